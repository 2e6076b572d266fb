use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// =============================================================================
// Unified config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
// Three equivalent ways to configure:
//
//   config.toml:     [session]
//                    name = "workspace-42"
//
//   env var:         WORKSPACED_SESSION__NAME=workspace-42
//                    (double underscore = nesting)
//
//   CLI flags override both for host/port/code-dir.

/// Top-level tunable configuration, deserialized by figment.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerFileConfig,
    #[serde(default)]
    pub workspace: WorkspaceFileConfig,
    #[serde(default)]
    pub session: SessionFileConfig,
}

/// Listener tunables (lives under `[server]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerFileConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerFileConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Served file root (lives under `[workspace]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceFileConfig {
    #[serde(default = "default_code_dir")]
    pub code_dir: PathBuf,
}

impl Default for WorkspaceFileConfig {
    fn default() -> Self {
        Self {
            code_dir: default_code_dir(),
        }
    }
}

/// Remote-shell session tunables (lives under `[session]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionFileConfig {
    /// Logical session name; used verbatim as the `job-name` label value.
    #[serde(default = "default_session_name")]
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Container to exec into within the selected pod.
    #[serde(default = "default_container")]
    pub container: String,
    /// Interactive shell invocation.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
}

impl Default for SessionFileConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            namespace: default_namespace(),
            container: default_container(),
            command: default_command(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_code_dir() -> PathBuf {
    PathBuf::from("/code")
}
fn default_session_name() -> String {
    "dev".to_string()
}
fn default_namespace() -> String {
    "default".to_string()
}
fn default_container() -> String {
    "user-service".to_string()
}
fn default_command() -> Vec<String> {
    vec!["sh".to_string()]
}

/// Build a figment that layers: defaults → config.toml → WORKSPACED_* env.
///
/// Env vars use double-underscore for nesting into sections:
///   `WORKSPACED_SESSION__NAME=ws-42`  →  `session.name = "ws-42"`
///   `WORKSPACED_SERVER__PORT=9090`    →  `server.port = 9090`
pub fn load_config(config_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(config_dir.join("config.toml")))
        .merge(Env::prefixed("WORKSPACED_").split("__"))
}

// =============================================================================
// Runtime config structs (derived from FileConfig, built once in main and
// injected through AppState; no process-wide mutable state)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_file(fc: &ServerFileConfig) -> Self {
        Self {
            host: fc.host.clone(),
            port: fc.port,
        }
    }

    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// The directory all file endpoints are scoped under.
#[derive(Clone, Debug)]
pub struct WorkspaceConfig {
    pub code_dir: PathBuf,
}

impl WorkspaceConfig {
    pub fn from_file(fc: &WorkspaceFileConfig) -> Self {
        Self {
            code_dir: fc.code_dir.clone(),
        }
    }
}

/// Read-only identity of the one workload this process bridges shells into.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub name: String,
    pub namespace: String,
    pub container: String,
    pub command: Vec<String>,
}

impl SessionConfig {
    pub fn from_file(fc: &SessionFileConfig) -> Self {
        Self {
            name: fc.name.clone(),
            namespace: fc.namespace.clone(),
            container: fc.container.clone(),
            command: fc.command.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let fc = FileConfig::default();
        assert_eq!(fc.server.host, "0.0.0.0");
        assert_eq!(fc.server.port, 8080);
        assert_eq!(fc.workspace.code_dir, PathBuf::from("/code"));
        assert_eq!(fc.session.name, "dev");
        assert_eq!(fc.session.namespace, "default");
        assert_eq!(fc.session.container, "user-service");
        assert_eq!(fc.session.command, vec!["sh"]);
    }

    #[test]
    fn test_load_config_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let fc: FileConfig = load_config(tmp.path()).extract().unwrap();
        assert_eq!(fc.server.port, 8080);
        assert_eq!(fc.session.name, "dev");
    }

    #[test]
    fn test_load_config_toml_sets_values() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[server]\nhost = \"127.0.0.1\"\nport = 9090\n\n\
             [workspace]\ncode_dir = \"/srv/code\"\n\n\
             [session]\nname = \"workspace-42\"\ncommand = [\"bash\", \"-l\"]\n",
        )
        .unwrap();
        let fc: FileConfig = load_config(tmp.path()).extract().unwrap();
        assert_eq!(fc.server.host, "127.0.0.1");
        assert_eq!(fc.server.port, 9090);
        assert_eq!(fc.workspace.code_dir, PathBuf::from("/srv/code"));
        assert_eq!(fc.session.name, "workspace-42");
        assert_eq!(fc.session.command, vec!["bash", "-l"]);
        // Untouched sections keep their defaults.
        assert_eq!(fc.session.container, "user-service");
    }

    #[test]
    fn test_runtime_views_from_file() {
        let fc = FileConfig::default();
        let server = ServerConfig::from_file(&fc.server);
        assert_eq!(server.addr().unwrap().port(), 8080);

        let session = SessionConfig::from_file(&fc.session);
        assert_eq!(session.name, "dev");
        assert_eq!(session.container, "user-service");
    }
}
