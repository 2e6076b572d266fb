use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{delete, get, post},
};
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use pod_broker::{KubeOrchestrator, Orchestrator};

mod bridge;
mod config;
mod files;
mod health;
mod terminal;
#[cfg(test)]
mod test_helpers;

use crate::config::{
    FileConfig, ServerConfig, SessionConfig, WorkspaceConfig, load_config,
};

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "workspaced")]
#[command(about = "Code workspace backend: file API and remote shell bridge")]
struct Cli {
    /// Directory containing config.toml (defaults to the working directory)
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Host to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port for the web server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Workspace root served by the file endpoints (overrides config)
    #[arg(long)]
    code_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<WorkspaceConfig>,
    pub session: Arc<SessionConfig>,
    /// `None` when the process runs outside a cluster without credentials;
    /// file endpoints keep working, terminal connections get refused.
    pub orchestrator: Option<Arc<dyn Orchestrator>>,
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::index_handler))
        .route("/health", get(health::health_handler))
        .route("/api/files", get(files::list_files))
        .route(
            "/api/files/content",
            get(files::get_file_content).post(files::save_file_content),
        )
        .route("/api/files/create", post(files::create_file))
        .route("/api/folder/create", post(files::create_folder))
        .route("/api/node", delete(files::delete_node))
        .route("/api/node/rename", post(files::rename_node))
        .route("/api/node/move", post(files::move_node))
        .route("/api/terminal", get(terminal::terminal_handler))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "workspaced=debug,pod_broker=debug,tower_http=debug,info"
    } else {
        "workspaced=info,pod_broker=info,tower_http=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let mut file_config: FileConfig = load_config(&cli.config_dir)
        .extract()
        .context("invalid configuration")?;
    if let Some(host) = cli.host {
        file_config.server.host = host;
    }
    if let Some(port) = cli.port {
        file_config.server.port = port;
    }
    if let Some(code_dir) = cli.code_dir {
        file_config.workspace.code_dir = code_dir;
    }

    let server = ServerConfig::from_file(&file_config.server);
    let workspace = WorkspaceConfig::from_file(&file_config.workspace);
    let session = SessionConfig::from_file(&file_config.session);

    let orchestrator: Option<Arc<dyn Orchestrator>> = match KubeOrchestrator::in_cluster() {
        Ok(orch) => Some(Arc::new(orch)),
        Err(e) => {
            warn!(error = %e, "no cluster credentials; terminal endpoint disabled");
            None
        }
    };

    let state = AppState {
        workspace: Arc::new(workspace),
        session: Arc::new(session),
        orchestrator,
    };

    info!(
        session = %state.session.name,
        namespace = %state.session.namespace,
        code_dir = %state.workspace.code_dir.display(),
        "starting workspaced"
    );

    let app = build_router(state);

    let addr: SocketAddr = server.addr().context("invalid listen address")?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("workspaced listening on http://{}", actual_addr);
    info!("API endpoints:");
    info!("  GET    /api/files            - Workspace file tree");
    info!("  GET    /api/files/content    - Read a file");
    info!("  POST   /api/files/content    - Save a file");
    info!("  POST   /api/files/create     - Create a file");
    info!("  POST   /api/folder/create    - Create a folder");
    info!("  DELETE /api/node             - Delete a file or folder");
    info!("  POST   /api/node/rename      - Rename a node");
    info!("  POST   /api/node/move        - Move a node");
    info!("  GET    /api/terminal         - WebSocket shell into the session pod");

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal, shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")
}
