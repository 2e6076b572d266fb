//! In-cluster Kubernetes implementation of [`Orchestrator`].
//!
//! Pods are listed through the REST API with the service-account bearer
//! token; exec channels ride the API server's WebSocket exec subprotocol
//! (`v4.channel.k8s.io`), where every binary frame carries a channel byte:
//! 0 stdin, 1 stdout, 2 stderr, 3 terminal status.

use std::sync::Arc;

use anyhow::{Context, anyhow, bail};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::debug;
use url::Url;

use crate::error::StreamingError;
use crate::exec::{ExecChannel, ExecFrame, ExecInput, ExecOutput, ExecSpec, ExecTarget};
use crate::{Candidate, Orchestrator, Phase};

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const EXEC_SUBPROTOCOL: &str = "v4.channel.k8s.io";

const CHANNEL_STDIN: u8 = 0;
const CHANNEL_STDOUT: u8 = 1;
const CHANNEL_STDERR: u8 = 2;
const CHANNEL_STATUS: u8 = 3;

/// Where the API server lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct KubeConfig {
    pub api_server: Url,
    pub token: String,
    /// Cluster CA bundle (PEM). When absent, system roots are trusted.
    pub ca_pem: Option<Vec<u8>>,
}

impl KubeConfig {
    /// Ambient credentials of a pod: `KUBERNETES_SERVICE_HOST`/`_PORT` plus
    /// the mounted service-account token and CA bundle.
    pub fn in_cluster() -> anyhow::Result<Self> {
        let host = std::env::var("KUBERNETES_SERVICE_HOST")
            .context("KUBERNETES_SERVICE_HOST not set; not running in a cluster?")?;
        let port = std::env::var("KUBERNETES_SERVICE_PORT").unwrap_or_else(|_| "443".to_string());
        let api_server = Url::parse(&format!("https://{host}:{port}"))
            .context("invalid in-cluster API server address")?;

        let token_path = format!("{SERVICE_ACCOUNT_DIR}/token");
        let token = std::fs::read_to_string(&token_path)
            .with_context(|| format!("failed to read service-account token: {token_path}"))?
            .trim()
            .to_string();

        let ca_path = format!("{SERVICE_ACCOUNT_DIR}/ca.crt");
        let ca_pem = std::fs::read(&ca_path)
            .with_context(|| format!("failed to read cluster CA bundle: {ca_path}"))?;

        Ok(Self {
            api_server,
            token,
            ca_pem: Some(ca_pem),
        })
    }

    pub fn from_parts(api_server: Url, token: String, ca_pem: Option<Vec<u8>>) -> Self {
        Self {
            api_server,
            token,
            ca_pem,
        }
    }
}

/// Concrete [`Orchestrator`] backed by one Kubernetes cluster.
pub struct KubeOrchestrator {
    config: KubeConfig,
    http: reqwest::Client,
    /// TLS config for the exec WebSocket when a custom CA is in play.
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl KubeOrchestrator {
    pub fn new(config: KubeConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ca_pem) = &config.ca_pem {
            let cert = reqwest::Certificate::from_pem(ca_pem)
                .context("cluster CA bundle is not valid PEM")?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        let tls = match &config.ca_pem {
            Some(ca_pem) => Some(Arc::new(rustls_config_with_ca(ca_pem)?)),
            None => None,
        };

        Ok(Self { config, http, tls })
    }

    pub fn in_cluster() -> anyhow::Result<Self> {
        Self::new(KubeConfig::in_cluster()?)
    }

    fn pods_url(&self, namespace: &str) -> anyhow::Result<Url> {
        self.config
            .api_server
            .join(&format!("api/v1/namespaces/{namespace}/pods"))
            .context("failed to build pod list URL")
    }
}

fn rustls_config_with_ca(ca_pem: &[u8]) -> anyhow::Result<rustls::ClientConfig> {
    let mut roots = rustls::RootCertStore::empty();
    let mut reader = std::io::BufReader::new(ca_pem);
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.context("cluster CA bundle is not valid PEM")?;
        roots
            .add(cert)
            .context("cluster CA certificate rejected")?;
    }
    if roots.is_empty() {
        bail!("cluster CA bundle contains no certificates");
    }
    Ok(rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

/// Build the exec URL for one pod: sub-resource path plus container,
/// command, and stream flags as query parameters.
fn exec_url(api_server: &Url, target: &ExecTarget, spec: &ExecSpec) -> anyhow::Result<Url> {
    let mut url = api_server
        .join(&format!(
            "api/v1/namespaces/{}/pods/{}/exec",
            target.namespace, target.name
        ))
        .context("failed to build exec URL")?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("container", &spec.container);
        for arg in &spec.command {
            query.append_pair("command", arg);
        }
        query.append_pair("stdin", if spec.stdin { "true" } else { "false" });
        query.append_pair("stdout", if spec.stdout { "true" } else { "false" });
        query.append_pair("stderr", if spec.stderr { "true" } else { "false" });
        query.append_pair("tty", if spec.tty { "true" } else { "false" });
    }
    let ws_scheme = match url.scheme() {
        "https" => "wss",
        _ => "ws",
    };
    url.set_scheme(ws_scheme)
        .map_err(|_| anyhow!("failed to switch exec URL to websocket scheme"))?;
    Ok(url)
}

fn encode_stdin_frame(data: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(data.len() + 1);
    frame.push(CHANNEL_STDIN);
    frame.extend_from_slice(data);
    frame
}

enum Decoded {
    Frame(ExecFrame),
    /// Terminal status object from channel 3.
    Status(serde_json::Value),
    /// Channel byte only, or an unknown channel: nothing to forward.
    Skip,
}

fn decode_frame(payload: &[u8]) -> Decoded {
    let Some((&channel, data)) = payload.split_first() else {
        return Decoded::Skip;
    };
    match channel {
        CHANNEL_STDOUT if !data.is_empty() => Decoded::Frame(ExecFrame::stdout(data.to_vec())),
        CHANNEL_STDERR if !data.is_empty() => Decoded::Frame(ExecFrame::stderr(data.to_vec())),
        CHANNEL_STATUS => match serde_json::from_slice(data) {
            Ok(status) => Decoded::Status(status),
            Err(_) => Decoded::Skip,
        },
        _ => Decoded::Skip,
    }
}

// Minimal view of the pod list response.
#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<Pod>,
}

#[derive(Deserialize)]
struct Pod {
    metadata: ObjectMeta,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default)]
    namespace: String,
}

#[derive(Deserialize, Default)]
struct PodStatus {
    phase: Option<Phase>,
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn list_candidates(
        &self,
        namespace: &str,
        selector: &str,
    ) -> anyhow::Result<Vec<Candidate>> {
        let url = self.pods_url(namespace)?;
        let mut request = self.http.get(url).query(&[("labelSelector", selector)]);
        if !self.config.token.is_empty() {
            request = request.bearer_auth(&self.config.token);
        }
        let list: PodList = request
            .send()
            .await
            .context("pod list request failed")?
            .error_for_status()
            .context("pod list request rejected")?
            .json()
            .await
            .context("pod list response is not valid JSON")?;

        Ok(list
            .items
            .into_iter()
            .map(|pod| Candidate {
                name: pod.metadata.name,
                namespace: if pod.metadata.namespace.is_empty() {
                    namespace.to_string()
                } else {
                    pod.metadata.namespace
                },
                phase: pod.status.phase.unwrap_or(Phase::Unknown),
            })
            .collect())
    }

    async fn open_exec(
        &self,
        target: &ExecTarget,
        spec: &ExecSpec,
    ) -> anyhow::Result<ExecChannel> {
        let url = exec_url(&self.config.api_server, target, spec)?;
        debug!(%url, "connecting exec websocket");

        let mut request = url
            .as_str()
            .into_client_request()
            .context("failed to build exec request")?;
        request.headers_mut().insert(
            "Sec-WebSocket-Protocol",
            EXEC_SUBPROTOCOL
                .parse()
                .context("invalid exec subprotocol header")?,
        );
        if !self.config.token.is_empty() {
            let bearer = format!("Bearer {}", self.config.token);
            request.headers_mut().insert(
                "Authorization",
                bearer.parse().context("invalid bearer token header")?,
            );
        }

        let connector = self.tls.clone().map(Connector::Rustls);
        let (ws, _response) = connect_async_tls_with_config(request, None, false, connector)
            .await
            .context("exec websocket handshake failed")?;

        let (sink, stream) = ws.split();
        Ok(ExecChannel {
            input: Box::new(KubeExecInput { sink }),
            output: Box::new(KubeExecOutput { stream }),
        })
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct KubeExecInput {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl ExecInput for KubeExecInput {
    async fn send(&mut self, data: &[u8]) -> Result<(), StreamingError> {
        self.sink
            .send(Message::Binary(encode_stdin_frame(data).into()))
            .await
            .map_err(|e| StreamingError::Channel(e.into()))
    }
}

struct KubeExecOutput {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl ExecOutput for KubeExecOutput {
    async fn recv(&mut self) -> Result<Option<ExecFrame>, StreamingError> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(StreamingError::Channel(e.into())),
                Some(Ok(m)) => m,
            };
            match message {
                Message::Binary(payload) => match decode_frame(&payload) {
                    Decoded::Frame(frame) => return Ok(Some(frame)),
                    Decoded::Status(status) => {
                        if status["status"] == "Success" {
                            return Ok(None);
                        }
                        let message = status["message"]
                            .as_str()
                            .unwrap_or("remote command failed")
                            .to_string();
                        return Err(StreamingError::Remote(message));
                    }
                    Decoded::Skip => continue,
                },
                Message::Close(_) => return Ok(None),
                // Text frames do not occur on this subprotocol; pings are
                // answered by the transport.
                _ => continue,
            }
        }
    }
}
