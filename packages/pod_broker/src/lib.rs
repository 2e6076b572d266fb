//! Pod Broker - Pod discovery and exec-channel brokering library
//!
//! This crate maps a logical session name onto one running backend pod and
//! opens an interactive exec channel into it. It has no HTTP-server
//! dependencies and no knowledge of the workspace domain: callers supply an
//! [`Orchestrator`] (the real in-cluster client lives in [`kube`], an
//! in-memory double lives in [`fake`]) plus byte-stream endpoints, and
//! [`stream`] copies bytes between both sides until either one terminates.
//!
//! # Example
//!
//! ```no_run
//! use pod_broker::{ExecSpec, ExecTarget, StreamOptions, resolve_running};
//! use pod_broker::kube::KubeOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orch = KubeOrchestrator::in_cluster()?;
//!
//!     let pod = resolve_running(&orch, "default", "my-session").await?;
//!     let spec = ExecSpec::interactive_shell("user-service", &["sh".to_string()]);
//!     let target = ExecTarget::new(&pod.name, &pod.namespace);
//!
//!     let channel = pod_broker::open_channel(&orch, &target, &spec).await?;
//!     pod_broker::stream(channel, StreamOptions::default()).await?;
//!     Ok(())
//! }
//! ```

mod error;
mod exec;
pub mod fake;
pub mod kube;
mod resolver;

use serde::Deserialize;

pub use error::{ChannelOpenError, ResolveError, StreamError, StreamingError};
pub use exec::{
    ExecChannel, ExecFrame, ExecInput, ExecOutput, ExecSpec, ExecTarget, InputStream,
    OutputStream, RemoteStream, StreamOptions, open_channel, stream,
};
pub use kube::KubeOrchestrator;
pub use resolver::resolve_running;

/// Lifecycle phase of a candidate pod, as reported by the orchestration API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Phase {
    Pending,
    Running,
    Succeeded,
    Failed,
    #[serde(other)]
    Unknown,
}

/// One backend execution unit matched by a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub namespace: String,
    pub phase: Phase,
}

/// Narrow capability interface over the orchestration API: list pods by
/// selector, open an exec stream into one pod. Everything else the cluster
/// client could do is deliberately out of reach.
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync {
    /// List candidate pods matching a label selector within one namespace.
    async fn list_candidates(
        &self,
        namespace: &str,
        selector: &str,
    ) -> anyhow::Result<Vec<Candidate>>;

    /// Open a live exec channel into one pod.
    async fn open_exec(&self, target: &ExecTarget, spec: &ExecSpec)
    -> anyhow::Result<ExecChannel>;
}
