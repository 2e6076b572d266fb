use thiserror::Error;

/// Discovery failures: the session is not (yet) schedulable. None of these
/// are retried here; the client reconnects and resolution starts from fresh
/// cluster state.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to list pods for selector {selector:?}: {source}")]
    List {
        selector: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no pods found for selector {selector:?}")]
    NoCandidates { selector: String },

    #[error("no running pod among {total} candidates for selector {selector:?}")]
    NoRunningInstance { selector: String, total: usize },
}

/// The exec request could not be built, authenticated, or accepted.
#[derive(Debug, Error)]
#[error("failed to open exec channel to {pod}/{container}: {source}")]
pub struct ChannelOpenError {
    pub pod: String,
    pub container: String,
    #[source]
    pub source: anyhow::Error,
}

/// Adapter-level I/O failure on a local byte-stream endpoint.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connection closed")]
    ConnectionClosed,

    #[error("read failed: {0}")]
    Read(#[source] anyhow::Error),

    #[error("write failed: {0}")]
    Write(#[source] anyhow::Error),
}

/// Failure during the bridged copy. The bridge session is over either way;
/// the variant says which side gave out first.
#[derive(Debug, Error)]
pub enum StreamingError {
    /// Reading client input failed (typically: the client disconnected).
    #[error("stdin copy failed: {0}")]
    Stdin(#[source] StreamError),

    /// Writing remote output to the client failed.
    #[error("output copy failed: {0}")]
    LocalWrite(#[source] StreamError),

    /// The exec transport itself failed.
    #[error("exec channel failed: {0}")]
    Channel(#[source] anyhow::Error),

    /// The remote side reported a terminal failure status.
    #[error("remote command failed: {0}")]
    Remote(String),
}
