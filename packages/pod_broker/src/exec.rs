use async_trait::async_trait;
use tracing::{debug, trace};

use crate::error::{ChannelOpenError, StreamError, StreamingError};
use crate::Orchestrator;

/// Pod identity an exec channel is opened against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecTarget {
    pub name: String,
    pub namespace: String,
}

impl ExecTarget {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }
}

/// What to run inside the pod and which streams to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSpec {
    pub container: String,
    pub command: Vec<String>,
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
    pub tty: bool,
}

impl ExecSpec {
    /// The bridge's fixed shape: an interactive shell with all three streams
    /// attached and terminal semantics (stderr merges into stdout remotely).
    pub fn interactive_shell(container: &str, command: &[String]) -> Self {
        Self {
            container: container.to_string(),
            command: command.to_vec(),
            stdin: true,
            stdout: true,
            stderr: true,
            tty: true,
        }
    }
}

/// Which remote stream a downstream frame belongs to. Under a tty both are
/// produced as `Stdout` by the remote, but non-tty channels keep them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStream {
    Stdout,
    Stderr,
}

/// One chunk of remote output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecFrame {
    pub stream: RemoteStream,
    pub data: Vec<u8>,
}

impl ExecFrame {
    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: RemoteStream::Stdout,
            data: data.into(),
        }
    }

    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self {
            stream: RemoteStream::Stderr,
            data: data.into(),
        }
    }
}

/// Upstream half of an open exec channel (bytes toward remote stdin).
#[async_trait]
pub trait ExecInput: Send {
    async fn send(&mut self, data: &[u8]) -> Result<(), StreamingError>;
}

/// Downstream half of an open exec channel. `Ok(None)` means the remote
/// process ended its output normally.
#[async_trait]
pub trait ExecOutput: Send {
    async fn recv(&mut self) -> Result<Option<ExecFrame>, StreamingError>;
}

/// A live exec session: both halves of the remote conduit. Exclusively owned
/// by one bridge session; dropping it tears the transport down.
pub struct ExecChannel {
    pub input: Box<dyn ExecInput>,
    pub output: Box<dyn ExecOutput>,
}

/// Local byte-source fed to remote stdin. `read` blocks for the next chunk
/// and copies up to `buf.len()` bytes into `buf`.
#[async_trait]
pub trait InputStream: Send {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError>;
}

/// Local byte-sink fed from remote stdout/stderr. `write` forwards the whole
/// slice and reports how many bytes it accepted (always all of them; there
/// are no partial writes at this layer).
#[async_trait]
pub trait OutputStream: Send {
    async fn write(&mut self, data: &[u8]) -> Result<usize, StreamError>;
}

/// Local endpoints for one streaming call, mirroring the exec spec's flags.
#[derive(Default)]
pub struct StreamOptions {
    pub stdin: Option<Box<dyn InputStream>>,
    pub stdout: Option<Box<dyn OutputStream>>,
    pub stderr: Option<Box<dyn OutputStream>>,
    pub tty: bool,
}

/// Build and open the exec channel for one selected pod, wrapping any
/// construction/authentication/refusal failure with the target identity.
pub async fn open_channel(
    orchestrator: &dyn Orchestrator,
    target: &ExecTarget,
    spec: &ExecSpec,
) -> Result<ExecChannel, ChannelOpenError> {
    debug!(pod = %target.name, container = %spec.container, "opening exec channel");
    orchestrator
        .open_exec(target, spec)
        .await
        .map_err(|source| ChannelOpenError {
            pod: target.name.clone(),
            container: spec.container.clone(),
            source,
        })
}

const STDIN_CHUNK: usize = 4096;

/// Drive one bridge session: copy local stdin to the remote and remote
/// frames to the local stdout/stderr sinks until either side terminates.
///
/// Returns `Ok(())` when the remote ends its output normally. Returns an
/// error when the client side closes mid-session, a local write fails, the
/// transport fails, or the remote reports a failure status. There is no
/// timeout and no cancellation token: the call blocks exactly as long as the
/// session lives, and closing either side makes the other loop observe it.
pub async fn stream(channel: ExecChannel, options: StreamOptions) -> Result<(), StreamingError> {
    let ExecChannel {
        mut input,
        mut output,
    } = channel;
    let StreamOptions {
        stdin,
        mut stdout,
        mut stderr,
        tty: _,
    } = options;

    // Upstream never completes on its own; it only ever yields an error.
    let upstream = async move {
        let mut stdin = match stdin {
            Some(s) => s,
            None => return std::future::pending::<StreamingError>().await,
        };
        let mut buf = [0u8; STDIN_CHUNK];
        loop {
            match stdin.read(&mut buf).await {
                Ok(0) => continue,
                Ok(n) => {
                    trace!(bytes = n, "stdin -> remote");
                    if let Err(e) = input.send(&buf[..n]).await {
                        return e;
                    }
                }
                Err(e) => return StreamingError::Stdin(e),
            }
        }
    };

    let downstream = async move {
        loop {
            match output.recv().await? {
                Some(frame) => {
                    trace!(bytes = frame.data.len(), stream = ?frame.stream, "remote -> client");
                    let sink = match frame.stream {
                        RemoteStream::Stdout => stdout.as_mut(),
                        RemoteStream::Stderr => stderr.as_mut(),
                    };
                    if let Some(sink) = sink {
                        sink.write(&frame.data)
                            .await
                            .map_err(StreamingError::LocalWrite)?;
                    }
                }
                None => return Ok(()),
            }
        }
    };

    tokio::select! {
        err = upstream => Err(err),
        result = downstream => result,
    }
}
