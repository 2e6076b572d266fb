//! The remote-shell bridge: adapts one client WebSocket to the byte-oriented
//! exec channel of the selected pod and drives the copy until either side
//! terminates.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tracing::{error, info};

use pod_broker::{
    ExecSpec, ExecTarget, InputStream, Orchestrator, OutputStream, StreamError, StreamOptions,
    StreamingError, open_channel, resolve_running,
};

use crate::config::SessionConfig;

/// Copy one inbound message into the caller's buffer. A message feeds at
/// most one read: whatever exceeds the buffer's capacity is dropped, not
/// queued for the next read.
fn copy_truncated(buf: &mut [u8], message: &[u8]) -> usize {
    let n = message.len().min(buf.len());
    buf[..n].copy_from_slice(&message[..n]);
    n
}

/// Presents the receiving half of a message-framed connection as a blocking
/// byte source: each read hands over (a prefix of) the next message.
pub struct WsByteReader<S> {
    stream: S,
}

impl<S> WsByteReader<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> InputStream for WsByteReader<S>
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin + Send,
{
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        loop {
            match self.stream.next().await {
                None => return Err(StreamError::ConnectionClosed),
                Some(Err(e)) => return Err(StreamError::Read(e.into())),
                Some(Ok(Message::Text(text))) => return Ok(copy_truncated(buf, text.as_bytes())),
                Some(Ok(Message::Binary(data))) => return Ok(copy_truncated(buf, &data)),
                Some(Ok(Message::Close(_))) => return Err(StreamError::ConnectionClosed),
                // Ping/pong is transport noise; the frames are answered by axum.
                Some(Ok(_)) => continue,
            }
        }
    }
}

/// Presents the sending half as a byte sink: every write becomes exactly one
/// binary message, unbuffered and uncoalesced. Cloneable so stdout and
/// stderr can share the single outbound half of the connection.
pub struct WsByteWriter<S> {
    sink: Arc<Mutex<S>>,
}

impl<S> WsByteWriter<S> {
    pub fn new(sink: Arc<Mutex<S>>) -> Self {
        Self { sink }
    }
}

impl<S> Clone for WsByteWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
        }
    }
}

#[async_trait]
impl<S> OutputStream for WsByteWriter<S>
where
    S: Sink<Message> + Unpin + Send,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    async fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(|e| StreamError::Write(e.into()))?;
        Ok(data.len())
    }
}

/// A client hanging up mid-session is the ordinary way most sessions end,
/// not a failure worth an error-level log.
fn is_client_disconnect(err: &StreamingError) -> bool {
    matches!(err, StreamingError::Stdin(StreamError::ConnectionClosed))
}

/// One full bridge session: resolve the session's pod, open the exec
/// channel, stream until either side terminates, release the connection.
///
/// Discovery and open failures are logged and end in a bare disconnect; the
/// client never receives a structured error payload. The upgrade future owns
/// the socket, so every exit path (errors included) closes it.
pub async fn run_bridge(
    socket: WebSocket,
    session: Arc<SessionConfig>,
    orchestrator: Arc<dyn Orchestrator>,
) {
    info!(session = %session.name, "terminal bridge connected");

    let pod = match resolve_running(orchestrator.as_ref(), &session.namespace, &session.name).await
    {
        Ok(pod) => pod,
        Err(e) => {
            error!(session = %session.name, error = %e, "session resolution failed");
            return;
        }
    };
    info!(session = %session.name, pod = %pod.name, "selected running pod");

    let spec = ExecSpec::interactive_shell(&session.container, &session.command);
    let target = ExecTarget::new(&pod.name, &pod.namespace);
    let channel = match open_channel(orchestrator.as_ref(), &target, &spec).await {
        Ok(channel) => channel,
        Err(e) => {
            error!(session = %session.name, pod = %pod.name, error = %e, "failed to open exec channel");
            return;
        }
    };

    let (ws_sink, ws_stream) = socket.split();
    let ws_sink = Arc::new(Mutex::new(ws_sink));
    let options = StreamOptions {
        stdin: Some(Box::new(WsByteReader::new(ws_stream))),
        stdout: Some(Box::new(WsByteWriter::new(ws_sink.clone()))),
        stderr: Some(Box::new(WsByteWriter::new(ws_sink.clone()))),
        tty: true,
    };

    match pod_broker::stream(channel, options).await {
        Ok(()) => info!(session = %session.name, pod = %pod.name, "bridge session ended"),
        Err(e) if is_client_disconnect(&e) => {
            info!(session = %session.name, pod = %pod.name, "client disconnected")
        }
        Err(e) => {
            error!(session = %session.name, pod = %pod.name, error = %e, "bridge session failed")
        }
    }

    // Adapters are gone once the streaming call returns; send a close frame
    // so well-behaved clients see an orderly shutdown.
    let mut sink = ws_sink.lock().await;
    let _ = sink.send(Message::Close(None)).await;
}
