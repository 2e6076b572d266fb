//! In-memory orchestrator double for tests and local development.
//!
//! Candidates and remote output are scripted up front; stdin writes and exec
//! opens are recorded so callers can assert on what the bridge actually did.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StreamingError;
use crate::exec::{ExecChannel, ExecFrame, ExecInput, ExecOutput, ExecSpec, ExecTarget};
use crate::{Candidate, Orchestrator};

#[derive(Default)]
pub struct FakeOrchestrator {
    candidates: Vec<Candidate>,
    list_error: Option<String>,
    script: Vec<ExecFrame>,
    echo: bool,
    opened: AtomicUsize,
    last_listing: Mutex<Option<(String, String)>>,
    last_exec: Mutex<Option<(ExecTarget, ExecSpec)>>,
    recorded: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Make every list call fail, as an unreachable apiserver would.
    pub fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    /// Frames the remote emits right after the channel opens. Without echo
    /// mode the remote "exits" once the script is drained.
    pub fn with_script(mut self, frames: Vec<ExecFrame>) -> Self {
        self.script = frames;
        self
    }

    /// After the script, echo every stdin write back as a stdout frame.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// How many exec channels have been opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// The `(namespace, selector)` of the most recent list call.
    pub fn last_listing(&self) -> Option<(String, String)> {
        self.last_listing.lock().unwrap().clone()
    }

    /// The `(target, spec)` of the most recent exec open.
    pub fn last_exec(&self) -> Option<(ExecTarget, ExecSpec)> {
        self.last_exec.lock().unwrap().clone()
    }

    /// Every stdin chunk the bridge has forwarded, in receipt order.
    pub fn recorded_stdin(&self) -> Vec<Vec<u8>> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Orchestrator for FakeOrchestrator {
    async fn list_candidates(
        &self,
        namespace: &str,
        selector: &str,
    ) -> anyhow::Result<Vec<Candidate>> {
        *self.last_listing.lock().unwrap() =
            Some((namespace.to_string(), selector.to_string()));
        if let Some(message) = &self.list_error {
            return Err(anyhow!("{message}"));
        }
        Ok(self.candidates.clone())
    }

    async fn open_exec(
        &self,
        target: &ExecTarget,
        spec: &ExecSpec,
    ) -> anyhow::Result<ExecChannel> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_exec.lock().unwrap() = Some((target.clone(), spec.clone()));

        let (echo_tx, echo_rx) = mpsc::unbounded_channel();
        Ok(ExecChannel {
            input: Box::new(FakeInput {
                recorded: self.recorded.clone(),
                echo: self.echo.then_some(echo_tx),
            }),
            output: Box::new(FakeOutput {
                script: self.script.clone(),
                echo: self.echo.then_some(echo_rx),
            }),
        })
    }
}

struct FakeInput {
    recorded: Arc<Mutex<Vec<Vec<u8>>>>,
    echo: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[async_trait]
impl ExecInput for FakeInput {
    async fn send(&mut self, data: &[u8]) -> Result<(), StreamingError> {
        self.recorded.lock().unwrap().push(data.to_vec());
        if let Some(tx) = &self.echo {
            tx.send(data.to_vec())
                .map_err(|_| StreamingError::Channel(anyhow!("echo peer gone")))?;
        }
        Ok(())
    }
}

struct FakeOutput {
    script: Vec<ExecFrame>,
    echo: Option<mpsc::UnboundedReceiver<Vec<u8>>>,
}

#[async_trait]
impl ExecOutput for FakeOutput {
    async fn recv(&mut self) -> Result<Option<ExecFrame>, StreamingError> {
        if !self.script.is_empty() {
            return Ok(Some(self.script.remove(0)));
        }
        match &mut self.echo {
            Some(rx) => Ok(rx.recv().await.map(ExecFrame::stdout)),
            None => Ok(None),
        }
    }
}
