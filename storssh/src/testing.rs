//! Scripted transport for pool and executor tests.
//!
//! Outcomes are queued up front and played back in order. Counters record
//! how many connections were opened and how many were live at once.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{Connection, DeviceEndpoint, Transport};

pub(crate) fn endpoint(max_pool_size: usize) -> DeviceEndpoint {
    DeviceEndpoint::builder("array01")
        .username("monitor")
        .password("secret")
        .connect_timeout(Duration::from_secs(2))
        .max_pool_size(max_pool_size)
        .build()
        .unwrap()
}

struct ExecStep {
    delay: Duration,
    outcome: Result<Vec<u8>, TransportError>,
}

#[derive(Default)]
struct Script {
    connect_failures: VecDeque<TransportError>,
    connect_delay: Duration,
    exec_steps: VecDeque<ExecStep>,
    /// Output chunks played back after each `send`, one entry per input.
    shell_replies: VecDeque<Vec<Vec<u8>>>,
    generation: u64,
    connects: usize,
    live: usize,
    max_live: usize,
    executed: Vec<String>,
    sent: Vec<String>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

fn lock(script: &Mutex<Script>) -> MutexGuard<'_, Script> {
    script.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_next_connect(&self, err: TransportError) {
        lock(&self.script).connect_failures.push_back(err);
    }

    /// Stall every later handshake by `delay`.
    pub(crate) fn set_connect_delay(&self, delay: Duration) {
        lock(&self.script).connect_delay = delay;
    }

    pub(crate) fn exec_ok(&self, output: &str) {
        self.exec_after(Duration::ZERO, Ok(output.as_bytes().to_vec()));
    }

    pub(crate) fn exec_err(&self, err: TransportError) {
        self.exec_after(Duration::ZERO, Err(err));
    }

    /// Queue an exec outcome delivered after `delay`. A delay longer than the
    /// caller's timeout turns into `TransportError::Timeout`.
    pub(crate) fn exec_after(&self, delay: Duration, outcome: Result<Vec<u8>, TransportError>) {
        lock(&self.script)
            .exec_steps
            .push_back(ExecStep { delay, outcome });
    }

    /// Queue the shell output produced by the next `send`.
    pub(crate) fn shell_reply(&self, chunks: &[&str]) {
        lock(&self.script)
            .shell_replies
            .push_back(chunks.iter().map(|c| c.as_bytes().to_vec()).collect());
    }

    /// Make every existing connection report itself dead.
    pub(crate) fn kill_connections(&self) {
        lock(&self.script).generation += 1;
    }

    pub(crate) fn connects(&self) -> usize {
        lock(&self.script).connects
    }

    pub(crate) fn live(&self) -> usize {
        lock(&self.script).live
    }

    pub(crate) fn max_live(&self) -> usize {
        lock(&self.script).max_live
    }

    pub(crate) fn executed(&self) -> Vec<String> {
        lock(&self.script).executed.clone()
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        lock(&self.script).sent.clone()
    }
}

impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    fn connect(
        &self,
        _endpoint: &DeviceEndpoint,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send {
        let script = Arc::clone(&self.script);
        let delay = lock(&self.script).connect_delay;
        async move {
            // let concurrent callers interleave the way a real handshake would
            tokio::time::sleep(Duration::from_millis(2) + delay).await;

            let generation = {
                let mut state = lock(&script);
                if let Some(err) = state.connect_failures.pop_front() {
                    return Err(err);
                }
                state.connects += 1;
                state.live += 1;
                state.max_live = state.max_live.max(state.live);
                state.generation
            };

            Ok(ScriptedConnection {
                script,
                generation,
                closed: false,
                pending: VecDeque::new(),
            })
        }
    }
}

pub(crate) struct ScriptedConnection {
    script: Arc<Mutex<Script>>,
    generation: u64,
    closed: bool,
    pending: VecDeque<Vec<u8>>,
}

impl ScriptedConnection {
    fn mark_closed(&mut self) {
        if !self.closed {
            self.closed = true;
            lock(&self.script).live -= 1;
        }
    }
}

impl Connection for ScriptedConnection {
    fn exec(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send {
        let step = {
            let mut state = lock(&self.script);
            state.executed.push(command.to_string());
            state.exec_steps.pop_front()
        };
        async move {
            let Some(step) = step else {
                return Ok(Vec::new());
            };
            if step.delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(TransportError::Timeout(timeout));
            }
            if !step.delay.is_zero() {
                tokio::time::sleep(step.delay).await;
            }
            step.outcome
        }
    }

    async fn open_shell(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&mut self, input: &str) -> Result<(), TransportError> {
        let reply = {
            let mut state = lock(&self.script);
            state.sent.push(input.to_string());
            state.shell_replies.pop_front()
        };
        self.pending.extend(reply.unwrap_or_default());
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.is_alive() {
            return Ok(None);
        }
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(Some(chunk));
        }
        tokio::time::sleep(timeout).await;
        Err(TransportError::Timeout(timeout))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.mark_closed();
        Ok(())
    }

    fn is_alive(&self) -> bool {
        !self.closed && lock(&self.script).generation == self.generation
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.mark_closed();
    }
}
