//! Command execution through a session pool.
//!
//! [`CommandExecutor::run`] is the one place raw transport failures are
//! classified. Every attempt checks a session out, runs the command, and
//! hands the session back: released when healthy, evicted when its state
//! after a failed read cannot be trusted. Retryable failures are retried
//! with exponential backoff; fatal ones surface immediately.
//!
//! ```rust,no_run
//! use storssh::executor::{CommandExecutor, ExecOptions};
//! use storssh::pool::SessionPool;
//! use storssh::profile::DeviceProfile;
//! use storssh::transport::DeviceEndpoint;
//!
//! # async fn example() -> Result<(), storssh::Error> {
//! let endpoint = DeviceEndpoint::builder("10.0.0.5")
//!     .username("monitor")
//!     .password("secret")
//!     .build()?;
//! let profile = DeviceProfile::new("eternus")
//!     .with_prompt(r"CLI>")?
//!     .with_soft_failure("Error: E0019 Inapplicable");
//! let executor = CommandExecutor::new(SessionPool::ssh(endpoint), profile);
//!
//! let response = executor
//!     .run("show disks", &ExecOptions::default().with_interactive(true))
//!     .await?;
//! if !response.is_empty_result() {
//!     println!("{}", response);
//! }
//! # Ok(())
//! # }
//! ```

mod command;
mod response;

pub use command::{Command, ExecOptions};
pub use response::RawResponse;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use crate::channel::{OutputBuffer, strip_ansi};
use crate::error::{Error, Result, TransportError};
use crate::pool::{SessionId, SessionPool};
use crate::profile::DeviceProfile;
use crate::transport::{Connection, SshTransport, Transport};

/// Output of one successful attempt, before interpretation.
struct Output {
    session_id: SessionId,
    bytes: Vec<u8>,
}

/// Runs commands against one device with retry and classification.
pub struct CommandExecutor<T: Transport = SshTransport> {
    pool: SessionPool<T>,
    profile: Arc<DeviceProfile>,
}

impl<T: Transport> Clone for CommandExecutor<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            profile: Arc::clone(&self.profile),
        }
    }
}

impl<T: Transport> CommandExecutor<T> {
    pub fn new(pool: SessionPool<T>, profile: DeviceProfile) -> Self {
        Self {
            pool,
            profile: Arc::new(profile),
        }
    }

    pub fn pool(&self) -> &SessionPool<T> {
        &self.pool
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Run a command and return its decoded output.
    ///
    /// Output carrying a soft failure marker, or nothing but prompts and
    /// banners, comes back as an empty-result success. Output carrying a
    /// failure marker is [`Error::UnexpectedResponse`] and is not retried.
    pub async fn run(
        &self,
        command: impl Into<Command>,
        options: &ExecOptions,
    ) -> Result<RawResponse> {
        let command = command.into();
        if command.is_empty() {
            return Err(Error::InvalidConfig {
                message: "command has no inputs".to_string(),
            });
        }

        let host = self.pool.endpoint().host();
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                "executor: {} on {} (attempt {}/{})",
                command,
                host,
                attempt,
                options.max_attempts()
            );

            match self.attempt(&command, options).await {
                Ok(output) => {
                    return self.interpret(&command, output, options, attempt, start.elapsed());
                }
                Err(err) if err.is_retryable() && attempt <= options.max_retries => {
                    let delay = options.delay_for_attempt(attempt - 1);
                    warn!(
                        "executor: attempt {} of '{}' on {} failed: {}; retrying in {:?}",
                        attempt, command, host, err, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    debug!(
                        "executor: '{}' on {} failed after {} attempt(s): {}",
                        command, host, attempt, err
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, command: &Command, options: &ExecOptions) -> Result<Output> {
        let mut session = self.pool.acquire(options.acquire_timeout).await?;
        let session_id = session.id();
        let deadline = Instant::now() + options.timeout;

        let conn = session.connection_mut();
        let result = if options.interactive {
            self.run_shell(conn, command, options, deadline).await
        } else {
            run_exec(conn, command, options, deadline)
                .await
                .map(|bytes| (bytes, true))
        };

        match result {
            Ok((bytes, true)) => {
                self.pool.release(session).await;
                Ok(Output { session_id, bytes })
            }
            Ok((bytes, false)) => {
                // the shell may still be writing; its next reader would get the rest
                debug!("executor: {} drained without a prompt, closing it", session_id);
                self.pool.evict(session).await;
                Ok(Output { session_id, bytes })
            }
            Err(err) => {
                let err = Error::classify(err, self.pool.endpoint());
                if err.evicts_session() || !session.is_alive() {
                    debug!("executor: evicting {} after: {}", session_id, err);
                    self.pool.evict(session).await;
                } else {
                    self.pool.release(session).await;
                }
                Err(err)
            }
        }
    }

    /// Write every input to the persistent shell, then drain until the
    /// prompt returns, output goes quiet, or the stream ends.
    ///
    /// The flag is false when a prompt is configured but the drain stopped
    /// without seeing it after the last echo.
    async fn run_shell(
        &self,
        conn: &mut T::Connection,
        command: &Command,
        options: &ExecOptions,
        deadline: Instant,
    ) -> std::result::Result<(Vec<u8>, bool), TransportError> {
        let timed_out = || TransportError::Timeout(options.timeout);

        tokio::time::timeout_at(deadline, conn.open_shell())
            .await
            .map_err(|_| timed_out())??;
        if !discard_pending(conn, deadline).await? {
            tokio::time::timeout_at(deadline, conn.open_shell())
                .await
                .map_err(|_| timed_out())??;
        }

        let inputs = self.shell_inputs(command);
        for (i, input) in inputs.iter().enumerate() {
            if i > 0 && !command.delay().is_zero() {
                tokio::time::sleep(command.delay()).await;
            }
            tokio::time::timeout_at(deadline, conn.send(input))
                .await
                .map_err(|_| timed_out())??;
        }
        let last_input = inputs.last().map(String::as_str).unwrap_or_default();

        let mut buffer = OutputBuffer::default();
        let mut at_prompt = false;
        loop {
            let now = Instant::now();
            if now >= deadline {
                debug!("executor: shell drain hit the deadline");
                return Err(timed_out());
            }
            let wait = options.idle_timeout.min(deadline - now);

            match conn.receive(wait).await {
                Ok(Some(chunk)) => {
                    trace!("executor: shell chunk of {} bytes", chunk.len());
                    buffer.extend(&chunk);
                    if let Some(ref prompt) = self.profile.prompt_pattern {
                        if buffer.prompt_after(last_input, prompt) {
                            at_prompt = true;
                            break;
                        }
                    }
                }
                Ok(None) => {
                    trace!("executor: shell reached end of stream");
                    break;
                }
                Err(TransportError::Timeout(_)) => {
                    if buffer.has_content() && wait == options.idle_timeout {
                        trace!("executor: shell idle for {:?}", wait);
                        break;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        let settled = at_prompt || self.profile.prompt_pattern.is_none();
        Ok((buffer.take(), settled))
    }

    /// Profile setup commands followed by the command's own inputs.
    fn shell_inputs(&self, command: &Command) -> Vec<String> {
        self.profile
            .shell_setup_commands
            .iter()
            .chain(command.inputs())
            .cloned()
            .collect()
    }

    fn interpret(
        &self,
        command: &Command,
        output: Output,
        options: &ExecOptions,
        attempts: u32,
        elapsed: Duration,
    ) -> Result<RawResponse> {
        let raw = String::from_utf8_lossy(&output.bytes).into_owned();
        let cleaned = strip_ansi(&output.bytes);
        let decoded = String::from_utf8_lossy(&cleaned).replace("\r\n", "\n");

        let (text, has_data) = if options.interactive {
            let kept = self
                .profile
                .strip_noise(&decoded, &self.shell_inputs(command));
            let has_data = kept.iter().any(|line| !line.trim().is_empty());
            let mut text = kept.join("\n");
            if !text.is_empty() {
                text.push('\n');
            }
            (text, has_data)
        } else {
            let has_data = decoded
                .lines()
                .any(|line| !line.trim().is_empty() && !self.profile.is_prompt_or_banner(line));
            (decoded, has_data)
        };

        let soft_failure = self.profile.soft_failure_in(&text).map(str::to_string);
        if soft_failure.is_none() {
            if let Some(marker) = self.profile.failure_in(&text) {
                debug!("executor: failure marker {:?} in output of '{}'", marker, command);
                return Err(Error::UnexpectedResponse {
                    command: command.to_string(),
                    marker: marker.to_string(),
                });
            }
        }

        let empty_result = soft_failure.is_some() || !has_data;
        if let Some(ref marker) = soft_failure {
            debug!("executor: '{}' not supported here ({:?})", command, marker);
        }

        Ok(RawResponse {
            command: command.to_string(),
            text,
            raw,
            session_id: output.session_id,
            elapsed,
            attempts,
            empty_result,
            soft_failure,
        })
    }
}

/// Drop output a reused shell produced after its previous drain ended.
///
/// Returns false when the shell stream ended and must be reopened.
async fn discard_pending<C: Connection>(
    conn: &mut C,
    deadline: Instant,
) -> std::result::Result<bool, TransportError> {
    let mut discarded = 0;
    while Instant::now() < deadline {
        match conn.receive(Duration::ZERO).await {
            Ok(Some(chunk)) => discarded += chunk.len(),
            Ok(None) => return Ok(false),
            Err(TransportError::Timeout(_)) => break,
            Err(err) => return Err(err),
        }
    }
    if discarded > 0 {
        debug!("executor: discarded {} stale bytes from the shell", discarded);
    }
    Ok(true)
}

/// One exec channel per input, outputs concatenated in order.
async fn run_exec<C: Connection>(
    conn: &mut C,
    command: &Command,
    options: &ExecOptions,
    deadline: Instant,
) -> std::result::Result<Vec<u8>, TransportError> {
    let mut output = Vec::new();
    for (i, input) in command.inputs().iter().enumerate() {
        if i > 0 && !command.delay().is_zero() {
            tokio::time::sleep(command.delay()).await;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout(options.timeout));
        }
        let chunk = tokio::time::timeout_at(deadline, conn.exec(input, remaining))
            .await
            .map_err(|_| TransportError::Timeout(options.timeout))??;
        output.extend_from_slice(&chunk);
    }
    Ok(output)
}
