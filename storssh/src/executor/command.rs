//! Commands and per-run execution options.

use std::fmt;
use std::time::Duration;

/// One input line, or an ordered sequence of them, run as a unit.
///
/// Sequences matter for devices whose CLI is a stateful shell: every input
/// is written to the same channel in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    inputs: Vec<String>,
    delay: Duration,
}

impl Command {
    pub fn single(input: impl Into<String>) -> Self {
        Self {
            inputs: vec![input.into()],
            delay: Duration::ZERO,
        }
    }

    pub fn sequence<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive inputs.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// True when there is nothing to send.
    pub fn is_empty(&self) -> bool {
        self.inputs.iter().all(|input| input.trim().is_empty())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inputs.join("; "))
    }
}

impl From<&str> for Command {
    fn from(input: &str) -> Self {
        Command::single(input)
    }
}

impl From<String> for Command {
    fn from(input: String) -> Self {
        Command::single(input)
    }
}

impl From<Vec<String>> for Command {
    fn from(inputs: Vec<String>) -> Self {
        Command::sequence(inputs)
    }
}

impl From<&[&str]> for Command {
    fn from(inputs: &[&str]) -> Self {
        Command::sequence(inputs.iter().copied())
    }
}

/// Options for one [`CommandExecutor::run`](super::CommandExecutor::run).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use storssh::executor::ExecOptions;
///
/// let options = ExecOptions::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_max_retries(3)
///     .with_interactive(true);
/// assert_eq!(options.delay_for_attempt(0), Duration::from_secs(1));
/// assert_eq!(options.delay_for_attempt(2), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// Deadline for all I/O of one attempt.
    pub timeout: Duration,

    /// How long to wait for a pooled session.
    pub acquire_timeout: Duration,

    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Delay before the first retry.
    pub retry_backoff: Duration,

    pub backoff_multiplier: f64,

    pub max_backoff: Duration,

    /// Use a persistent shell instead of one exec channel per input.
    pub interactive: bool,

    /// Quiet period that ends a shell drain once output has arrived.
    pub idle_timeout: Duration,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(30),
            interactive: false,
            idle_timeout: Duration::from_secs(1),
        }
    }
}

impl ExecOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Growth factor between retries; values below 1.0 are raised to 1.0.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = if multiplier.is_finite() {
            multiplier.max(1.0)
        } else {
            1.0
        };
        self
    }

    pub fn with_max_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle_timeout = idle;
        self
    }

    /// Total attempts, the first included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep before retry number `attempt` (0-based):
    /// `min(retry_backoff * multiplier^attempt, max_backoff)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.retry_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_display_joins_inputs() {
        let command = Command::sequence(["set clienv-show-more-messages disable", "show disks"]);
        assert_eq!(
            command.to_string(),
            "set clienv-show-more-messages disable; show disks"
        );
        assert_eq!(Command::from("show pools").inputs(), ["show pools"]);
    }

    #[test]
    fn test_empty_command() {
        assert!(Command::sequence(Vec::<String>::new()).is_empty());
        assert!(Command::single("  ").is_empty());
        assert!(!Command::single("lsvdisk").is_empty());
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let options = ExecOptions::default()
            .with_retry_backoff(Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(500));
        assert_eq!(options.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(options.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(options.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(options.delay_for_attempt(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_multiplier_floor() {
        let options = ExecOptions::default().with_backoff_multiplier(0.1);
        assert_eq!(options.backoff_multiplier, 1.0);
        assert_eq!(options.delay_for_attempt(5), options.retry_backoff);
    }

    #[test]
    fn test_defaults() {
        let options = ExecOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(30));
        assert_eq!(options.max_attempts(), 3);
        assert!(!options.interactive);
    }
}
