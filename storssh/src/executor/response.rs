//! Response type for command execution results.

use std::time::Duration;

use crate::pool::SessionId;

/// Decoded output of one [`Command`](super::Command) run.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The inputs that were sent, joined by `"; "`.
    pub command: String,

    /// Normalized output (ANSI stripped, LF line endings, shell noise removed).
    pub text: String,

    /// Decoded output before normalization.
    pub raw: String,

    /// The session that produced the output.
    pub session_id: SessionId,

    /// Time from the first attempt to the final output.
    pub elapsed: Duration,

    /// Attempts used, the successful one included.
    pub attempts: u32,

    /// No data: nothing but whitespace, prompts or banners, or a soft failure.
    pub empty_result: bool,

    /// The soft failure marker found in the output, if any.
    pub soft_failure: Option<String>,
}

impl RawResponse {
    /// Check if the device returned no data.
    pub fn is_empty_result(&self) -> bool {
        self.empty_result
    }

    /// Check if the device reported the command as unsupported.
    pub fn is_soft_failure(&self) -> bool {
        self.soft_failure.is_some()
    }

    /// Get the normalized lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    /// Check if the normalized text contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.text.contains(pattern)
    }
}

impl std::fmt::Display for RawResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
