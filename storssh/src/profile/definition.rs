//! Device profile definition.

use regex::bytes::Regex;

use crate::channel::compile_prompt_pattern;
use crate::error::{ParseError, Result};

/// Response-handling configuration shared by every device of one family.
///
/// # Example
///
/// ```rust
/// use storssh::profile::DeviceProfile;
///
/// # fn example() -> Result<(), storssh::Error> {
/// let profile = DeviceProfile::new("eternus")
///     .with_prompt(r"CLI>")?
///     .with_soft_failure("Error: E0019 Inapplicable")
///     .with_failure("Error: E0100 Resource is busy");
/// assert!(profile.soft_failure_in("Error: E0019 Inapplicable model").is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Profile name (e.g., "eternus", "ds8k").
    pub name: String,

    /// Pattern matching the shell prompt.
    pub prompt_pattern: Option<Regex>,

    /// Lines matching any of these are banner noise.
    pub banner_patterns: Vec<Regex>,

    /// Substrings meaning "command not supported here"; yields an empty result.
    pub soft_failure_markers: Vec<String>,

    /// Substrings meaning the command failed; yields an error.
    pub failure_markers: Vec<String>,

    /// Commands sent first on every interactive run (paging off, etc.).
    pub shell_setup_commands: Vec<String>,
}

impl DeviceProfile {
    /// Create an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_pattern: None,
            banner_patterns: vec![],
            soft_failure_markers: vec![],
            failure_markers: vec![],
            shell_setup_commands: vec![],
        }
    }

    /// Set the prompt pattern. An unanchored pattern is anchored to the end.
    pub fn with_prompt(mut self, pattern: &str) -> Result<Self> {
        self.prompt_pattern = Some(compile_prompt_pattern(pattern).map_err(ParseError::from)?);
        Ok(self)
    }

    /// Add a banner line pattern.
    pub fn with_banner(mut self, pattern: &str) -> Result<Self> {
        self.banner_patterns
            .push(Regex::new(pattern).map_err(ParseError::from)?);
        Ok(self)
    }

    /// Add a soft failure marker.
    pub fn with_soft_failure(mut self, marker: impl Into<String>) -> Self {
        self.soft_failure_markers.push(marker.into());
        self
    }

    /// Add a failure marker.
    pub fn with_failure(mut self, marker: impl Into<String>) -> Self {
        self.failure_markers.push(marker.into());
        self
    }

    /// Add a shell setup command.
    pub fn with_shell_setup(mut self, command: impl Into<String>) -> Self {
        self.shell_setup_commands.push(command.into());
        self
    }

    /// First soft failure marker contained in `text`.
    pub fn soft_failure_in(&self, text: &str) -> Option<&str> {
        find_marker(&self.soft_failure_markers, text)
    }

    /// First failure marker contained in `text`.
    pub fn failure_in(&self, text: &str) -> Option<&str> {
        find_marker(&self.failure_markers, text)
    }

    /// Whether a whole line is a bare prompt or banner noise.
    pub fn is_prompt_or_banner(&self, line: &str) -> bool {
        if let Some(ref prompt) = self.prompt_pattern {
            if prompt.is_match(line.as_bytes()) {
                return true;
            }
        }
        self.banner_patterns
            .iter()
            .any(|banner| banner.is_match(line.as_bytes()))
    }

    /// Whether `line` is the shell's echo of `input`, bare or after a prompt.
    pub fn is_echo_of(&self, line: &str, input: &str) -> bool {
        let (trimmed, input) = (line.trim(), input.trim());
        if input.is_empty() {
            return false;
        }
        if trimmed == input {
            return true;
        }
        match (&self.prompt_pattern, trimmed.strip_suffix(input)) {
            (Some(prompt), Some(prefix)) => prompt.is_match(prefix.as_bytes()),
            _ => false,
        }
    }

    /// Lines of interactive output with prompts, banners and echoes removed.
    ///
    /// Each input accounts for at most one echo line; later lines with the
    /// same text are data.
    pub fn strip_noise<'a>(&self, text: &'a str, inputs: &[String]) -> Vec<&'a str> {
        let mut echoed = vec![false; inputs.len()];
        text.lines()
            .filter(|line| {
                let echo = inputs
                    .iter()
                    .zip(echoed.iter_mut())
                    .find(|(input, seen)| !**seen && self.is_echo_of(line, input));
                if let Some((_, seen)) = echo {
                    *seen = true;
                    return false;
                }
                !self.is_prompt_or_banner(line)
            })
            .collect()
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self::new("generic")
    }
}

fn find_marker<'a>(markers: &'a [String], text: &str) -> Option<&'a str> {
    markers
        .iter()
        .find(|marker| memchr::memmem::find(text.as_bytes(), marker.as_bytes()).is_some())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile::new("test")
            .with_prompt(r"CLI>")
            .unwrap()
            .with_banner(r"^Last login:")
            .unwrap()
            .with_soft_failure("Unknown command")
            .with_failure("Error: busy")
    }

    #[test]
    fn test_markers() {
        let profile = profile();
        assert_eq!(
            profile.soft_failure_in("^\nUnknown command: foo"),
            Some("Unknown command")
        );
        assert_eq!(profile.failure_in("Error: busy, retry"), Some("Error: busy"));
        assert!(profile.failure_in("all good").is_none());
    }

    #[test]
    fn test_noise_lines() {
        let profile = profile();
        assert!(profile.is_prompt_or_banner("CLI> "));
        assert!(profile.is_prompt_or_banner("Last login: Mon Oct 12"));
        assert!(!profile.is_prompt_or_banner("disk0  Online"));

        assert!(profile.is_echo_of("CLI> show disks", "show disks"));
        assert!(profile.is_echo_of("show disks\r", "show disks"));
        assert!(!profile.is_echo_of("disk0 show disks", "show disks"));
        assert!(!profile.is_echo_of("", ""));
    }

    #[test]
    fn test_strip_noise_drops_one_echo_per_input() {
        let profile = profile();
        let inputs = vec!["status".to_string()];
        let text = "Last login: Mon Oct 12\nCLI> status\nstatus\nNormal\nCLI> ";
        assert_eq!(profile.strip_noise(text, &inputs), ["status", "Normal"]);

        let inputs = vec!["show disks".to_string(), "show disks".to_string()];
        let text = "show disks\ndisk0\nshow disks\ndisk0\nshow disks\n";
        assert_eq!(
            profile.strip_noise(text, &inputs),
            ["disk0", "disk0", "show disks"]
        );
    }

    #[test]
    fn test_invalid_prompt() {
        let err = DeviceProfile::new("bad").with_prompt("(").unwrap_err();
        assert!(matches!(err, crate::Error::Parse(ParseError::InvalidPattern(_))));
    }
}
