//! Output buffer with tail-only prompt search.
//!
//! Prompt detection only looks at the last `search_depth` bytes and the echo
//! marker is searched incrementally, so long listings (thousands of disks)
//! do not make every read quadratic.

use std::borrow::Cow;

use bytes::BytesMut;
use memchr::memmem;
use regex::bytes::Regex;

/// Remove ANSI escape sequences. Output without an ESC byte is returned as is.
pub fn strip_ansi(data: &[u8]) -> Cow<'_, [u8]> {
    if memchr::memchr(0x1b, data).is_some() {
        Cow::Owned(strip_ansi_escapes::strip(data))
    } else {
        Cow::Borrowed(data)
    }
}

/// Accumulates shell output and searches its tail for prompt patterns.
#[derive(Debug)]
pub struct OutputBuffer {
    /// The accumulated output, ANSI escapes removed.
    buffer: BytesMut,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Bytes already searched for the echo marker.
    scanned: usize,

    /// End offset of the last echo marker seen.
    marker_end: Option<usize>,
}

impl OutputBuffer {
    /// Create a new buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
            scanned: 0,
            marker_end: None,
        }
    }

    /// Append raw output, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(&strip_ansi(data));
    }

    /// Offset where the searched tail begins.
    fn tail_start(&self) -> usize {
        self.buffer.len().saturating_sub(self.search_depth)
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// The returned offsets are relative to the full buffer.
    pub fn search_tail(&self, pattern: &Regex) -> Option<(usize, usize)> {
        let start = self.tail_start();
        pattern
            .find(&self.buffer[start..])
            .map(|m| (start + m.start(), start + m.end()))
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// True once `prompt` shows up in the tail *after* the last occurrence of
    /// `marker` (typically the echo of the final command sent).
    ///
    /// Only bytes added since the previous call are searched for the marker,
    /// so `marker` must stay the same until the buffer is taken.
    pub fn prompt_after(&mut self, marker: &str, prompt: &Regex) -> bool {
        let marker = marker.as_bytes();
        // back up far enough to catch a marker split across chunks
        let from = self.scanned.saturating_sub(marker.len().saturating_sub(1));
        if let Some(at) = memmem::rfind(&self.buffer[from..], marker) {
            self.marker_end = Some(from + at + marker.len());
        }
        self.scanned = self.buffer.len();

        let Some(marker_end) = self.marker_end else {
            return false;
        };
        let start = marker_end.max(self.tail_start());
        prompt.is_match(&self.buffer[start..])
    }

    /// Check whether the buffer holds anything besides whitespace.
    pub fn has_content(&self) -> bool {
        self.buffer.iter().any(|b| !b.is_ascii_whitespace())
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        self.scanned = 0;
        self.marker_end = None;
        self.buffer.split().to_vec()
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = OutputBuffer::new(100);
        buffer.extend(b"\x1b[32mOnline\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Online");
    }

    #[test]
    fn test_plain_output_is_untouched() {
        let data = b"Disk\t0\r\n";
        assert!(matches!(strip_ansi(data), Cow::Borrowed(_)));
        assert_eq!(strip_ansi(data).as_ref(), data);
    }

    #[test]
    fn test_tail_search_offsets_are_absolute() {
        let mut buffer = OutputBuffer::new(20);
        buffer.extend(&[b'x'; 100]);
        buffer.extend(b"\nCLI> ");

        let pattern = Regex::new(r"CLI>\s*$").unwrap();
        let (start, _) = buffer.search_tail(&pattern).unwrap();
        assert_eq!(&buffer.as_slice()[start..start + 4], b"CLI>");
    }

    #[test]
    fn test_tail_search_ignores_old_prompt() {
        let mut buffer = OutputBuffer::new(10);
        buffer.extend(b"CLI> ");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"CLI>").unwrap();
        assert!(!buffer.tail_contains(&pattern));
    }

    #[test]
    fn test_prompt_after_last_echo() {
        let prompt = Regex::new(r"CLI>\s*$").unwrap();
        let mut buffer = OutputBuffer::default();
        buffer.extend(b"CLI> show disks\r\n");
        assert!(!buffer.prompt_after("show disks", &prompt));

        buffer.extend(b"disk0 ok\r\ndisk1 ok\r\nCLI> ");
        assert!(buffer.prompt_after("show disks", &prompt));

        let mut other = OutputBuffer::default();
        other.extend(b"CLI> show disks\r\nCLI> ");
        assert!(!other.prompt_after("show pools", &prompt));
    }

    #[test]
    fn test_prompt_after_echo_split_across_chunks() {
        let prompt = Regex::new(r"CLI>\s*$").unwrap();
        let mut buffer = OutputBuffer::default();
        buffer.extend(b"CLI> show di");
        assert!(!buffer.prompt_after("show disks", &prompt));
        buffer.extend(b"sks\r\ndisk0 ok\r\nCLI> ");
        assert!(buffer.prompt_after("show disks", &prompt));
    }

    #[test]
    fn test_prompt_after_long_listing() {
        let prompt = Regex::new(r"CLI>\s*$").unwrap();
        let mut buffer = OutputBuffer::new(100);
        buffer.extend(b"CLI> show disks\r\n");
        for i in 0..5000 {
            buffer.extend(format!("disk{i} ok\r\n").as_bytes());
            assert!(!buffer.prompt_after("show disks", &prompt));
        }
        buffer.extend(b"CLI> ");
        assert!(buffer.prompt_after("show disks", &prompt));

        // take starts the echo search over
        buffer.take();
        buffer.extend(b"CLI> show disks\r\nCLI> ");
        assert!(buffer.prompt_after("show disks", &prompt));
        assert_eq!(buffer.take(), b"CLI> show disks\r\nCLI> ");
        assert!(!buffer.prompt_after("show disks", &prompt));
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = OutputBuffer::new(100);
        buffer.extend(b"  \r\n");
        assert!(!buffer.has_content());
        buffer.extend(b"data");
        assert!(buffer.has_content());
        assert_eq!(buffer.take(), b"  \r\ndata");
        assert!(buffer.is_empty());
    }
}
