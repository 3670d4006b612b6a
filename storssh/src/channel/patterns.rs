//! Prompt pattern helpers.

use regex::bytes::Regex;

/// Compile a prompt pattern string into a regex.
///
/// Anchors to end of input (allowing trailing whitespace) if the pattern has
/// no anchor of its own, so `CLI>` only matches a prompt that ends the text.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    let pattern = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!("{}\\s*$", pattern)
    };

    Regex::new(&pattern)
}
