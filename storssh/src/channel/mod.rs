//! Output handling for interactive shells.
//!
//! Shell output arrives in arbitrary chunks full of terminal noise. This
//! module accumulates it, strips ANSI escapes and answers "has the prompt
//! come back yet" without rescanning the whole buffer.

mod buffer;
mod patterns;

pub use buffer::{OutputBuffer, strip_ansi};
pub use patterns::compile_prompt_pattern;
