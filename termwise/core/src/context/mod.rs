//! Context Assembler
//!
//! Pure transformation from captured lines plus session metadata into the two
//! prompt strings sent to a provider. Nothing is retained between calls.
//!
//! # Pipeline
//!
//! ```text
//! lines ──► keep last max_lines ──► sanitize each ──► join "\n"
//!                                                        │
//!                         prompts ◄── render ◄── truncate tail to max_bytes
//! ```

mod prompt;
mod sanitize;

pub use prompt::{system_prompt, PromptMode, NO_OUTPUT, OUTPUT_HEADER};
pub use sanitize::{sanitize_line, strip_ansi, truncate_tail, TRUNCATION_MARKER};

use crate::provider::ChatMessage;

/// Default number of trailing lines considered
pub const DEFAULT_MAX_LINES: usize = 100;

/// Default byte budget for the sanitized output
pub const DEFAULT_MAX_BYTES: usize = 12_000;

/// Limits applied while assembling context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextOptions {
    /// Keep at most this many of the most recent lines
    pub max_lines: usize,
    /// Keep at most this many bytes of sanitized output
    pub max_bytes: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_MAX_LINES,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// What is known about the terminal session besides its output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalMetadata {
    /// Working directory; empty when unknown
    pub cwd: String,
    /// Most recent command line; empty when unknown
    pub last_command: String,
    /// Exit status of the last command; `-1` when unknown
    pub exit_code: i32,
}

impl Default for TerminalMetadata {
    fn default() -> Self {
        Self {
            cwd: String::new(),
            last_command: String::new(),
            exit_code: -1,
        }
    }
}

impl TerminalMetadata {
    /// Set the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Set the last command line
    #[must_use]
    pub fn with_last_command(mut self, command: impl Into<String>) -> Self {
        self.last_command = command.into();
        self
    }

    /// Set the exit status
    #[must_use]
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// The exit code, or `None` for the unknown sentinel (any negative value)
    #[must_use]
    pub fn known_exit_code(&self) -> Option<i32> {
        (self.exit_code >= 0).then_some(self.exit_code)
    }
}

/// Assembled context, ready to become provider messages
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalContext {
    /// Sanitized (and possibly truncated) output text
    pub output: String,
    /// Number of lines present in `output`; a line cut short by truncation
    /// still counts
    pub line_count: usize,
    /// Whether the output was cut to fit the byte budget
    pub truncated: bool,
    /// System / instructions prompt
    pub system_prompt: String,
    /// User / content prompt
    pub user_prompt: String,
}

impl TerminalContext {
    /// The `[system, user]` message pair for a chat request
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_prompt.clone()),
            ChatMessage::user(self.user_prompt.clone()),
        ]
    }
}

/// Keep the last `max_lines` lines, sanitize and join them
///
/// Returns the joined text and the number of lines it was built from.
#[must_use]
pub fn sanitize_output<L: AsRef<[u8]>>(lines: &[L], max_lines: usize) -> (String, usize) {
    let start = lines.len().saturating_sub(max_lines);
    let kept = &lines[start..];
    let text = kept
        .iter()
        .map(|line| sanitize_line(line.as_ref()))
        .collect::<Vec<_>>()
        .join("\n");
    (text, kept.len())
}

/// Build a [`TerminalContext`] from captured lines and metadata
#[must_use]
pub fn assemble<L: AsRef<[u8]>>(
    lines: &[L],
    metadata: &TerminalMetadata,
    mode: PromptMode,
    options: &ContextOptions,
) -> TerminalContext {
    let (text, sanitized_lines) = sanitize_output(lines, options.max_lines);
    let (output, truncated) = truncate_tail(&text, options.max_bytes);
    let line_count = if truncated {
        lines_after_truncation(&output, sanitized_lines)
    } else {
        sanitized_lines
    };

    let user_prompt = prompt::user_prompt(
        metadata,
        &output,
        line_count,
        truncated.then_some(options.max_bytes),
    );

    TerminalContext {
        output,
        line_count,
        truncated,
        system_prompt: system_prompt(mode),
        user_prompt,
    }
}

/// Lines left in truncated output, never more than went in
fn lines_after_truncation(output: &str, before: usize) -> usize {
    match output.strip_prefix(TRUNCATION_MARKER) {
        Some(tail) if !tail.is_empty() => tail.split('\n').count().min(before),
        _ => 0,
    }
}
