//! Prompt templates
//!
//! Both system prompts describe the same user-prompt fields and the same
//! formatting rules; only the instructions differ.

use super::TerminalMetadata;

/// Section header preceding the captured output in the user prompt
pub const OUTPUT_HEADER: &str = "terminal_output:";

/// Placeholder used when nothing printable was captured
pub const NO_OUTPUT: &str = "<no output captured>";

const FIELD_GUIDE: &str = "\
The user message describes a terminal session with these fields:
- cwd: the working directory, when known
- last_command: the most recent command line, when known
- last_exit_code: its exit status, when known (0 means success)
- output_lines: how many lines of recent output are included
- note: present when older output was cut to fit the size limit
The captured output follows the `terminal_output:` header, oldest line first.";

const FORMAT_RULES: &str = "\
Formatting rules:
- Answer in plain text suitable for a terminal; short Markdown is allowed.
- Quote commands and file paths in backticks.
- Do not repeat the captured output back verbatim.
- If the output is insufficient to answer, say what is missing.";

const DIAGNOSTIC_INSTRUCTIONS: &str = "\
You are a command-line troubleshooting assistant. Explain why the last \
command failed or misbehaved, point at the line of output that shows the \
cause, and propose the smallest concrete fix. Prefer commands the user can \
run directly.";

const CONVERSATIONAL_INSTRUCTIONS: &str = "\
You are a helpful assistant with access to the user's recent terminal \
session. Use it as context to answer the user's questions accurately and \
concisely.";

/// Which system prompt to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromptMode {
    /// Explain failures and suggest fixes
    #[default]
    Diagnostic,
    /// Neutral assistant with terminal context
    Conversational,
}

impl PromptMode {
    /// Parse a mode name; anything unrecognized is diagnostic
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "chat" | "conversational" | "ask" => Self::Conversational,
            _ => Self::Diagnostic,
        }
    }
}

/// Render the system prompt for `mode`
#[must_use]
pub fn system_prompt(mode: PromptMode) -> String {
    let instructions = match mode {
        PromptMode::Diagnostic => DIAGNOSTIC_INSTRUCTIONS,
        PromptMode::Conversational => CONVERSATIONAL_INSTRUCTIONS,
    };
    format!("{instructions}\n\n{FIELD_GUIDE}\n\n{FORMAT_RULES}")
}

/// Render the user prompt from metadata and already-sanitized output
pub(crate) fn user_prompt(
    metadata: &TerminalMetadata,
    output: &str,
    line_count: usize,
    truncated_to: Option<usize>,
) -> String {
    let mut prompt = String::new();

    if !metadata.cwd.is_empty() {
        prompt.push_str(&format!("cwd: {}\n", metadata.cwd));
    }
    if !metadata.last_command.is_empty() {
        prompt.push_str(&format!("last_command: {}\n", metadata.last_command));
    }
    if let Some(code) = metadata.known_exit_code() {
        prompt.push_str(&format!("last_exit_code: {code}\n"));
    }
    prompt.push_str(&format!("output_lines: {line_count}\n"));
    if let Some(max_bytes) = truncated_to {
        prompt.push_str(&format!(
            "note: output truncated to the most recent {max_bytes} bytes\n"
        ));
    }

    prompt.push_str(OUTPUT_HEADER);
    prompt.push('\n');
    if output.trim().is_empty() {
        prompt.push_str(NO_OUTPUT);
    } else {
        prompt.push_str(output);
    }
    prompt
}
