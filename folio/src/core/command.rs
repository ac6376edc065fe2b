//! Recognition of chat commands.
//!
//! Every reply passes through [`Command::parse`] once; the engine dispatches on
//! the result instead of comparing raw strings in several places.

/// A classified user reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `yes`, `y` or `start`.
    Start,
    /// `no` or `n`.
    Decline,
    /// `skip`.
    Skip,
    /// Anything else, trimmed.
    Text(String),
}

impl Command {
    /// Classify `input`. Returns `None` when it is empty after trimming.
    ///
    /// Matching is case-insensitive on the trimmed text and exact: `"yes please"`
    /// is [`Command::Text`].
    pub fn parse(input: &str) -> Option<Command> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        let command = match trimmed.to_lowercase().as_str() {
            "yes" | "y" | "start" => Command::Start,
            "no" | "n" => Command::Decline,
            "skip" => Command::Skip,
            _ => Command::Text(trimmed.to_string()),
        };
        Some(command)
    }
}
