//! Free-form command parsing.

/// A recognized command from the command input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  /// The enhance phrase: set enhanced mode and restart.
  Enhance,
  Help,
  /// Clear the log panel only.
  Clear,
  Reset,
  Auto,
  /// Render the final page instantly and stop.
  Skip,
}

impl Command {
  /// Parse a command line. Matching ignores case, surrounding whitespace and
  /// runs of inner whitespace.
  pub fn parse(input: &str, enhance_phrase: &str) -> Option<Self> {
    let normalized = normalize(input);
    if !normalized.is_empty() && normalized == normalize(enhance_phrase) {
      return Some(Command::Enhance);
    }

    match normalized.as_str() {
      "help" => Some(Command::Help),
      "clear" => Some(Command::Clear),
      "reset" => Some(Command::Reset),
      "auto" => Some(Command::Auto),
      "skip" => Some(Command::Skip),
      _ => None,
    }
  }
}

pub(crate) fn normalize(input: &str) -> String {
  input
    .split_whitespace()
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join(" ")
}
