//! Splitting a raw input line into a bounded token list.
//!
//! The parser deliberately knows nothing about quoting or globbing: a line is
//! whitespace-separated words, at most [`MAX_TOKENS`] of them, with an optional
//! trailing `&` marking the command as a background job.

use crate::command::CommandLine;
use std::fmt;

/// Hard cap on tokens kept per command line. Overflow tokens are dropped
/// silently; this is a documented policy, not an accident.
pub const MAX_TOKENS: usize = 5;

/// Longest accepted input line, in bytes. Longer lines are rejected outright.
pub const MAX_LINE_LEN: usize = 1024;

/// Token that requests background execution when it is the last kept token.
pub const BACKGROUND_MARKER: &str = "&";

/// Errors that can occur while parsing an input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The input exceeded [`MAX_LINE_LEN`] bytes.
    LineTooLong(usize),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::LineTooLong(len) => {
                write!(f, "line too long: {len} bytes (limit {MAX_LINE_LEN})")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one input line into a [`CommandLine`].
///
/// Returns `Ok(None)` for blank input, which must never be dispatched. The
/// token list is truncated to [`MAX_TOKENS`] entries; if the last *kept* token
/// is the background marker it is stripped and the background flag set instead.
/// A marker pushed past the bound is dropped together with the rest of the
/// overflow and does not set the flag.
pub fn parse_line(line: &str) -> Result<Option<CommandLine>, ParseError> {
    if line.len() > MAX_LINE_LEN {
        return Err(ParseError::LineTooLong(line.len()));
    }

    let mut tokens: Vec<String> = line
        .split_whitespace()
        .take(MAX_TOKENS)
        .map(str::to_string)
        .collect();

    if tokens.is_empty() {
        return Ok(None);
    }

    let background = tokens.last().map(String::as_str) == Some(BACKGROUND_MARKER);
    if background {
        tokens.pop();
        if tokens.is_empty() {
            // A lone "&" names no command to run.
            return Ok(None);
        }
    }

    Ok(Some(CommandLine { tokens, background }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &CommandLine) -> Vec<&str> {
        line.tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn splits_on_whitespace() {
        let parsed = parse_line("ls -l /tmp").unwrap().unwrap();
        assert_eq!(toks(&parsed), ["ls", "-l", "/tmp"]);
        assert!(!parsed.background);
    }

    #[test]
    fn blank_input_is_no_command() {
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("   \t ").unwrap(), None);
    }

    #[test]
    fn overflow_tokens_are_dropped() {
        let parsed = parse_line("a b c d e f g").unwrap().unwrap();
        assert_eq!(toks(&parsed), ["a", "b", "c", "d", "e"]);
        assert!(!parsed.background);
    }

    #[test]
    fn trailing_marker_sets_background_and_is_stripped() {
        let parsed = parse_line("sleep 10 &").unwrap().unwrap();
        assert_eq!(toks(&parsed), ["sleep", "10"]);
        assert!(parsed.background);
    }

    #[test]
    fn marker_at_the_bound_still_counts() {
        let parsed = parse_line("a b c d &").unwrap().unwrap();
        assert_eq!(toks(&parsed), ["a", "b", "c", "d"]);
        assert!(parsed.background);
    }

    #[test]
    fn marker_past_the_bound_is_overflow() {
        let parsed = parse_line("a b c d e &").unwrap().unwrap();
        assert_eq!(toks(&parsed), ["a", "b", "c", "d", "e"]);
        assert!(!parsed.background);
    }

    #[test]
    fn lone_marker_is_no_command() {
        assert_eq!(parse_line("&").unwrap(), None);
    }

    #[test]
    fn over_long_line_is_rejected() {
        let line = "x".repeat(MAX_LINE_LEN + 1);
        assert_eq!(
            parse_line(&line),
            Err(ParseError::LineTooLong(MAX_LINE_LEN + 1))
        );
    }
}
