use std::io;

use thiserror::Error;

/// Errors returned while compiling a pattern.
///
/// Every variant carries the byte offset, within the input source being
/// consumed when the error fired, at which the offending construct starts.
/// For errors raised inside a rule expansion the offset refers to the
/// expansion text, not to the pattern that referenced the rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    /// The pattern ended where more input was required.
    #[error("end of pattern reached unexpectedly at offset {pos}")]
    UnexpectedEnd {
        /// Byte offset of the error.
        pos: usize,
    },

    /// A backslash was followed by a character that has no escaped meaning.
    #[error("unexpected `\\` found at offset {pos}")]
    UnknownEscape {
        /// Byte offset of the error.
        pos: usize,
    },

    /// A rule reference did not resolve against the rule table or the
    /// built-in classes.
    #[error("undefined rule `{name}` at offset {pos}")]
    UndefinedRule {
        /// Name of the rule that could not be resolved.
        name: String,
        /// Byte offset of the error.
        pos: usize,
    },

    /// A specific delimiter was required but something else was found.
    #[error("expected `{expected}` at offset {pos}")]
    Expected {
        /// The delimiter that was required.
        expected: char,
        /// Byte offset of the error.
        pos: usize,
    },

    /// A bounded repetition was missing one of its decimal bounds.
    #[error("expected decimal integer at offset {pos}")]
    ExpectedInteger {
        /// Byte offset of the error.
        pos: usize,
    },

    /// The lower bound of a bounded repetition exceeds the upper bound.
    #[error(
        "lower limit is greater than upper in bounded repetition \
         at offset {pos}"
    )]
    BoundsReversed {
        /// Byte offset of the error.
        pos: usize,
    },

    /// A closing delimiter appeared with no group open.
    #[error("unexpected `{found}` found at offset {pos}")]
    Unexpected {
        /// The unexpected character.
        found: char,
        /// Byte offset of the error.
        pos: usize,
    },

    /// The pattern is not valid UTF-8.
    #[error("invalid UTF-8-encoded text in pattern at offset {pos}")]
    InvalidUtf8 {
        /// Byte offset of the first invalid byte.
        pos: usize,
    },
}

impl PatternError {
    /// Byte offset at which the error was detected.
    pub fn position(&self) -> usize {
        match self {
            Self::UnexpectedEnd { pos }
            | Self::UnknownEscape { pos }
            | Self::UndefinedRule { pos, .. }
            | Self::Expected { pos, .. }
            | Self::ExpectedInteger { pos }
            | Self::BoundsReversed { pos }
            | Self::Unexpected { pos, .. }
            | Self::InvalidUtf8 { pos } => *pos,
        }
    }
}

/// Errors returned while matching against a caller-supplied input source.
///
/// Matching a pattern against a `&str` cannot fail; these errors only occur
/// when a [`crate::Source`] implementation backed by an external reader
/// cannot produce valid input.
#[derive(Error, Debug)]
pub enum MatchError {
    /// The input source failed to produce more bytes.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The input source produced bytes that are not valid UTF-8.
    #[error("input isn't valid UTF-8-encoded text")]
    InvalidUtf8,
}
