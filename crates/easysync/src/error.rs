//! Error families.
//!
//! Decoding problems (`ParseError`, `FormatError`) are kept apart from
//! semantically broken changesets (`InvalidChangeset`) and from changesets
//! that are fine on their own but do not fit the document they are applied
//! to (`PreconditionError`).

use thiserror::Error;

use crate::op::OpCode;

/// A malformed number, attribute string or op token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty base-36 number")]
    EmptyNumber,
    #[error("invalid base-36 digit {0:?}")]
    InvalidDigit(char),
    #[error("base-36 number has a leading zero: {0}")]
    LeadingZero(String),
    #[error("base-36 number overflows: {0}")]
    Overflow(String),
    #[error("invalid operation at offset {offset}: {rest:?}")]
    InvalidOperation { offset: usize, rest: String },
    #[error("invalid attribute string: {0:?}")]
    InvalidAttribString(String),
}

/// A string that does not have the `Z:...$...` changeset shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("not a changeset: {0:?}")]
    NotAChangeset(String),
    #[error("changeset has no `$` char bank separator")]
    MissingBank,
    #[error("changeset shrinks a document of length {old_len} by {shrink}")]
    NegativeLength { old_len: usize, shrink: usize },
    #[error("bad changeset header: {0}")]
    Number(#[from] ParseError),
}

/// A changeset that decodes but breaks one of the structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidChangeset {
    #[error("ops consume {pos} chars of a document of length {old_len}")]
    OldLenExceeded { pos: usize, old_len: usize },
    #[error("inserts grow the document to {len} chars, header says {new_len}")]
    NewLenExceeded { len: usize, new_len: usize },
    #[error("header says new length {claimed}, ops produce {actual}")]
    LengthMismatch { claimed: usize, actual: usize },
    #[error("char bank too short: insert needs {needed} chars, {remaining} left")]
    BankTooShort { needed: usize, remaining: usize },
    #[error("{excess} unused chars left in the char bank")]
    ExcessBank { excess: usize },
    #[error("insert declares {expected} newlines, its text has {actual}")]
    NewlineCountMismatch { expected: usize, actual: usize },
    #[error("multi-line insert does not end with a newline")]
    MissingTrailingNewline,
    #[error("op has more lines ({lines}) than chars ({chars})")]
    MoreLinesThanChars { chars: usize, lines: usize },
    #[error("line counts of overlapping ops disagree")]
    LineCountMismatch,
    #[error("changeset is not in canonical form, expected {expected:?}")]
    NotCanonical { expected: String },
    #[error("attribute {0} does not exist in the pool")]
    UnknownAttrib(u32),
    #[error("attribute numbers of an op are not strictly ascending: {0}")]
    AttribsNotAscending(String),
    #[error("cannot compose: first changeset produces {new_len} chars, second expects {old_len}")]
    ComposeMismatch { new_len: usize, old_len: usize },
    #[error("cannot follow: changesets apply to lengths {first} and {second}")]
    FollowMismatch { first: usize, second: usize },
    #[error("changeset exceeds configured limit: {0}")]
    LimitExceeded(String),
}

/// A valid changeset that does not fit the text or lines it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("changeset expects a document of length {expected}, got {actual}")]
    TextLengthMismatch { expected: usize, actual: usize },
    #[error("wanted {wanted} chars, only {remaining} left")]
    NotEnoughChars { wanted: usize, remaining: usize },
    #[error("{opcode} op declares {expected} newlines, the text has {actual}")]
    NewlineCountMismatch {
        opcode: OpCode,
        expected: usize,
        actual: usize,
    },
    #[error("line {line} is past the end of the document ({len} lines)")]
    LineOutOfRange { line: usize, len: usize },
    #[error("removing {chars} chars at column {col} runs past the end of the line")]
    RemovePastLineEnd { col: usize, chars: usize },
    #[error("attribution op spans {0} lines where one was expected")]
    MultipleLines(usize),
    #[error("attribution line left unfinished")]
    UnfinishedLine,
    #[error("text has no newline where the attribution expects one")]
    MissingNewline,
    #[error("cut at unit {at} falls inside a surrogate pair")]
    SplitsSurrogatePair { at: usize },
    #[error("{lines} text lines but {alines} attribution lines")]
    LineCountMismatch { lines: usize, alines: usize },
}

/// Any failure of this crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Invalid(#[from] InvalidChangeset),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
