//! Error types for case parsing and delta arithmetic.

use thiserror::Error;

/// A field of a case block violated its schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field missing: {field} on {block}")]
    MissingField { field: String, block: &'static str },
    #[error("invalid value {value:?} for {field} on {block}: expected one of {allowed:?}")]
    InvalidChoice {
        field: String,
        block: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },
    #[error("unexpected field: {field} on {block}")]
    UnexpectedField { field: String, block: &'static str },
    #[error("field {field} on {block} must be {expected}")]
    WrongType {
        field: String,
        block: &'static str,
        expected: &'static str,
    },
    #[error("{block} must be a mapping, got {found}")]
    NotAnObject {
        block: &'static str,
        found: &'static str,
    },
    #[error("invalid ISO-8601 timestamp {value:?} for {field}: {reason}")]
    InvalidTimestamp {
        field: String,
        value: String,
        reason: TimestampError,
    },
    #[error("invalid base64 payload for {field}: {reason}")]
    InvalidBase64 {
        field: String,
        reason: base64::DecodeError,
    },
}

impl ValidationError {
    /// Name of the offending field, when the violation concerns one.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { field, .. }
            | ValidationError::InvalidChoice { field, .. }
            | ValidationError::UnexpectedField { field, .. }
            | ValidationError::WrongType { field, .. }
            | ValidationError::InvalidTimestamp { field, .. }
            | ValidationError::InvalidBase64 { field, .. } => Some(field),
            ValidationError::NotAnObject { .. } => None,
        }
    }
}

/// Why a timestamp string was rejected by the ISO-8601 codec.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimestampError {
    #[error("missing UTC offset")]
    MissingOffset,
    #[error("malformed UTC offset")]
    InvalidOffset,
    #[error("malformed date or time")]
    InvalidDateTime,
}

/// Input could not be turned into a case block.
#[derive(Debug, Error)]
pub enum ParsingError {
    #[error("invalid case block: {0}")]
    Validation(#[from] ValidationError),
    #[error("invalid case markup: {0}")]
    Markup(#[from] case_xml::XmlError),
    #[error("case input must be markup, a document tree or a mapping, got {kind}")]
    UnsupportedInput { kind: &'static str },
}

/// Two deltas cannot be combined.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("cannot merge delta for case {right} into delta for case {left}")]
    CaseIdMismatch { left: String, right: String },
    #[error("case {case_id} is created twice")]
    DoubleCreate { case_id: String },
    #[error("case {case_id} is already closed")]
    AlreadyClosed { case_id: String },
}

/// Failure of a batch operation that both parses and merges.
#[derive(Debug, Error)]
pub enum CaseError {
    #[error(transparent)]
    Parsing(#[from] ParsingError),
    #[error(transparent)]
    Merge(#[from] MergeError),
}
