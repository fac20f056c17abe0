/*!
Error types shared by every module of the crate. Grammar and sample errors are surfaced to the
caller immediately; desynchronisation while persisting is not an error value at all (it is traced
and absorbed by the store).
*/
use crate::grammar::TagParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, NerError>;

#[derive(Debug, Error)]
/// Enum error encompassing the failures that can happen while editing, persisting and aggregating
/// annotations.
pub enum NerError {
    /// The edit position is not a valid index of the sequence. No state was changed.
    #[error("position {position} is out of range for a sequence of length {len}")]
    OutOfRange { position: usize, len: usize },
    /// An expected file is absent. Only raised for files the caller cannot work without.
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),
    /// The tag is not offered at this position by the grammar.
    #[error("tag `{tag}` is not legal at position {position}")]
    IllegalTag { position: usize, tag: String },
    #[error(transparent)]
    TagParse(#[from] TagParseError),
    #[error("invalid annotator identifier `{0}`: it must be non-empty and contain no `_`, `/` or `\\`")]
    InvalidAnnotator(String),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures of the offline aggregation batch. They never affect an annotation session.
pub enum AggregationError {
    #[error(
        "no annotator output matches a progress log (outputs: {}, logs: {})",
        .output_dir.display(),
        .log_dir.display()
    )]
    NoMatchingPairs {
        output_dir: PathBuf,
        log_dir: PathBuf,
    },
    #[error("column `{0}` is missing from a combined row")]
    MissingColumn(String),
    #[error("annotator `{annotator}` has more than one row for identity {identity:?}")]
    DuplicateEntry {
        identity: Vec<String>,
        annotator: String,
    },
}
