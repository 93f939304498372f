//! Translation failure taxonomy
//!
//! Every variant is terminal and deterministic: the same sentence against the
//! same snapshot fails the same way, so callers never retry.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("No pattern recognized")]
    NoPatternRecognized,

    #[error("Please check your dimension and measure names: {0}")]
    MissingMeasureOrDimension(String),

    #[error("No row count given for {0} query")]
    MissingRowCount(String),

    #[error("No joinable table set for referenced columns [{}]", .0.join(", "))]
    NoJoinableTableSet(Vec<String>),

    #[error("No collection holds every referenced column")]
    NoCollectionResolved,

    #[error("Aggregate alias {0} does not appear in the projection")]
    UnresolvedAggregateAlias(String),

    #[error("Table not loaded: {0}")]
    UnknownTable(String),
}

impl TranslateError {
    /// Stable identifier for structured error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            TranslateError::NoPatternRecognized => "no_pattern_recognized",
            TranslateError::MissingMeasureOrDimension(_) => "missing_measure_or_dimension",
            TranslateError::MissingRowCount(_) => "missing_row_count",
            TranslateError::NoJoinableTableSet(_) => "no_joinable_table_set",
            TranslateError::NoCollectionResolved => "no_collection_resolved",
            TranslateError::UnresolvedAggregateAlias(_) => "unresolved_aggregate_alias",
            TranslateError::UnknownTable(_) => "unknown_table",
        }
    }
}
