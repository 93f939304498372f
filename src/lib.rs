//! NLQ - Natural Language Query translation
//!
//! Rule-based translation of constrained English analytic questions
//! ("total sales by region where year = 2023 order by sales descending
//! limit 10") into SQL text or a document-store aggregation pipeline,
//! against an immutable schema snapshot.
//!
//! Both back-ends consume the same IR, so a sentence means the same thing
//! whichever target it is rendered for.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod translate;

pub use nlq_ast::ResolverKind;
pub use nlq_ir::{Query, SchemaError, SchemaSnapshot, TableSchema, TranslateError};
pub use nlq_pipeline::{EncodingError, PipelineQuery};
pub use nlq_sql::{CompiledQuery, QueryParam, RenderError};
pub use translate::*;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error("SQL rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Pipeline encoding failed: {0}")]
    Encoding(#[from] EncodingError),
}

impl Error {
    /// Stable identifier for structured error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Translate(e) => e.kind(),
            Error::Render(_) => "render_failed",
            Error::Encoding(_) => "encoding_failed",
        }
    }
}

/// Knobs shared by both translation targets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateOptions {
    /// Phrase-to-column matching strategy
    pub resolver: ResolverKind,

    /// Fail instead of passing through aggregate filters whose alias is not projected
    pub strict_aggregate_refs: bool,

    /// Emit `?` placeholders and bound values instead of inline SQL literals
    pub parameterize_literals: bool,
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::translate::{translate_pipeline, translate_relational};
    pub use crate::{Error, TranslateOptions};
    pub use nlq_ir::{SchemaSnapshot, TableSchema, TranslateError};
}
