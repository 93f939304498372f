//! Recognized sentence shapes
//!
//! A [`Template`] holds the raw phrase fragments a pattern captured. Nothing
//! here is resolved against the schema yet; that happens during lowering.

use nlq_ir::{AggFunc, Pattern};
use serde::{Deserialize, Serialize};

/// A sentence together with the template it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub template: Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rank {
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Template {
    /// "total amount by region"
    GroupedAggregate {
        func: AggFunc,
        subject: String,
        group: String,
    },
    /// "show the top 5 products by price"
    Ranked {
        rank: Rank,
        subject: String,
        order: String,
    },
    /// "show the total amount"
    Aggregate { func: AggFunc, subject: String },
    /// "list region and amount"
    Select { subject: String },
}

impl Template {
    pub fn pattern(&self) -> Pattern {
        match self {
            Template::GroupedAggregate { func, .. } => Pattern::Aggregate {
                func: *func,
                grouped: true,
            },
            Template::Aggregate { func, .. } => Pattern::Aggregate {
                func: *func,
                grouped: false,
            },
            Template::Ranked { rank: Rank::Top, .. } => Pattern::TopN,
            Template::Ranked { rank: Rank::Bottom, .. } => Pattern::BottomN,
            Template::Select { .. } => Pattern::Select,
        }
    }

    /// Phrase naming what is selected, aggregated or ranked
    pub fn subject(&self) -> &str {
        match self {
            Template::GroupedAggregate { subject, .. }
            | Template::Ranked { subject, .. }
            | Template::Aggregate { subject, .. }
            | Template::Select { subject } => subject,
        }
    }
}
