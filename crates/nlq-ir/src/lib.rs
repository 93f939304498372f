//! NLQ Intermediate Representation (IR)
//!
//! Renderer-agnostic description of one translated question. The relational
//! and pipeline back-ends both consume a [`Query`], which keeps their output
//! semantically aligned. All types serialize deterministically so a query can
//! be fingerprinted for caching and provenance.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

mod error;
mod schema;

pub use error::TranslateError;
pub use schema::*;

/// One translated question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub pattern: Pattern,

    pub projection: Vec<Projection>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<Predicate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<Ordering>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,

    pub source: Source,
}

impl Query {
    /// Calculate fingerprint (SHA-256) for deterministic caching
    pub fn fingerprint(&self) -> String {
        // Every field is plain data with string keys, so serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Predicates evaluated against individual rows
    pub fn row_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter().filter(|p| p.scope() == Scope::Row)
    }

    /// Predicates evaluated against aggregated groups
    pub fn aggregate_predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter().filter(|p| p.scope() == Scope::Aggregate)
    }

    /// Find the projection entry that produces the given aggregate alias
    pub fn projection_for_alias(&self, alias: &str) -> Option<&Projection> {
        self.projection
            .iter()
            .find(|p| p.alias.as_deref() == Some(alias))
    }
}

/// Recognized sentence shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Aggregate { func: AggFunc, grouped: bool },
    TopN,
    BottomN,
    Select,
}

impl Pattern {
    /// Top/bottom-N patterns carry their own ordering and row count
    pub fn is_ranked(&self) -> bool {
        matches!(self, Pattern::TopN | Pattern::BottomN)
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, Pattern::Aggregate { grouped: true, .. })
    }

    pub fn name(&self) -> String {
        match self {
            Pattern::Aggregate { func, grouped: true } => format!("{}_group_by", func.token()),
            Pattern::Aggregate { func, grouped: false } => func.token().to_string(),
            Pattern::TopN => "top_n".to_string(),
            Pattern::BottomN => "bottom_n".to_string(),
            Pattern::Select => "select".to_string(),
        }
    }
}

/// Aggregate functions the translator can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggFunc {
    Sum,
    Avg,
    Min,
    Max,
    Count,
}

impl AggFunc {
    pub const ALL: [AggFunc; 5] = [AggFunc::Sum, AggFunc::Avg, AggFunc::Min, AggFunc::Max, AggFunc::Count];

    /// Lower-case token used in aliases (`sum_amount`)
    pub fn token(&self) -> &'static str {
        match self {
            AggFunc::Sum => "sum",
            AggFunc::Avg => "avg",
            AggFunc::Min => "min",
            AggFunc::Max => "max",
            AggFunc::Count => "count",
        }
    }

    /// Alias shared by projections, aggregate predicates and sort keys
    pub fn alias(&self, field: &str) -> String {
        let field = if field == WILDCARD { "all" } else { field };
        format!("{}_{}", self.token(), field)
    }
}

/// Column name standing for "every column"
pub const WILDCARD: &str = "*";

/// One projected output column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    pub field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub func: Option<AggFunc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Projection {
    pub fn column(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            func: None,
            alias: None,
        }
    }

    pub fn aggregate(func: AggFunc, field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            alias: Some(func.alias(&field)),
            field,
            func: Some(func),
        }
    }

    pub fn wildcard() -> Self {
        Self::column(WILDCARD)
    }

    pub fn is_wildcard(&self) -> bool {
        self.func.is_none() && self.field == WILDCARD
    }
}

/// What a predicate or sort key refers to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    Column { name: String },
    Aggregate { func: AggFunc, column: String },
}

impl Target {
    pub fn column(name: impl Into<String>) -> Self {
        Target::Column { name: name.into() }
    }

    pub fn aggregate(func: AggFunc, column: impl Into<String>) -> Self {
        Target::Aggregate {
            func,
            column: column.into(),
        }
    }

    /// Underlying schema column
    pub fn column_name(&self) -> &str {
        match self {
            Target::Column { name } => name,
            Target::Aggregate { column, .. } => column,
        }
    }

    /// Aggregate alias, `None` for plain columns
    pub fn alias(&self) -> Option<String> {
        match self {
            Target::Column { .. } => None,
            Target::Aggregate { func, column } => Some(func.alias(column)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Row,
    Aggregate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "between")]
    Between,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Between => "between",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Typed comparison value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => f.write_str(s),
            Literal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Scalar(Literal),
    Range { low: Literal, high: Literal },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub target: Target,
    pub op: CompareOp,
    pub value: PredicateValue,
}

impl Predicate {
    pub fn compare(target: Target, op: CompareOp, value: Literal) -> Self {
        Self {
            target,
            op,
            value: PredicateValue::Scalar(value),
        }
    }

    pub fn between(target: Target, low: Literal, high: Literal) -> Self {
        Self {
            target,
            op: CompareOp::Between,
            value: PredicateValue::Range { low, high },
        }
    }

    /// Row scope for columns, aggregate scope for aggregated targets
    pub fn scope(&self) -> Scope {
        match self.target {
            Target::Column { .. } => Scope::Row,
            Target::Aggregate { .. } => Scope::Aggregate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// Sort keys sharing one direction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub keys: Vec<Target>,
    pub direction: Direction,
}

/// Where the query reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Source {
    Relational { plan: JoinPlan },
    Collection { name: String },
}

/// Relational table plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JoinPlan {
    Single { table: String },
    Joined { base: String, links: Vec<JoinLink> },
}

impl JoinPlan {
    /// Table that owns a join key on its left side, if `column` is one
    pub fn key_owner(&self, column: &str) -> Option<&str> {
        match self {
            JoinPlan::Single { .. } => None,
            JoinPlan::Joined { links, .. } => links
                .iter()
                .find(|link| link.key == column)
                .map(|link| link.left.as_str()),
        }
    }

    pub fn tables(&self) -> Vec<&str> {
        match self {
            JoinPlan::Single { table } => vec![table.as_str()],
            JoinPlan::Joined { base, links } => std::iter::once(base.as_str())
                .chain(links.iter().map(|l| l.right.as_str()))
                .collect(),
        }
    }
}

/// `left JOIN right ON left.key = right.key`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinLink {
    pub left: String,
    pub right: String,
    pub key: String,
}
