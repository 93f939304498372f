//! Aggregation pipeline encoder for NLQ IR
//!
//! Converts a [`Query`] into an ordered list of document-store stages:
//! `$match` (rows) → `$group` / `$project` → `$match` (aggregates) →
//! `$sort` → `$skip` → `$limit`. Empty stages are omitted. A `$sort` on a
//! column that `$project` drops moves ahead of the projection.

use nlq_ir::{
    AggFunc, CompareOp, Direction, Literal, Ordering, Pattern, Predicate, PredicateValue, Projection,
    Query, Source, Target, WILDCARD,
};
use nlq_registry::{AggregateRegistry, RegistryError};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

mod collection;

pub use collection::CollectionResolver;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Unsupported source for pipeline: {0}")]
    UnsupportedSource(String),

    #[error("Pipeline encoding failed: {0}")]
    EncodingFailed(String),
}

/// Encoded pipeline and the shell-style text form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineQuery {
    pub collection: String,
    pub pipeline: Vec<Value>,
    pub rendered: String,
}

pub struct PipelineEncoder {
    registry: AggregateRegistry,
}

impl Default for PipelineEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineEncoder {
    pub fn new() -> Self {
        Self {
            registry: AggregateRegistry::default(),
        }
    }

    /// Encode a query against its resolved collection
    pub fn encode(&self, query: &Query) -> Result<PipelineQuery, EncodingError> {
        let collection = match &query.source {
            Source::Collection { name } => name.clone(),
            Source::Relational { plan } => {
                return Err(EncodingError::UnsupportedSource(format!(
                    "relational plan over {}",
                    plan.tables().join(", ")
                )))
            }
        };

        let pipeline = self.stages(query)?;
        let text = serde_json::to_string(&pipeline)
            .map_err(|e| EncodingError::EncodingFailed(e.to_string()))?;
        let rendered = format!("db.{}.aggregate({})", collection, text);

        tracing::debug!(%collection, stages = pipeline.len(), "pipeline encoded");

        Ok(PipelineQuery {
            collection,
            pipeline,
            rendered,
        })
    }

    fn stages(&self, query: &Query) -> Result<Vec<Value>, EncodingError> {
        let mut stages = Vec::new();

        let rows: Vec<&Predicate> = query.row_predicates().collect();
        if !rows.is_empty() {
            stages.push(json!({ "$match": match_document(&rows, |t| t.column_name().to_string()) }));
        }

        let mut sort = query.order.as_ref().map(|order| sort_stage(query, order));

        match query.pattern {
            Pattern::Aggregate { .. } => stages.push(self.group(query)?),
            Pattern::Select | Pattern::TopN | Pattern::BottomN => {
                if let Some(project) = project(&query.projection) {
                    // A sort on a column the projection drops has to run first.
                    if sorts_on_dropped_column(query) {
                        stages.extend(sort.take());
                    }
                    stages.push(project);
                }
            }
        }

        let aggregates: Vec<&Predicate> = query.aggregate_predicates().collect();
        if query.pattern.is_ranked() {
            if !aggregates.is_empty() {
                tracing::warn!(count = aggregates.len(), "aggregate filters ignored for ranked query");
            }
        } else if !aggregates.is_empty() {
            let document = match_document(&aggregates, |t| {
                t.alias().unwrap_or_else(|| t.column_name().to_string())
            });
            stages.push(json!({ "$match": document }));
        }

        stages.extend(sort);

        if let Some(offset) = query.offset {
            stages.push(json!({ "$skip": offset }));
        }
        if let Some(limit) = query.limit {
            stages.push(json!({ "$limit": limit }));
        }

        Ok(stages)
    }

    /// `$group` keyed on the group-by columns, one accumulator per aggregate
    fn group(&self, query: &Query) -> Result<Value, EncodingError> {
        let id = match query.group_by.as_slice() {
            [] => Value::Null,
            [key] => json!(format!("${}", key)),
            keys => Value::Object(
                keys.iter()
                    .map(|k| (k.clone(), json!(format!("${}", k))))
                    .collect(),
            ),
        };

        let mut group = Map::new();
        group.insert("_id".to_string(), id);
        for projection in &query.projection {
            let (Some(func), Some(alias)) = (projection.func, projection.alias.as_ref()) else {
                continue;
            };
            group.insert(alias.clone(), self.accumulator(func, &projection.field)?);
        }

        Ok(json!({ "$group": group }))
    }

    fn accumulator(&self, func: AggFunc, field: &str) -> Result<Value, EncodingError> {
        let sig = self.registry.lookup(func)?;
        let value = match (func, field) {
            (AggFunc::Count, WILDCARD) => json!(1),
            (AggFunc::Count, column) => json!({
                "$cond": [{ "$gt": [format!("${}", column), null] }, 1, 0]
            }),
            (_, column) => json!(format!("${}", column)),
        };

        let mut document = Map::new();
        document.insert(sig.accumulator.clone(), value);
        Ok(Value::Object(document))
    }
}

/// `$project` keeping the selected columns, `None` when everything is kept
fn project(projection: &[Projection]) -> Option<Value> {
    if projection.is_empty() || projection.iter().any(Projection::is_wildcard) {
        return None;
    }

    let mut fields = Map::new();
    fields.insert("_id".to_string(), json!(0));
    for p in projection {
        fields.insert(p.field.clone(), json!(1));
    }
    Some(json!({ "$project": fields }))
}

fn sort_stage(query: &Query, order: &Ordering) -> Value {
    let direction = match order.direction {
        Direction::Asc => 1,
        Direction::Desc => -1,
    };
    let mut sort = Map::new();
    for key in &order.keys {
        sort.insert(sort_field(query, key), json!(direction));
    }
    json!({ "$sort": sort })
}

fn sorts_on_dropped_column(query: &Query) -> bool {
    query.order.as_ref().is_some_and(|order| {
        order.keys.iter().any(|key| match key {
            Target::Column { name } => !query.projection.iter().any(|p| &p.field == name),
            Target::Aggregate { .. } => false,
        })
    })
}

/// Field a sort key names once earlier stages have run
fn sort_field(query: &Query, key: &Target) -> String {
    match key {
        Target::Aggregate { .. } => key.alias().unwrap_or_default(),
        Target::Column { name } => {
            let grouped = matches!(query.pattern, Pattern::Aggregate { .. });
            if !grouped || !query.group_by.contains(name) {
                return name.clone();
            }
            if query.group_by.len() == 1 {
                "_id".to_string()
            } else {
                format!("_id.{}", name)
            }
        }
    }
}

/// One `$match` document; conditions on the same field merge into one
/// operator document
fn match_document(predicates: &[&Predicate], field: impl Fn(&Target) -> String) -> Map<String, Value> {
    let mut document = Map::new();

    for predicate in predicates {
        let key = field(&predicate.target);
        let condition = condition(predicate);

        match document.get_mut(&key) {
            Some(existing) => {
                let mut operators = as_operators(existing.take());
                operators.extend(as_operators(condition));
                *existing = Value::Object(operators);
            }
            None => {
                document.insert(key, condition);
            }
        }
    }

    document
}

/// Bare values are implicit equality; widen them to `{"$eq": v}`
fn as_operators(condition: Value) -> Map<String, Value> {
    match condition {
        Value::Object(operators) => operators,
        value => {
            let mut operators = Map::new();
            operators.insert("$eq".to_string(), value);
            operators
        }
    }
}

fn condition(predicate: &Predicate) -> Value {
    match (&predicate.value, predicate.op) {
        (PredicateValue::Range { low, high }, _) => json!({ "$gte": value(low), "$lte": value(high) }),
        (PredicateValue::Scalar(v), CompareOp::Eq | CompareOp::Between) => value(v),
        (PredicateValue::Scalar(v), op) => {
            let operator = match op {
                CompareOp::Ne => "$ne",
                CompareOp::Lt => "$lt",
                CompareOp::Le => "$lte",
                CompareOp::Gt => "$gt",
                _ => "$gte",
            };
            let mut document = Map::new();
            document.insert(operator.to_string(), value(v));
            Value::Object(document)
        }
    }
}

fn value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(i) => json!(i),
        Literal::Float(x) => json!(x),
        Literal::String(s) => json!(s),
        Literal::Date(_) => json!(literal.to_string()),
    }
}
