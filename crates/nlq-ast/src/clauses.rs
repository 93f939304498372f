//! Base clause: projection, aggregation and grouping for a template

use nlq_ir::{AggFunc, Direction, Ordering, Pattern, Projection, SchemaView, Target, TranslateError};
use regex::Regex;
use std::sync::LazyLock;

use crate::ast::{Rank, Template};
use crate::resolver::ColumnResolver;

static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern"));

/// First run of digits in the text
pub(crate) fn first_integer(text: &str) -> Option<u64> {
    INTEGER.find(text).and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BaseClause {
    pub pattern: Pattern,
    pub projection: Vec<Projection>,
    pub group_by: Vec<String>,
    pub order: Option<Ordering>,
    pub limit: Option<u64>,
}

impl BaseClause {
    fn new(pattern: Pattern, projection: Vec<Projection>) -> Self {
        Self {
            pattern,
            projection,
            group_by: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

pub(crate) fn build(
    template: &Template,
    view: &SchemaView<'_>,
    resolver: &dyn ColumnResolver,
) -> Result<BaseClause, TranslateError> {
    let pattern = template.pattern();

    match template {
        Template::GroupedAggregate { func, subject, group } => {
            let keys = resolver.resolve(group, &view.attributes());
            if keys.is_empty() {
                return Err(TranslateError::MissingMeasureOrDimension(format!(
                    "no attribute found in \"{}\"",
                    group
                )));
            }

            let aggregates = aggregate_projection(*func, subject, view, resolver)?;
            let mut projection: Vec<Projection> = keys.iter().map(Projection::column).collect();
            projection.extend(aggregates);

            Ok(BaseClause {
                group_by: keys,
                ..BaseClause::new(pattern, projection)
            })
        }

        Template::Aggregate { func, subject } => {
            let projection = aggregate_projection(*func, subject, view, resolver)?;
            Ok(BaseClause::new(pattern, projection))
        }

        Template::Ranked { rank, subject, order } => {
            let count = first_integer(subject)
                .ok_or_else(|| TranslateError::MissingRowCount(pattern.name()))?;

            let order_columns = resolver.resolve(order, &view.columns());
            if order_columns.is_empty() {
                return Err(TranslateError::MissingMeasureOrDimension(format!(
                    "no column found in \"{}\"",
                    order
                )));
            }

            let selected = resolver.resolve(subject, &view.columns());
            let projection = if selected.is_empty() {
                vec![Projection::wildcard()]
            } else {
                let mut fields = selected;
                for column in &order_columns {
                    if !fields.contains(column) {
                        fields.push(column.clone());
                    }
                }
                fields.into_iter().map(Projection::column).collect()
            };

            let direction = match rank {
                Rank::Top => Direction::Desc,
                Rank::Bottom => Direction::Asc,
            };

            Ok(BaseClause {
                order: Some(Ordering {
                    keys: order_columns.into_iter().map(Target::column).collect(),
                    direction,
                }),
                limit: Some(count),
                ..BaseClause::new(pattern, projection)
            })
        }

        Template::Select { subject } => {
            let columns = resolver.resolve(subject, &view.columns());
            let projection = if columns.is_empty() {
                vec![Projection::wildcard()]
            } else {
                columns.into_iter().map(Projection::column).collect()
            };
            Ok(BaseClause::new(pattern, projection))
        }
    }
}

/// Aggregated columns named by the subject phrase
///
/// Counting accepts any column and falls back to counting rows. Every other
/// function needs at least one measure.
fn aggregate_projection(
    func: AggFunc,
    subject: &str,
    view: &SchemaView<'_>,
    resolver: &dyn ColumnResolver,
) -> Result<Vec<Projection>, TranslateError> {
    if func == AggFunc::Count {
        let counted = resolver.resolve(subject, &view.columns());
        if counted.is_empty() {
            return Ok(vec![Projection::aggregate(AggFunc::Count, nlq_ir::WILDCARD)]);
        }
        return Ok(counted
            .into_iter()
            .map(|c| Projection::aggregate(AggFunc::Count, c))
            .collect());
    }

    let measures = resolver.resolve(subject, &view.measures());
    if measures.is_empty() {
        return Err(TranslateError::MissingMeasureOrDimension(format!(
            "no measure found in \"{}\"",
            subject
        )));
    }
    Ok(measures
        .into_iter()
        .map(|m| Projection::aggregate(func, m))
        .collect())
}
