//! Lower a recognized sentence to the canonical IR

use nlq_ir::{self as ir, Ordering, Projection, SchemaView, SourcePlanner, Target, TranslateError};

use crate::ast::*;
use crate::clauses;
use crate::modifiers::{self, OrderClause};
use crate::predicates;
use crate::resolver::ColumnResolver;

/// Everything lowering needs besides the sentence
pub struct Context<'a> {
    pub view: &'a SchemaView<'a>,
    pub resolver: &'a dyn ColumnResolver,
    /// Reject aggregate filters whose alias is not projected
    pub strict_aggregate_refs: bool,
}

impl Sentence {
    /// Convert the sentence to an IR query
    pub fn to_ir(&self, ctx: &Context<'_>, planner: &dyn SourcePlanner) -> Result<ir::Query, TranslateError> {
        let base = clauses::build(&self.template, ctx.view, ctx.resolver)?;
        let predicates = predicates::extract(&self.text, ctx.view);

        for predicate in predicates.iter().filter(|p| p.scope() == ir::Scope::Aggregate) {
            let Some(alias) = predicate.target.alias() else {
                continue;
            };
            let projected = base.projection.iter().any(|p| p.alias.as_deref() == Some(alias.as_str()));
            if projected {
                continue;
            }
            if ctx.strict_aggregate_refs {
                return Err(TranslateError::UnresolvedAggregateAlias(alias));
            }
            tracing::warn!(%alias, "aggregate filter references an alias outside the projection");
        }

        // Ranked templates take their order and row count from the template itself.
        let (order, limit, offset) = if base.pattern.is_ranked() {
            (base.order, base.limit, None)
        } else {
            let found = modifiers::extract(&self.text, ctx.view, ctx.resolver);
            let order = found.order.map(|clause| sort_targets(clause, &base.projection));
            (order, found.limit, found.offset)
        };

        let referenced = ctx.resolver.resolve(&self.text, &ctx.view.columns());
        let source = planner.plan(&referenced, ctx.view)?;

        let query = ir::Query {
            pattern: base.pattern,
            projection: base.projection,
            group_by: base.group_by,
            predicates,
            order,
            limit,
            offset,
            source,
        };
        tracing::debug!(
            pattern = %query.pattern.name(),
            referenced = ?referenced,
            fingerprint = %query.fingerprint(),
            "query lowered"
        );
        Ok(query)
    }
}

/// Point sort columns at the aggregate alias when the column is projected
/// only in aggregated form
fn sort_targets(clause: OrderClause, projection: &[Projection]) -> Ordering {
    let keys = clause
        .columns
        .into_iter()
        .map(|column| {
            let plain = projection.iter().any(|p| p.func.is_none() && p.field == column);
            let aggregated = projection
                .iter()
                .find(|p| p.field == column)
                .and_then(|p| p.func);
            match aggregated {
                Some(func) if !plain => Target::aggregate(func, column),
                _ => Target::column(column),
            }
        })
        .collect();

    Ordering {
        keys,
        direction: clause.direction,
    }
}
