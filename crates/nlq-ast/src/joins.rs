//! Relational join planning from referenced columns

use nlq_ir::{JoinLink, JoinPlan, SchemaView, Source, SourcePlanner, TableSchema, TranslateError};

/// Plans joins over shared column names
///
/// Each referenced column belongs to the first loaded table that has it.
/// Owning tables are then chained greedily: a table joins onto the first
/// already-joined table it shares a column with, keyed on the first shared
/// column in that table's column order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinPlanner;

impl JoinPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Tables owning at least one referenced column, in load order
    pub fn owners<'a>(referenced: &[String], view: &SchemaView<'a>) -> Vec<&'a TableSchema> {
        let tables = view.tables();
        let owner_names: Vec<&str> = referenced
            .iter()
            .filter_map(|column| tables.iter().find(|t| t.has_column(column)))
            .map(|t| t.name.as_str())
            .collect();

        tables
            .iter()
            .filter(|t| owner_names.contains(&t.name.as_str()))
            .copied()
            .collect()
    }

    pub fn plan_joins(&self, referenced: &[String], view: &SchemaView<'_>) -> Result<JoinPlan, TranslateError> {
        let selected = Self::owners(referenced, view);

        let Some((base, rest)) = selected.split_first() else {
            return Err(TranslateError::NoJoinableTableSet(referenced.to_vec()));
        };
        if rest.is_empty() {
            return Ok(JoinPlan::Single {
                table: base.name.clone(),
            });
        }

        let mut joined: Vec<&TableSchema> = vec![*base];
        let mut pending: Vec<&TableSchema> = rest.to_vec();
        let mut links = Vec::new();

        loop {
            let next = pending.iter().enumerate().find_map(|(i, table)| {
                joined.iter().find_map(|left| {
                    left.columns
                        .iter()
                        .find(|c| table.has_column(c))
                        .map(|key| (i, left.name.clone(), key.clone()))
                })
            });

            let Some((i, left, key)) = next else {
                break;
            };
            let table = pending.remove(i);
            links.push(JoinLink {
                left,
                right: table.name.clone(),
                key,
            });
            joined.push(table);
        }

        for table in &pending {
            tracing::warn!(table = %table.name, "table shares no column with the join, dropped");
        }

        if links.is_empty() {
            return Err(TranslateError::NoJoinableTableSet(referenced.to_vec()));
        }

        Ok(JoinPlan::Joined {
            base: base.name.clone(),
            links,
        })
    }
}

impl SourcePlanner for JoinPlanner {
    fn plan(&self, referenced: &[String], view: &SchemaView<'_>) -> Result<Source, TranslateError> {
        let plan = self.plan_joins(referenced, view)?;
        tracing::debug!(tables = ?plan.tables(), "join plan built");
        Ok(Source::Relational { plan })
    }
}
