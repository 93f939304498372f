//! Target collection resolution

use nlq_ir::{SchemaView, Source, SourcePlanner, TableSchema, TranslateError};

/// Picks the single collection a pipeline runs against
///
/// Documents are not joined, so the resolved collection must hold every
/// referenced column. When several do, the last one in load order wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionResolver;

impl CollectionResolver {
    pub fn resolve<'a>(
        &self,
        referenced: &[String],
        view: &SchemaView<'a>,
    ) -> Result<&'a TableSchema, TranslateError> {
        view.tables()
            .iter()
            .copied()
            .rev()
            .find(|table| referenced.iter().all(|column| table.has_column(column)))
            .ok_or(TranslateError::NoCollectionResolved)
    }
}

impl SourcePlanner for CollectionResolver {
    fn plan(&self, referenced: &[String], view: &SchemaView<'_>) -> Result<Source, TranslateError> {
        let table = self.resolve(referenced, view)?;
        tracing::debug!(collection = %table.name, "collection resolved");
        Ok(Source::Collection {
            name: table.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nlq_ir::SchemaSnapshot;
    use std::collections::BTreeMap;

    fn snapshot() -> SchemaSnapshot {
        let table = |name: &str, columns: &[&str]| {
            let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
            TableSchema::new(name, columns.clone(), columns, vec![], BTreeMap::new()).unwrap()
        };
        SchemaSnapshot::new(vec![
            table("orders", &["order_id", "city"]),
            table("stores", &["store_id", "city", "manager"]),
            table("cities", &["city", "manager"]),
        ])
        .unwrap()
    }

    fn referenced(columns: &[&str]) -> Vec<String> {
        columns.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_last_covering_collection_wins() {
        let snapshot = snapshot();
        let view = snapshot.view(&["orders", "stores", "cities"]).unwrap();

        let source = CollectionResolver.plan(&referenced(&["city", "manager"]), &view).unwrap();
        assert_eq!(source, Source::Collection { name: "cities".to_string() });

        let source = CollectionResolver.plan(&referenced(&["order_id", "city"]), &view).unwrap();
        assert_eq!(source, Source::Collection { name: "orders".to_string() });
    }

    #[test]
    fn test_load_order_decides_between_covering_collections() {
        let snapshot = snapshot();
        let view = snapshot.view(&["cities", "stores"]).unwrap();
        let source = CollectionResolver.plan(&referenced(&["city", "manager"]), &view).unwrap();
        assert_eq!(source, Source::Collection { name: "stores".to_string() });
    }

    #[test]
    fn test_nothing_referenced_uses_last_collection() {
        let snapshot = snapshot();
        let view = snapshot.view(&["cities", "orders"]).unwrap();
        let table = CollectionResolver.resolve(&[], &view).unwrap();
        assert_eq!(table.name, "orders");
    }

    #[test]
    fn test_split_columns_fail() {
        let snapshot = snapshot();
        let view = snapshot.view(&["orders", "stores"]).unwrap();
        assert_eq!(
            CollectionResolver.plan(&referenced(&["order_id", "manager"]), &view),
            Err(TranslateError::NoCollectionResolved)
        );
    }
}
