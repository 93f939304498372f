//! Sort, limit and skip language

use nlq_ir::{Direction, SchemaView};
use regex::Regex;
use std::sync::LazyLock;

use crate::clauses::first_integer;
use crate::resolver::ColumnResolver;

static ORDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:order\s+by|ordered\s+by|arranged\s+by|arranged|arrange\s+by|arrange|sorted\s+by|sorted|sort\s+by|sort)\b\s*(.+?)\s*(?:$|\b(?:limit|limited|skip|offset)\b)",
    )
    .expect("order pattern")
});

static LIMIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:limit\s+to|limited\s+to|limit)\b\s*(.+?)\s*(?:$|\b(?:order|ordered|sort|sorted|arranged|arrange|skip|offset)\b)",
    )
    .expect("limit pattern")
});

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:skip|offset)\b\s*(.+?)\s*(?:$|\b(?:limit|limited|order|ordered|sort|sorted|arranged|arrange)\b)",
    )
    .expect("offset pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderClause {
    pub columns: Vec<String>,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Modifiers {
    pub order: Option<OrderClause>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

fn fragment<'s>(regex: &Regex, sentence: &'s str) -> Option<&'s str> {
    regex.captures(sentence).and_then(|caps| caps.get(1)).map(|m| m.as_str())
}

pub(crate) fn extract(sentence: &str, view: &SchemaView<'_>, resolver: &dyn ColumnResolver) -> Modifiers {
    let order = fragment(&ORDER, sentence).and_then(|text| {
        let columns = resolver.resolve(text, &view.columns());
        if columns.is_empty() {
            tracing::debug!(fragment = %text, "ordering names no known column");
            return None;
        }
        let direction = if text.to_lowercase().contains("descending") {
            Direction::Desc
        } else {
            Direction::Asc
        };
        Some(OrderClause { columns, direction })
    });

    Modifiers {
        order,
        limit: fragment(&LIMIT, sentence).and_then(first_integer),
        offset: fragment(&OFFSET, sentence).and_then(first_integer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SubstringResolver;
    use nlq_ir::{SchemaSnapshot, TableSchema};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn modifiers(sentence: &str) -> Modifiers {
        let table = TableSchema::new(
            "sales",
            vec!["region".into(), "amount".into()],
            vec!["region".into()],
            vec!["amount".into()],
            BTreeMap::new(),
        )
        .unwrap();
        let snapshot = SchemaSnapshot::new(vec![table]).unwrap();
        let view = snapshot.view(&["sales"]).unwrap();
        extract(sentence, &view, &SubstringResolver)
    }

    #[test]
    fn test_all_modifiers() {
        assert_eq!(
            modifiers("total amount by region order by amount descending limit 10 offset 20"),
            Modifiers {
                order: Some(OrderClause {
                    columns: vec!["amount".to_string()],
                    direction: Direction::Desc,
                }),
                limit: Some(10),
                offset: Some(20),
            }
        );
    }

    #[test]
    fn test_skip_before_limit() {
        let found = modifiers("show region sorted by region skip the first 5 rows limited to 3 rows");
        assert_eq!(found.order.unwrap().direction, Direction::Asc);
        assert_eq!(found.offset, Some(5));
        assert_eq!(found.limit, Some(3));
    }

    #[test]
    fn test_missing_numbers_are_omitted() {
        let found = modifiers("show region limit a few");
        assert_eq!(found, Modifiers::default());
    }

    #[test]
    fn test_unknown_order_column() {
        assert_eq!(modifiers("show region order by popularity").order, None);
    }
}
