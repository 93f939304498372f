//! Sentence to aggregation pipeline, through the parser and collection resolver
//!
//! Run with: cargo test --package nlq-pipeline --test end_to_end

use nlq_ast::{parse, Context, ResolverKind};
use nlq_ir::{SchemaSnapshot, TableSchema, TranslateError};
use nlq_pipeline::{CollectionResolver, PipelineEncoder, PipelineQuery};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeMap;

fn setup_snapshot() -> SchemaSnapshot {
    let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    SchemaSnapshot::new(vec![
        TableSchema::new(
            "sales",
            strings(&["region", "product", "year", "amount", "units"]),
            strings(&["region", "product", "year"]),
            strings(&["amount", "units"]),
            BTreeMap::new(),
        )
        .unwrap(),
        TableSchema::new(
            "stores",
            strings(&["store_id", "region", "manager"]),
            strings(&["store_id", "region", "manager"]),
            vec![],
            BTreeMap::new(),
        )
        .unwrap(),
    ])
    .unwrap()
}

fn pipeline(sentence: &str) -> Result<PipelineQuery, TranslateError> {
    let snapshot = setup_snapshot();
    let view = snapshot.view(&["sales", "stores"])?;
    let ctx = Context {
        view: &view,
        resolver: ResolverKind::Substring.resolver(),
        strict_aggregate_refs: false,
    };
    let query = parse(sentence)?.to_ir(&ctx, &CollectionResolver)?;
    Ok(PipelineEncoder::new().encode(&query).unwrap())
}

#[test]
fn test_grouped_sum() {
    let encoded = pipeline("total amount by region").unwrap();
    assert_eq!(encoded.collection, "sales");
    assert_eq!(
        encoded.pipeline,
        vec![json!({"$group": {"_id": "$region", "sum_amount": {"$sum": "$amount"}}})]
    );
}

#[test]
fn test_filters_and_modifiers() {
    let encoded = pipeline(
        "minimum units per product where year >= 2020 and region is west having min units < 3 sort by units descending limit 4",
    )
    .unwrap();

    assert_eq!(
        encoded.pipeline,
        vec![
            json!({"$match": {"year": {"$gte": 2020}, "region": "west"}}),
            json!({"$group": {"_id": "$product", "min_units": {"$min": "$units"}}}),
            json!({"$match": {"min_units": {"$lt": 3}}}),
            json!({"$sort": {"min_units": -1}}),
            json!({"$limit": 4}),
        ]
    );
}

#[test]
fn test_top_n_projects_then_sorts() {
    let encoded = pipeline("Show the top 2 product by units").unwrap();
    assert_eq!(
        encoded.rendered,
        r#"db.sales.aggregate([{"$project":{"_id":0,"product":1,"units":1}},{"$sort":{"units":-1}},{"$limit":2}])"#
    );
}

#[test]
fn test_select_sorted_by_unselected_column() {
    let encoded = pipeline("show region order by amount").unwrap();
    assert_eq!(
        encoded.pipeline,
        vec![
            json!({"$sort": {"amount": 1}}),
            json!({"$project": {"_id": 0, "region": 1}}),
        ]
    );
}

#[test]
fn test_collection_follows_columns() {
    let encoded = pipeline("List manager and store_id").unwrap();
    assert_eq!(encoded.collection, "stores");
    assert_eq!(
        encoded.pipeline,
        vec![json!({"$project": {"_id": 0, "store_id": 1, "manager": 1}})]
    );
}

#[test]
fn test_no_collection() {
    assert_eq!(
        pipeline("List manager and amount").unwrap_err(),
        TranslateError::NoCollectionResolved
    );
}
