//! Translation through the public API, for both targets
//!
//! Run with: cargo test --test translate

use nlq::{
    plan_relational, translate_pipeline, translate_relational, translate_relational_with, Error,
    QueryParam, ResolverKind, SchemaSnapshot, TableSchema, TranslateError, TranslateOptions,
};
use nlq_ir::{CompareOp, Pattern};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn sales_only() -> SchemaSnapshot {
    let sales = TableSchema::new(
        "sales",
        strings(&["region", "amount"]),
        strings(&["region"]),
        strings(&["amount"]),
        BTreeMap::new(),
    )
    .unwrap();
    SchemaSnapshot::new(vec![sales]).unwrap()
}

fn retail() -> SchemaSnapshot {
    SchemaSnapshot::new(vec![
        TableSchema::new(
            "sales",
            strings(&["sale_id", "store_id", "region", "product", "amount", "units"]),
            strings(&["sale_id", "store_id", "region", "product"]),
            strings(&["amount", "units"]),
            BTreeMap::from([("region".to_string(), strings(&["west", "east", "north"]))]),
        )
        .unwrap(),
        TableSchema::new(
            "stores",
            strings(&["store_id", "manager", "city"]),
            strings(&["store_id", "manager", "city"]),
            vec![],
            BTreeMap::new(),
        )
        .unwrap(),
    ])
    .unwrap()
}

#[test]
fn test_grouped_sum_both_targets() {
    let schema = sales_only();

    let sql = translate_relational("total amount by region", &["sales"], &schema).unwrap();
    assert_eq!(sql, "SELECT region,Sum(amount) as Sum_amount FROM sales GROUP BY region");

    let pipeline = translate_pipeline("total amount by region", &["sales"], &schema).unwrap();
    assert_eq!(pipeline.collection, "sales");
    assert_eq!(
        pipeline.pipeline[0],
        json!({"$group": {"_id": "$region", "sum_amount": {"$sum": "$amount"}}})
    );
}

#[test]
fn test_full_sentence() {
    let schema = retail();
    let sentence = "total amount by region where units > 2 order by amount descending limit 10";

    assert_eq!(
        translate_relational(sentence, &["sales", "stores"], &schema).unwrap(),
        "SELECT region,Sum(amount) as Sum_amount FROM sales WHERE units > 2 \
         GROUP BY region ORDER BY Sum_amount DESC LIMIT 10"
    );
    assert_eq!(
        translate_pipeline(sentence, &["sales", "stores"], &schema).unwrap().rendered,
        concat!(
            r#"db.sales.aggregate([{"$match":{"units":{"$gt":2}}},"#,
            r#"{"$group":{"_id":"$region","sum_amount":{"$sum":"$amount"}}},"#,
            r#"{"$sort":{"sum_amount":-1}},{"$limit":10}])"#
        )
    );
}

#[test]
fn test_join_and_collection_choice() {
    let schema = retail();

    assert_eq!(
        translate_relational("average amount per city", &["sales", "stores"], &schema).unwrap(),
        "SELECT city,Avg(amount) as Avg_amount \
         FROM sales JOIN stores ON sales.store_id = stores.store_id GROUP BY city"
    );

    let err = translate_pipeline("average amount per city", &["sales", "stores"], &schema).unwrap_err();
    assert!(matches!(err, Error::Translate(TranslateError::NoCollectionResolved)));
}

#[test]
fn test_top_n_beats_sum() {
    let schema = sales_only();
    assert_eq!(
        translate_relational("Show the top 3 region by sum of amount", &["sales"], &schema).unwrap(),
        "SELECT region,amount FROM sales ORDER BY amount DESC LIMIT 3"
    );
}

#[test]
fn test_parameterized_literals() {
    let options = TranslateOptions {
        parameterize_literals: true,
        ..TranslateOptions::default()
    };
    let compiled = translate_relational_with(
        "Show product where region is 'west' and amount at least 100",
        &["sales"],
        &retail(),
        &options,
    )
    .unwrap();

    assert_eq!(compiled.sql, "SELECT product FROM sales WHERE region = ? AND amount >= ?");
    assert_eq!(
        compiled.params,
        vec![QueryParam::String("west".to_string()), QueryParam::Int(100)]
    );
}

#[test]
fn test_strict_aggregate_refs() {
    let sentence = "total amount by region having max units > 4";
    let schema = retail();

    let sql = translate_relational(sentence, &["sales"], &schema).unwrap();
    assert_eq!(
        sql,
        "SELECT region,Sum(amount) as Sum_amount FROM sales GROUP BY region HAVING Max(units) > 4"
    );

    let strict = TranslateOptions {
        strict_aggregate_refs: true,
        ..TranslateOptions::default()
    };
    let err = translate_relational_with(sentence, &["sales"], &schema, &strict).unwrap_err();
    assert_eq!(err.kind(), "unresolved_aggregate_alias");
}

#[test]
fn test_token_resolver_is_stricter() {
    let schema = sales_only();
    assert!(translate_relational("total amounts by region", &["sales"], &schema).is_ok());

    let token = TranslateOptions {
        resolver: ResolverKind::Token,
        ..TranslateOptions::default()
    };
    let err = translate_relational_with("total amounts by region", &["sales"], &schema, &token).unwrap_err();
    assert!(matches!(err, Error::Translate(TranslateError::MissingMeasureOrDimension(_))));
}

#[test]
fn test_failures() {
    let schema = retail();
    let cases = [
        ("how are you", "no_pattern_recognized"),
        ("Show the top region by amount", "missing_row_count"),
        ("List manager and city", "ok"),
    ];
    for (sentence, kind) in cases {
        let got = match translate_relational(sentence, &["sales", "stores"], &schema) {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        assert_eq!(got, kind, "{}", sentence);
    }
}

// ============================================================================
// Properties
// ============================================================================

fn lead_verb() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("select"),
        Just("list"),
        Just("give"),
        Just("show"),
        Just("find"),
        Just("provide"),
    ]
}

fn attribute() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("region"), Just("product"), Just("store_id")]
}

fn measure() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("amount"), Just("units")]
}

fn top_trigger() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("top"), Just("first")]
}

fn sum_trigger() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("total of all"),
        Just("total"),
        Just("sum of all"),
        Just("sum of"),
        Just("sum"),
    ]
}

fn non_count_trigger() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("total"),
        Just("sum of"),
        Just("average"),
        Just("mean of"),
        Just("minimum"),
        Just("lowest"),
        Just("max"),
        Just("largest"),
    ]
}

fn sentence() -> impl Strategy<Value = String> {
    prop_oneof![
        (non_count_trigger(), measure(), attribute())
            .prop_map(|(t, m, a)| format!("{} {} by {}", t, m, a)),
        (lead_verb(), 1u32..500, attribute(), measure())
            .prop_map(|(v, n, a, m)| format!("{} the bottom {} {} by {}", v, n, a, m)),
        (lead_verb(), attribute(), measure(), 0i64..10_000)
            .prop_map(|(v, a, m, x)| format!("{} {} where {} > {} sorted by {}", v, a, m, x, a)),
        (non_count_trigger(), measure(), attribute(), 1u32..100)
            .prop_map(|(t, m, a, n)| format!("{} {} per {} order by {} descending limit {}", t, m, a, m, n)),
    ]
}

proptest! {
    /// Top-N language wins over a later summation trigger
    #[test]
    fn top_n_precedes_sum(
        verb in lead_verb(),
        top in top_trigger(),
        sum in sum_trigger(),
        n in 1u64..1000,
        col in attribute(),
        m in measure(),
    ) {
        let sentence = format!("{} the {} {} {} by {} {}", verb, top, n, col, sum, m);
        let query = plan_relational(&sentence, &["sales"], &retail(), &TranslateOptions::default()).unwrap();
        prop_assert_eq!(query.pattern, Pattern::TopN);
        prop_assert_eq!(query.limit, Some(n));
    }

    /// Same sentence and snapshot give byte-identical output on both targets
    #[test]
    fn translation_is_deterministic(sentence in sentence()) {
        let schema = retail();
        let first = translate_relational(&sentence, &["sales", "stores"], &schema).unwrap();
        let second = translate_relational(&sentence, &["sales", "stores"], &schema).unwrap();
        prop_assert_eq!(first, second);

        let first = translate_pipeline(&sentence, &["sales", "stores"], &schema).unwrap();
        let second = translate_pipeline(&sentence, &["sales", "stores"], &schema).unwrap();
        prop_assert_eq!(first.rendered, second.rendered);
    }

    /// A between phrase is one range predicate, never two comparisons
    #[test]
    fn between_is_one_predicate(low in 0i64..1000, span in 0i64..1000, col in measure()) {
        let high = low + span;
        let sentence = format!("show region where {} between {} and {}", col, low, high);
        let schema = retail();

        let query = plan_relational(&sentence, &["sales"], &schema, &TranslateOptions::default()).unwrap();
        prop_assert_eq!(query.predicates.len(), 1);
        prop_assert_eq!(query.predicates[0].op, CompareOp::Between);

        let sql = translate_relational(&sentence, &["sales"], &schema).unwrap();
        let expected = format!("WHERE {} BETWEEN {} AND {}", col, low, high);
        prop_assert!(sql.ends_with(&expected), "{}", sql);
    }

    /// Sentences naming one table's columns never join
    #[test]
    fn single_table_never_joins(sentence in sentence()) {
        let sql = translate_relational(&sentence, &["sales", "stores"], &retail()).unwrap();
        prop_assert!(!sql.contains(" JOIN "), "{}", sql);
    }

    /// Grouped aggregates need a measure
    #[test]
    fn no_measures_fails_grouped(trigger in non_count_trigger(), col in prop_oneof![Just("amount"), Just("product")]) {
        let flat = TableSchema::new(
            "sales",
            strings(&["region", "product", "amount"]),
            strings(&["region", "product", "amount"]),
            vec![],
            BTreeMap::new(),
        )
        .unwrap();
        let schema = SchemaSnapshot::new(vec![flat]).unwrap();

        let sentence = format!("{} {} by region", trigger, col);
        let err = translate_relational(&sentence, &["sales"], &schema).unwrap_err();
        prop_assert!(
            matches!(err, Error::Translate(TranslateError::MissingMeasureOrDimension(_))),
            "{:?}", err
        );
    }
}
