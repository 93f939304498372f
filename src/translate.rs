//! Public translation entry points
//!
//! Each call is pure: a sentence, the names of the loaded tables (or
//! collections) and a schema snapshot go in, a rendered query or a
//! structured error comes out.

use nlq_ast::{parse, Context, JoinPlanner};
use nlq_ir::{Query, SchemaSnapshot, SourcePlanner, TranslateError};
use nlq_pipeline::{CollectionResolver, PipelineEncoder, PipelineQuery};
use nlq_sql::{CompiledQuery, SqlRenderer};
use std::sync::LazyLock;

use crate::{Error, TranslateOptions};

static SQL_INLINE: LazyLock<SqlRenderer> = LazyLock::new(SqlRenderer::new);
static SQL_BOUND: LazyLock<SqlRenderer> = LazyLock::new(|| SqlRenderer::new().parameterized(true));
static PIPELINE: LazyLock<PipelineEncoder> = LazyLock::new(PipelineEncoder::new);

fn plan<T: AsRef<str>>(
    query: &str,
    loaded: &[T],
    schema: &SchemaSnapshot,
    options: &TranslateOptions,
    planner: &dyn SourcePlanner,
) -> Result<Query, TranslateError> {
    let view = schema.view(loaded)?;
    let ctx = Context {
        view: &view,
        resolver: options.resolver.resolver(),
        strict_aggregate_refs: options.strict_aggregate_refs,
    };
    parse(query)?.to_ir(&ctx, planner)
}

/// Sentence to IR with a relational join plan
pub fn plan_relational<T: AsRef<str>>(
    query: &str,
    loaded_tables: &[T],
    schema: &SchemaSnapshot,
    options: &TranslateOptions,
) -> Result<Query, TranslateError> {
    plan(query, loaded_tables, schema, options, &JoinPlanner)
}

/// Sentence to IR targeting a single collection
pub fn plan_pipeline<T: AsRef<str>>(
    query: &str,
    loaded_collections: &[T],
    schema: &SchemaSnapshot,
    options: &TranslateOptions,
) -> Result<Query, TranslateError> {
    plan(query, loaded_collections, schema, options, &CollectionResolver)
}

/// Translate a sentence to SQL text with default options
pub fn translate_relational<T: AsRef<str>>(
    query: &str,
    loaded_tables: &[T],
    schema: &SchemaSnapshot,
) -> Result<String, Error> {
    translate_relational_with(query, loaded_tables, schema, &TranslateOptions::default())
        .map(|compiled| compiled.sql)
}

/// Translate a sentence to SQL, optionally with bound parameters
pub fn translate_relational_with<T: AsRef<str>>(
    query: &str,
    loaded_tables: &[T],
    schema: &SchemaSnapshot,
    options: &TranslateOptions,
) -> Result<CompiledQuery, Error> {
    let ir = plan_relational(query, loaded_tables, schema, options)?;
    render_relational(&ir, options)
}

/// Render an already planned query as SQL
pub fn render_relational(query: &Query, options: &TranslateOptions) -> Result<CompiledQuery, Error> {
    let renderer: &SqlRenderer = if options.parameterize_literals {
        &SQL_BOUND
    } else {
        &SQL_INLINE
    };
    Ok(renderer.render(query)?)
}

/// Translate a sentence to an aggregation pipeline with default options
pub fn translate_pipeline<T: AsRef<str>>(
    query: &str,
    loaded_collections: &[T],
    schema: &SchemaSnapshot,
) -> Result<PipelineQuery, Error> {
    translate_pipeline_with(query, loaded_collections, schema, &TranslateOptions::default())
}

pub fn translate_pipeline_with<T: AsRef<str>>(
    query: &str,
    loaded_collections: &[T],
    schema: &SchemaSnapshot,
    options: &TranslateOptions,
) -> Result<PipelineQuery, Error> {
    let ir = plan_pipeline(query, loaded_collections, schema, options)?;
    encode_pipeline(&ir)
}

/// Encode an already planned query as an aggregation pipeline
pub fn encode_pipeline(query: &Query) -> Result<PipelineQuery, Error> {
    Ok(PIPELINE.encode(query)?)
}
