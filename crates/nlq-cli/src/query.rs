//! Sentence translation into JSON envelopes

use clap::ValueEnum;
use nlq::{SchemaSnapshot, TranslateOptions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::Level;
use uuid::Uuid;

/// Output target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetMode {
    /// SQL text
    #[default]
    Sql,
    /// Document-store aggregation pipeline
    Pipeline,
}

impl TargetMode {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        match std::env::var("NLQ_TARGET").as_deref() {
            Ok("pipeline") | Ok("mongo") | Ok("nosql") => TargetMode::Pipeline,
            Ok("sql") | Ok(_) | Err(_) => TargetMode::Sql,
        }
    }
}

/// Translates sentences against whatever snapshot it is handed
pub struct Translator {
    target: TargetMode,
    options: TranslateOptions,
    tables: Vec<String>,
}

impl Translator {
    /// `tables` empty means every table in the snapshot
    pub fn new(target: TargetMode, options: TranslateOptions, tables: Vec<String>) -> Self {
        Self {
            target,
            options,
            tables,
        }
    }

    /// Translate one sentence; failures become `{"error": {kind, message}}`
    pub fn envelope(&self, sentence: &str, schema: &SchemaSnapshot) -> Value {
        let span = tracing::info_span!("translate", request_id = %Uuid::new_v4(), mode = ?self.target);
        let _enter = span.enter();

        let loaded: Vec<&str> = if self.tables.is_empty() {
            schema.table_names()
        } else {
            self.tables.iter().map(String::as_str).collect()
        };

        match self.translate(sentence, &loaded, schema) {
            Ok(envelope) => envelope,
            Err(e) => {
                crate::log_event!(
                    level: Level::WARN,
                    event: "translation_failed",
                    kind: e.kind(),
                    sentence: sentence,
                );
                json!({"error": {"kind": e.kind(), "message": e.to_string()}})
            }
        }
    }

    fn translate(&self, sentence: &str, loaded: &[&str], schema: &SchemaSnapshot) -> Result<Value, nlq::Error> {
        match self.target {
            TargetMode::Sql => {
                let query = nlq::plan_relational(sentence, loaded, schema, &self.options)?;
                let fingerprint = query.fingerprint();
                let compiled = nlq::render_relational(&query, &self.options)?;
                crate::log_event!(
                    level: Level::INFO,
                    event: "query_translated",
                    pattern: query.pattern.name(),
                    fingerprint: &fingerprint,
                );

                let mut envelope = json!({
                    "translated_query": compiled.sql,
                    "fingerprint": fingerprint,
                });
                if self.options.parameterize_literals {
                    envelope["params"] = json!(compiled.params);
                }
                Ok(envelope)
            }
            TargetMode::Pipeline => {
                let query = nlq::plan_pipeline(sentence, loaded, schema, &self.options)?;
                let fingerprint = query.fingerprint();
                let encoded = nlq::encode_pipeline(&query)?;
                crate::log_event!(
                    level: Level::INFO,
                    event: "query_translated",
                    pattern: query.pattern.name(),
                    collection: &encoded.collection,
                    fingerprint: &fingerprint,
                );

                Ok(json!({
                    "translated_query": encoded.rendered,
                    "fingerprint": fingerprint,
                    "collection": encoded.collection,
                    "pipeline": encoded.pipeline,
                }))
            }
        }
    }
}
