//! Schema catalog: loads schema files and publishes snapshots
//!
//! A schema file lists tables with their columns and, optionally, their
//! attribute/measure classification. Tables that omit the classification
//! have it inferred from sample rows.
//!
//! ```yaml
//! tables:
//!   - name: sales
//!     columns: [region, year, amount]
//!     attributes: [region, year]
//!     measures: [amount]
//!     unique_values:
//!       region: [west, east]
//!   - name: stores
//!     rows:
//!       - {store_id: 1, city: "Oslo"}
//! ```

use arc_swap::ArcSwap;
use nlq::{SchemaError, SchemaSnapshot, TableSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML schema: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema: {0}")]
    Schema(#[from] SchemaError),

    #[error("Table {0} declares neither columns nor sample rows")]
    EmptyTable(String),

    #[error("Catalog was not loaded from a file")]
    NoSource,
}

/// On-disk schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    pub tables: Vec<TableSpec>,
}

/// One table as written in a schema file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub attributes: Option<Vec<String>>,
    pub measures: Option<Vec<String>>,
    pub unique_values: BTreeMap<String, Vec<String>>,
    pub rows: Vec<Map<String, Value>>,
}

impl TableSpec {
    pub fn into_schema(self) -> Result<TableSchema, CatalogError> {
        match (self.attributes, self.measures) {
            (None, None) => {
                if self.rows.is_empty() {
                    return Err(CatalogError::EmptyTable(self.name));
                }
                let mut inferred = TableSchema::infer(&self.name, &self.rows)?;
                for (column, values) in self.unique_values {
                    inferred.unique_values.insert(nlq_ir::normalize_column(&column), values);
                }
                debug!(
                    table = %inferred.name,
                    attributes = ?inferred.attributes,
                    measures = ?inferred.measures,
                    "Inferred column classification"
                );
                Ok(inferred)
            }
            (attributes, measures) => {
                let mut columns = self.columns;
                if columns.is_empty() {
                    for row in &self.rows {
                        for key in row.keys() {
                            if !columns.contains(key) {
                                columns.push(key.clone());
                            }
                        }
                    }
                }
                if columns.is_empty() {
                    return Err(CatalogError::EmptyTable(self.name));
                }
                Ok(TableSchema::new(
                    self.name,
                    columns,
                    attributes.unwrap_or_default(),
                    measures.unwrap_or_default(),
                    self.unique_values,
                )?)
            }
        }
    }
}

impl SchemaFile {
    /// Parse by file extension: `.json` is JSON, anything else YAML
    pub fn read(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(serde_yaml::from_str(&contents)?)
        }
    }

    pub fn into_snapshot(self) -> Result<SchemaSnapshot, CatalogError> {
        let tables = self
            .tables
            .into_iter()
            .map(TableSpec::into_schema)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SchemaSnapshot::new(tables)?)
    }
}

/// Current schema snapshot, replaced wholesale on reload
pub struct SchemaStore {
    source: Option<PathBuf>,
    current: ArcSwap<SchemaSnapshot>,
}

impl SchemaStore {
    #[cfg(test)]
    pub fn new(snapshot: SchemaSnapshot) -> Self {
        Self {
            source: None,
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = SchemaFile::read(&path)?.into_snapshot()?;
        info!(path = %path.display(), tables = snapshot.tables.len(), "Schema loaded");
        Ok(Self {
            source: Some(path),
            current: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Re-read the source file; the old snapshot stays in place on failure
    pub fn reload(&self) -> Result<(), CatalogError> {
        let path = self.source.as_ref().ok_or(CatalogError::NoSource)?;
        let snapshot = SchemaFile::read(path)?.into_snapshot()?;
        info!(path = %path.display(), tables = snapshot.tables.len(), "Schema reloaded");
        self.current.store(Arc::new(snapshot));
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.current.load_full()
    }

    /// Format the catalog as markdown
    pub fn to_markdown(&self) -> String {
        let snapshot = self.current.load();
        let mut md = String::new();

        md.push_str("# Schema Catalog\n\n");
        if let Some(path) = &self.source {
            md.push_str(&format!("**Source:** `{}`\n\n", path.display()));
        }
        md.push_str(&format!("**Tables:** {}\n\n", snapshot.tables.len()));

        for table in &snapshot.tables {
            md.push_str(&format!("## Table: `{}`\n\n", table.name));
            md.push_str("| Column | Role | Known Values |\n");
            md.push_str("|--------|------|--------------|\n");

            for column in &table.columns {
                let role = if table.measures.contains(column) {
                    "measure"
                } else if table.attributes.contains(column) {
                    "attribute"
                } else {
                    ""
                };
                let values = table
                    .unique_values
                    .get(column)
                    .map(|values| {
                        values
                            .iter()
                            .take(3)
                            .map(|v| format!("\"{}\"", v))
                            .collect::<Vec<_>>()
                            .join(", ")
                    })
                    .unwrap_or_default();
                md.push_str(&format!("| `{}` | {} | {} |\n", column, role, values));
            }
            md.push('\n');
        }

        md
    }
}
