//! Schema snapshot types and the source-planning seam

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::{Source, TranslateError};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Table name must not be empty")]
    EmptyName,

    #[error("Table {0} has no columns")]
    NoColumns(String),

    #[error("Duplicate column {column} in table {table}")]
    DuplicateColumn { table: String, column: String },

    #[error("Column {column} is classified but not declared in table {table}")]
    UndeclaredColumn { table: String, column: String },

    #[error("Column {column} in table {table} is both an attribute and a measure")]
    Overlap { table: String, column: String },

    #[error("Column {column} in table {table} is identifier-like and cannot be a measure")]
    IdentifierMeasure { table: String, column: String },

    #[error("Duplicate table: {0}")]
    DuplicateTable(String),
}

/// Lower-case a column name and replace spaces with underscores
pub fn normalize_column(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// One loaded dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<String>,
    pub attributes: Vec<String>,
    pub measures: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unique_values: BTreeMap<String, Vec<String>>,
}

impl TableSchema {
    /// Build a table schema, normalizing names and checking the classification
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        attributes: Vec<String>,
        measures: Vec<String>,
        unique_values: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, SchemaError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(SchemaError::EmptyName);
        }

        let columns: Vec<String> = columns.iter().map(|c| normalize_column(c)).collect();
        if columns.is_empty() {
            return Err(SchemaError::NoColumns(name));
        }

        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(SchemaError::DuplicateColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }

        let attributes: Vec<String> = attributes.iter().map(|c| normalize_column(c)).collect();
        let measures: Vec<String> = measures.iter().map(|c| normalize_column(c)).collect();

        for column in attributes.iter().chain(&measures) {
            if !seen.contains(column.as_str()) {
                return Err(SchemaError::UndeclaredColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }
        if let Some(column) = measures.iter().find(|m| is_identifier(m)) {
            return Err(SchemaError::IdentifierMeasure {
                table: name,
                column: column.clone(),
            });
        }
        if let Some(column) = attributes.iter().find(|a| measures.contains(a)) {
            return Err(SchemaError::Overlap {
                table: name,
                column: column.clone(),
            });
        }

        let unique_values = unique_values
            .into_iter()
            .map(|(k, v)| (normalize_column(&k), v))
            .collect();

        Ok(Self {
            name,
            columns,
            attributes,
            measures,
            unique_values,
        })
    }

    /// Classify columns from sample rows
    ///
    /// A column is a measure when every non-null sample is numeric and its name
    /// does not end in `id`. Everything else is an attribute, and the distinct
    /// textual sample values of attributes are recorded.
    pub fn infer(name: impl Into<String>, rows: &[Map<String, Value>]) -> Result<Self, SchemaError> {
        let mut columns: Vec<String> = Vec::new();
        for row in rows {
            for key in row.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut attributes = Vec::new();
        let mut measures = Vec::new();
        let mut unique_values = BTreeMap::new();

        for raw in &columns {
            let column = normalize_column(raw);
            let samples: Vec<&Value> = rows
                .iter()
                .filter_map(|row| row.get(raw))
                .filter(|v| !v.is_null())
                .collect();

            let numeric = !samples.is_empty() && samples.iter().all(|v| is_numeric(v));
            if numeric && !is_identifier(&column) {
                measures.push(column);
                continue;
            }

            // JSON numbers keep comparing as numbers, so only textual values are recorded.
            let mut distinct: Vec<String> = Vec::new();
            for value in samples {
                let text = match value {
                    Value::Number(_) => continue,
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !distinct.contains(&text) {
                    distinct.push(text);
                }
            }
            if !distinct.is_empty() {
                unique_values.insert(column.clone(), distinct);
            }
            attributes.push(column);
        }

        Self::new(name, columns, attributes, measures, unique_values)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// Names ending in `id` are identifiers, never aggregated
fn is_identifier(column: &str) -> bool {
    column.ends_with("id")
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}

/// All loaded tables, in load order. Replaced wholesale on reload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<TableSchema>,
}

impl SchemaSnapshot {
    pub fn new(tables: Vec<TableSchema>) -> Result<Self, SchemaError> {
        let mut names = BTreeSet::new();
        for table in &tables {
            if !names.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
        }
        Ok(Self { tables })
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// View over the named tables, in the order given
    pub fn view<T: AsRef<str>>(&self, loaded: &[T]) -> Result<SchemaView<'_>, TranslateError> {
        let tables = loaded
            .iter()
            .map(|name| {
                self.table(name.as_ref())
                    .ok_or_else(|| TranslateError::UnknownTable(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SchemaView { tables })
    }
}

/// The tables one translation call may read
#[derive(Debug, Clone)]
pub struct SchemaView<'a> {
    tables: Vec<&'a TableSchema>,
}

impl<'a> SchemaView<'a> {
    pub fn tables(&self) -> &[&'a TableSchema] {
        &self.tables
    }

    /// Union of column names, first occurrence wins
    pub fn columns(&self) -> Vec<String> {
        union(self.tables.iter().map(|t| &t.columns))
    }

    pub fn attributes(&self) -> Vec<String> {
        union(self.tables.iter().map(|t| &t.attributes))
    }

    pub fn measures(&self) -> Vec<String> {
        union(self.tables.iter().map(|t| &t.measures))
    }

    /// Observed literals for an attribute, from the first table that records any
    pub fn unique_values(&self, column: &str) -> Option<&'a [String]> {
        self.tables
            .iter()
            .find_map(|t| t.unique_values.get(column))
            .map(|v| v.as_slice())
    }
}

fn union<'a>(lists: impl Iterator<Item = &'a Vec<String>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for list in lists {
        for item in list {
            if !out.contains(item) {
                out.push(item.clone());
            }
        }
    }
    out
}

/// Decides where a query reads from, given the columns it references
pub trait SourcePlanner {
    fn plan(&self, referenced: &[String], view: &SchemaView<'_>) -> Result<Source, TranslateError>;
}
