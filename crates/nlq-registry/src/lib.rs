//! Aggregate vocabulary: sentence triggers, predicate keywords and back-end names

use nlq_ir::AggFunc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Aggregate not registered: {0:?}")]
    NotRegistered(AggFunc),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateSignature {
    pub func: AggFunc,
    /// Phrases that open an aggregate template ("total of all", "sum")
    pub triggers: Vec<String>,
    /// Words that mark an aggregate inside a filter clause
    pub keywords: Vec<String>,
    /// Relational function name, also the capitalized alias prefix
    pub sql_name: String,
    /// Pipeline `$group` accumulator
    pub accumulator: String,
}

pub struct AggregateRegistry {
    signatures: Vec<AggregateSignature>,
    version: String,
}

impl AggregateRegistry {
    pub fn new(version: impl Into<String>) -> Self {
        let mut registry = Self {
            signatures: Vec::new(),
            version: version.into(),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        self.register(signature(
            AggFunc::Sum,
            &["total", "sum of", "sum", "sum of all", "total of all"],
            &["sum", "total"],
            "Sum",
            "$sum",
        ));
        self.register(signature(
            AggFunc::Avg,
            &["average of", "avg of", "mean of", "average", "avg", "mean"],
            &["average", "avg", "mean"],
            "Avg",
            "$avg",
        ));
        self.register(signature(
            AggFunc::Min,
            &["min of", "minimum of", "min", "minimum", "lowest", "smallest"],
            &["min", "minimum", "lowest", "smallest"],
            "Min",
            "$min",
        ));
        self.register(signature(
            AggFunc::Max,
            &["max of", "maximum of", "max", "maximum", "largest", "biggest"],
            &["max", "maximum", "biggest", "largest"],
            "Max",
            "$max",
        ));
        // Counting is recognized by the template only, never inside a filter.
        self.register(signature(AggFunc::Count, &["count", "number"], &[], "Count", "$sum"));
    }

    /// Register a signature, replacing any earlier one for the same function
    pub fn register(&mut self, mut sig: AggregateSignature) {
        // Longest phrase first, so regex alternation prefers "sum of all" over "sum".
        sig.triggers.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        sig.keywords.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self.signatures.retain(|s| s.func != sig.func);
        self.signatures.push(sig);
    }

    pub fn lookup(&self, func: AggFunc) -> Result<&AggregateSignature, RegistryError> {
        self.signatures
            .iter()
            .find(|s| s.func == func)
            .ok_or(RegistryError::NotRegistered(func))
    }

    /// Function named by a filter-clause keyword
    pub fn keyword(&self, word: &str) -> Option<AggFunc> {
        let word = word.to_lowercase();
        self.signatures
            .iter()
            .find(|s| s.keywords.iter().any(|k| *k == word))
            .map(|s| s.func)
    }

    /// Every filter-clause keyword, longest first
    pub fn keywords(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self
            .signatures
            .iter()
            .flat_map(|s| s.keywords.iter().map(String::as_str))
            .collect();
        all.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        all
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl Default for AggregateRegistry {
    fn default() -> Self {
        Self::new("0.1.0")
    }
}

fn signature(
    func: AggFunc,
    triggers: &[&str],
    keywords: &[&str],
    sql_name: &str,
    accumulator: &str,
) -> AggregateSignature {
    AggregateSignature {
        func,
        triggers: triggers.iter().map(|s| s.to_string()).collect(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        sql_name: sql_name.to_string(),
        accumulator: accumulator.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = AggregateRegistry::default();

        let sig = registry.lookup(AggFunc::Avg).unwrap();
        assert_eq!(sig.sql_name, "Avg");
        assert_eq!(sig.accumulator, "$avg");
    }

    #[test]
    fn test_triggers_longest_first() {
        let registry = AggregateRegistry::default();

        let sig = registry.lookup(AggFunc::Sum).unwrap();
        assert_eq!(sig.triggers[0], "total of all");
        assert_eq!(sig.triggers.last().map(String::as_str), Some("sum"));
    }

    #[test]
    fn test_keyword_lookup() {
        let registry = AggregateRegistry::default();

        assert_eq!(registry.keyword("Mean"), Some(AggFunc::Avg));
        assert_eq!(registry.keyword("lowest"), Some(AggFunc::Min));
        assert_eq!(registry.keyword("count"), None);
        assert_eq!(registry.keywords()[0], "smallest");
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AggregateRegistry::default();
        registry.register(signature(AggFunc::Count, &["how many"], &[], "Count", "$sum"));

        let sig = registry.lookup(AggFunc::Count).unwrap();
        assert_eq!(sig.triggers, vec!["how many"]);
    }
}
