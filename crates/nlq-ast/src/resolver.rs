//! Phrase-to-column resolution strategies

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maps a phrase fragment to the known columns it mentions
pub trait ColumnResolver: Send + Sync {
    /// Matching candidates, in candidate order. An empty result is not an error.
    fn resolve(&self, fragment: &str, candidates: &[String]) -> Vec<String>;
}

/// Matches a column when its name, or the name with underscores read as
/// spaces, occurs anywhere in the fragment
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringResolver;

impl ColumnResolver for SubstringResolver {
    fn resolve(&self, fragment: &str, candidates: &[String]) -> Vec<String> {
        let fragment = fragment.to_lowercase();
        candidates
            .iter()
            .filter(|c| fragment.contains(c.as_str()) || fragment.contains(&c.replace('_', " ")))
            .cloned()
            .collect()
    }
}

/// Matches whole words only: `amount` is found in "the amount" but not in
/// "amounts" or "total_amount"
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenResolver;

impl ColumnResolver for TokenResolver {
    fn resolve(&self, fragment: &str, candidates: &[String]) -> Vec<String> {
        let fragment = fragment.to_lowercase();
        let words: Vec<&str> = fragment
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();

        candidates
            .iter()
            .filter(|c| {
                let parts: Vec<&str> = c.split('_').filter(|p| !p.is_empty()).collect();
                words.iter().any(|w| *w == c.as_str())
                    || (!parts.is_empty() && words.windows(parts.len()).any(|win| win == parts.as_slice()))
            })
            .cloned()
            .collect()
    }
}

/// Configurable choice of resolver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    #[default]
    Substring,
    Token,
}

impl ResolverKind {
    pub fn resolver(&self) -> &'static dyn ColumnResolver {
        match self {
            ResolverKind::Substring => &SubstringResolver,
            ResolverKind::Token => &TokenResolver,
        }
    }
}

impl FromStr for ResolverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(ResolverKind::Substring),
            "token" | "word" => Ok(ResolverKind::Token),
            other => Err(format!("unknown resolver: {}", other)),
        }
    }
}
