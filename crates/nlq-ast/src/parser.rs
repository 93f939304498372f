//! Ordered template catalogue
//!
//! Templates are tried in priority order and the first match wins: grouped
//! aggregates, then top/bottom-N, then ungrouped aggregates, then counting,
//! then plain select.

use nlq_ir::{AggFunc, TranslateError};
use nlq_registry::AggregateRegistry;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::ast::*;

pub(crate) static REGISTRY: LazyLock<AggregateRegistry> = LazyLock::new(AggregateRegistry::default);

const LEAD_VERBS: &[&str] = &["select", "list", "give", "show", "find", "provide"];
const TOP_TRIGGERS: &[&str] = &["top", "first"];
const BOTTOM_TRIGGERS: &[&str] = &["bottom", "last"];
const GROUP_SEPARATORS: &[&str] = &["grouped by", "group by", "by", "for each", "for every", "of each", "per"];
const RANK_SEPARATORS: &[&str] = &["ordered by", "based on", "by"];

/// Keywords that close a captured phrase
const CLAUSE_TAIL: &[&str] = &[
    "where", "when", "with", "whose", "having", "limit", "limited", "sort", "sorted", "ordered",
    "order", "arranged", "skip", "offset",
];

#[derive(Debug, Clone, Copy)]
enum Shape {
    Grouped(AggFunc),
    Ranked(Rank),
    Ungrouped(AggFunc),
    Select,
}

struct Matcher {
    shape: Shape,
    regex: Regex,
}

static CATALOGUE: LazyLock<Vec<Matcher>> = LazyLock::new(|| build_catalogue(&REGISTRY));

static TAIL_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation(CLAUSE_TAIL))).expect("tail keyword pattern")
});

static SORT_VERB_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+(?:sorted|ordered|arranged)$").expect("sort verb pattern"));

/// Regex alternation over phrases, longest first, tolerant of repeated spaces
pub(crate) fn alternation<S: AsRef<str>>(phrases: &[S]) -> String {
    let mut phrases: Vec<&str> = phrases.iter().map(AsRef::as_ref).collect();
    phrases.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    phrases
        .iter()
        .map(|p| {
            p.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn build_catalogue(registry: &AggregateRegistry) -> Vec<Matcher> {
    let lead = format!(r"\b(?:{})\b", alternation(LEAD_VERBS));
    let tail = format!(r"\s*(?:$|\b(?:{})\b)", alternation(CLAUSE_TAIL));
    let group_sep = alternation(GROUP_SEPARATORS);
    let rank_sep = alternation(RANK_SEPARATORS);

    let triggers = |func: AggFunc| {
        registry
            .lookup(func)
            .map(|sig| alternation(&sig.triggers))
            .unwrap_or_default()
    };

    let mut shapes: Vec<(Shape, String)> = Vec::new();

    for func in AggFunc::ALL {
        shapes.push((
            Shape::Grouped(func),
            format!(r"(?i)\b(?:{})\s+(.+?)\s+(?:{group_sep})\s+(.+?){tail}", triggers(func)),
        ));
    }
    for (rank, words) in [(Rank::Top, TOP_TRIGGERS), (Rank::Bottom, BOTTOM_TRIGGERS)] {
        shapes.push((
            Shape::Ranked(rank),
            format!(
                r"(?i){lead}.*?\b(?:{})\s+(.+?)\s+(?:{rank_sep})\s+(.+?){tail}",
                alternation(words)
            ),
        ));
    }
    for func in AggFunc::ALL {
        shapes.push((
            Shape::Ungrouped(func),
            format!(r"(?i){lead}.*?\b(?:{})\s+(.+?){tail}", triggers(func)),
        ));
    }
    shapes.push((Shape::Select, format!(r"(?i){lead}(.+?){tail}")));

    shapes
        .into_iter()
        .filter_map(|(shape, pattern)| match Regex::new(&pattern) {
            Ok(regex) => Some(Matcher { shape, regex }),
            Err(e) => {
                tracing::error!(?shape, error = %e, "template pattern failed to compile");
                None
            }
        })
        .collect()
}

fn capture(caps: &Captures<'_>, index: usize) -> String {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Recognize the sentence's template
pub fn parse(source: &str) -> Result<Sentence, TranslateError> {
    for matcher in CATALOGUE.iter() {
        let Some(caps) = matcher.regex.captures(source) else {
            continue;
        };

        let mut subject = capture(&caps, 1);
        let second = capture(&caps, 2);

        if let Shape::Ranked(_) = matcher.shape {
            // "top 5 products sorted by price": the sort verb belongs to the rank separator
            if let Some(found) = SORT_VERB_SUFFIX.find(&subject) {
                let end = found.start();
                subject.truncate(end);
            }
        }

        // A "by" inside "sorted by" / "ordered by" does not separate a group or rank phrase.
        if matches!(matcher.shape, Shape::Grouped(_) | Shape::Ranked(_))
            && (TAIL_WORD.is_match(&subject) || TAIL_WORD.is_match(&second))
        {
            tracing::trace!(shape = ?matcher.shape, "capture crosses a clause tail, trying next template");
            continue;
        }

        let template = match matcher.shape {
            Shape::Grouped(func) => Template::GroupedAggregate {
                func,
                subject,
                group: second,
            },
            Shape::Ranked(rank) => Template::Ranked {
                rank,
                subject,
                order: second,
            },
            Shape::Ungrouped(func) => Template::Aggregate { func, subject },
            Shape::Select => Template::Select { subject },
        };

        tracing::debug!(pattern = %template.pattern().name(), ?template, "pattern recognized");
        return Ok(Sentence {
            text: source.to_string(),
            template,
        });
    }

    Err(TranslateError::NoPatternRecognized)
}
