//! Filter clause extraction
//!
//! The clause after where/when/whose/with/having is split on column names
//! and the conjunctions "and"/"but" (a later "where" or "having" also
//! separates conditions). Walking the pieces left to right, a
//! column name sets the current target, an aggregate keyword right before a
//! column turns that target into an aggregate, and any other piece is a
//! comparison against the current target.

use chrono::NaiveDate;
use nlq_ir::{AggFunc, CompareOp, Literal, Predicate, SchemaView, Target};
use regex::Regex;
use std::sync::LazyLock;

use crate::parser::{alternation, REGISTRY};

static CLAUSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:where|when|whose|with|having)\s+(.+?)\s*(?:$|\b(?:(?:order|ordered|sort|sorted|arranged|arrange)\s+by|sorted|arranged|arrange)\b|\b(?:limit\s+to|limited\s+to|limit|skip|offset)\s+\d)",
    )
    .expect("filter clause pattern")
});

static BETWEEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bbetween\b").expect("between pattern"));

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+(.+)$").expect("range pattern")
});

static SYMBOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(<=|>=|!=|<>|==|=|<|>)\s*(.*)$").expect("symbol pattern"));

static AGGREGATE_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation(&REGISTRY.keywords())))
        .expect("aggregate keyword pattern")
});

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(?:\.\d+)?$").expect("number pattern"));

/// Comparison phrases, checked in order so that "less than or equal to"
/// is seen before "less than" and "not equal to" before "equal to"
static OPERATORS: LazyLock<Vec<(CompareOp, Regex)>> = LazyLock::new(|| {
    [
        (
            CompareOp::Le,
            r"\b(?:is\s+)?(?:less|lesser|below|lower|smaller)\s+than\s+or\s+equal\s+to\b|\b(?:is\s+)?at\s+most\b",
        ),
        (
            CompareOp::Ge,
            r"\b(?:is\s+)?(?:greater|more|above|higher|larger|bigger)\s+than\s+or\s+equal\s+to\b|\b(?:is\s+)?at\s+least\b",
        ),
        (CompareOp::Lt, r"\b(?:is\s+)?(?:less|lesser|below|lower|smaller)\s+than\b"),
        (CompareOp::Gt, r"\b(?:is\s+)?(?:greater|more|above|higher|larger|bigger)\s+than\b"),
        (
            CompareOp::Ne,
            r"\b(?:is\s+)?(?:not\s+equal\s+to|not\s+equals|different\s+from|not\s+the\s+same\s+as)\b",
        ),
        (
            CompareOp::Eq,
            r"\b(?:is\s+)?(?:equal\s+to|equals|same\s+as|exactly)\b|\bis\b",
        ),
    ]
    .into_iter()
    .map(|(op, pattern)| (op, Regex::new(&format!("(?i){}", pattern)).expect("operator pattern")))
    .collect()
});

const CONJUNCTIONS: &[&str] = &["and", "but", "where", "having"];

#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Column(String),
    Conjunction,
    Text(String),
}

/// Trailing filter clause of a sentence, if any
pub(crate) fn clause(sentence: &str) -> Option<String> {
    CLAUSE
        .captures(sentence)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Row and aggregate predicates, in sentence order
pub(crate) fn extract(sentence: &str, view: &SchemaView<'_>) -> Vec<Predicate> {
    let Some(clause) = clause(sentence) else {
        return Vec::new();
    };

    let columns = view.columns();
    let pieces = match split(&clause, &columns) {
        Some(pieces) => merge_ranges(pieces),
        None => return Vec::new(),
    };

    let mut predicates = Vec::new();
    let mut current: Option<Target> = None;
    let mut pending: Option<AggFunc> = None;

    for (i, piece) in pieces.iter().enumerate() {
        match piece {
            Piece::Conjunction => {}
            Piece::Column(column) => {
                current = Some(match pending.take() {
                    Some(func) => Target::aggregate(func, column.as_str()),
                    None => Target::column(column.as_str()),
                });
            }
            Piece::Text(text) => {
                let before_column = matches!(pieces.get(i + 1), Some(Piece::Column(_)));
                if before_column {
                    if let Some(func) = aggregate_keyword(text) {
                        pending = Some(func);
                        continue;
                    }
                }

                let Some(target) = current.clone() else {
                    tracing::debug!(piece = %text, "filter text before any column ignored");
                    continue;
                };

                match condition(text, target, view) {
                    Some(predicate) => predicates.push(predicate),
                    None => tracing::warn!(piece = %text, "unreadable filter condition dropped"),
                }
            }
        }
    }

    predicates
}

/// Split the clause at column names and conjunctions, keeping both
fn split(clause: &str, columns: &[String]) -> Option<Vec<Piece>> {
    let mut words: Vec<String> = columns
        .iter()
        .flat_map(|c| [c.clone(), c.replace('_', " ")])
        .collect();
    words.extend(CONJUNCTIONS.iter().map(|w| w.to_string()));
    words.dedup();

    let splitter = match Regex::new(&format!(r"\b(?:{})\b", alternation(&words))) {
        Ok(re) => re,
        Err(e) => {
            tracing::warn!(error = %e, "filter clause splitter failed to compile");
            return None;
        }
    };

    let mut pieces = Vec::new();
    let mut last = 0;
    for m in splitter.find_iter(clause) {
        push_text(&mut pieces, &clause[last..m.start()]);
        let word = m.as_str().split_whitespace().collect::<Vec<_>>().join("_");
        if CONJUNCTIONS.contains(&word.as_str()) {
            pieces.push(Piece::Conjunction);
        } else {
            pieces.push(Piece::Column(word));
        }
        last = m.end();
    }
    push_text(&mut pieces, &clause[last..]);

    Some(pieces)
}

fn push_text(pieces: &mut Vec<Piece>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        pieces.push(Piece::Text(text.to_string()));
    }
}

/// Join "between X" + "and" + "Y" back into one piece
fn merge_ranges(mut pieces: Vec<Piece>) -> Vec<Piece> {
    let mut i = 0;
    while i < pieces.len() {
        let range = match (&pieces[i], pieces.get(i + 1), pieces.get(i + 2)) {
            (Piece::Text(low), Some(Piece::Conjunction), Some(Piece::Text(high)))
                if BETWEEN.is_match(low) =>
            {
                let start = BETWEEN.find(low).map(|m| m.start()).unwrap_or(0);
                Some(format!("{} and {}", &low[start..], high))
            }
            _ => None,
        };
        if let Some(text) = range {
            pieces[i] = Piece::Text(text);
            pieces.remove(i + 1);
            pieces.remove(i + 1);
        }
        i += 1;
    }
    pieces
}

fn aggregate_keyword(text: &str) -> Option<AggFunc> {
    AGGREGATE_WORD
        .find(text)
        .and_then(|m| REGISTRY.keyword(m.as_str()))
}

fn condition(text: &str, target: Target, view: &SchemaView<'_>) -> Option<Predicate> {
    if BETWEEN.is_match(text) {
        let caps = RANGE.captures(text)?;
        let low = literal(caps.get(1)?.as_str(), &target, view)?;
        let high = literal(caps.get(2)?.as_str(), &target, view)?;
        return Some(Predicate::between(target, low, high));
    }

    let (op, value) = operator(text);
    let value = literal(value, &target, view)?;
    Some(Predicate::compare(target, op, value))
}

/// Comparison operator and the value text that follows it
///
/// Text without a recognizable operator compares for equality.
fn operator(text: &str) -> (CompareOp, &str) {
    if let Some(caps) = SYMBOL.captures(text) {
        let op = match caps.get(1).map(|m| m.as_str()) {
            Some("<=") => CompareOp::Le,
            Some(">=") => CompareOp::Ge,
            Some("!=") | Some("<>") => CompareOp::Ne,
            Some("<") => CompareOp::Lt,
            Some(">") => CompareOp::Gt,
            _ => CompareOp::Eq,
        };
        let value = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        return (op, value);
    }

    for (op, regex) in OPERATORS.iter() {
        if let Some(m) = regex.find(text) {
            return (*op, text[m.end()..].trim_start());
        }
    }

    (CompareOp::Eq, text)
}

/// Type a raw value
///
/// Dates become date literals and numbers become numeric literals, unless the
/// attribute has been observed holding that exact text, in which case it
/// stays a string.
fn literal(raw: &str, target: &Target, view: &SchemaView<'_>) -> Option<Literal> {
    let value = raw
        .trim()
        .trim_end_matches(['?', '!', ';', ','])
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim();
    if value.is_empty() {
        return None;
    }

    if DATE.is_match(value) {
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Some(Literal::Date(date));
        }
    }

    if NUMBER.is_match(value) {
        let observed_as_text = match target {
            Target::Column { name } => view
                .unique_values(name)
                .is_some_and(|values| values.iter().any(|v| v == value)),
            Target::Aggregate { .. } => false,
        };
        if !observed_as_text {
            if let Ok(i) = value.parse::<i64>() {
                return Some(Literal::Int(i));
            }
            if let Ok(x) = value.parse::<f64>() {
                return Some(Literal::Float(x));
            }
        }
    }

    Some(Literal::String(value.to_string()))
}
