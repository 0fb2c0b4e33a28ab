//! Parsing a model reply into a relevance flag.
//!
//! Parsing is fallible and reports why; the labeler decides what a failure
//! means (see [`RelevanceFlag::FALLBACK`]).

use crate::eval::RelevanceFlag;
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a reply could not be read as a relevance judgment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("reply is not valid JSON: {0}")]
    Malformed(String),

    #[error("reply is JSON but not an object")]
    NotAnObject,

    #[error("relevance has unusable value {0}")]
    WrongType(String),

    #[error("relevance {0} is neither 0 nor 1")]
    OutOfRange(i64),
}

/// Parse a reply that must be exactly one JSON object (surrounding whitespace allowed).
///
/// A missing `relevance` field reads as 0. Integers, booleans, floats
/// (truncated toward zero) and integer strings are accepted.
pub fn parse_relevance(text: &str) -> Result<RelevanceFlag, ParseError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| ParseError::Malformed(e.to_string()))?;
    relevance_from_value(&value)
}

/// Like [`parse_relevance`], but also finds the object inside a fenced code
/// block or surrounding prose.
pub fn parse_relevance_lenient(text: &str) -> Result<RelevanceFlag, ParseError> {
    match parse_relevance(text) {
        Err(ParseError::Malformed(reason)) => match extract_json_object(text) {
            Some(value) => relevance_from_value(&value),
            None => Err(ParseError::Malformed(reason)),
        },
        other => other,
    }
}

fn relevance_from_value(value: &Value) -> Result<RelevanceFlag, ParseError> {
    let object: &Map<String, Value> = value.as_object().ok_or(ParseError::NotAnObject)?;
    let raw = match object.get("relevance") {
        Some(v) => coerce_int(v)?,
        None => 0,
    };
    match raw {
        0 => Ok(RelevanceFlag::NotRelevant),
        1 => Ok(RelevanceFlag::Relevant),
        other => Err(ParseError::OutOfRange(other)),
    }
}

fn coerce_int(value: &Value) -> Result<i64, ParseError> {
    let wrong = || ParseError::WrongType(value.to_string());
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else {
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Ok(f.trunc() as i64),
                    _ => Err(wrong()),
                }
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| wrong()),
        _ => Err(wrong()),
    }
}

/// Locate a JSON object in free text: a ```json fence, a bare ``` fence, or the
/// outermost `{...}` span.
fn extract_json_object(text: &str) -> Option<Value> {
    let t = text.trim().trim_matches('\u{feff}');

    let mut candidates: Vec<&str> = Vec::new();
    if let Some(start) = t.find("```json") {
        if let Some(end) = t[start + 7..].find("```") {
            candidates.push(&t[start + 7..start + 7 + end]);
        }
    }
    if let Some(start) = t.find("```") {
        if let Some(end) = t[start + 3..].find("```") {
            candidates.push(&t[start + 3..start + 3 + end]);
        }
    }
    if let (Some(i), Some(j)) = (t.find('{'), t.rfind('}')) {
        if i < j {
            candidates.push(&t[i..=j]);
        }
    }

    candidates
        .into_iter()
        .filter_map(|c| serde_json::from_str::<Value>(c.trim()).ok())
        .find(Value::is_object)
}
