//! Relevance items: the (query, document) records that get judged and scored.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Binary relevance label. Serialized as the integers `0` and `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RelevanceFlag {
    #[default]
    NotRelevant,
    Relevant,
}

impl RelevanceFlag {
    /// Label assigned when a judgment cannot be parsed.
    pub const FALLBACK: RelevanceFlag = RelevanceFlag::NotRelevant;

    pub fn is_relevant(self) -> bool {
        self == RelevanceFlag::Relevant
    }
}

impl TryFrom<u8> for RelevanceFlag {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(RelevanceFlag::NotRelevant),
            1 => Ok(RelevanceFlag::Relevant),
            other => Err(format!("relevance must be 0 or 1, got {}", other)),
        }
    }
}

impl From<RelevanceFlag> for u8 {
    fn from(flag: RelevanceFlag) -> u8 {
        match flag {
            RelevanceFlag::NotRelevant => 0,
            RelevanceFlag::Relevant => 1,
        }
    }
}

impl From<RelevanceFlag> for u32 {
    fn from(flag: RelevanceFlag) -> u32 {
        u8::from(flag) as u32
    }
}

/// Opaque query identifier: whatever JSON value the dataset used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qid(pub Value);

impl Qid {
    pub fn new(value: impl Into<Value>) -> Self {
        Qid(value.into())
    }
}

impl fmt::Display for Qid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

const QID: &str = "qid";
const QUERY: &str = "query";
const DOCUMENT: &str = "document";
const DOCUMENT_MISSPELLED: &str = "docuement";
const RELEVANCE: &str = "relevance";

/// One (query, document) pair, optionally carrying its relevance label.
///
/// The caller's JSON object is kept as-is: keys, their order and their
/// spelling (`document` or `docuement`) are written back unchanged, and
/// labeling only sets `relevance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct RelevanceItem {
    fields: Map<String, Value>,
}

impl TryFrom<Map<String, Value>> for RelevanceItem {
    type Error = String;

    fn try_from(fields: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        if !matches!(fields.get(QUERY), Some(Value::String(_))) {
            return Err("item needs a string \"query\"".to_string());
        }
        let document = fields.get(DOCUMENT).or_else(|| fields.get(DOCUMENT_MISSPELLED));
        if !matches!(document, Some(Value::String(_))) {
            return Err("item needs a string \"document\" (or \"docuement\")".to_string());
        }
        if let Some(value) = fields.get(RELEVANCE) {
            flag_from_value(value)
                .ok_or_else(|| format!("relevance must be 0 or 1, got {}", value))?;
        }
        Ok(Self { fields })
    }
}

impl From<RelevanceItem> for Map<String, Value> {
    fn from(item: RelevanceItem) -> Self {
        item.fields
    }
}

fn flag_from_value(value: &Value) -> Option<RelevanceFlag> {
    value
        .as_u64()
        .and_then(|n| u8::try_from(n).ok())
        .and_then(|n| RelevanceFlag::try_from(n).ok())
}

fn str_field<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields.get(key).and_then(Value::as_str)
}

impl RelevanceItem {
    pub fn new(qid: Option<Qid>, query: impl Into<String>, document: impl Into<String>) -> Self {
        let mut fields = Map::new();
        if let Some(qid) = qid {
            fields.insert(QID.to_string(), qid.0);
        }
        fields.insert(QUERY.to_string(), Value::String(query.into()));
        fields.insert(DOCUMENT.to_string(), Value::String(document.into()));
        Self { fields }
    }

    pub fn qid(&self) -> Option<Qid> {
        self.fields.get(QID).cloned().map(Qid)
    }

    pub fn query(&self) -> &str {
        str_field(&self.fields, QUERY).unwrap_or_default()
    }

    pub fn document(&self) -> &str {
        str_field(&self.fields, DOCUMENT)
            .or_else(|| str_field(&self.fields, DOCUMENT_MISSPELLED))
            .unwrap_or_default()
    }

    pub fn relevance(&self) -> Option<RelevanceFlag> {
        self.fields.get(RELEVANCE).and_then(flag_from_value)
    }

    /// The item's JSON object, in input order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Copy of this item with `relevance` set: an existing key is overwritten
    /// in place, otherwise it is appended. The original is left untouched.
    pub fn with_relevance(&self, flag: RelevanceFlag) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(RELEVANCE.to_string(), Value::from(u8::from(flag)));
        Self { fields }
    }

    /// Label used in log lines: the qid if present, otherwise `-`.
    pub fn trace_id(&self) -> String {
        self.qid()
            .map(|q| q.to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_misspelled_document_key() {
        let item: RelevanceItem = serde_json::from_value(json!({
            "qid": 7,
            "query": "rust ownership",
            "docuement": "Ownership rules in Rust..."
        }))
        .unwrap();
        assert_eq!(item.qid(), Some(Qid::new(7)));
        assert_eq!(item.document(), "Ownership rules in Rust...");
        assert_eq!(item.relevance(), None);
    }

    #[test]
    fn labeling_keeps_caller_keys_and_order() {
        let item: RelevanceItem =
            serde_json::from_str(r#"{"query":"a","docuement":"b","qid":1,"rank":3}"#).unwrap();
        let labeled = item.with_relevance(RelevanceFlag::Relevant);
        assert_eq!(
            serde_json::to_string(&labeled).unwrap(),
            r#"{"query":"a","docuement":"b","qid":1,"rank":3,"relevance":1}"#
        );
    }

    #[test]
    fn relabeling_overwrites_relevance_in_place() {
        let item: RelevanceItem =
            serde_json::from_str(r#"{"relevance":0,"query":"a","document":"b"}"#).unwrap();
        let labeled = item.with_relevance(RelevanceFlag::Relevant);
        assert_eq!(
            serde_json::to_string(&labeled).unwrap(),
            r#"{"relevance":1,"query":"a","document":"b"}"#
        );
    }

    #[test]
    fn qid_accepts_any_json_value() {
        for raw in [
            r#"{"qid":1.5,"query":"a","document":"b"}"#,
            r#"{"qid":true,"query":"a","document":"b"}"#,
            r#"{"qid":18446744073709551615,"query":"a","document":"b"}"#,
            r#"{"qid":["x",2],"query":"a","document":"b"}"#,
        ] {
            let item: RelevanceItem = serde_json::from_str(raw).unwrap();
            assert!(item.qid().is_some(), "qid lost for {}", raw);
        }
        let item: RelevanceItem =
            serde_json::from_str(r#"{"qid":1.5,"query":"a","document":"b"}"#).unwrap();
        assert_eq!(item.trace_id(), "1.5");
        assert_eq!(Qid::new("q-7").to_string(), "q-7");
    }

    #[test]
    fn rejects_missing_text_and_bad_relevance() {
        assert!(serde_json::from_value::<RelevanceItem>(json!({"document": "b"})).is_err());
        assert!(serde_json::from_value::<RelevanceItem>(json!({"query": "a"})).is_err());
        assert!(serde_json::from_value::<RelevanceItem>(json!({
            "query": "a", "document": "b", "relevance": 2
        }))
        .is_err());
    }

    #[test]
    fn with_relevance_does_not_mutate_original() {
        let item = RelevanceItem::new(None, "q", "d");
        let labeled = item.with_relevance(RelevanceFlag::Relevant);
        assert_eq!(item.relevance(), None);
        assert_eq!(labeled.relevance(), Some(RelevanceFlag::Relevant));
        assert_eq!(labeled.trace_id(), "-");
    }

    #[test]
    fn fallback_is_not_relevant() {
        assert_eq!(RelevanceFlag::FALLBACK, RelevanceFlag::NotRelevant);
        assert!(!RelevanceFlag::FALLBACK.is_relevant());
    }
}
