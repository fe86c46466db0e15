//! Core data types: name operations and the per-day documents that hold them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One blockchain name-registration event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameOp {
    /// Namespace-prefixed identifier (e.g. `e/alice`, `nft/42`, or a bare key)
    pub name_id: String,
    /// May be empty
    #[serde(default)]
    pub name_value: String,
    /// Epoch milliseconds
    pub blocktime: i64,
    pub txid: String,
    pub address: String,
    pub vout: u32,
    #[serde(rename = "type")]
    pub op_type: String,
}

impl NameOp {
    /// Dedup identity: two ops with the same `(nameId, nameValue)` are the same entity
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.name_id, &self.name_value)
    }
}

/// Aggregate of all deduplicated name operations recorded for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub block_date: NaiveDate,
    pub block_height: u64,
    #[serde(default)]
    pub name_ops: Vec<NameOp>,
}

/// How document ids are derived from a scan's date and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocIdScheme {
    /// `nameops-<date>`: one document per calendar day
    #[default]
    Date,
    /// `nameops-<date>-<height>`: one document per (day, height)
    DateHeight,
}

impl DocIdScheme {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "date" => Some(DocIdScheme::Date),
            "date-height" | "date_height" => Some(DocIdScheme::DateHeight),
            _ => None,
        }
    }

    pub fn doc_id(&self, date: NaiveDate, height: u64) -> DocId {
        let date = date.format("%Y-%m-%d");
        match self {
            DocIdScheme::Date => DocId(format!("nameops-{}", date)),
            DocIdScheme::DateHeight => DocId(format!("nameops-{}-{}", date, height)),
        }
    }
}

/// Deterministic document key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocId(String);

impl DocId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 3).unwrap()
    }

    #[test]
    fn test_doc_id_schemes() {
        assert_eq!(DocIdScheme::Date.doc_id(date(), 170).as_str(), "nameops-2024-11-03");
        assert_eq!(
            DocIdScheme::DateHeight.doc_id(date(), 170).as_str(),
            "nameops-2024-11-03-170"
        );
    }

    #[test]
    fn test_doc_id_scheme_parse() {
        assert_eq!(DocIdScheme::parse("date"), Some(DocIdScheme::Date));
        assert_eq!(DocIdScheme::parse(" Date-Height "), Some(DocIdScheme::DateHeight));
        assert_eq!(DocIdScheme::parse("hourly"), None);
    }

    #[test]
    fn test_name_op_json_field_names() {
        let op = NameOp {
            name_id: "e/alice".to_string(),
            name_value: String::new(),
            blocktime: 1_700_000_000_000,
            txid: "tx1".to_string(),
            address: "addr1".to_string(),
            vout: 2,
            op_type: "name_op".to_string(),
        };

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["nameId"], "e/alice");
        assert_eq!(value["nameValue"], "");
        assert_eq!(value["blocktime"], 1_700_000_000_000i64);
        assert_eq!(value["vout"], 2);
        assert_eq!(value["type"], "name_op");
    }

    #[test]
    fn test_daily_document_layout() {
        let doc = DailyDocument {
            id: "nameops-2024-11-03".to_string(),
            block_date: date(),
            block_height: 99,
            name_ops: Vec::new(),
        };

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], "nameops-2024-11-03");
        assert_eq!(value["blockDate"], "2024-11-03");
        assert_eq!(value["blockHeight"], 99);
        assert!(value["nameOps"].as_array().unwrap().is_empty());
    }
}
