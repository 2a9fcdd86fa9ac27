//! # Record Types
//!
//! The structured data produced by an extraction call. The wire format is the
//! camelCase JSON the model is asked to emit, and the same shape is handed to
//! the persistence layer.

use crate::{
    domains::{Domain, DomainProfile},
    errors::ExtractError,
};
use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize};
use regex::Regex;
use serde_json::Value;
use std::{
    collections::{BTreeSet, HashMap},
    sync::LazyLock,
};

/// One extracted measurement or line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricItem {
    pub key: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_position",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
}

/// The result of one extraction: a page, or a whole document after merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    #[serde(rename = "type")]
    pub record_type: Domain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub category: String,
    pub date: String,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub summary: Option<f64>,
    pub items: Vec<MetricItem>,
}

/// A data-quality problem in the `parentKey` tree of a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum HierarchyIssue {
    /// An item references a parent key that no item carries.
    DanglingParent { key: String, parent_key: String },
    /// The listed keys reference each other in a loop (sorted).
    Cycle { keys: Vec<String> },
}

impl RecordData {
    /// Parses the untrusted `date` field.
    ///
    /// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, from which the date part is taken.
    pub fn parsed_date(&self) -> Result<NaiveDate, ExtractError> {
        let raw = self.date.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
            .map_err(|_| ExtractError::InvalidDate(format!("'{raw}' is not an ISO date")))
    }

    /// Checks the record against a domain profile and normalizes metric statuses.
    ///
    /// Statuses are trimmed and lower-cased before the check. The category is
    /// advisory and is not enforced.
    pub fn validate_for(mut self, profile: &DomainProfile) -> Result<Self, ExtractError> {
        if self.record_type != profile.domain {
            return Err(ExtractError::InvalidResponse(format!(
                "record type '{}' does not match the requested domain '{}'",
                self.record_type, profile.domain
            )));
        }

        for (index, item) in self.items.iter_mut().enumerate() {
            item.key = item.key.trim().to_string();
            if item.key.is_empty() {
                return Err(ExtractError::InvalidResponse(format!(
                    "item {index} has an empty key"
                )));
            }
            if item.name.trim().is_empty() {
                return Err(ExtractError::InvalidResponse(format!(
                    "item '{}' has an empty name",
                    item.key
                )));
            }
            let status = item.status.trim().to_ascii_lowercase();
            if !profile.accepts_status(&status) {
                return Err(ExtractError::InvalidResponse(format!(
                    "item '{}' has status '{}', expected one of {:?}",
                    item.key, item.status, profile.statuses
                )));
            }
            item.status = status;
        }

        Ok(self)
    }

    /// Reports dangling parents and cycles in the `parentKey` tree.
    ///
    /// Each cycle is reported once regardless of which member it was reached from.
    pub fn hierarchy_issues(&self) -> Vec<HierarchyIssue> {
        let parents: HashMap<&str, Option<&str>> = self
            .items
            .iter()
            .map(|item| (item.key.as_str(), item.parent_key.as_deref()))
            .collect();

        let mut issues = BTreeSet::new();
        for item in &self.items {
            let Some(parent) = item.parent_key.as_deref() else {
                continue;
            };
            if !parents.contains_key(parent) {
                issues.insert(HierarchyIssue::DanglingParent {
                    key: item.key.clone(),
                    parent_key: parent.to_string(),
                });
                continue;
            }

            let mut path = vec![item.key.as_str()];
            let mut current = item.key.as_str();
            while let Some(&Some(next)) = parents.get(current) {
                if !parents.contains_key(next) {
                    break;
                }
                if let Some(pos) = path.iter().position(|key| *key == next) {
                    let mut keys: Vec<String> = path[pos..].iter().map(|k| k.to_string()).collect();
                    keys.sort();
                    issues.insert(HierarchyIssue::Cycle { keys });
                    break;
                }
                path.push(next);
                current = next;
            }
        }

        issues.into_iter().collect()
    }
}

static THOUSANDS_GROUPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid thousands pattern")
});
static DECIMAL_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?\d+,\d+$").expect("valid decimal comma pattern"));

/// Normalizes a numeric string to the form `f64::from_str` accepts.
///
/// Commas are either thousands separators (`"1,284.50"`) or a single decimal
/// comma (`"5,2"`). Any other use of a comma is rejected.
fn normalize_number(raw: &str) -> Option<String> {
    if !raw.contains(',') {
        return Some(raw.to_string());
    }
    if THOUSANDS_GROUPED.is_match(raw) {
        return Some(raw.replace(',', ""));
    }
    if DECIMAL_COMMA.is_match(raw) {
        return Some(raw.replace(',', "."));
    }
    None
}

/// Accepts a JSON number, a numeric string (`"1,200.50"`, `"5,2"`) or null.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("number {n} is out of range"))),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            normalize_number(trimmed)
                .and_then(|cleaned| cleaned.parse::<f64>().ok())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("expected a number, got \"{s}\"")))
        }
        Some(other) => Err(de::Error::custom(format!(
            "expected a number, got {other}"
        ))),
    }
}

/// Like [`lenient_number`], for a non-negative position.
fn lenient_position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match lenient_number(deserializer)? {
        None => Ok(None),
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => Ok(Some(n as u32)),
        Some(n) => Err(de::Error::custom(format!(
            "expected a non-negative integer position, got {n}"
        ))),
    }
}
