//! # Page Merge
//!
//! Combines per-page records of one document into a single record.
//!
//! The first page supplies the record's type, category, date and summary.
//! Items are concatenated in page order and deduplicated by `key`: a later
//! duplicate replaces the earlier item only when it carries a value, and the
//! surviving item stays where the key first appeared. Two genuinely different
//! measurements that share a key on different pages therefore collapse into
//! one.

use aichart::{ExtractError, MetricItem, RecordData};
use std::collections::HashMap;

pub fn merge_page_records(pages: Vec<RecordData>) -> Result<RecordData, ExtractError> {
    let mut pages = pages.into_iter();
    let RecordData {
        record_type,
        title,
        category,
        date,
        summary,
        items: first_items,
    } = pages
        .next()
        .ok_or_else(|| ExtractError::Merge("no page produced a result".to_string()))?;

    let mut title = title.filter(|t| !t.trim().is_empty());
    let mut items: Vec<MetricItem> = Vec::with_capacity(first_items.len());
    let mut slots: HashMap<String, usize> = HashMap::new();

    let mut absorb = |page_items: Vec<MetricItem>| {
        for item in page_items {
            match slots.get(&item.key) {
                Some(&slot) => {
                    if item.value.is_some() {
                        items[slot] = item;
                    }
                }
                None => {
                    slots.insert(item.key.clone(), items.len());
                    items.push(item);
                }
            }
        }
    };

    absorb(first_items);
    for page in pages {
        if title.is_none() {
            title = page.title.filter(|t| !t.trim().is_empty());
        }
        absorb(page.items);
    }

    Ok(RecordData {
        record_type,
        title,
        category,
        date,
        summary,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aichart::Domain;

    fn item(key: &str, value: Option<f64>) -> MetricItem {
        MetricItem {
            key: key.to_string(),
            name: key.to_uppercase(),
            value,
            unit: None,
            status: "normal".to_string(),
            reference: None,
            notes: None,
            display_order: None,
            category_tag: None,
            parent_key: None,
        }
    }

    fn page(title: Option<&str>, date: &str, items: Vec<MetricItem>) -> RecordData {
        RecordData {
            record_type: Domain::Health,
            title: title.map(str::to_string),
            category: "blood_test".to_string(),
            date: date.to_string(),
            summary: None,
            items,
        }
    }

    fn keys(record: &RecordData) -> Vec<&str> {
        record.items.iter().map(|i| i.key.as_str()).collect()
    }

    #[test]
    fn test_items_follow_page_order() {
        let merged = merge_page_records(vec![
            page(None, "2024-01-01", vec![item("a1", Some(1.0)), item("b1", Some(1.0))]),
            page(None, "2024-01-02", vec![item("a2", Some(2.0)), item("b2", Some(2.0))]),
            page(None, "2024-01-03", vec![item("a3", Some(3.0)), item("b3", Some(3.0))]),
        ])
        .unwrap();
        assert_eq!(keys(&merged), vec!["a1", "b1", "a2", "b2", "a3", "b3"]);
        assert_eq!(merged.date, "2024-01-01");
    }

    #[test]
    fn test_valued_duplicate_wins_in_either_order() {
        let valued_last = merge_page_records(vec![
            page(None, "2024-01-01", vec![item("wbc", None), item("rbc", Some(4.5))]),
            page(None, "2024-01-01", vec![item("wbc", Some(5.2))]),
        ])
        .unwrap();
        let valued_first = merge_page_records(vec![
            page(None, "2024-01-01", vec![item("wbc", Some(5.2)), item("rbc", Some(4.5))]),
            page(None, "2024-01-01", vec![item("wbc", None)]),
        ])
        .unwrap();

        for merged in [valued_last, valued_first] {
            assert_eq!(keys(&merged), vec!["wbc", "rbc"]);
            assert_eq!(merged.items[0].value, Some(5.2));
        }
    }

    #[test]
    fn test_title_is_first_non_empty() {
        let merged = merge_page_records(vec![
            page(Some("  "), "2024-01-01", vec![]),
            page(Some("Lipid Panel"), "2024-01-01", vec![]),
            page(Some("Page 3"), "2024-01-01", vec![]),
        ])
        .unwrap();
        assert_eq!(merged.title.as_deref(), Some("Lipid Panel"));
    }

    #[test]
    fn test_no_pages_is_a_merge_error() {
        let err = merge_page_records(Vec::new()).unwrap_err();
        assert_eq!(err.kind(), aichart::ErrorKind::Merge);
    }
}
