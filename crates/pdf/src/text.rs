//! # Page Text
//!
//! Pulls the text layer out of a PDF with the `pdf` crate, one string per page.

use aichart::ExtractError;
use pdf::{
    content::{Op, TextDrawAdjusted},
    file::FileOptions,
};

/// Kerning adjustments below this (in thousandths of an em) are read as a word gap.
const WORD_GAP: f32 = -200.0;

/// Extracts the text of every page synchronously, in page order.
pub fn extract_page_texts(pdf_data: &[u8]) -> Result<Vec<String>, ExtractError> {
    let file = FileOptions::cached()
        .load(pdf_data)
        .map_err(|e| ExtractError::PdfParse(e.to_string()))?;
    let resolver = file.resolver();
    let mut pages = Vec::with_capacity(file.num_pages() as usize);

    for page_num in 0..file.num_pages() {
        let page = file
            .get_page(page_num)
            .map_err(|e| ExtractError::PdfParse(e.to_string()))?;
        let mut page_text = String::new();
        if let Some(content) = &page.contents {
            let operations = content
                .operations(&resolver)
                .map_err(|e| ExtractError::PdfParse(e.to_string()))?;
            for op in operations.iter() {
                match op {
                    Op::TextDraw { text } => page_text.push_str(&text.to_string_lossy()),
                    Op::TextDrawAdjusted { array } => {
                        for part in array {
                            match part {
                                TextDrawAdjusted::Text(text) => {
                                    page_text.push_str(&text.to_string_lossy())
                                }
                                TextDrawAdjusted::Spacing(gap) if *gap < WORD_GAP => {
                                    page_text.push(' ')
                                }
                                TextDrawAdjusted::Spacing(_) => {}
                            }
                        }
                    }
                    Op::TextNewline | Op::EndText => page_text.push('\n'),
                    _ => {}
                }
            }
        }
        pages.push(page_text.trim().to_string());
    }
    Ok(pages)
}

/// Joins page texts with `--- Page N ---` markers so the model can tell pages apart.
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .map(|(i, text)| format!("--- Page {} ---\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_are_marked_in_order() {
        let joined = join_pages(&["WBC 5.2".to_string(), "ALT 31".to_string()]);
        assert_eq!(joined, "--- Page 1 ---\nWBC 5.2\n\n--- Page 2 ---\nALT 31");
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let err = extract_page_texts(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, ExtractError::PdfParse(_)));
    }
}
