//! # Text Strategy Tests
//!
//! Exercises the text path against PDFs generated with printpdf.

mod common;

use aichart::{Domain, ErrorKind, ExtractOptions};
use aichart_pdf::{
    render::UnavailableRenderer, text, PdfExtractOptions, PdfExtractor, PdfStrategy,
};
use aichart_test_utils::{
    extractor_with_mock,
    helpers::{generate_test_pdf, generate_test_pdf_pages},
    image_key, record_json, MockAiProvider,
};
use anyhow::Result;
use common::{setup_tracing, StaticRenderer};
use std::sync::Arc;

fn text_options() -> PdfExtractOptions {
    PdfExtractOptions::default().with_strategy(PdfStrategy::Text)
}

#[tokio::test]
async fn test_text_strategy_makes_one_call_without_an_image() -> Result<()> {
    setup_tracing();
    // --- 1. Arrange ---
    let mock = MockAiProvider::new();
    mock.add_response(
        "--- Page 1 ---",
        &record_json(Domain::Finance, Some("Statement"), &[("rent", Some(900.0))]),
    );
    let renderer = StaticRenderer::new(vec![b"unused".as_slice()]);
    let pdf = PdfExtractor::new(extractor_with_mock(&mock)).with_renderer(Arc::new(renderer.clone()));
    let document = generate_test_pdf("Rent 900.00")?;

    // --- 2. Act ---
    let record = pdf
        .extract_from_pdf(&document, Domain::Finance, &text_options())
        .await?;

    // --- 3. Assert ---
    assert_eq!(record.title.as_deref(), Some("Statement"));
    assert_eq!(record.items[0].key, "rent");

    let calls = mock.get_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].image.is_none());
    assert!(calls[0]
        .system_prompt
        .starts_with(Domain::Finance.profile().text_prompt));
    assert_eq!(renderer.calls(), 0, "the renderer is not needed for text");
    Ok(())
}

#[tokio::test]
async fn test_every_page_is_marked_in_the_prompt() -> Result<()> {
    // --- 1. Arrange ---
    let mock = MockAiProvider::new();
    mock.add_response(
        "--- Page 3 ---",
        &record_json(Domain::Health, None, &[("ldl", Some(96.0))]),
    );
    let pdf = PdfExtractor::new(extractor_with_mock(&mock)).with_renderer(Arc::new(UnavailableRenderer));
    let document = generate_test_pdf_pages(&["Cholesterol", "HDL 55", "LDL 96"])?;

    // --- 2. Act ---
    pdf.extract_text(&document, Domain::Health, &ExtractOptions::default())
        .await?;

    // --- 3. Assert ---
    let prompt = &mock.get_calls()[0].user_prompt;
    let first = prompt.find("--- Page 1 ---").expect("page 1 marker");
    let second = prompt.find("--- Page 2 ---").expect("page 2 marker");
    let third = prompt.find("--- Page 3 ---").expect("page 3 marker");
    assert!(first < second && second < third);
    Ok(())
}

#[test]
fn test_generated_pages_are_read_in_order() -> Result<()> {
    let document = generate_test_pdf_pages(&["first", "second"])?;

    let pages = text::extract_page_texts(&document)?;

    assert_eq!(pages.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_unreadable_pdf_falls_back_to_vision() -> Result<()> {
    // --- 1. Arrange ---
    let page: &[u8] = b"scanned-page";
    let mock = MockAiProvider::new();
    mock.add_response(
        &image_key(page),
        &record_json(Domain::Health, Some("Scan"), &[("tsh", Some(2.1))]),
    );
    let renderer = StaticRenderer::new(vec![page]);
    let pdf = PdfExtractor::new(extractor_with_mock(&mock)).with_renderer(Arc::new(renderer.clone()));

    // --- 2. Act ---
    let record = pdf
        .extract_from_pdf(b"%PDF-garbage", Domain::Health, &text_options())
        .await?;

    // --- 3. Assert ---
    assert_eq!(record.title.as_deref(), Some("Scan"));
    assert_eq!(renderer.calls(), 1);
    assert!(mock.get_calls().iter().all(|call| call.image.is_some()));
    Ok(())
}

#[tokio::test]
async fn test_unreadable_pdf_on_the_text_path_alone_is_an_extraction_error() {
    let mock = MockAiProvider::new();
    let pdf = PdfExtractor::new(extractor_with_mock(&mock));

    let err = pdf
        .extract_text(b"%PDF-garbage", Domain::Health, &ExtractOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Extraction);
    assert!(mock.get_calls().is_empty());
}
