#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Scripted page renderers for driving the vision path without pdfium.

use aichart::ExtractError;
use aichart_pdf::render::{PageRenderer, RenderedPage};
use async_trait::async_trait;
use dotenvy::dotenv;
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenv().ok();
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Returns the same pages for every document and records the requested scales.
#[derive(Debug, Clone)]
pub struct StaticRenderer {
    pages: Vec<Vec<u8>>,
    pub scales: Arc<Mutex<Vec<f32>>>,
}

impl StaticRenderer {
    pub fn new(pages: Vec<&[u8]>) -> Self {
        Self {
            pages: pages.into_iter().map(<[u8]>::to_vec).collect(),
            scales: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> usize {
        self.scales.lock().unwrap().len()
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render_pages(
        &self,
        _pdf_data: &[u8],
        scale: f32,
    ) -> Result<Vec<RenderedPage>, ExtractError> {
        self.scales.lock().unwrap().push(scale);
        Ok(self
            .pages
            .iter()
            .enumerate()
            .map(|(index, png)| RenderedPage {
                index,
                png: png.clone(),
            })
            .collect())
    }
}
