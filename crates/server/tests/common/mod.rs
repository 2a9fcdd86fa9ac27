//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port around an injected
//! application state, so endpoint tests run without live providers.

// Not every test file uses every helper.
#![allow(unused)]

use aichart::ExtractError;
use aichart_pdf::{
    render::{PageRenderer, RenderedPage},
    PdfExtractor,
};
use aichart_server::{config::AppConfig, router::create_router, state::AppState};
use aichart_test_utils::{extractor_with_mock, MockAiProvider};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, Once};
use tokio::{net::TcpListener, task::JoinHandle};

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .with_test_writer()
            .try_init();
    });
}

/// Renders every document into the same fixed pages.
#[derive(Debug, Clone)]
pub struct FixedPages(pub Vec<Vec<u8>>);

#[async_trait]
impl PageRenderer for FixedPages {
    async fn render_pages(
        &self,
        _pdf_data: &[u8],
        _scale: f32,
    ) -> Result<Vec<RenderedPage>, ExtractError> {
        Ok(self
            .0
            .iter()
            .enumerate()
            .map(|(index, png)| RenderedPage {
                index,
                png: png.clone(),
            })
            .collect())
    }
}

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    _server_handle: JoinHandle<()>,
}

impl TestApp {
    /// Spawns the router around `app_state` on a random port.
    pub async fn spawn_with_state(app_state: AppState) -> Result<Self> {
        setup_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = format!("http://{}", listener.local_addr()?);
        let app = create_router(app_state);

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Server error: {e}");
            }
        });

        Ok(Self {
            address,
            client: Client::new(),
            _server_handle: server_handle,
        })
    }

    /// Spawns a server whose providers are all `mock` and whose PDFs render
    /// into `pages`.
    pub async fn spawn_with_mock(
        mock: &MockAiProvider,
        pages: Vec<&[u8]>,
        config: AppConfig,
    ) -> Result<Self> {
        let pdf_extractor = PdfExtractor::new(extractor_with_mock(mock)).with_renderer(Arc::new(
            FixedPages(pages.into_iter().map(<[u8]>::to_vec).collect()),
        ));
        Self::spawn_with_state(AppState::new(config, pdf_extractor)).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}
