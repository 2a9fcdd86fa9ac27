use aichart::{
    errors::{ExtractError, ModelError},
    providers::{
        ai::{AiProvider, GenerationRequest},
        ModelProvider, ProviderKind, ProviderRegistry, ProviderSettings,
    },
    Domain, Extractor, RetryPolicy,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{json, Value};
use std::fmt::{self, Debug};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

// --- Mock AI Provider ---

type Handler = dyn Fn(&GenerationRequest) -> Result<String, ModelError> + Send + Sync;

#[derive(Clone)]
pub struct MockAiProvider {
    responses: Arc<Mutex<Vec<(String, Result<String, String>)>>>,
    handler: Option<Arc<Handler>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockAiProvider {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            handler: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answers every call with `handler` instead of the programmed responses.
    pub fn with_handler(
        handler: impl Fn(&GenerationRequest) -> Result<String, ModelError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    /// Makes every call wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Pre-programs a response for a specific prompt.
    /// The key should be a unique substring of the system prompt, the user
    /// prompt or the image URI. Earlier keys take precedence.
    pub fn add_response(&self, key: &str, response: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.push((key.to_string(), Ok(response.to_string())));
    }

    /// Pre-programs a provider error for a specific prompt.
    pub fn add_error(&self, key: &str, message: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses.push((key.to_string(), Err(message.to_string())));
    }

    /// Retrieves the recorded calls for assertion.
    pub fn get_calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    /// The largest number of calls that were waiting at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn respond(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        if let Some(handler) = &self.handler {
            return handler(request);
        }

        let image_uri = request
            .image
            .as_ref()
            .map(|image| image.to_uri())
            .unwrap_or_default();
        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if request.system_prompt.contains(key)
                || request.user_prompt.contains(key)
                || image_uri.contains(key)
            {
                return response.clone().map_err(ModelError::AiApi);
            }
        }

        Err(ModelError::AiApi(format!(
            "MockAiProvider: No response programmed for request. Got user prompt: '{}'",
            request.user_prompt
        )))
    }
}

impl Default for MockAiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for MockAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockAiProvider")
            .field("calls", &self.calls.lock().map(|c| c.len()).unwrap_or(0))
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ModelError> {
        self.calls.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.respond(request)
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Serves a [`MockAiProvider`] for one provider kind.
pub struct MockModelProvider {
    kind: ProviderKind,
    handle: MockAiProvider,
}

impl MockModelProvider {
    pub fn new(kind: ProviderKind, handle: MockAiProvider) -> Self {
        Self { kind, handle }
    }
}

impl ModelProvider for MockModelProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self, _settings: &ProviderSettings) -> bool {
        true
    }

    fn build(
        &self,
        _model_id: &str,
        _settings: &ProviderSettings,
    ) -> Result<Box<dyn AiProvider>, ExtractError> {
        Ok(Box::new(self.handle.clone()))
    }
}

// --- Test Setup ---

const ALL_KINDS: [ProviderKind; 5] = [
    ProviderKind::OpenRouter,
    ProviderKind::Google,
    ProviderKind::OpenAi,
    ProviderKind::Anthropic,
    ProviderKind::WorkersAi,
];

/// A registry where every provider kind is served by `mock`.
pub fn registry_with_mock(mock: &MockAiProvider) -> Arc<ProviderRegistry> {
    let mut registry = ProviderRegistry::new(ProviderSettings::default());
    for kind in ALL_KINDS {
        registry.register(Arc::new(MockModelProvider::new(kind, mock.clone())));
    }
    Arc::new(registry)
}

/// An extractor backed by `mock` that retries without sleeping.
pub fn extractor_with_mock(mock: &MockAiProvider) -> Extractor {
    Extractor::new(registry_with_mock(mock)).with_retry_policy(RetryPolicy::immediate(3))
}

/// The base64 form of `bytes`, usable as a response key for an image request.
pub fn image_key(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

// --- Record Builders ---

/// Builds a model reply for `domain` with one item per `(key, value)` pair.
pub fn record_json(domain: Domain, title: Option<&str>, items: &[(&str, Option<f64>)]) -> String {
    let status = domain.profile().statuses[0];
    let items: Vec<Value> = items
        .iter()
        .enumerate()
        .map(|(i, (key, value))| {
            json!({
                "key": key,
                "name": key.to_uppercase(),
                "value": value,
                "status": status,
                "displayOrder": i + 1
            })
        })
        .collect();
    json!({
        "type": domain.as_str(),
        "title": title,
        "category": domain.profile().allowed_categories[0],
        "date": "2024-03-01",
        "items": items
    })
    .to_string()
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use printpdf::{
        BuiltinFont, Layer, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextItem,
        TextMatrix, TextRenderingMode,
    };

    /// Generates a simple, single-page PDF with the given text content, compatible with printpdf v0.8.2.
    pub fn generate_test_pdf(text: &str) -> Result<Vec<u8>> {
        generate_test_pdf_pages(&[text])
    }

    /// Generates a PDF with one page per entry of `pages`.
    pub fn generate_test_pdf_pages(pages: &[&str]) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Test PDF");
        let layer_def = Layer::new("Layer 1");
        let layer_id = doc.add_layer(&layer_def);

        // Get the font bytes for a built-in font and parse it.
        let font_bytes = BuiltinFont::Helvetica.get_subset_font().bytes;
        let font = ParsedFont::from_bytes(&font_bytes, 0, &mut Vec::new())
            .ok_or_else(|| anyhow::anyhow!("Failed to parse built-in font"))?;
        let font_id = doc.add_font(&font);

        for text in pages {
            let mut page = PdfPage::new(Mm(210.0), Mm(297.0), vec![]);
            page.ops = vec![
                Op::BeginLayer {
                    layer_id: layer_id.clone(),
                },
                Op::SetFontSize {
                    size: Pt(12.0),
                    font: font_id.clone(),
                },
                Op::StartTextSection,
                Op::SetTextMatrix {
                    matrix: TextMatrix::Translate(Mm(10.0).into(), Mm(280.0).into()),
                },
                Op::SetTextRenderingMode {
                    mode: TextRenderingMode::Fill,
                },
                Op::WriteText {
                    items: vec![TextItem::Text(text.to_string())],
                    font: font_id.clone(),
                },
                Op::EndTextSection,
                Op::EndLayer {
                    layer_id: layer_id.clone(),
                },
            ];
            doc.pages.push(page);
        }

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            // In a test context, it's fine to just print warnings.
            eprintln!("PDF generation warnings: {warnings:?}");
        }

        Ok(bytes)
    }
}
