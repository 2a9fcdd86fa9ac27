//! # Extraction Route Handlers
//!
//! Image and PDF extraction over JSON, plus a multipart upload endpoint that
//! routes the file by sniffing its bytes.

use super::{parse_domain, wrap_response, ApiResponse, AppError, AppState};
use aichart::{
    extract::image::decode_data_uri, Domain, ExtractOptions, ImageInput, RecordData,
};
use aichart_pdf::{PdfExtractOptions, PdfStrategy};
use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use base64::{engine::general_purpose, Engine as _};
use futures::future::AbortHandle;
use tracing::{info, warn};

use crate::types::{ExtractImageRequest, ExtractPdfRequest};

const PDF_MAGIC: &[u8] = b"%PDF-";

// --- Helpers ---

fn parse_strategy(raw: Option<&str>) -> Result<PdfStrategy, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(PdfStrategy::default()),
        Some(s) => s
            .parse()
            .map_err(|_| AppError::BadRequest(format!("Unknown PDF strategy '{s}'."))),
    }
}

fn decode_pdf_payload(payload: &str) -> Result<Vec<u8>, AppError> {
    let payload = payload.trim();
    if payload.starts_with("data:") {
        return decode_data_uri(payload)
            .map(|(_, bytes)| bytes)
            .map_err(|e| AppError::BadRequest(format!("Invalid PDF data URI: {e}")));
    }
    general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| AppError::BadRequest(format!("pdf_data_base64 is not valid base64: {e}")))
}

/// Runs the PDF pipeline, aborting it once the configured deadline passes.
async fn run_pdf(
    app_state: &AppState,
    pdf_data: &[u8],
    domain: Domain,
    options: &PdfExtractOptions,
) -> Result<RecordData, AppError> {
    let (handle, registration) = AbortHandle::new_pair();
    let timer = app_state.config.pdf_timeout().map(|deadline| {
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!("PDF extraction exceeded {:?}; aborting.", deadline);
            handle.abort();
        })
    });

    let result = app_state
        .pdf_extractor
        .extract_from_pdf_abortable(pdf_data, domain, options, registration)
        .await;

    if let Some(timer) = timer {
        timer.abort();
    }
    Ok(result?)
}

// --- Extraction Handlers ---

/// Handler for extracting a record from a single image.
pub async fn extract_image_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ExtractImageRequest>,
) -> Result<Json<ApiResponse<RecordData>>, AppError> {
    let domain = parse_domain(&payload.domain)?;
    info!(
        %domain,
        provider = ?payload.options.provider,
        model_id = ?payload.options.model_id,
        "Received image extraction request."
    );

    let max_attempts = app_state.config.attempts_for_request(payload.max_retries);
    if max_attempts != payload.max_retries {
        warn!(
            requested = ?payload.max_retries,
            limit = app_state.config.max_retries_limit,
            "Requested attempts exceed the configured limit."
        );
    }

    let record = app_state
        .extractor
        .extract_from_image_with_retry(
            &ImageInput::Encoded(payload.image),
            domain,
            max_attempts,
            &payload.options,
        )
        .await?;

    Ok(wrap_response(record))
}

/// Handler for extracting a merged record from a base64-encoded PDF.
pub async fn extract_pdf_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<ExtractPdfRequest>,
) -> Result<Json<ApiResponse<RecordData>>, AppError> {
    let domain = parse_domain(&payload.domain)?;
    let strategy = parse_strategy(payload.strategy.as_deref())?;
    let pdf_data = decode_pdf_payload(&payload.pdf_data_base64)?;
    info!(
        %domain,
        %strategy,
        bytes = pdf_data.len(),
        "Received PDF extraction request."
    );

    let options = PdfExtractOptions {
        strategy,
        model: payload.options,
    };
    let record = run_pdf(&app_state, &pdf_data, domain, &options).await?;

    Ok(wrap_response(record))
}

/// Handler for a multipart upload of an image or a PDF.
///
/// Fields: `file` (required), `domain` (required), `strategy`, `model_id`
/// and `provider`. PDFs are recognized by their magic bytes; anything else is
/// treated as an image.
pub async fn extract_file_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<RecordData>>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut domain: Option<String> = None;
    let mut strategy: Option<String> = None;
    let mut options = ExtractOptions::default();

    let bad_multipart = |e: axum_extra::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Malformed multipart body: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(str::to_string);
                file_data = Some(field.bytes().await.map_err(bad_multipart)?.to_vec());
            }
            "domain" => domain = Some(field.text().await.map_err(bad_multipart)?),
            "strategy" => strategy = Some(field.text().await.map_err(bad_multipart)?),
            "model_id" => options.model_id = Some(field.text().await.map_err(bad_multipart)?),
            "provider" => options.provider = Some(field.text().await.map_err(bad_multipart)?),
            _ => {}
        }
    }

    let file_data = file_data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| AppError::BadRequest("File data not found in request.".to_string()))?;
    let domain = parse_domain(
        domain
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("The 'domain' field is required.".to_string()))?,
    )?;

    if file_data.starts_with(PDF_MAGIC) {
        info!(?file_name, %domain, bytes = file_data.len(), "Uploaded file is a PDF.");
        let options = PdfExtractOptions {
            strategy: parse_strategy(strategy.as_deref())?,
            model: options,
        };
        let record = run_pdf(&app_state, &file_data, domain, &options).await?;
        return Ok(wrap_response(record));
    }

    info!(?file_name, %domain, bytes = file_data.len(), "Uploaded file is an image.");
    let record = app_state
        .extractor
        .extract_from_image_with_retry(&ImageInput::Bytes(file_data), domain, None, &options)
        .await?;
    Ok(wrap_response(record))
}
