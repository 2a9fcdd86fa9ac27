//! # Page Rendering
//!
//! Rasterizes PDF pages to PNG for the vision path. Rendering needs a native
//! backend; without one, [`UnavailableRenderer`] fails every call with a
//! render error so the pipeline can fall back to the text path.

use aichart::ExtractError;
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

/// Pages are rendered at twice their nominal size.
pub const RENDER_SCALE: f32 = 2.0;

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// Zero-based page number.
    pub index: usize,
    pub png: Vec<u8>,
}

/// Turns a PDF into one PNG per page, in page order.
#[async_trait]
pub trait PageRenderer: Send + Sync + Debug {
    async fn render_pages(
        &self,
        pdf_data: &[u8],
        scale: f32,
    ) -> Result<Vec<RenderedPage>, ExtractError>;
}

/// The renderer used when no rasterization backend was compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRenderer;

#[async_trait]
impl PageRenderer for UnavailableRenderer {
    async fn render_pages(
        &self,
        _pdf_data: &[u8],
        _scale: f32,
    ) -> Result<Vec<RenderedPage>, ExtractError> {
        Err(ExtractError::Render(
            "no rasterization backend is available in this build".to_string(),
        ))
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRenderer;

/// Returns the pdfium renderer when the `pdfium` feature is enabled, and
/// [`UnavailableRenderer`] otherwise.
pub fn default_renderer() -> Arc<dyn PageRenderer> {
    #[cfg(feature = "pdfium")]
    {
        Arc::new(PdfiumRenderer::default())
    }
    #[cfg(not(feature = "pdfium"))]
    {
        Arc::new(UnavailableRenderer)
    }
}

#[cfg(feature = "pdfium")]
mod pdfium {
    use super::{PageRenderer, RenderedPage};
    use aichart::ExtractError;
    use async_trait::async_trait;
    use image::ImageFormat;
    use pdfium_render::prelude::*;
    use std::{io::Cursor, path::PathBuf};
    use tracing::debug;

    /// Renders pages with a pdfium library bound at runtime.
    ///
    /// The library is looked up in `library_dir` first, then on the system path.
    #[derive(Debug, Clone)]
    pub struct PdfiumRenderer {
        pub library_dir: PathBuf,
    }

    impl Default for PdfiumRenderer {
        fn default() -> Self {
            Self {
                library_dir: PathBuf::from("./lib"),
            }
        }
    }

    fn render_error(context: &str, e: impl std::fmt::Display) -> ExtractError {
        ExtractError::Render(format!("{context}: {e}"))
    }

    fn render_blocking(
        pdf_data: &[u8],
        scale: f32,
        library_dir: &PathBuf,
    ) -> Result<Vec<RenderedPage>, ExtractError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
            library_dir,
        ))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| render_error("pdfium library is unavailable", e))?;
        let pdfium = Pdfium::new(bindings);

        let document = pdfium
            .load_pdf_from_byte_slice(pdf_data, None)
            .map_err(|e| render_error("pdfium could not open the document", e))?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);

        let mut pages = Vec::new();
        for (index, page) in document.pages().iter().enumerate() {
            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| render_error("page rendering failed", e))?;
            let mut png = Vec::new();
            bitmap
                .as_image()
                .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
                .map_err(|e| render_error("PNG encoding failed", e))?;
            debug!(index, bytes = png.len(), "Rendered page");
            pages.push(RenderedPage { index, png });
        }
        Ok(pages)
    }

    #[async_trait]
    impl PageRenderer for PdfiumRenderer {
        async fn render_pages(
            &self,
            pdf_data: &[u8],
            scale: f32,
        ) -> Result<Vec<RenderedPage>, ExtractError> {
            let pdf_data = pdf_data.to_vec();
            let library_dir = self.library_dir.clone();
            tokio::task::spawn_blocking(move || render_blocking(&pdf_data, scale, &library_dir))
                .await
                .map_err(|e| render_error("render task failed", e))?
        }
    }
}
