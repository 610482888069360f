//! Document export: composed pages into a PDF, one isolated raster per page.

pub mod delivery;
pub mod pdf;

pub use delivery::{Delivery, DeliverySink, DirectorySink, MemorySink};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::charts::svg::{Anchor, SvgCanvas, MUTED};
use crate::config::{ExportConfig, FailurePolicy};
use crate::error::RenderError;
use crate::layout::compose::{LAYOUT_HEIGHT, LAYOUT_WIDTH};
use crate::layout::RenderedPage;
use crate::render::fonts::FontWeight;
use crate::render::{RasterImage, RenderSurface};
use crate::{Error, Result};
use pdf::PdfBuilder;

/// Turns one composed page into pixels.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, page: &RenderedPage) -> std::result::Result<RasterImage, RenderError>;
}

/// Draws each page on its own freshly acquired surface, released on return.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceRasterizer;

impl PageRasterizer for SurfaceRasterizer {
    fn rasterize(&self, page: &RenderedPage) -> std::result::Result<RasterImage, RenderError> {
        let mut surface = RenderSurface::acquire(
            format!("page:{}", page.index + 1),
            page.geometry.width_px(),
            page.geometry.height_px(),
        )?;
        surface.draw_svg(&page.svg)?;
        Ok(surface.capture())
    }
}

pub struct DocumentExporter<R = SurfaceRasterizer> {
    rasterizer: R,
    policy: FailurePolicy,
    cancel: CancellationToken,
}

impl DocumentExporter<SurfaceRasterizer> {
    pub fn new(config: &ExportConfig) -> Self {
        Self::with_rasterizer(SurfaceRasterizer, config.failure_policy)
    }
}

impl<R: PageRasterizer> DocumentExporter<R> {
    pub fn with_rasterizer(rasterizer: R, policy: FailurePolicy) -> Self {
        Self {
            rasterizer,
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next page boundary once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Rasterize every page in order and assemble the PDF bytes.
    ///
    /// Pages are processed strictly one at a time, yielding to the scheduler
    /// after each. Nothing is returned unless every page made it in (or was
    /// substituted under [`FailurePolicy::Placeholder`]).
    pub async fn build(&self, pages: &[RenderedPage]) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(Error::ExportAbort {
                page: 0,
                reason: "document has no pages".into(),
            });
        }

        let mut builder = PdfBuilder::new();
        for page in pages {
            let number = page.index + 1;
            if self.cancel.is_cancelled() {
                info!(page = number, "export cancelled");
                return Err(Error::Cancelled { page: number });
            }

            let image = match self.rasterizer.rasterize(page) {
                Ok(image) => image,
                Err(err) => match self.policy {
                    FailurePolicy::Abort => {
                        warn!(page = number, error = %err, "page failed; aborting export");
                        return Err(Error::ExportAbort {
                            page: number,
                            reason: err.to_string(),
                        });
                    }
                    FailurePolicy::Placeholder => {
                        warn!(page = number, error = %err, "page failed; substituting placeholder");
                        unavailable_page(page)
                    }
                },
            };
            builder.push_page(&page.header, &image, page.geometry)?;
            drop(image);
            debug!(page = number, header = %page.header, "page appended");

            tokio::task::yield_now().await;
        }
        builder.finish()
    }

    /// Build the document and hand it to `sink` under `filename`.
    pub async fn export<S: DeliverySink>(
        &self,
        pages: &[RenderedPage],
        filename: &str,
        sink: &S,
    ) -> Result<Delivery> {
        info!(pages = pages.len(), filename, "export started");
        let bytes = self.build(pages).await?;
        sink.deliver(filename, delivery::PDF_MIME, bytes).await
    }
}

/// Stand-in raster for a page that could not be drawn.
fn unavailable_page(page: &RenderedPage) -> RasterImage {
    let mut canvas = SvgCanvas::new(LAYOUT_WIDTH, LAYOUT_HEIGHT);
    canvas.text(
        LAYOUT_WIDTH / 2.0,
        LAYOUT_HEIGHT / 2.0 - 20.0,
        &page.header,
        36.0,
        Anchor::Middle,
        FontWeight::Bold,
        MUTED,
    );
    canvas.text(
        LAYOUT_WIDTH / 2.0,
        LAYOUT_HEIGHT / 2.0 + 30.0,
        "Page unavailable",
        28.0,
        Anchor::Middle,
        FontWeight::Regular,
        MUTED,
    );
    let fallback = RenderedPage {
        svg: canvas.finish(),
        ..page.clone()
    };
    SurfaceRasterizer.rasterize(&fallback).unwrap_or_else(|_| {
        RasterImage::blank(page.geometry.width_px(), page.geometry.height_px())
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::PageGeometry;

    struct FailOn {
        page: usize,
        calls: AtomicUsize,
    }

    impl PageRasterizer for FailOn {
        fn rasterize(&self, page: &RenderedPage) -> std::result::Result<RasterImage, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if page.index == self.page {
                Err(RenderError::Other("boom".into()))
            } else {
                Ok(RasterImage::blank(8, 12))
            }
        }
    }

    fn pages(count: usize) -> Vec<RenderedPage> {
        (0..count)
            .map(|index| RenderedPage {
                index,
                header: format!("Page {}", index + 1),
                svg: String::new(),
                geometry: PageGeometry { dpi: 36 },
            })
            .collect()
    }

    #[tokio::test]
    async fn abort_policy_delivers_nothing() {
        let exporter = DocumentExporter::with_rasterizer(
            FailOn {
                page: 1,
                calls: AtomicUsize::new(0),
            },
            FailurePolicy::Abort,
        );
        let sink = MemorySink::new();
        let err = exporter
            .export(&pages(3), "out.pdf", &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExportAbort { page: 2, .. }));
        assert!(sink.is_empty());
        // Page 3 is never attempted.
        assert_eq!(exporter.rasterizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn placeholder_policy_keeps_page_count() {
        let exporter = DocumentExporter::with_rasterizer(
            FailOn {
                page: 0,
                calls: AtomicUsize::new(0),
            },
            FailurePolicy::Placeholder,
        );
        let bytes = exporter.build(&pages(2)).await.unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_page() {
        let token = CancellationToken::new();
        token.cancel();
        let exporter = DocumentExporter::with_rasterizer(
            FailOn {
                page: usize::MAX,
                calls: AtomicUsize::new(0),
            },
            FailurePolicy::Abort,
        )
        .with_cancellation(token);
        let err = exporter.build(&pages(2)).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled { page: 1 }));
        assert_eq!(exporter.rasterizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_page_markup_aborts_on_real_surfaces() {
        let mut document = pages(3);
        let valid = SvgCanvas::new(LAYOUT_WIDTH, LAYOUT_HEIGHT).finish();
        document[0].svg = valid.clone();
        document[1].svg = "<svg><rect".into();
        document[2].svg = valid;

        let exporter = DocumentExporter::with_rasterizer(SurfaceRasterizer, FailurePolicy::Abort);
        let sink = MemorySink::new();
        let err = exporter
            .export(&document, "out.pdf", &sink)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ExportAbort { page: 2, .. }));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn empty_document_is_rejected() {
        let exporter = DocumentExporter::new(&ExportConfig::default());
        assert!(exporter.build(&[]).await.is_err());
    }
}
