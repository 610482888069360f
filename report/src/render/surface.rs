//! Disposable off-screen drawing surface.
//!
//! A surface owns one pixmap and builds fresh parse options for every draw,
//! so nothing leaks between charts or pages. Acquire one per artifact or page
//! and let it drop; release happens on every exit path.

use tiny_skia::{Color, Pixmap, Transform};
use tracing::trace;

use crate::error::RenderError;
use crate::render::{fonts, RasterImage};

/// Upper bound on either dimension, roughly A4 at 600 dpi.
const MAX_SIDE: u32 = 8192;

pub struct RenderSurface {
    label: String,
    pixmap: Pixmap,
}

impl RenderSurface {
    pub fn acquire(label: impl Into<String>, width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width > MAX_SIDE || height > MAX_SIDE {
            return Err(RenderError::SurfaceSize { width, height });
        }
        let mut pixmap =
            Pixmap::new(width, height).ok_or(RenderError::SurfaceSize { width, height })?;
        pixmap.fill(Color::WHITE);

        let label = label.into();
        trace!(surface = %label, width, height, "render surface acquired");
        Ok(Self { label, pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Parse SVG markup and paint it scaled to fill the surface.
    pub fn draw_svg(&mut self, markup: &str) -> Result<(), RenderError> {
        let options = usvg::Options {
            fontdb: fonts::database(),
            font_family: fonts::FAMILY.to_string(),
            ..usvg::Options::default()
        };
        let tree = usvg::Tree::from_str(markup, &options)
            .map_err(|err| RenderError::Markup(err.to_string()))?;

        let size = tree.size();
        if size.width() <= 0.0 || size.height() <= 0.0 {
            return Err(RenderError::Markup("document has an empty viewport".into()));
        }
        let transform = Transform::from_scale(
            self.pixmap.width() as f32 / size.width(),
            self.pixmap.height() as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut self.pixmap.as_mut());
        Ok(())
    }

    /// Copy the current contents out as straight (non-premultiplied) RGBA.
    pub fn capture(&self) -> RasterImage {
        let rgba: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect();
        RasterImage::from_rgba(self.pixmap.width(), self.pixmap.height(), rgba)
            .unwrap_or_else(|_| RasterImage::blank(self.pixmap.width(), self.pixmap.height()))
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        trace!(surface = %self.label, "render surface released");
    }
}
