//! Rasterization primitives shared by charts and page export.

pub mod fonts;
pub mod image;
pub mod surface;

pub use image::RasterImage;
pub use surface::RenderSurface;
