//! Immutable RGBA pixel buffers.

use std::sync::Arc;

use crate::error::RenderError;

/// Straight-alpha RGBA8 image. Clones share the pixel buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl RasterImage {
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(RenderError::Decode(format!(
                "expected {expected} bytes for {width}x{height} RGBA, got {}",
                rgba.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba: rgba.into(),
        })
    }

    /// Solid light-gray image, used when nothing better can be produced.
    pub fn blank(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let rgba = [236u8, 238, 242, 255].repeat(width as usize * height as usize);
        Self {
            width,
            height,
            rgba: rgba.into(),
        }
    }

    /// Decode a PNG supplied by an external image store.
    pub fn from_png(bytes: &[u8]) -> Result<Self, RenderError> {
        let mut decoder = png::Decoder::new(bytes);
        decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
        let mut reader = decoder
            .read_info()
            .map_err(|err| RenderError::Decode(err.to_string()))?;
        let mut buffer = vec![0; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut buffer)
            .map_err(|err| RenderError::Decode(err.to_string()))?;
        buffer.truncate(info.buffer_size());

        let rgba = match info.color_type {
            png::ColorType::Rgba => buffer,
            png::ColorType::Rgb => buffer
                .chunks_exact(3)
                .flat_map(|px| [px[0], px[1], px[2], 255])
                .collect(),
            png::ColorType::GrayscaleAlpha => buffer
                .chunks_exact(2)
                .flat_map(|px| [px[0], px[0], px[0], px[1]])
                .collect(),
            png::ColorType::Grayscale => buffer.iter().flat_map(|&v| [v, v, v, 255]).collect(),
            png::ColorType::Indexed => {
                return Err(RenderError::Decode("unexpanded palette image".into()));
            }
        };
        Self::from_rgba(info.width, info.height, rgba)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.rgba[idx],
            self.rgba[idx + 1],
            self.rgba[idx + 2],
            self.rgba[idx + 3],
        ]
    }

    /// RGB bytes composited over white, the layout PDF image streams expect.
    pub fn rgb_over_white(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(4)
            .flat_map(|px| {
                let alpha = px[3] as u16;
                let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
                [blend(px[0]), blend(px[1]), blend(px[2])]
            })
            .collect()
    }

    pub fn to_png(&self) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut buffer, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            encoder
                .write_header()
                .map_err(|err| RenderError::Encode(err.to_string()))?
                .write_image_data(&self.rgba)
                .map_err(|err| RenderError::Encode(err.to_string()))?;
        }
        Ok(buffer)
    }
}
