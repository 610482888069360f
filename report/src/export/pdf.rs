//! PDF assembly: one full-bleed raster image per page plus an invisible
//! text layer carrying the page header.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::config::PageGeometry;
use crate::render::RasterImage;
use crate::{Error, Result};

const HEADER_FONT: &str = "F1";
const PAGE_IMAGE: &str = "Im0";

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        Self {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append a page showing `image` scaled to the full page box.
    pub fn push_page(
        &mut self,
        header: &str,
        image: &RasterImage,
        geometry: PageGeometry,
    ) -> Result<()> {
        let (width_pt, height_pt) = geometry.size_pt();

        let image_id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width() as i64,
                "Height" => image.height() as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8_i64,
            },
            image.rgb_over_white(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        real(width_pt),
                        real(0.0),
                        real(0.0),
                        real(height_pt),
                        real(0.0),
                        real(0.0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(PAGE_IMAGE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
                // Render mode 3: text is neither filled nor stroked.
                Operation::new("BT", vec![]),
                Operation::new("Tr", vec![Object::Integer(3)]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(HEADER_FONT.as_bytes().to_vec()), Object::Integer(12)],
                ),
                Operation::new("Td", vec![real(36.0), real(height_pt - 36.0)]),
                Operation::new("Tj", vec![Object::string_literal(win_ansi(header))]),
                Operation::new("ET", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|err| pdf_error(self.kids.len(), err))?;
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), encoded));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(width_pt), real(height_pt)],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { HEADER_FONT => self.font_id },
                "XObject" => dictionary! { PAGE_IMAGE => image_id },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Close the page tree and serialize the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|err| Error::ExportAbort {
                page: count as usize,
                reason: format!("pdf serialization failed: {err}"),
            })?;
        Ok(buffer)
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Standard fonts only cover Latin-1-ish text; anything else becomes '?'.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

fn pdf_error(page: usize, err: impl std::fmt::Display) -> Error {
    Error::ExportAbort {
        page: page + 1,
        reason: format!("pdf encoding failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_appended_in_order() {
        let geometry = PageGeometry { dpi: 36 };
        let image = RasterImage::blank(geometry.width_px(), geometry.height_px());
        let mut builder = PdfBuilder::new();
        for header in ["first", "second", "third"] {
            builder.push_page(header, &image, geometry).unwrap();
        }
        assert_eq!(builder.page_count(), 3);
        let bytes = builder.finish().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 3);
        let headers: Vec<Vec<u8>> = pages
            .values()
            .map(|id| {
                let content = doc.get_and_decode_page_content(*id).unwrap();
                content
                    .operations
                    .iter()
                    .find(|op| op.operator == "Tj")
                    .and_then(|op| op.operands.first())
                    .and_then(|obj| obj.as_str().ok())
                    .unwrap()
                    .to_vec()
            })
            .collect();
        assert_eq!(headers, vec![b"first".to_vec(), b"second".to_vec(), b"third".to_vec()]);
    }

    #[test]
    fn non_latin_text_is_replaced() {
        assert_eq!(win_ansi("Ünits → mV"), b"\xdcnits ? mV".to_vec());
    }
}
