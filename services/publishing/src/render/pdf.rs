//! PDF serialisation of a [`DocumentPlan`].
//!
//! The printpdf document handle is not `Send`; it lives and dies inside
//! [`PdfWriter::write`], which runs on a blocking thread.

use super::layout::{DocumentPlan, Element, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use crate::error::RenderError;
use image::DynamicImage;
use printpdf::{BuiltinFont, Image, ImageTransform, Mm, PdfDocument};
use std::io::{BufWriter, Write};

/// Resolution images are embedded at
pub const IMAGE_DPI: f32 = 300.0;

/// Turns a laid-out document into bytes
pub trait DocumentWriter: Send + Sync {
    /// Serialise `plan`, drawing `cover` wherever the plan places an image
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if fonts cannot be registered or the document
    /// cannot be serialised.
    fn write(
        &self,
        title: &str,
        plan: &DocumentPlan,
        cover: Option<&DynamicImage>,
    ) -> Result<Vec<u8>, RenderError>;
}

/// [`DocumentWriter`] producing PDF with the built-in Helvetica fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfWriter;

impl DocumentWriter for PdfWriter {
    fn write(
        &self,
        title: &str,
        plan: &DocumentPlan,
        cover: Option<&DynamicImage>,
    ) -> Result<Vec<u8>, RenderError> {
        let (doc, first_page, first_layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Font(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Font(e.to_string()))?;

        for (index, page) in plan.pages.iter().enumerate() {
            let (page_ref, layer_ref) = if index == 0 {
                (first_page, first_layer)
            } else {
                doc.add_page(
                    Mm(PAGE_WIDTH_MM),
                    Mm(PAGE_HEIGHT_MM),
                    format!("Layer {}", index + 1),
                )
            };
            let layer = doc.get_page(page_ref).get_layer(layer_ref);

            for element in &page.elements {
                match element {
                    Element::Text {
                        role,
                        text,
                        x_mm,
                        y_mm,
                    } => {
                        if text.is_empty() {
                            continue;
                        }
                        let font = if role.is_bold() { &bold } else { &regular };
                        layer.use_text(text.as_str(), role.size_pt(), Mm(*x_mm), Mm(*y_mm), font);
                    },
                    Element::Image {
                        x_mm,
                        y_mm,
                        width_mm,
                        height_mm,
                    } => {
                        let Some(cover) = cover else {
                            continue;
                        };
                        place_image(cover, layer.clone(), *x_mm, *y_mm, *width_mm, *height_mm);
                    },
                }
            }
        }

        let mut bytes = Vec::new();
        {
            let mut writer = BufWriter::new(&mut bytes);
            doc.save(&mut writer)
                .map_err(|e| RenderError::Serialize(e.to_string()))?;
            writer
                .flush()
                .map_err(|e| RenderError::Serialize(e.to_string()))?;
        }
        Ok(bytes)
    }
}

#[allow(clippy::cast_precision_loss)] // Pixel sizes are far below f32 precision limits
fn place_image(
    cover: &DynamicImage,
    layer: printpdf::PdfLayerReference,
    x_mm: f32,
    y_mm: f32,
    width_mm: f32,
    height_mm: f32,
) {
    let natural_width_mm = cover.width() as f32 * 25.4 / IMAGE_DPI;
    let natural_height_mm = cover.height() as f32 * 25.4 / IMAGE_DPI;
    if natural_width_mm <= 0.0 || natural_height_mm <= 0.0 {
        return;
    }

    let rgb = DynamicImage::ImageRgb8(cover.to_rgb8());
    Image::from_dynamic_image(&rgb).add_to_layer(
        layer,
        ImageTransform {
            translate_x: Some(Mm(x_mm)),
            translate_y: Some(Mm(y_mm)),
            scale_x: Some(width_mm / natural_width_mm),
            scale_y: Some(height_mm / natural_height_mm),
            dpi: Some(IMAGE_DPI),
            ..Default::default()
        },
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::render::layout::{CoverArt, PlanInput, plan_document};
    use image::{ImageBuffer, Rgb};

    fn is_pdf(bytes: &[u8]) -> bool {
        bytes.starts_with(b"%PDF")
            && bytes
                .windows(5)
                .rev()
                .take(64)
                .any(|window| window == b"%%EOF")
    }

    #[test]
    fn empty_document_is_well_formed() {
        let plan = plan_document(&PlanInput {
            title: "",
            summary: "",
            body: "",
            cover: CoverArt::Missing,
        });

        let bytes = PdfWriter.write("", &plan, None).unwrap();

        assert!(is_pdf(&bytes));
    }

    #[test]
    fn cover_image_is_embedded() {
        let cover = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(8, 4, Rgb([0u8, 90, 160])));
        let plan = plan_document(&PlanInput {
            title: "Tides",
            summary: "A summary.",
            body: "Body text.",
            cover: CoverArt::Image {
                width_px: 8,
                height_px: 4,
            },
        });

        let with_image = PdfWriter.write("Tides", &plan, Some(&cover)).unwrap();
        let without_image = PdfWriter.write("Tides", &plan, None).unwrap();

        assert!(is_pdf(&with_image));
        assert!(with_image.len() > without_image.len());
    }
}
