//! Document – the ordered page sequence produced by an export, and its PDF
//! serialisation via `printpdf` (v0.8 ops-based API).

use std::io::Cursor;
use std::ops::Range;
use std::sync::Arc;

use image::RgbaImage;
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, XObjectTransform,
};

use crate::error::ExportError;
use crate::pagination::{PagePlacement, Pagination};
use crate::raster::RenderSurface;

/// A rendered surface in its PNG-encoded form, as embedded in the PDF.
///
/// Pixel buffers are encoded as soon as they join a document, so a batch
/// holds at most one raw surface at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedSurface {
    pub width: u32,
    pub height: u32,
    /// Empty for zero-sized surfaces.
    pub png: Vec<u8>,
}

impl EncodedSurface {
    pub fn encode(surface: &RenderSurface) -> Result<Self, ExportError> {
        let (width, height) = (surface.width(), surface.height());
        let png = if width == 0 || height == 0 {
            Vec::new()
        } else {
            encode_png(&surface.pixels)?
        };
        Ok(Self { width, height, png })
    }

    pub fn is_empty(&self) -> bool {
        self.png.is_empty()
    }

    /// Decode back to pixels.
    pub fn decode(&self) -> Result<RgbaImage, ExportError> {
        if self.is_empty() {
            return Ok(RgbaImage::new(self.width, self.height));
        }
        image::load_from_memory_with_format(&self.png, image::ImageFormat::Png)
            .map(|img| img.to_rgba8())
            .map_err(|e| ExportError::Pdf(format!("PNG decode error: {e}")))
    }
}

/// One physical page: a surface drawn at a vertical offset.
#[derive(Debug, Clone)]
pub struct Page {
    /// Shared with the other pages cut from the same surface.
    pub surface: Arc<EncodedSurface>,
    /// Record this page belongs to; `None` for single-template exports.
    pub record_index: Option<usize>,
    pub placement: PagePlacement,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    /// Size of the whole surface once scaled to the page width.
    pub image_width_pt: f32,
    pub image_height_pt: f32,
}

impl Page {
    /// Surface rows visible on this page, in source pixels.
    pub fn visible_rows(&self) -> Range<u32> {
        let surface_h = self.surface.height;
        if self.image_height_pt <= 0.0 {
            return 0..0;
        }
        let px_per_pt = surface_h as f32 / self.image_height_pt;
        let top = (-self.placement.offset_pt * px_per_pt).round().max(0.0) as u32;
        let bottom = ((-self.placement.offset_pt + self.page_height_pt) * px_per_pt).round() as u32;
        top.min(surface_h)..bottom.min(surface_h)
    }

    /// Decode the band of the surface shown on this page.
    pub fn slice(&self) -> Result<RgbaImage, ExportError> {
        let rows = self.visible_rows();
        let pixels = self.surface.decode()?;
        Ok(image::imageops::crop_imm(&pixels, 0, rows.start, self.surface.width, rows.end - rows.start).to_image())
    }
}

/// The ordered output pages of one export.
#[derive(Debug, Clone)]
pub struct Document {
    pub title: String,
    pub page_width_pt: f32,
    pub page_height_pt: f32,
    pages: Vec<Page>,
    /// Page index ranges, one per rendered surface, in order.
    groups: Vec<Range<usize>>,
}

impl Document {
    pub fn new(title: impl Into<String>, page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: title.into(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Append all pages of one surface as a new group. The group always
    /// starts on a fresh page. The surface is encoded and dropped here.
    pub fn push_surface(
        &mut self,
        surface: RenderSurface,
        pagination: &Pagination,
        record_index: Option<usize>,
    ) -> Result<Range<usize>, ExportError> {
        let encoded = Arc::new(EncodedSurface::encode(&surface)?);
        drop(surface);

        let start = self.pages.len();
        for placement in pagination {
            self.pages.push(Page {
                surface: Arc::clone(&encoded),
                record_index,
                placement,
                page_width_pt: pagination.page_width_pt,
                page_height_pt: pagination.page_height_pt,
                image_width_pt: pagination.page_width_pt,
                image_height_pt: pagination.scaled_height_pt,
            });
        }
        let range = start..self.pages.len();
        self.groups.push(range.clone());
        Ok(range)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page index ranges, one per surface, in export order.
    pub fn groups(&self) -> &[Range<usize>] {
        &self.groups
    }

    /// Serialise to PDF bytes. Each surface is embedded once as a PNG image
    /// and drawn on every page of its group.
    pub fn to_pdf(&self) -> Result<Vec<u8>, ExportError> {
        let page_w = Mm(self.page_width_pt * 0.352778); // pt → mm
        let page_h = Mm(self.page_height_pt * 0.352778);

        let mut doc = PdfDocument::new(&self.title);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let mut pdf_pages = Vec::with_capacity(self.pages.len());

        for group in &self.groups {
            let group_pages = &self.pages[group.clone()];
            let Some(first) = group_pages.first() else {
                continue;
            };

            let encoded = &first.surface;
            let xobj_id = if encoded.is_empty() {
                log::warn!("empty surface; emitting blank page(s)");
                None
            } else {
                let raw = RawImage::decode_from_bytes(&encoded.png, &mut warnings)
                    .map_err(|e| ExportError::Pdf(format!("image embed error: {e}")))?;
                Some(doc.add_image(&raw))
            };
            let (px_w, px_h) = (encoded.width, encoded.height);

            for page in group_pages {
                let mut ops = Vec::new();
                if let Some(xobj_id) = xobj_id.as_ref().filter(|_| page.image_height_pt > 0.0) {
                    // PDF origin is bottom-left; offsets are measured from the top.
                    let img_bottom_y = page.page_height_pt - page.placement.offset_pt - page.image_height_pt;
                    // At dpi=72 printpdf renders 1 px = 1 pt.
                    ops.push(Op::UseXobject {
                        id: xobj_id.clone(),
                        transform: XObjectTransform {
                            translate_x: Some(Pt(0.0)),
                            translate_y: Some(Pt(img_bottom_y)),
                            dpi: Some(72.0),
                            scale_x: Some(page.image_width_pt / px_w as f32),
                            scale_y: Some(page.image_height_pt / px_h as f32),
                            rotate: None,
                        },
                    });
                }
                pdf_pages.push(PdfPage::new(page_w, page_h, ops));
            }
        }

        if pdf_pages.is_empty() {
            pdf_pages.push(PdfPage::new(page_w, page_h, Vec::new()));
        }
        for w in &warnings {
            log::debug!("pdf: {w:?}");
        }

        doc.with_pages(pdf_pages);
        Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
    }
}

fn encode_png(pixels: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut buf = Cursor::new(Vec::new());
    pixels
        .write_to(&mut buf, image::ImageFormat::Png)
        .map_err(|e| ExportError::Pdf(format!("PNG encode error: {e}")))?;
    Ok(buf.into_inner())
}

/// What an export file contains; decides the file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// A plain template without record data.
    Template,
    /// One page group per record.
    Products,
}

impl ExportKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ExportKind::Template => "_template.pdf",
            ExportKind::Products => "_products.pdf",
        }
    }
}

/// Derive the download file name: ASCII letters and digits are kept, every
/// other character becomes `_`, the result is lowercased and suffixed.
pub fn export_file_name(name: &str, kind: ExportKind) -> String {
    let stem: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    format!("{stem}{}", kind.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn striped_surface(w: u32, h: u32) -> RenderSurface {
        // Row y is coloured by y so slices can be checked.
        RenderSurface::new(RgbaImage::from_fn(w, h, |_, y| Rgba([(y % 256) as u8, 0, 0, 255])))
    }

    #[test]
    fn file_names_are_sanitised() {
        assert_eq!(
            export_file_name("Summer Sale 2024!", ExportKind::Template),
            "summer_sale_2024__template.pdf"
        );
        assert_eq!(export_file_name("Étiquette", ExportKind::Products), "_tiquette_products.pdf");
        assert_eq!(export_file_name("", ExportKind::Products), "_products.pdf");
    }

    #[test]
    fn surfaces_form_separate_groups() {
        let mut doc = Document::new("t", 100.0, 100.0);
        let s1 = striped_surface(100, 250);
        let p1 = Pagination::new(100, 250, 100.0, 100.0);
        let s2 = striped_surface(100, 50);
        let p2 = Pagination::new(100, 50, 100.0, 100.0);
        assert_eq!(doc.push_surface(s1, &p1, Some(0)).unwrap(), 0..3);
        assert_eq!(doc.push_surface(s2, &p2, Some(1)).unwrap(), 3..4);
        assert_eq!(doc.page_count(), 4);
        assert_eq!(doc.groups(), &[0..3, 3..4]);
        assert_eq!(doc.pages()[3].record_index, Some(1));
        assert_eq!(doc.pages()[3].placement.offset_pt, 0.0);
    }

    #[test]
    fn page_slices_follow_offsets() {
        let mut doc = Document::new("t", 100.0, 100.0);
        doc.push_surface(striped_surface(100, 250), &Pagination::new(100, 250, 100.0, 100.0), None)
            .unwrap();
        let rows: Vec<_> = doc.pages().iter().map(Page::visible_rows).collect();
        assert_eq!(rows, vec![0..100, 100..200, 200..250]);
        let last = doc.pages()[2].slice().unwrap();
        assert_eq!(last.height(), 50);
        assert_eq!(last.get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn pages_hold_compressed_surfaces() {
        // A flat surface compresses far below its raw RGBA size.
        let (w, h) = (800, 3000);
        let mut doc = Document::new("t", 100.0, 100.0);
        let flat = RenderSurface::new(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])));
        doc.push_surface(flat, &Pagination::new(w, h, 100.0, 100.0), None).unwrap();

        let first = &doc.pages()[0].surface;
        assert!(doc.pages().iter().all(|p| Arc::ptr_eq(&p.surface, first)));
        assert_eq!((first.width, first.height), (w, h));
        assert!(first.png.len() < (w * h * 4 / 100) as usize, "png is {} bytes", first.png.len());
        assert_eq!(first.decode().unwrap().get_pixel(0, h - 1).0, [255, 255, 255, 255]);
    }

    #[test]
    fn pdf_is_written_for_small_surface() {
        let mut doc = Document::new("t", 100.0, 100.0);
        doc.push_surface(striped_surface(10, 25), &Pagination::new(10, 25, 100.0, 100.0), None)
            .unwrap();
        let bytes = doc.to_pdf().unwrap();
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn zero_sized_surface_gives_blank_page() {
        let mut doc = Document::new("t", 100.0, 100.0);
        doc.push_surface(RenderSurface::new(RgbaImage::new(0, 0)), &Pagination::new(0, 0, 100.0, 100.0), None)
            .unwrap();
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages()[0].surface.is_empty());
        assert!(doc.pages()[0].slice().unwrap().is_empty());
        assert_eq!(&doc.to_pdf().unwrap()[0..5], b"%PDF-");
    }

    #[test]
    fn empty_document_still_renders_a_page() {
        let doc = Document::new("empty", 595.28, 841.89);
        let bytes = doc.to_pdf().unwrap();
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }
}
