//! Pipeline – the document assembler. Drives binding, rendering and
//! pagination over a template (once) or over a list of records, and
//! collects the resulting pages into a [`Document`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::binder::bind;
use crate::document::{export_file_name, Document, ExportKind};
use crate::error::ExportError;
use crate::layout::Renderer;
use crate::pagination::paginate;
use crate::widget::{Record, Template};

/// A4 width in points.
pub const A4_WIDTH_PT: f32 = 595.28;
/// A4 height in points.
pub const A4_HEIGHT_PT: f32 = 841.89;

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for one export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Document title embedded in the PDF metadata. Empty means "use the
    /// template name".
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    /// Page orientation; swaps effective width/height when `Landscape`.
    pub orientation: PageOrientation,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            page_width: A4_WIDTH_PT,
            page_height: A4_HEIGHT_PT,
            orientation: PageOrientation::Portrait,
        }
    }
}

impl ExportConfig {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width,
            PageOrientation::Landscape => self.page_height,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height,
            PageOrientation::Landscape => self.page_width,
        }
    }

    /// Create an A4 landscape config.
    pub fn a4_landscape() -> Self {
        Self {
            orientation: PageOrientation::Landscape,
            ..Self::default()
        }
    }

    fn title_for(&self, template: &Template) -> String {
        if self.title.is_empty() {
            template.name.clone()
        } else {
            self.title.clone()
        }
    }
}

/// Cooperative cancellation for batch exports, checked between records.
///
/// Clones share the same flag, so one clone can be handed to another thread
/// and cancelled from there.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Turns templates (and optional record lists) into documents.
pub struct Assembler {
    config: ExportConfig,
    renderer: Renderer,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

impl Assembler {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            renderer: Renderer::default(),
        }
    }

    /// Replace the renderer, e.g. to inject capture or barcode services.
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Export the template as-is, without record data.
    pub fn export_single(&self, template: &Template) -> Result<Document, ExportError> {
        self.check_canvas(template)?;
        let mut doc = self.new_document(template);

        let bound = bind(template, None, 0);
        let surface = self.renderer.render(&bound);
        let pagination = paginate(&surface, doc.page_width_pt, doc.page_height_pt);
        let pages = doc.push_surface(surface, &pagination, None)?;

        log::debug!(
            "exported template {} ({:?}) on {} page(s)",
            template.id,
            template.name,
            pages.len()
        );
        Ok(doc)
    }

    /// Export one page group per record, in record order.
    ///
    /// `cancel` is checked before each record; when set, the export stops and
    /// reports how many records were completed.
    pub fn export_batch(
        &self,
        template: &Template,
        records: &[Record],
        cancel: &CancelFlag,
    ) -> Result<Document, ExportError> {
        self.check_canvas(template)?;
        let mut doc = self.new_document(template);

        for (index, record) in records.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!("batch export cancelled after {index} of {} record(s)", records.len());
                return Err(ExportError::Cancelled { completed: index });
            }
            let bound = bind(template, Some(record), index);
            let surface = self.renderer.render(&bound);
            let pagination = paginate(&surface, doc.page_width_pt, doc.page_height_pt);
            let pages = doc.push_surface(surface, &pagination, Some(index))?;
            log::debug!("record {index}: pages {pages:?}");
        }

        log::debug!(
            "exported {} record(s) of template {} on {} page(s)",
            records.len(),
            template.id,
            doc.page_count()
        );
        Ok(doc)
    }

    /// [`Assembler::export_single`] followed by PDF serialisation. Returns
    /// the download file name and the PDF bytes.
    pub fn export_single_to_pdf(&self, template: &Template) -> Result<(String, Vec<u8>), ExportError> {
        let doc = self.export_single(template)?;
        let bytes = doc.to_pdf()?;
        Ok((export_file_name(&template.name, ExportKind::Template), bytes))
    }

    /// [`Assembler::export_batch`] followed by PDF serialisation.
    pub fn export_batch_to_pdf(
        &self,
        template: &Template,
        records: &[Record],
        cancel: &CancelFlag,
    ) -> Result<(String, Vec<u8>), ExportError> {
        let doc = self.export_batch(template, records, cancel)?;
        let bytes = doc.to_pdf()?;
        Ok((export_file_name(&template.name, ExportKind::Products), bytes))
    }

    fn check_canvas(&self, template: &Template) -> Result<(), ExportError> {
        self.renderer.canvas().validate().inspect_err(|e| {
            log::error!("cannot export template {}: {e}", template.id);
        })
    }

    fn new_document(&self, template: &Template) -> Document {
        Document::new(
            self.config.title_for(template),
            self.config.effective_width(),
            self.config.effective_height(),
        )
    }
}

/// Convenience: export a template with default A4 settings.
pub fn export_template(template: &Template) -> Result<(String, Vec<u8>), ExportError> {
    Assembler::default().export_single_to_pdf(template)
}
