//! # label-forge – widget templates to paginated PDF documents
//!
//! This crate renders user-designed label/product templates into fixed-size
//! PDF pages, optionally merging one data record per page group. The
//! pipeline stages are:
//!
//! 1. **Model** – templates, widgets and records ([`widget`])
//! 2. **Bind** – resolve record values into a copy of the widgets ([`binder`])
//! 3. **Compose** – lay widgets out on an off-screen canvas ([`layout`],
//!    [`composition`])
//! 4. **Rasterize** – capture the canvas into pixels ([`raster`],
//!    [`barcode`], [`fonts`])
//! 5. **Paginate** – tile the surface over pages ([`pagination`])
//! 6. **Assemble** – collect pages per record and write the PDF
//!    ([`pipeline`], [`document`])
//!
//! Templates persist through [`store`]. A C-compatible FFI surface is exposed
//! via the [`ffi`] module.

pub mod barcode;
pub mod binder;
pub mod composition;
pub mod document;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod layout;
pub mod pagination;
pub mod pipeline;
pub mod raster;
pub mod store;
pub mod templates;
pub mod widget;

// Re-exports for convenience
pub use binder::{bind, BoundWidgets};
pub use document::{export_file_name, Document, EncodedSurface, ExportKind, Page};
pub use error::{ExportError, RenderError, StoreError};
pub use layout::{CanvasConfig, Renderer};
pub use pagination::{paginate, Pagination};
pub use pipeline::{export_template, Assembler, CancelFlag, ExportConfig, PageOrientation};
pub use store::{FileBackend, MemoryBackend, TemplateStore};
pub use widget::{Record, Template, Widget, WidgetKind};
