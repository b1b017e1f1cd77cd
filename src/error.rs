//! Error types for template export and template storage.

use thiserror::Error;

/// Errors that abort an export operation.
///
/// Rendering failures local to one widget or one record never show up here;
/// they are degraded to placeholder visuals by the renderer.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The composition root (the canvas) has no usable dimensions.
    #[error("template canvas not found: {0}")]
    MissingCanvasTarget(String),

    /// The batch was cancelled between records.
    #[error("export cancelled after {completed} record(s)")]
    Cancelled { completed: usize },

    /// PDF serialisation failed.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by the rasterization and barcode collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("rasterization failed: {0}")]
    Rasterization(String),

    #[error("barcode generation failed: {0}")]
    BarcodeGeneration(String),
}

/// Errors raised while persisting templates.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialisation error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A widget of the template being saved would not load back.
    #[error("template {id} has an invalid widget: {source}")]
    InvalidTemplate { id: u64, source: WidgetError },

    /// The stored value exists but cannot be read; writing would lose it.
    #[error("stored templates are unreadable: {0}")]
    Corrupt(String),
}

/// Widget validation failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WidgetError {
    #[error("widget field `{field}` must be a finite, non-negative number (got {value})")]
    InvalidGeometry { field: &'static str, value: f32 },

    #[error("widget field `fontSize` must be a finite, positive number (got {0})")]
    InvalidFontSize(f32),
}
