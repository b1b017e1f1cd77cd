//! C-compatible FFI API for embedding the exporter in other languages.
//!
//! # ABI Contract
//!
//! All exported functions use the `extern "C"` calling convention and
//! `#[no_mangle]` symbol names prefixed with `lf_`.
//!
//! ## Inputs
//! Templates and record lists are passed as UTF-8 JSON in the editor's
//! stored format (see [`crate::widget`]). Buffers need not be
//! null-terminated.
//!
//! ## Memory management
//! - PDF buffers and file-name strings returned by `lf_*` functions are
//!   allocated on the Rust heap.
//! - Callers **must** free them with `lf_free_buffer` / `lf_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success):
//!   1 = null pointer, 2 = invalid UTF-8, 3 = invalid JSON, 4 = export failed.
//! - Error details can be retrieved via `lf_last_error`.
//!
//! ## Thread safety
//! `lf_last_error` reads a thread-local, so concurrent callers on different
//! threads see their own errors.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -llabel_forge
//! // #include "label_forge.h"
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::pipeline::{Assembler, CancelFlag, ExportConfig, PageOrientation};
use crate::widget::{Record, Template};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

// ---------------------------------------------------------------------------
// C-compatible configuration types
// ---------------------------------------------------------------------------

/// Page orientation for use in [`LfExportConfig`].
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub enum LfPageOrientation {
    /// Portrait mode: height > width (default).
    Portrait = 0,
    /// Landscape mode: width > height.
    Landscape = 1,
}

/// Optional export configuration.
///
/// Fields set to `0` (or `NULL` for `title`) fall back to their defaults:
/// - `page_width`  → 595.28 pt (A4)
/// - `page_height` → 841.89 pt (A4)
/// - `title`       → the template name
#[repr(C)]
pub struct LfExportConfig {
    /// Null-terminated UTF-8 document title embedded in PDF metadata.
    pub title: *const c_char,
    /// Page width in points. Pass `0.0` to use the default.
    pub page_width: f32,
    /// Page height in points. Pass `0.0` to use the default.
    pub page_height: f32,
    /// Page orientation (portrait = 0, landscape = 1).
    pub orientation: LfPageOrientation,
}

/// Convert an `LfExportConfig` (FFI) to an `ExportConfig` (Rust).
///
/// # Safety
/// `cfg.title`, if non-null, must point to a valid null-terminated UTF-8 string.
unsafe fn export_config_from_c(cfg: &LfExportConfig) -> ExportConfig {
    let defaults = ExportConfig::default();

    let title = if cfg.title.is_null() {
        defaults.title.clone()
    } else {
        CStr::from_ptr(cfg.title).to_str().unwrap_or_default().to_string()
    };

    let page_width = if cfg.page_width > 0.0 { cfg.page_width } else { defaults.page_width };
    let page_height = if cfg.page_height > 0.0 { cfg.page_height } else { defaults.page_height };

    let orientation = match cfg.orientation {
        LfPageOrientation::Portrait => PageOrientation::Portrait,
        LfPageOrientation::Landscape => PageOrientation::Landscape,
    };

    ExportConfig {
        title,
        page_width,
        page_height,
        orientation,
    }
}

/// # Safety
/// `cfg`, if non-null, must point to a fully-initialised [`LfExportConfig`].
unsafe fn config_or_default(cfg: *const LfExportConfig) -> ExportConfig {
    if cfg.is_null() {
        ExportConfig::default()
    } else {
        export_config_from_c(&*cfg)
    }
}

/// Borrow `len` bytes at `ptr` as UTF-8, recording an error on failure.
///
/// # Safety
/// `ptr` must point to `len` readable bytes that outlive the returned slice.
unsafe fn utf8_arg<'a>(ptr: *const u8, len: u32) -> Result<&'a str, c_int> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    std::str::from_utf8(bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        2
    })
}

fn parse_template(json: &str) -> Result<Template, c_int> {
    Template::from_json(json).map_err(|e| {
        set_last_error(&format!("Invalid template JSON: {e}"));
        3
    })
}

/// Hand PDF bytes and the file name over to the caller.
///
/// # Safety
/// All out-pointers must be valid for writes.
unsafe fn write_outputs(
    (name, pdf_bytes): (String, Vec<u8>),
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_name: *mut *mut c_char,
) {
    let len = pdf_bytes.len() as u32;
    let buf = pdf_bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
    *out_name = match CString::new(name) {
        Ok(cs) => cs.into_raw(),
        Err(_) => ptr::null_mut(),
    };
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Export a template (no record data) to PDF.
///
/// # Parameters
/// - `template_ptr`, `template_len`: UTF-8 template JSON
/// - `cfg`: optional pointer to an [`LfExportConfig`]; pass `NULL` for defaults
/// - `out_buf`, `out_len`: PDF output (free with `lf_free_buffer`)
/// - `out_name`: suggested file name, e.g. `my_label_template.pdf`
///   (free with `lf_free_string`)
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `lf_last_error`.
///
/// # Safety
/// - `template_ptr` must point to `template_len` valid bytes.
/// - `cfg`, if non-null, must be a valid [`LfExportConfig`] whose `title`
///   (if non-null) is a null-terminated UTF-8 string.
/// - `out_buf`, `out_len` and `out_name` must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn lf_export_template(
    template_ptr: *const u8,
    template_len: u32,
    cfg: *const LfExportConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_name: *mut *mut c_char,
) -> c_int {
    if template_ptr.is_null() || out_buf.is_null() || out_len.is_null() || out_name.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }

    let json = match utf8_arg(template_ptr, template_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let template = match parse_template(json) {
        Ok(t) => t,
        Err(rc) => return rc,
    };

    let assembler = Assembler::new(config_or_default(cfg));
    match assembler.export_single_to_pdf(&template) {
        Ok(out) => {
            write_outputs(out, out_buf, out_len, out_name);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

/// Export one page group per record to PDF.
///
/// # Parameters
/// - `template_ptr`, `template_len`: UTF-8 template JSON
/// - `records_ptr`, `records_len`: UTF-8 JSON array of record objects
/// - `cfg`, `out_buf`, `out_len`, `out_name`: as for `lf_export_template`
///
/// # Returns
/// `0` on success.
///
/// # Safety
/// Same as `lf_export_template`; additionally `records_ptr` must point to
/// `records_len` valid bytes.
#[no_mangle]
pub unsafe extern "C" fn lf_export_products(
    template_ptr: *const u8,
    template_len: u32,
    records_ptr: *const u8,
    records_len: u32,
    cfg: *const LfExportConfig,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
    out_name: *mut *mut c_char,
) -> c_int {
    if template_ptr.is_null()
        || records_ptr.is_null()
        || out_buf.is_null()
        || out_len.is_null()
        || out_name.is_null()
    {
        set_last_error("Null pointer argument");
        return 1;
    }

    let template = match utf8_arg(template_ptr, template_len).and_then(parse_template) {
        Ok(t) => t,
        Err(rc) => return rc,
    };
    let records_json = match utf8_arg(records_ptr, records_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let records = match Record::list_from_json(records_json) {
        Ok(r) => r,
        Err(e) => {
            set_last_error(&format!("Invalid records JSON: {e}"));
            return 3;
        }
    };

    let assembler = Assembler::new(config_or_default(cfg));
    match assembler.export_batch_to_pdf(&template, &records, &CancelFlag::new()) {
        Ok(out) => {
            write_outputs(out, out_buf, out_len, out_name);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `lf_export_template` / `lf_export_products`.
///
/// # Safety
/// `buf` must have been returned by a previous export call, and `len` must be
/// the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn lf_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a file-name string returned by an export call.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn lf_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `lf_*` call on the same
/// thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn lf_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn lf_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates;

    struct Output {
        buf: *mut u8,
        len: u32,
        name: *mut c_char,
    }

    impl Output {
        fn new() -> Self {
            Self {
                buf: ptr::null_mut(),
                len: 0,
                name: ptr::null_mut(),
            }
        }

        fn bytes(&self) -> &[u8] {
            unsafe { slice::from_raw_parts(self.buf, self.len as usize) }
        }

        fn name(&self) -> &str {
            unsafe { CStr::from_ptr(self.name) }.to_str().unwrap()
        }

        fn free(self) {
            unsafe {
                lf_free_buffer(self.buf, self.len);
                lf_free_string(self.name);
            }
        }
    }

    fn last_error() -> String {
        let p = lf_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_export_template() {
        let json = templates::product_label_json();
        let mut out = Output::new();

        let rc = unsafe {
            lf_export_template(
                json.as_ptr(),
                json.len() as u32,
                ptr::null(),
                &mut out.buf,
                &mut out.len,
                &mut out.name,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert!(out.len > 100);
        assert_eq!(&out.bytes()[0..5], b"%PDF-");
        assert_eq!(out.name(), "stored_label_template.pdf");
        out.free();
    }

    #[test]
    fn ffi_export_products_custom_config() {
        let json = templates::product_label_json();
        let records = br#"[{"name": "Tea", "productId": "T-1"}, {"name": "Mug"}]"#;
        let title = CString::new("Products").unwrap();
        let cfg = LfExportConfig {
            title: title.as_ptr(),
            page_width: 0.0,
            page_height: 0.0,
            orientation: LfPageOrientation::Landscape,
        };
        let mut out = Output::new();

        let rc = unsafe {
            lf_export_products(
                json.as_ptr(),
                json.len() as u32,
                records.as_ptr(),
                records.len() as u32,
                &cfg,
                &mut out.buf,
                &mut out.len,
                &mut out.name,
            )
        };

        assert_eq!(rc, 0, "Expected success");
        assert_eq!(&out.bytes()[0..5], b"%PDF-");
        assert_eq!(out.name(), "stored_label_products.pdf");
        out.free();
    }

    #[test]
    fn ffi_null_input() {
        let mut out = Output::new();
        let rc = unsafe {
            lf_export_template(ptr::null(), 0, ptr::null(), &mut out.buf, &mut out.len, &mut out.name)
        };
        assert_eq!(rc, 1, "Should fail on null input");
        assert!(last_error().contains("Null pointer"));
    }

    #[test]
    fn ffi_invalid_json() {
        let json = b"{ not json";
        let mut out = Output::new();
        let rc = unsafe {
            lf_export_template(
                json.as_ptr(),
                json.len() as u32,
                ptr::null(),
                &mut out.buf,
                &mut out.len,
                &mut out.name,
            )
        };
        assert_eq!(rc, 3);
        assert!(last_error().contains("template JSON"));
    }

    #[test]
    fn ffi_invalid_records() {
        let json = templates::product_label_json();
        let records = br#"{"name": "not a list"}"#;
        let mut out = Output::new();
        let rc = unsafe {
            lf_export_products(
                json.as_ptr(),
                json.len() as u32,
                records.as_ptr(),
                records.len() as u32,
                ptr::null(),
                &mut out.buf,
                &mut out.len,
                &mut out.name,
            )
        };
        assert_eq!(rc, 3);
        assert!(last_error().contains("records JSON"));
    }

    #[test]
    fn ffi_config_zero_fields_use_defaults() {
        let cfg = LfExportConfig {
            title: ptr::null(),
            page_width: 0.0,
            page_height: 0.0,
            orientation: LfPageOrientation::Portrait,
        };
        let c = unsafe { export_config_from_c(&cfg) };
        assert_eq!(c.page_width, 595.28);
        assert_eq!(c.page_height, 841.89);
        assert!(c.title.is_empty());
    }

    #[test]
    fn ffi_version() {
        let v = lf_version();
        let version = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}
