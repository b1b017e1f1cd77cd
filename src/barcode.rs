//! Barcode symbol rendering.
//!
//! Symbol generation is an injectable [`BarcodeService`]. The built-in
//! [`Code128Service`] uses the barcoders crate for Code 128 and Code 39
//! encoding and draws the bars, plus the payload text beneath, into an RGBA
//! buffer.

use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use image::RgbaImage;

use crate::composition::{Color, BLACK, WHITE};
use crate::fonts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Symbology {
    #[default]
    Code128,
    Code39,
}

/// Rendering options for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BarcodeOptions {
    pub symbology: Symbology,
    /// Width of one module (narrowest bar) in px.
    pub module_width: u32,
    /// Bar height in px.
    pub symbol_height: u32,
    /// Draw the payload text beneath the bars.
    pub show_text: bool,
    pub font_size: f32,
    /// Quiet zone around the symbol in px.
    pub margin: u32,
    pub background: Color,
    pub line_color: Color,
}

impl Default for BarcodeOptions {
    fn default() -> Self {
        Self {
            symbology: Symbology::Code128,
            module_width: 2,
            symbol_height: 60,
            show_text: true,
            font_size: 14.0,
            margin: 5,
            background: WHITE,
            line_color: BLACK,
        }
    }
}

/// Renders a scannable symbol for a payload. `None` means the symbol could
/// not be produced; callers fall back to a placeholder.
pub trait BarcodeService {
    fn encode(&self, payload: &str, options: &BarcodeOptions) -> Option<RgbaImage>;
}

/// Built-in symbol renderer backed by barcoders.
#[derive(Debug, Clone, Copy, Default)]
pub struct Code128Service;

impl BarcodeService for Code128Service {
    fn encode(&self, payload: &str, options: &BarcodeOptions) -> Option<RgbaImage> {
        if payload.is_empty() {
            return None;
        }
        let modules = match options.symbology {
            Symbology::Code128 => encode_code128(payload),
            Symbology::Code39 => encode_code39(payload),
        };
        if modules.is_empty() {
            log::warn!("barcode payload {payload:?} cannot be encoded as {:?}", options.symbology);
            return None;
        }
        Some(draw_symbol(&modules, payload, options))
    }
}

/// Encode data as Code 128 modules (1 = bar, 0 = space).
pub fn encode_code128(data: &str) -> Vec<u8> {
    // Character set B covers upper/lower case, digits and punctuation.
    let prefixed = format!("\u{0181}{data}");
    match Code128::new(&prefixed) {
        Ok(b) => b.encode(),
        Err(_) => Vec::new(),
    }
}

/// Encode data as Code 39 modules (1 = bar, 0 = space).
pub fn encode_code39(data: &str) -> Vec<u8> {
    match Code39::new(data) {
        Ok(b) => b.encode(),
        Err(_) => Vec::new(),
    }
}

fn draw_symbol(modules: &[u8], payload: &str, options: &BarcodeOptions) -> RgbaImage {
    let module_w = options.module_width.max(1);
    let bars_w = modules.len() as u32 * module_w;
    let text_h = if options.show_text {
        2 + fonts::line_height(options.font_size).ceil() as u32
    } else {
        0
    };
    let width = bars_w + 2 * options.margin;
    let height = options.margin * 2 + options.symbol_height + text_h;

    let mut img = RgbaImage::from_pixel(width, height, options.background);
    for (i, &m) in modules.iter().enumerate() {
        if m != 1 {
            continue;
        }
        let x0 = options.margin + i as u32 * module_w;
        for x in x0..x0 + module_w {
            for y in options.margin..options.margin + options.symbol_height {
                img.put_pixel(x, y, options.line_color);
            }
        }
    }

    if options.show_text {
        let text_w = fonts::measure_text_width(payload, options.font_size);
        let x = ((width as f32 - text_w) / 2.0).max(0.0);
        let y = (options.margin + options.symbol_height + 2) as f32
            + (fonts::line_height(options.font_size) - options.font_size) / 2.0;
        fonts::draw_text(
            &mut img,
            x.round() as i64,
            y.round() as i64,
            payload,
            options.font_size,
            options.line_color,
            false,
        );
    }
    img
}
