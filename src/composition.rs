//! Composition – the off-screen visual description handed to a capture
//! service. This is the "frozen" structure that encodes exactly what goes on
//! the canvas, in canvas pixel coordinates.

use std::sync::Arc;

use image::{Rgba, RgbaImage};

pub type Color = Rgba<u8>;

/// Build an opaque colour from a `0xRRGGBB` literal.
pub const fn hex(rgb: u32) -> Color {
    Rgba([(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255])
}

pub const WHITE: Color = hex(0xffffff);
pub const BLACK: Color = hex(0x000000);
/// Border grey used for frames, rules and placeholders.
pub const BORDER_GREY: Color = hex(0xcbd5e0);
pub const LABEL_COLOR: Color = hex(0x2d3748);
pub const MUTED_TEXT: Color = hex(0x718096);
pub const BARCODE_BG: Color = hex(0xf7fafc);

/// A complete canvas ready for capture.
#[derive(Debug, Clone)]
pub struct Composition {
    /// Canvas size in pixels, frame included.
    pub width: u32,
    pub height: u32,
    pub background: Color,
    /// Border drawn around the whole canvas.
    pub frame: Option<BorderStyle>,
    /// Top-level boxes in paint order.
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone)]
pub struct LayoutBox {
    /// Position relative to the canvas top-left, in pixels.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background: Option<Color>,
    pub border: Option<BorderStyle>,

    pub text: Option<TextContent>,
    pub image: Option<ImageContent>,
    /// Vertical bar pattern used by the CSS-style barcode fallback.
    pub stripes: Option<StripeFill>,

    /// Children carry canvas-absolute coordinates too.
    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderStyle {
    pub width: f32,
    pub color: Color,
    pub dashed: bool,
}

impl BorderStyle {
    pub fn solid(width: f32, color: Color) -> Self {
        Self {
            width,
            color,
            dashed: false,
        }
    }

    pub fn dashed(width: f32, color: Color) -> Self {
        Self {
            width,
            color,
            dashed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<String>,
    pub font_size: f32,
    pub bold: bool,
    pub color: Color,
    pub line_height: f32,
    pub align: TextAlign,
}

/// Pixels drawn scaled to the box size.
#[derive(Debug, Clone)]
pub struct ImageContent {
    pub pixels: Arc<RgbaImage>,
}

/// Alternating vertical bars: `bar` px of `color`, then `gap` px of white.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StripeFill {
    pub bar: u32,
    pub gap: u32,
    pub color: Color,
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background: None,
            border: None,
            text: None,
            image: None,
            stripes: None,
            children: Vec::new(),
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn right_edge(&self) -> f32 {
        self.x + self.width
    }

    /// Move this box and all descendants.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
        for child in &mut self.children {
            child.translate(dx, dy);
        }
    }

    /// Visit this box and all descendants in paint order.
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a LayoutBox)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

impl Composition {
    /// Visit every box in paint order.
    pub fn visit<'a>(&'a self, mut f: impl FnMut(&'a LayoutBox)) {
        for b in &self.boxes {
            b.visit(&mut f);
        }
    }

    /// Collect every text line in the composition, in paint order.
    pub fn text_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.visit(|b| {
            if let Some(t) = &b.text {
                out.extend(t.lines.iter().cloned());
            }
        });
        out
    }
}
