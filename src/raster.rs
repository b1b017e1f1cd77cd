//! Rasterization – turns a [`Composition`] into a pixel surface.
//!
//! The capture step is an injectable [`CaptureService`]; [`BitmapRasterizer`]
//! is the built-in implementation. It paints boxes in order (background,
//! border, stripes, image, text, children) onto an RGBA buffer.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::composition::{
    BorderStyle, Color, Composition, LayoutBox, TextAlign, TextContent, WHITE,
};
use crate::error::RenderError;
use crate::fonts;

/// Dash pattern for dashed borders, in px.
const DASH_ON: u32 = 6;
const DASH_OFF: u32 = 4;

/// Largest canvas side, in px, a capture will allocate.
pub const MAX_SURFACE_SIDE: u32 = 32_768;

/// A rasterized canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSurface {
    pub pixels: RgbaImage,
}

impl RenderSurface {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }
}

/// Captures a composition into pixels.
pub trait CaptureService {
    fn capture(&self, composition: &Composition) -> Result<RenderSurface, RenderError>;
}

/// Built-in software rasterizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitmapRasterizer;

impl CaptureService for BitmapRasterizer {
    fn capture(&self, composition: &Composition) -> Result<RenderSurface, RenderError> {
        if composition.width == 0 || composition.height == 0 {
            return Err(RenderError::Rasterization(format!(
                "empty canvas {}x{}",
                composition.width, composition.height
            )));
        }
        if composition.width > MAX_SURFACE_SIDE || composition.height > MAX_SURFACE_SIDE {
            return Err(RenderError::Rasterization(format!(
                "canvas {}x{} exceeds the {MAX_SURFACE_SIDE} px limit",
                composition.width, composition.height
            )));
        }

        let mut img = RgbaImage::from_pixel(composition.width, composition.height, composition.background);
        for lbox in &composition.boxes {
            paint_box(&mut img, lbox);
        }
        if let Some(frame) = &composition.frame {
            let (w, h) = (composition.width as f32, composition.height as f32);
            stroke_rect(&mut img, 0.0, 0.0, w, h, frame);
        }
        Ok(RenderSurface::new(img))
    }
}

fn paint_box(img: &mut RgbaImage, lbox: &LayoutBox) {
    if let Some(bg) = lbox.background {
        fill_rect(img, lbox.x, lbox.y, lbox.width, lbox.height, bg);
    }

    if let Some(border) = &lbox.border {
        stroke_rect(img, lbox.x, lbox.y, lbox.width, lbox.height, border);
    }

    if let Some(stripes) = &lbox.stripes {
        let period = (stripes.bar + stripes.gap).max(1);
        let (x0, y0, x1, y1) = pixel_bounds(img, lbox.x, lbox.y, lbox.width, lbox.height);
        for x in x0..x1 {
            let color = if (x - x0) % period < stripes.bar {
                stripes.color
            } else {
                WHITE
            };
            for y in y0..y1 {
                img.put_pixel(x, y, color);
            }
        }
    }

    if let Some(content) = &lbox.image {
        let w = lbox.width.round() as u32;
        let h = lbox.height.round() as u32;
        if w > 0 && h > 0 {
            let scaled = if content.pixels.dimensions() == (w, h) {
                (*content.pixels).clone()
            } else {
                imageops::resize(&*content.pixels, w, h, FilterType::Triangle)
            };
            imageops::overlay(img, &scaled, lbox.x.round() as i64, lbox.y.round() as i64);
        }
    }

    if let Some(text) = &lbox.text {
        paint_text(img, lbox, text);
    }

    for child in &lbox.children {
        paint_box(img, child);
    }
}

fn paint_text(img: &mut RgbaImage, lbox: &LayoutBox, text: &TextContent) {
    // Centre each glyph row inside its line box.
    let leading = (text.line_height - text.font_size) / 2.0;
    for (i, line) in text.lines.iter().enumerate() {
        let line_w = fonts::measure_text_width(line, text.font_size);
        let x = match text.align {
            TextAlign::Left => lbox.x,
            TextAlign::Center => lbox.x + ((lbox.width - line_w) / 2.0).max(0.0),
        };
        let y = lbox.y + i as f32 * text.line_height + leading;
        fonts::draw_text(
            img,
            x.round() as i64,
            y.round() as i64,
            line,
            text.font_size,
            text.color,
            text.bold,
        );
    }
}

/// Clamp a float rectangle to integer pixel bounds `[x0, x1) × [y0, y1)`.
fn pixel_bounds(img: &RgbaImage, x: f32, y: f32, w: f32, h: f32) -> (u32, u32, u32, u32) {
    let clamp = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
    (
        clamp(x, img.width()),
        clamp(y, img.height()),
        clamp(x + w, img.width()),
        clamp(y + h, img.height()),
    )
}

fn fill_rect(img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let (x0, y0, x1, y1) = pixel_bounds(img, x, y, w, h);
    for yy in y0..y1 {
        for xx in x0..x1 {
            img.put_pixel(xx, yy, color);
        }
    }
}

fn stroke_rect(img: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32, border: &BorderStyle) {
    let bw = border.width.round().max(1.0) as u32;
    let (x0, y0, x1, y1) = pixel_bounds(img, x, y, w, h);
    if x1 <= x0 || y1 <= y0 {
        return;
    }
    let on = |t: u32| !border.dashed || t % (DASH_ON + DASH_OFF) < DASH_ON;

    for xx in x0..x1 {
        if !on(xx - x0) {
            continue;
        }
        for k in 0..bw {
            if y0 + k < y1 {
                img.put_pixel(xx, y0 + k, border.color);
            }
            if y1 >= y0 + k + 1 {
                img.put_pixel(xx, y1 - 1 - k, border.color);
            }
        }
    }
    for yy in y0..y1 {
        if !on(yy - y0) {
            continue;
        }
        for k in 0..bw {
            if x0 + k < x1 {
                img.put_pixel(x0 + k, yy, border.color);
            }
            if x1 >= x0 + k + 1 {
                img.put_pixel(x1 - 1 - k, yy, border.color);
            }
        }
    }
}

/// Paint a single centred message on a dashed box of the given size. Used
/// when a capture service fails and something still has to be shown.
///
/// Both sides are clamped to `1..=MAX_SURFACE_SIDE`.
pub fn fallback_surface(width: u32, height: u32, message: &str) -> RenderSurface {
    let width = width.clamp(1, MAX_SURFACE_SIDE);
    let height = height.clamp(1, MAX_SURFACE_SIDE);
    let mut img = RgbaImage::from_pixel(width, height, WHITE);
    let border = BorderStyle::dashed(2.0, crate::composition::BORDER_GREY);
    stroke_rect(&mut img, 0.0, 0.0, width as f32, height as f32, &border);

    let font_size = 14.0;
    let text_w = fonts::measure_text_width(message, font_size);
    let x = ((width as f32 - text_w) / 2.0).max(0.0);
    let y = ((height as f32 - font_size) / 2.0).max(0.0);
    fonts::draw_text(
        &mut img,
        x.round() as i64,
        y.round() as i64,
        message,
        font_size,
        crate::composition::MUTED_TEXT,
        false,
    );
    RenderSurface::new(img)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::{hex, StripeFill, BLACK};

    fn canvas(boxes: Vec<LayoutBox>) -> Composition {
        Composition {
            width: 100,
            height: 80,
            background: WHITE,
            frame: None,
            boxes,
        }
    }

    #[test]
    fn capture_matches_canvas_size() {
        let surface = BitmapRasterizer.capture(&canvas(Vec::new())).unwrap();
        assert_eq!((surface.width(), surface.height()), (100, 80));
        assert!(surface.pixels.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn empty_canvas_is_an_error() {
        let mut c = canvas(Vec::new());
        c.height = 0;
        assert!(matches!(
            BitmapRasterizer.capture(&c),
            Err(RenderError::Rasterization(_))
        ));
    }

    #[test]
    fn background_and_border_are_painted() {
        let mut b = LayoutBox::new(10.0, 10.0, 20.0, 20.0);
        b.background = Some(hex(0x112233));
        b.border = Some(BorderStyle::solid(1.0, BLACK));
        let surface = BitmapRasterizer.capture(&canvas(vec![b])).unwrap();
        assert_eq!(*surface.pixels.get_pixel(15, 15), hex(0x112233));
        assert_eq!(*surface.pixels.get_pixel(10, 15), BLACK);
        assert_eq!(*surface.pixels.get_pixel(29, 15), BLACK);
        assert_eq!(*surface.pixels.get_pixel(5, 5), WHITE);
    }

    #[test]
    fn stripes_alternate() {
        let mut b = LayoutBox::new(0.0, 0.0, 8.0, 4.0);
        b.stripes = Some(StripeFill {
            bar: 2,
            gap: 2,
            color: BLACK,
        });
        let surface = BitmapRasterizer.capture(&canvas(vec![b])).unwrap();
        assert_eq!(*surface.pixels.get_pixel(0, 1), BLACK);
        assert_eq!(*surface.pixels.get_pixel(1, 1), BLACK);
        assert_eq!(*surface.pixels.get_pixel(2, 1), WHITE);
        assert_eq!(*surface.pixels.get_pixel(4, 1), BLACK);
    }

    #[test]
    fn oversized_canvas_is_an_error() {
        let mut c = canvas(Vec::new());
        c.height = u32::MAX;
        assert!(matches!(
            BitmapRasterizer.capture(&c),
            Err(RenderError::Rasterization(_))
        ));
    }

    #[test]
    fn fallback_surface_is_clamped() {
        let s = fallback_surface(10, u32::MAX, "Render failed");
        assert_eq!((s.width(), s.height()), (10, MAX_SURFACE_SIDE));
    }

    #[test]
    fn fallback_surface_has_requested_size() {
        let s = fallback_surface(120, 40, "Render failed");
        assert_eq!((s.width(), s.height()), (120, 40));
    }
}
