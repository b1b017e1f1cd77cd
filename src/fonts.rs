//! Text measurement and glyph drawing using the Spleen bitmap font.
//!
//! For reproducible surfaces we render every string with one monospaced
//! bitmap face (Spleen 8×16) scaled by nearest neighbour. A glyph cell is
//! half as wide as the font size, so measurement is exact and needs no font
//! files at runtime.

use image::{Rgba, RgbaImage};
use spleen_font::{PSF2Font, FONT_8X16};

/// Source glyph dimensions of the embedded face.
const GLYPH_W: u32 = 8;
const GLYPH_H: u32 = 16;

/// Line height as a multiple of font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Width of one character cell in px.
pub fn char_width(font_size: f32) -> f32 {
    font_size * 0.5
}

/// Line height in px.
pub fn line_height(font_size: f32) -> f32 {
    font_size * LINE_HEIGHT_FACTOR
}

/// Measure the width of a single line of text in px.
pub fn measure_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().count() as f32 * char_width(font_size)
}

/// Word-wrap text to fit within `max_width` pixels. Words longer than a full
/// line are broken at character boundaries.
pub fn wrap_text(text: &str, font_size: f32, max_width: f32) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let cw = char_width(font_size);
    if max_width <= 0.0 || cw <= 0.0 {
        return text.split('\n').map(str::to_string).collect();
    }
    let max_chars = ((max_width / cw).floor() as usize).max(1);

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            let mut word: Vec<char> = word.chars().collect();
            let current_len = current.chars().count();
            let needed = if current.is_empty() {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed <= max_chars {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.extend(word);
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            while word.len() > max_chars {
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            current = word.into_iter().collect();
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    lines
}

/// Draw one line of text with its top-left corner at `(x, y)`.
///
/// Bold text is drawn twice with a one pixel horizontal offset. Characters
/// missing from the face are drawn as hollow boxes.
pub fn draw_text(
    img: &mut RgbaImage,
    x: i64,
    y: i64,
    text: &str,
    font_size: f32,
    color: Rgba<u8>,
    bold: bool,
) {
    let cell_w = char_width(font_size).round().max(1.0) as u32;
    let cell_h = font_size.round().max(1.0) as u32;

    let mut face = match PSF2Font::new(FONT_8X16) {
        Ok(face) => face,
        Err(_) => {
            log::warn!("embedded bitmap font failed to load; text skipped");
            return;
        }
    };

    for (i, ch) in text.chars().enumerate() {
        let glyph = glyph_bitmap(&mut face, ch);
        let gx = x + i as i64 * cell_w as i64;
        for dy in 0..cell_h {
            let sy = dy * GLYPH_H / cell_h;
            for dx in 0..cell_w {
                let sx = dx * GLYPH_W / cell_w;
                if !glyph[(sy * GLYPH_W + sx) as usize] {
                    continue;
                }
                put_pixel(img, gx + dx as i64, y + dy as i64, color);
                if bold {
                    put_pixel(img, gx + dx as i64 + 1, y + dy as i64, color);
                }
            }
        }
    }
}

fn glyph_bitmap(face: &mut PSF2Font, ch: char) -> Vec<bool> {
    let mut bitmap = vec![false; (GLYPH_W * GLYPH_H) as usize];
    if ch == ' ' {
        return bitmap;
    }
    let utf8 = ch.to_string();
    match face.glyph_for_utf8(utf8.as_bytes()) {
        Some(glyph) => {
            for (row_y, row) in glyph.enumerate() {
                for (col_x, on) in row.enumerate() {
                    let idx = row_y * GLYPH_W as usize + col_x;
                    if idx < bitmap.len() {
                        bitmap[idx] = on;
                    }
                }
            }
        }
        None => {
            for yy in 2..GLYPH_H - 2 {
                for xx in 1..GLYPH_W - 1 {
                    let edge = yy == 2 || yy == GLYPH_H - 3 || xx == 1 || xx == GLYPH_W - 2;
                    bitmap[(yy * GLYPH_W + xx) as usize] = edge;
                }
            }
        }
    }
    bitmap
}

fn put_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}
