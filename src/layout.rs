//! Layout renderer – turns a bound widget set into a [`Composition`] and
//! captures it into a [`RenderSurface`].
//!
//! Every widget is absolutely positioned at its stored `left`/`top` inside a
//! canvas of fixed reference width; the canvas grows downward to fit the
//! lowest widget. Per-variant visuals are built by one exhaustive `match`.
//! Labeled inputs are laid out with Taffy flexbox so the four label
//! positions map directly onto flex directions.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::RgbaImage;
use taffy::prelude::*;

use crate::barcode::{BarcodeOptions, BarcodeService, Code128Service};
use crate::binder::BoundWidgets;
use crate::composition::*;
use crate::error::{ExportError, RenderError};
use crate::fonts;
use crate::raster::{fallback_surface, BitmapRasterizer, CaptureService, RenderSurface};
use crate::widget::{FontWeight, LabelPosition, Widget, WidgetKind};

/// Widgets are never narrower than this, in px.
const MIN_WIDGET_WIDTH: f32 = 100.0;
const WIDGET_PADDING: f32 = 5.0;
const IMAGE_PADDING: f32 = 20.0;
const BARCODE_PADDING: f32 = 10.0;
const PLACEHOLDER_BORDER: f32 = 2.0;
const IMAGE_MIN_HEIGHT: f32 = 120.0;
const IMAGE_MAX_HEIGHT: f32 = 200.0;
const BARCODE_MIN_HEIGHT: f32 = 80.0;
const LABEL_GAP: f32 = 10.0;
const LABEL_PADDING: f32 = 5.0;
const INPUT_PADDING: f32 = 8.0;
const INPUT_BORDER: f32 = 1.0;
const INPUT_FONT_SIZE: f32 = 14.0;
const INPUT_MIN_HEIGHT: f32 = 20.0;
const SEPARATOR_THICKNESS: f32 = 2.0;
const SEPARATOR_MARGIN: f32 = 10.0;
const FALLBACK_BARS_W: f32 = 150.0;
const FALLBACK_BARS_H: f32 = 50.0;
const FALLBACK_TEXT_SIZE: f32 = 12.0;

// ---------------------------------------------------------------------------
// Canvas configuration
// ---------------------------------------------------------------------------

/// Geometry of the off-screen canvas widgets are composed on.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    /// Logical content width in px; must match the editor's canvas width.
    pub reference_width: f32,
    /// Minimum content height in px.
    pub min_height: f32,
    pub padding: f32,
    /// Width of the dashed frame around the canvas.
    pub frame_width: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            reference_width: 800.0,
            min_height: 600.0,
            padding: 20.0,
            frame_width: 2.0,
        }
    }
}

impl CanvasConfig {
    /// Reject canvases that cannot host a composition.
    pub fn validate(&self) -> Result<(), ExportError> {
        let finite_non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !self.reference_width.is_finite() || self.reference_width <= 0.0 {
            return Err(ExportError::MissingCanvasTarget(format!(
                "reference width {} is not a positive size",
                self.reference_width
            )));
        }
        if !finite_non_negative(self.min_height)
            || !finite_non_negative(self.padding)
            || !finite_non_negative(self.frame_width)
        {
            return Err(ExportError::MissingCanvasTarget(
                "canvas height, padding and frame must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Total canvas width in px, padding and frame included.
    pub fn pixel_width(&self) -> u32 {
        (self.reference_width + 2.0 * (self.padding + self.frame_width)).ceil() as u32
    }

    /// Canvas height needed for content ending at `content_bottom`.
    fn pixel_height(&self, content_bottom: f32) -> u32 {
        let inner = (self.min_height + 2.0 * self.padding).max(content_bottom);
        (inner + 2.0 * self.frame_width).ceil() as u32
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Builds compositions and captures them through injectable services.
pub struct Renderer {
    canvas: CanvasConfig,
    capture: Box<dyn CaptureService>,
    barcodes: Box<dyn BarcodeService>,
    barcode_options: BarcodeOptions,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

impl Renderer {
    pub fn new(canvas: CanvasConfig) -> Self {
        Self {
            canvas,
            capture: Box::new(BitmapRasterizer),
            barcodes: Box::new(Code128Service),
            barcode_options: BarcodeOptions::default(),
        }
    }

    pub fn with_capture(mut self, capture: impl CaptureService + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    pub fn with_barcodes(mut self, barcodes: impl BarcodeService + 'static) -> Self {
        self.barcodes = Box::new(barcodes);
        self
    }

    pub fn with_barcode_options(mut self, options: BarcodeOptions) -> Self {
        self.barcode_options = options;
        self
    }

    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// Render a bound widget set into a surface.
    ///
    /// Never fails: if the capture service errors, a placeholder surface of
    /// the same canvas size is returned instead.
    pub fn render(&self, widgets: &BoundWidgets) -> RenderSurface {
        let composition = self.compose(widgets);
        match self.capture.capture(&composition) {
            Ok(surface) => surface,
            Err(e) => {
                log::warn!("{e}; using placeholder surface");
                fallback_surface(composition.width, composition.height, "Render failed")
            }
        }
    }

    /// Build the composition for a bound widget set. One top-level box per
    /// widget, in widget order.
    pub fn compose(&self, widgets: &BoundWidgets) -> Composition {
        let origin = self.canvas.frame_width;
        let mut boxes = Vec::with_capacity(widgets.len());
        let mut content_bottom = 0.0f32;

        for widget in widgets.iter() {
            let mut element = self.build_widget(widget);
            element.translate(origin + widget.left, origin + widget.top);
            content_bottom = content_bottom.max(widget.top + element.height);
            boxes.push(element);
        }

        let composition = Composition {
            width: self.canvas.pixel_width(),
            height: self.canvas.pixel_height(content_bottom),
            background: WHITE,
            frame: (self.canvas.frame_width > 0.0)
                .then(|| BorderStyle::dashed(self.canvas.frame_width, BORDER_GREY)),
            boxes,
        };
        log::debug!(
            "composed {} widget(s) on a {}x{} canvas",
            widgets.len(),
            composition.width,
            composition.height
        );
        composition
    }

    /// Build one widget's box at the origin.
    fn build_widget(&self, widget: &Widget) -> LayoutBox {
        let content_w = widget.width.max(MIN_WIDGET_WIDTH);
        let font_size = widget.font.size_px;
        let bold = widget.font.weight == FontWeight::Bold;

        let content = match &widget.kind {
            WidgetKind::LabeledInput {
                label_text,
                hide_label,
                label_position,
                input_value,
            } => {
                let label = (!*hide_label && !label_text.is_empty()).then_some(label_text.as_str());
                match labeled_input(label, *label_position, input_value, content_w, font_size) {
                    Ok(content) => content,
                    Err(e) => {
                        log::warn!("labeled input {:?} layout failed: {e}", widget.id);
                        placeholder("Layout failed", content_w, WIDGET_PADDING, 0.0)
                    }
                }
            }
            WidgetKind::Separator => separator(content_w),
            WidgetKind::Image { image_data, .. } => match image_data.as_deref().filter(|s| !s.is_empty()) {
                Some(src) => match decode_data_uri_image(src) {
                    Ok(pixels) => image_widget(pixels, content_w),
                    Err(e) => {
                        log::warn!("image widget {:?}: {e}", widget.id);
                        placeholder("Image Placeholder", content_w, IMAGE_PADDING, IMAGE_MIN_HEIGHT)
                    }
                },
                None => placeholder("Image Placeholder", content_w, IMAGE_PADDING, IMAGE_MIN_HEIGHT),
            },
            WidgetKind::Barcode {
                product_id,
                has_barcode,
            } => match (*has_barcode, product_id.as_deref()) {
                (true, Some(payload)) if !payload.is_empty() => {
                    match self.barcodes.encode(payload, &self.barcode_options) {
                        Some(symbol) => barcode_symbol(symbol, content_w),
                        None => {
                            let e = RenderError::BarcodeGeneration(format!("no symbol for {payload:?}"));
                            log::warn!("barcode widget {:?}: {e}; drawing bar pattern", widget.id);
                            barcode_fallback(payload, content_w)
                        }
                    }
                }
                _ => {
                    let mut c = placeholder(
                        "Barcode Placeholder",
                        content_w,
                        BARCODE_PADDING,
                        BARCODE_MIN_HEIGHT,
                    );
                    c.background = Some(BARCODE_BG);
                    c
                }
            },
            WidgetKind::Content { content, .. } => text_block(content, content_w, font_size, bold),
        };

        content.into_box(content_w, widget.height)
    }
}

// ---------------------------------------------------------------------------
// Per-variant content
// ---------------------------------------------------------------------------

/// A widget's inner content, positioned relative to the content-box origin,
/// plus the decoration of the element around it.
struct WidgetContent {
    children: Vec<LayoutBox>,
    intrinsic_height: f32,
    min_height: f32,
    padding: f32,
    border: Option<BorderStyle>,
    background: Option<Color>,
    /// Centre children vertically when the element is taller than them.
    center: bool,
}

impl WidgetContent {
    fn plain(children: Vec<LayoutBox>, intrinsic_height: f32) -> Self {
        Self {
            children,
            intrinsic_height,
            min_height: 0.0,
            padding: WIDGET_PADDING,
            border: None,
            background: None,
            center: false,
        }
    }

    /// Wrap the content into the element box at origin `(0, 0)`.
    fn into_box(self, content_w: f32, fixed_height: Option<f32>) -> LayoutBox {
        let content_h = fixed_height
            .unwrap_or(self.intrinsic_height)
            .max(self.min_height);
        let border_w = self.border.map(|b| b.width).unwrap_or(0.0);
        let inset = self.padding + border_w;

        let mut element = LayoutBox::new(0.0, 0.0, content_w + 2.0 * inset, content_h + 2.0 * inset);
        element.border = self.border;
        element.background = self.background;

        let dy = if self.center {
            ((content_h - self.intrinsic_height) / 2.0).max(0.0)
        } else {
            0.0
        };
        for mut child in self.children {
            child.translate(inset, inset + dy);
            element.children.push(child);
        }
        element
    }
}

fn text_content(lines: Vec<String>, font_size: f32, bold: bool, color: Color, align: TextAlign) -> TextContent {
    TextContent {
        lines,
        font_size,
        bold,
        color,
        line_height: fonts::line_height(font_size),
        align,
    }
}

fn text_block(text: &str, content_w: f32, font_size: f32, bold: bool) -> WidgetContent {
    let lines = fonts::wrap_text(text, font_size, content_w);
    let height = lines.len() as f32 * fonts::line_height(font_size);
    if lines.is_empty() {
        return WidgetContent::plain(Vec::new(), 0.0);
    }
    let mut b = LayoutBox::new(0.0, 0.0, content_w, height);
    b.text = Some(text_content(lines, font_size, bold, BLACK, TextAlign::Left));
    WidgetContent::plain(vec![b], height)
}

fn separator(content_w: f32) -> WidgetContent {
    let mut rule = LayoutBox::new(0.0, SEPARATOR_MARGIN, content_w, SEPARATOR_THICKNESS);
    rule.background = Some(BORDER_GREY);
    WidgetContent::plain(vec![rule], SEPARATOR_THICKNESS + 2.0 * SEPARATOR_MARGIN)
}

/// Dashed box with a centred caption.
fn placeholder(caption: &str, content_w: f32, padding: f32, min_height: f32) -> WidgetContent {
    let lh = fonts::line_height(INPUT_FONT_SIZE);
    let lines = fonts::wrap_text(caption, INPUT_FONT_SIZE, content_w);
    let height = lines.len() as f32 * lh;
    let mut caption_box = LayoutBox::new(0.0, 0.0, content_w, height);
    caption_box.text = Some(text_content(lines, INPUT_FONT_SIZE, false, MUTED_TEXT, TextAlign::Center));
    WidgetContent {
        children: vec![caption_box],
        intrinsic_height: height,
        min_height,
        padding,
        border: Some(BorderStyle::dashed(PLACEHOLDER_BORDER, BORDER_GREY)),
        background: None,
        center: true,
    }
}

/// Scale `(w, h)` down to fit `(max_w, max_h)`, keeping the aspect ratio.
fn contain(w: f32, h: f32, max_w: f32, max_h: f32) -> (f32, f32) {
    if w <= 0.0 || h <= 0.0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / w).min(max_h / h).min(1.0);
    ((w * scale).max(1.0), (h * scale).max(1.0))
}

fn centered_image(pixels: RgbaImage, content_w: f32, max_h: f32) -> (LayoutBox, f32) {
    let (w, h) = contain(pixels.width() as f32, pixels.height() as f32, content_w, max_h);
    let mut b = LayoutBox::new(((content_w - w) / 2.0).max(0.0), 0.0, w, h);
    b.image = Some(ImageContent {
        pixels: Arc::new(pixels),
    });
    (b, h)
}

fn image_widget(pixels: RgbaImage, content_w: f32) -> WidgetContent {
    let (b, h) = centered_image(pixels, content_w, IMAGE_MAX_HEIGHT);
    WidgetContent {
        children: vec![b],
        intrinsic_height: h,
        min_height: IMAGE_MIN_HEIGHT,
        padding: IMAGE_PADDING,
        border: None,
        background: None,
        center: true,
    }
}

fn barcode_symbol(symbol: RgbaImage, content_w: f32) -> WidgetContent {
    let (b, h) = centered_image(symbol, content_w, f32::INFINITY);
    WidgetContent {
        children: vec![b],
        intrinsic_height: h,
        min_height: BARCODE_MIN_HEIGHT,
        padding: BARCODE_PADDING,
        border: None,
        background: Some(BARCODE_BG),
        center: true,
    }
}

/// Striped bars with the payload beneath, drawn when no symbol could be
/// generated.
fn barcode_fallback(payload: &str, content_w: f32) -> WidgetContent {
    let bars_x = ((content_w - FALLBACK_BARS_W) / 2.0).max(0.0);
    let mut bars = LayoutBox::new(bars_x, 0.0, FALLBACK_BARS_W, FALLBACK_BARS_H);
    bars.stripes = Some(StripeFill {
        bar: 2,
        gap: 2,
        color: BLACK,
    });

    let lh = fonts::line_height(FALLBACK_TEXT_SIZE);
    let lines = fonts::wrap_text(payload, FALLBACK_TEXT_SIZE, content_w);
    let text_h = lines.len() as f32 * lh;
    let mut caption = LayoutBox::new(0.0, FALLBACK_BARS_H + 5.0, content_w, text_h);
    caption.text = Some(text_content(lines, FALLBACK_TEXT_SIZE, false, BLACK, TextAlign::Center));

    WidgetContent {
        children: vec![bars, caption],
        intrinsic_height: FALLBACK_BARS_H + 5.0 + text_h,
        min_height: BARCODE_MIN_HEIGHT,
        padding: BARCODE_PADDING,
        border: None,
        background: Some(BARCODE_BG),
        center: true,
    }
}

/// Label and value box laid out as a flex container whose direction follows
/// the label position.
fn labeled_input(
    label: Option<&str>,
    position: LabelPosition,
    value: &str,
    content_w: f32,
    font_size: f32,
) -> Result<WidgetContent, taffy::TaffyError> {
    let is_row = matches!(position, LabelPosition::Left | LabelPosition::Right);
    let mut taffy: TaffyTree<()> = TaffyTree::new();

    let label_lh = fonts::line_height(font_size);
    let label_size = label.map(|text| {
        let w = (fonts::measure_text_width(text, font_size) + 2.0 * LABEL_PADDING).min(content_w);
        (w, label_lh + 2.0 * LABEL_PADDING)
    });

    // Estimate the value box width up front so its text can be wrapped.
    let input_w = match (is_row, label_size) {
        (true, Some((lw, _))) => (content_w - lw - LABEL_GAP).max(2.0 * (INPUT_PADDING + INPUT_BORDER) + 1.0),
        _ => content_w,
    };
    let inset = INPUT_PADDING + INPUT_BORDER;
    let value_lines = fonts::wrap_text(value, INPUT_FONT_SIZE, input_w - 2.0 * inset);
    let value_lh = fonts::line_height(INPUT_FONT_SIZE);
    let input_h = (value_lines.len() as f32 * value_lh).max(INPUT_MIN_HEIGHT) + 2.0 * inset;

    let label_node = match label_size {
        Some((w, h)) => Some(taffy.new_leaf(Style {
            size: Size {
                width: Dimension::Length(w),
                height: Dimension::Length(h),
            },
            flex_shrink: 0.0,
            ..Default::default()
        })?),
        None => None,
    };

    let input_style = if is_row {
        Style {
            size: Size {
                width: Dimension::Auto,
                height: Dimension::Length(input_h),
            },
            flex_grow: 1.0,
            flex_shrink: 1.0,
            flex_basis: Dimension::Length(0.0),
            min_size: Size {
                width: Dimension::Length(0.0),
                height: Dimension::Auto,
            },
            ..Default::default()
        }
    } else {
        Style {
            size: Size {
                width: Dimension::Percent(1.0),
                height: Dimension::Length(input_h),
            },
            ..Default::default()
        }
    };
    let input_node = taffy.new_leaf(input_style)?;

    let mut children = Vec::new();
    if let Some(node) = label_node {
        children.push(node);
    }
    children.push(input_node);

    let root = taffy.new_with_children(
        Style {
            display: taffy::Display::Flex,
            flex_direction: match position {
                LabelPosition::Left => taffy::FlexDirection::Row,
                LabelPosition::Right => taffy::FlexDirection::RowReverse,
                LabelPosition::Top => taffy::FlexDirection::Column,
                LabelPosition::Bottom => taffy::FlexDirection::ColumnReverse,
            },
            align_items: Some(if is_row {
                taffy::AlignItems::Center
            } else {
                taffy::AlignItems::FlexStart
            }),
            gap: Size {
                width: LengthPercentage::Length(LABEL_GAP),
                height: LengthPercentage::Length(LABEL_GAP),
            },
            size: Size {
                width: Dimension::Length(content_w),
                height: Dimension::Auto,
            },
            ..Default::default()
        },
        &children,
    )?;

    taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_w),
            height: AvailableSpace::MaxContent,
        },
    )?;

    let mut boxes = Vec::new();
    if let (Some(node), Some(text)) = (label_node, label) {
        let l = taffy.layout(node)?;
        let mut b = LayoutBox::new(l.location.x, l.location.y, l.size.width, l.size.height);
        let mut text_box = LayoutBox::new(
            l.location.x + LABEL_PADDING,
            l.location.y + LABEL_PADDING,
            (l.size.width - 2.0 * LABEL_PADDING).max(0.0),
            label_lh,
        );
        text_box.text = Some(text_content(
            vec![text.to_string()],
            font_size,
            true,
            LABEL_COLOR,
            TextAlign::Left,
        ));
        b.children.push(text_box);
        boxes.push(b);
    }

    let l = taffy.layout(input_node)?;
    let mut input_box = LayoutBox::new(l.location.x, l.location.y, l.size.width, l.size.height);
    input_box.background = Some(WHITE);
    input_box.border = Some(BorderStyle::solid(INPUT_BORDER, BORDER_GREY));
    if !value_lines.is_empty() {
        let mut text_box = LayoutBox::new(
            l.location.x + inset,
            l.location.y + inset,
            (l.size.width - 2.0 * inset).max(0.0),
            value_lines.len() as f32 * value_lh,
        );
        text_box.text = Some(text_content(value_lines, INPUT_FONT_SIZE, false, BLACK, TextAlign::Left));
        input_box.children.push(text_box);
    }
    boxes.push(input_box);

    let height = taffy.layout(root)?.size.height;
    Ok(WidgetContent::plain(boxes, height))
}

// ---------------------------------------------------------------------------
// Data-URI images
// ---------------------------------------------------------------------------

/// Parse a `data:<mime>;base64,<data>` URI and decode the image it carries.
pub fn decode_data_uri_image(src: &str) -> Result<RgbaImage, RenderError> {
    let bytes = parse_data_uri(src).map_err(RenderError::Rasterization)?;
    ::image::load_from_memory(&bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| RenderError::Rasterization(format!("image decode error: {e}")))
}

/// Parse a `data:<mime>;base64,<data>` URI and return the raw decoded bytes.
fn parse_data_uri(src: &str) -> Result<Vec<u8>, String> {
    let rest = src.strip_prefix("data:").ok_or_else(|| {
        let preview: String = src.chars().take(80).collect();
        format!("image source must be a base64 data URI, got {preview:?}")
    })?;
    let comma_pos = rest
        .find(',')
        .ok_or_else(|| "invalid data URI: missing `,` separator".to_string())?;
    let header = &rest[..comma_pos];
    if !header.contains(";base64") {
        return Err("only base64-encoded data URIs are supported".to_string());
    }
    BASE64_STD
        .decode(rest[comma_pos + 1..].trim())
        .map_err(|e| format!("base64 decode error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::bind;
    use crate::templates;
    use crate::widget::{Record, Template};

    /// 1×1 transparent PNG.
    const PIXEL_PNG: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

    struct FailingBarcodes;

    impl BarcodeService for FailingBarcodes {
        fn encode(&self, _payload: &str, _options: &BarcodeOptions) -> Option<RgbaImage> {
            None
        }
    }

    struct FailingCapture;

    impl CaptureService for FailingCapture {
        fn capture(&self, _composition: &Composition) -> Result<RenderSurface, RenderError> {
            Err(RenderError::Rasterization("simulated".into()))
        }
    }

    fn single(widget: Widget) -> BoundWidgets {
        BoundWidgets {
            widgets: vec![widget],
        }
    }

    fn find_text(c: &Composition, needle: &str) -> bool {
        c.text_lines().iter().any(|l| l == needle)
    }

    #[test]
    fn empty_template_uses_minimum_canvas() {
        let r = Renderer::default();
        let c = r.compose(&BoundWidgets { widgets: vec![] });
        assert_eq!(c.width, 844);
        assert_eq!(c.height, 644);
        assert!(c.boxes.is_empty());
    }

    #[test]
    fn canvas_grows_to_fit_lowest_widget() {
        let r = Renderer::default();
        let c = r.compose(&single(Widget::separator(1, 0.0, 1500.0, 700.0)));
        // 1500 + 22 content + 10 padding + 4 frame
        assert_eq!(c.height, 1536);
    }

    #[test]
    fn widgets_are_positioned_at_stored_offsets() {
        let r = Renderer::default();
        let c = r.compose(&single(Widget::separator(1, 30.0, 40.0, 700.0)));
        assert_eq!((c.boxes[0].x, c.boxes[0].y), (32.0, 42.0));
        assert_eq!(c.boxes[0].width, 710.0);
    }

    #[test]
    fn narrow_widgets_get_minimum_width() {
        let r = Renderer::default();
        let c = r.compose(&single(Widget::content(1, 0.0, 0.0, 20.0, "x")));
        assert_eq!(c.boxes[0].width, 110.0);
    }

    #[test]
    fn fixed_height_is_respected() {
        let r = Renderer::default();
        let c = r.compose(&single(Widget::content(1, 0.0, 0.0, 200.0, "x").with_height(90.0)));
        assert_eq!(c.boxes[0].height, 100.0);
    }

    #[test]
    fn label_left_lays_out_as_row() {
        let r = Renderer::default();
        let mut w = Widget::labeled_input(1, 0.0, 0.0, 300.0, "Name");
        if let WidgetKind::LabeledInput { input_value, .. } = &mut w.kind {
            *input_value = "Alice".into();
        }
        let c = r.compose(&single(w));
        let el = &c.boxes[0];
        assert_eq!(el.children.len(), 2);
        let (label, input) = (&el.children[0], &el.children[1]);
        assert!(label.x < input.x, "label should precede the value box");
        assert!((input.right_edge() - (el.x + 5.0 + 300.0)).abs() < 0.5);
        assert!(find_text(&c, "Name"));
        assert!(find_text(&c, "Alice"));
    }

    #[test]
    fn label_positions_map_to_flex_directions() {
        let r = Renderer::default();
        let layout = |pos: LabelPosition| {
            let mut w = Widget::labeled_input(1, 0.0, 0.0, 300.0, "Name");
            if let WidgetKind::LabeledInput { label_position, .. } = &mut w.kind {
                *label_position = pos;
            }
            let c = r.compose(&single(w));
            let el = &c.boxes[0];
            (el.children[0].clone(), el.children[1].clone())
        };

        let (label, input) = layout(LabelPosition::Right);
        assert!(label.x > input.x);
        let (label, input) = layout(LabelPosition::Top);
        assert!(label.y < input.y);
        assert_eq!(label.x, input.x);
        let (label, input) = layout(LabelPosition::Bottom);
        assert!(label.y > input.y);
    }

    #[test]
    fn hidden_or_empty_label_is_omitted() {
        let r = Renderer::default();
        let mut hidden = Widget::labeled_input(1, 0.0, 0.0, 300.0, "Name");
        if let WidgetKind::LabeledInput { hide_label, .. } = &mut hidden.kind {
            *hide_label = true;
        }
        let c = r.compose(&single(hidden));
        assert_eq!(c.boxes[0].children.len(), 1);
        assert!(!find_text(&c, "Name"));

        let c = r.compose(&single(Widget::labeled_input(1, 0.0, 0.0, 300.0, "")));
        assert_eq!(c.boxes[0].children.len(), 1);
    }

    #[test]
    fn image_without_data_is_placeholder() {
        let r = Renderer::default();
        let c = r.compose(&single(Widget::image(1, 0.0, 0.0, 200.0)));
        let el = &c.boxes[0];
        assert!(el.border.is_some_and(|b| b.dashed));
        assert!(find_text(&c, "Image Placeholder"));
        // 120 min height + 2 × (20 padding + 2 border)
        assert_eq!(el.height, 164.0);
    }

    #[test]
    fn image_with_data_is_contained() {
        let r = Renderer::default();
        let mut w = Widget::image(1, 0.0, 0.0, 200.0);
        if let WidgetKind::Image { image_data, .. } = &mut w.kind {
            *image_data = Some(PIXEL_PNG.into());
        }
        let c = r.compose(&single(w));
        let el = &c.boxes[0];
        assert!(el.border.is_none());
        let img = &el.children[0];
        assert!(img.image.is_some());
        assert_eq!((img.width, img.height), (1.0, 1.0));
    }

    #[test]
    fn contain_preserves_aspect_ratio() {
        assert_eq!(contain(400.0, 100.0, 200.0, 200.0), (200.0, 50.0));
        assert_eq!(contain(100.0, 400.0, 200.0, 200.0), (50.0, 200.0));
        assert_eq!(contain(10.0, 10.0, 200.0, 200.0), (10.0, 10.0));
    }

    #[test]
    fn undecodable_image_degrades_to_placeholder() {
        let r = Renderer::default();
        let mut w = Widget::image(1, 0.0, 0.0, 200.0);
        if let WidgetKind::Image { image_data, .. } = &mut w.kind {
            *image_data = Some("https://example.com/x.png".into());
        }
        let c = r.compose(&single(w));
        assert!(find_text(&c, "Image Placeholder"));
    }

    #[test]
    fn ready_barcode_embeds_symbol() {
        let t = Template::new(1, "t", vec![Widget::barcode(1, 0.0, 0.0, 300.0)]);
        let bound = bind(&t, Some(&Record::new().with("productId", "ABC123")), 0);
        let c = Renderer::default().compose(&bound);
        let el = &c.boxes[0];
        assert_eq!(el.background, Some(BARCODE_BG));
        assert!(el.border.is_none());
        assert!(el.children[0].image.is_some());
    }

    #[test]
    fn failing_barcode_service_draws_bar_pattern() {
        let t = Template::new(1, "t", vec![Widget::barcode(1, 0.0, 0.0, 300.0)]);
        let bound = bind(&t, Some(&Record::new().with("productId", "ABC123")), 0);
        let r = Renderer::default().with_barcodes(FailingBarcodes);
        let c = r.compose(&bound);
        let el = &c.boxes[0];
        assert!(el.children.iter().any(|b| b.stripes.is_some()));
        assert!(el.children.iter().all(|b| b.image.is_none()));
        assert!(find_text(&c, "ABC123"));

        let surface = r.render(&bound);
        assert_eq!(surface.width(), c.width);
    }

    #[test]
    fn unready_barcode_is_placeholder() {
        let c = Renderer::default().compose(&single(Widget::barcode(1, 0.0, 0.0, 300.0)));
        assert!(find_text(&c, "Barcode Placeholder"));
        assert!(c.boxes[0].border.is_some_and(|b| b.dashed));
    }

    #[test]
    fn failing_capture_returns_fallback_surface() {
        let t = templates::product_label_template();
        let bound = bind(&t, None, 0);
        let r = Renderer::default().with_capture(FailingCapture);
        let expected = r.compose(&bound);
        let surface = r.render(&bound);
        assert_eq!(
            (surface.width(), surface.height()),
            (expected.width, expected.height)
        );
    }

    #[test]
    fn far_away_widget_degrades_to_bounded_fallback() {
        let r = Renderer::default();
        let bound = single(Widget::separator(1, 0.0, 5.0e9, 700.0));
        assert!(r.compose(&bound).height > crate::raster::MAX_SURFACE_SIDE);
        let surface = r.render(&bound);
        assert_eq!(surface.height(), crate::raster::MAX_SURFACE_SIDE);
        assert_eq!(surface.width(), r.canvas().pixel_width());
    }

    #[test]
    fn data_uri_rejects_non_base64() {
        assert!(parse_data_uri("data:image/png,abc").is_err());
        assert!(parse_data_uri("image.png").is_err());
        assert!(decode_data_uri_image(PIXEL_PNG).is_ok());
    }
}
