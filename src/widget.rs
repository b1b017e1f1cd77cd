//! Widget model – templates, widgets and data records.
//!
//! Widgets are stored by the editor as flat JSON objects carrying a `type`
//! tag and camelCase attributes. On the Rust side a widget is a set of common
//! geometry/font fields plus a closed [`WidgetKind`] enum, so every renderer
//! and binder `match` is exhaustive. Conversion between the two shapes goes
//! through [`RawWidget`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::WidgetError;

/// Type tag used for widgets created with [`Widget::content`].
pub const CONTENT_TAG: &str = "content";

/// Default font size in pixels when a widget does not specify one.
pub const DEFAULT_FONT_SIZE_PX: f32 = 14.0;

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// A saved, reusable layout of widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

impl Template {
    pub fn new(id: u64, name: impl Into<String>, widgets: Vec<Widget>) -> Self {
        Self {
            id,
            name: name.into(),
            widgets,
        }
    }

    /// Serialise to pretty JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// Widget
// ---------------------------------------------------------------------------

/// Where the label of a labeled input sits relative to its value box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelPosition {
    Top,
    Bottom,
    #[default]
    Left,
    Right,
}

impl LabelPosition {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "top" => LabelPosition::Top,
            "bottom" => LabelPosition::Bottom,
            "right" => LabelPosition::Right,
            _ => LabelPosition::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LabelPosition::Top => "top",
            LabelPosition::Bottom => "bottom",
            LabelPosition::Left => "left",
            LabelPosition::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Font styling shared by every widget variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size_px: f32,
    pub weight: FontWeight,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            size_px: DEFAULT_FONT_SIZE_PX,
            weight: FontWeight::Normal,
        }
    }
}

/// Variant-specific widget attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetKind {
    /// A label next to a value box. `label_text` doubles as the binding key.
    LabeledInput {
        label_text: String,
        hide_label: bool,
        label_position: LabelPosition,
        input_value: String,
    },
    Image {
        image_name: Option<String>,
        /// Resolved image as a base64 data URI.
        image_data: Option<String>,
    },
    Barcode {
        product_id: Option<String>,
        has_barcode: bool,
    },
    Separator,
    /// Literal display text. `tag` keeps the stored type name so unknown
    /// widget types round-trip unchanged.
    Content { tag: String, content: String },
}

impl WidgetKind {
    /// The type tag used in stored JSON.
    pub fn tag(&self) -> &str {
        match self {
            WidgetKind::LabeledInput { .. } => "labeled-input",
            WidgetKind::Image { .. } => "image",
            WidgetKind::Barcode { .. } => "barcode",
            WidgetKind::Separator => "separator",
            WidgetKind::Content { tag, .. } => tag,
        }
    }
}

/// One positioned visual element within a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWidget", into = "RawWidget")]
pub struct Widget {
    pub id: Option<u64>,
    /// Pixel offset from the canvas' left edge.
    pub left: f32,
    /// Pixel offset from the canvas' top edge.
    pub top: f32,
    pub width: f32,
    /// Fixed height in pixels; `None` means auto.
    pub height: Option<f32>,
    pub font: FontSpec,
    pub kind: WidgetKind,
}

impl Widget {
    fn with_kind(id: Option<u64>, left: f32, top: f32, width: f32, kind: WidgetKind) -> Self {
        Self {
            id,
            left,
            top,
            width,
            height: None,
            font: FontSpec::default(),
            kind,
        }
    }

    pub fn labeled_input(
        id: u64,
        left: f32,
        top: f32,
        width: f32,
        label_text: impl Into<String>,
    ) -> Self {
        Self::with_kind(
            Some(id),
            left,
            top,
            width,
            WidgetKind::LabeledInput {
                label_text: label_text.into(),
                hide_label: false,
                label_position: LabelPosition::Left,
                input_value: String::new(),
            },
        )
    }

    pub fn image(id: u64, left: f32, top: f32, width: f32) -> Self {
        Self::with_kind(
            Some(id),
            left,
            top,
            width,
            WidgetKind::Image {
                image_name: None,
                image_data: None,
            },
        )
    }

    pub fn barcode(id: u64, left: f32, top: f32, width: f32) -> Self {
        Self::with_kind(
            Some(id),
            left,
            top,
            width,
            WidgetKind::Barcode {
                product_id: None,
                has_barcode: false,
            },
        )
    }

    pub fn separator(id: u64, left: f32, top: f32, width: f32) -> Self {
        Self::with_kind(Some(id), left, top, width, WidgetKind::Separator)
    }

    pub fn content(id: u64, left: f32, top: f32, width: f32, text: impl Into<String>) -> Self {
        Self::with_kind(
            Some(id),
            left,
            top,
            width,
            WidgetKind::Content {
                tag: CONTENT_TAG.to_string(),
                content: text.into(),
            },
        )
    }

    /// Fix the widget height.
    pub fn with_height(mut self, height: f32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn with_font(mut self, size_px: f32, weight: FontWeight) -> Self {
        self.font = FontSpec { size_px, weight };
        self
    }

    /// Check that position and size are finite and non-negative, and that
    /// the font size is positive.
    pub fn validate(&self) -> Result<(), WidgetError> {
        let size = self.font.size_px;
        if !size.is_finite() || size <= 0.0 {
            return Err(WidgetError::InvalidFontSize(size));
        }
        let mut fields = vec![("left", self.left), ("top", self.top), ("width", self.width)];
        if let Some(h) = self.height {
            fields.push(("height", h));
        }
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(WidgetError::InvalidGeometry { field, value });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stored JSON shape
// ---------------------------------------------------------------------------

/// Flat editor representation of a widget. Fields the editor may store with
/// loose types (numbers as strings, `"auto"` heights) are kept as raw JSON
/// values and interpreted leniently.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWidget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    left: f32,
    #[serde(default)]
    top: f32,
    #[serde(default)]
    width: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    height: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_size: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font_weight: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hide_label: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    input_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    product_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    has_barcode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<Value>,
}

impl TryFrom<RawWidget> for Widget {
    type Error = WidgetError;

    fn try_from(raw: RawWidget) -> Result<Self, Self::Error> {
        let font = FontSpec {
            size_px: raw
                .font_size
                .as_ref()
                .and_then(parse_px)
                .unwrap_or(DEFAULT_FONT_SIZE_PX),
            weight: match raw.font_weight.as_ref() {
                Some(Value::String(s)) if s == "bold" || s == "bolder" => FontWeight::Bold,
                Some(Value::String(s)) if s.parse::<u32>().is_ok_and(|w| w >= 600) => {
                    FontWeight::Bold
                }
                Some(Value::Number(n)) if n.as_f64().is_some_and(|w| w >= 600.0) => {
                    FontWeight::Bold
                }
                _ => FontWeight::Normal,
            },
        };

        let kind = match raw.kind.as_str() {
            "labeled-input" => WidgetKind::LabeledInput {
                label_text: raw.label_text.unwrap_or_default(),
                hide_label: raw.hide_label.unwrap_or(false),
                label_position: raw
                    .label_position
                    .as_deref()
                    .map(LabelPosition::parse)
                    .unwrap_or_default(),
                input_value: raw.input_value.as_ref().map(value_text).unwrap_or_default(),
            },
            "image" => WidgetKind::Image {
                image_name: raw.image_name,
                image_data: raw.image_data,
            },
            "barcode" => WidgetKind::Barcode {
                product_id: raw.product_id.as_ref().map(value_text),
                has_barcode: raw.has_barcode.unwrap_or(false),
            },
            "separator" => WidgetKind::Separator,
            other => WidgetKind::Content {
                tag: other.to_string(),
                content: raw.content.as_ref().map(value_text).unwrap_or_default(),
            },
        };

        let widget = Widget {
            id: raw.id,
            left: raw.left,
            top: raw.top,
            width: raw.width,
            height: raw.height.as_ref().and_then(Value::as_f64).map(|h| h as f32),
            font,
            kind,
        };
        widget.validate()?;
        Ok(widget)
    }
}

impl From<Widget> for RawWidget {
    fn from(w: Widget) -> Self {
        let mut raw = RawWidget {
            id: w.id,
            kind: w.kind.tag().to_string(),
            left: w.left,
            top: w.top,
            width: w.width,
            height: w.height.map(|h| Value::from(h as f64)),
            font_size: Some(Value::String(format!("{}px", w.font.size_px))),
            font_weight: Some(Value::String(
                match w.font.weight {
                    FontWeight::Normal => "normal",
                    FontWeight::Bold => "bold",
                }
                .to_string(),
            )),
            ..RawWidget::default()
        };
        match w.kind {
            WidgetKind::LabeledInput {
                label_text,
                hide_label,
                label_position,
                input_value,
            } => {
                raw.label_text = Some(label_text);
                raw.hide_label = Some(hide_label);
                raw.label_position = Some(label_position.as_str().to_string());
                raw.input_value = Some(Value::String(input_value));
            }
            WidgetKind::Image {
                image_name,
                image_data,
            } => {
                raw.image_name = image_name;
                raw.image_data = image_data;
            }
            WidgetKind::Barcode {
                product_id,
                has_barcode,
            } => {
                raw.product_id = product_id.map(Value::String);
                raw.has_barcode = Some(has_barcode);
            }
            WidgetKind::Separator => {}
            WidgetKind::Content { content, .. } => {
                raw.content = Some(Value::String(content));
            }
        }
        raw
    }
}

/// Parse `"14px"`, `"14"` or `14` into pixels.
fn parse_px(v: &Value) -> Option<f32> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse::<f32>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite() && *f > 0.0)
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One data row merged into a template, e.g. one product.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The display text of a field, if present.
    pub fn text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(value_text)
    }

    /// JavaScript-style truthiness of a field; absent fields are falsy.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(_)) | Some(Value::Object(_)) => true,
        }
    }

    /// Parse a JSON array of records.
    pub fn list_from_json(json: &str) -> Result<Vec<Record>, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Render a JSON value the way it shows up as text content.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => number_text(n),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
