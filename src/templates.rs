//! Sample templates and records for testing and demonstration.
//!
//! Each template exercises a different mix of widget variants.

use crate::widget::{FontWeight, LabelPosition, Record, Template, Widget, WidgetKind};

/// 1×1 transparent PNG as a data URI.
pub const PIXEL_PNG_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Shelf label: name, price, product image and barcode.
pub fn product_label_template() -> Template {
    let mut price = Widget::labeled_input(2, 20.0, 60.0, 360.0, "price");
    if let WidgetKind::LabeledInput { input_value, .. } = &mut price.kind {
        *input_value = "0.00".to_string();
    }

    Template::new(
        1001,
        "Product Label",
        vec![
            Widget::content(1, 20.0, 10.0, 600.0, "Product Label").with_font(20.0, FontWeight::Bold),
            Widget::labeled_input(3, 20.0, 110.0, 360.0, "name"),
            price,
            Widget::image(4, 420.0, 60.0, 300.0),
            Widget::separator(5, 20.0, 240.0, 700.0),
            Widget::barcode(6, 20.0, 280.0, 360.0),
        ],
    )
}

/// Labels in every position, for layout checks.
pub fn label_positions_template() -> Template {
    let positions = [
        LabelPosition::Left,
        LabelPosition::Right,
        LabelPosition::Top,
        LabelPosition::Bottom,
    ];
    let widgets = positions
        .iter()
        .enumerate()
        .map(|(i, pos)| {
            let mut w = Widget::labeled_input(i as u64 + 1, 20.0, 20.0 + i as f32 * 90.0, 400.0, pos.as_str());
            if let WidgetKind::LabeledInput {
                label_position,
                input_value,
                ..
            } = &mut w.kind
            {
                *label_position = *pos;
                *input_value = format!("value {}", i + 1);
            }
            w
        })
        .collect();
    Template::new(1002, "Label Positions", widgets)
}

/// A template tall enough to span several A4 pages.
pub fn multi_page_template() -> Template {
    let mut widgets = Vec::new();
    for i in 0..12u64 {
        let top = i as f32 * 260.0;
        widgets.push(Widget::content(i * 2 + 1, 20.0, top, 700.0, format!("Section {}", i + 1)).with_font(18.0, FontWeight::Bold));
        widgets.push(Widget::separator(i * 2 + 2, 20.0, top + 40.0, 700.0));
    }
    widgets.push(Widget::barcode(100, 20.0, 12.0 * 260.0, 400.0));
    Template::new(1003, "Catalogue Sheet", widgets)
}

/// Template with no widgets.
pub fn empty_template() -> Template {
    Template::new(1004, "Blank", Vec::new())
}

/// Records matching [`product_label_template`].
pub fn sample_products() -> Vec<Record> {
    vec![
        Record::new()
            .with("name", "Espresso Beans 1kg")
            .with("price", 18.5)
            .with("productId", "SKU-1001")
            .with("image4", PIXEL_PNG_DATA_URI),
        Record::new()
            .with("name", "Oat Milk")
            .with("price", 2)
            .with("productId", "SKU-1002"),
        Record::new().with("name", "Gift Card").with("productId", ""),
    ]
}

/// The product label in the editor's stored JSON shape.
pub fn product_label_json() -> &'static str {
    r##"{
  "id": 2001,
  "name": "Stored Label",
  "widgets": [
    { "id": 1, "type": "labeled-input", "left": 20, "top": 20, "width": 360,
      "labelText": "name", "hideLabel": false, "labelPosition": "top",
      "inputValue": "", "fontSize": "14px", "fontWeight": "normal" },
    { "id": 2, "type": "image", "left": 420, "top": 20, "width": 300,
      "imageName": "photo" },
    { "id": 3, "type": "separator", "left": 20, "top": 200, "width": 700 },
    { "id": 4, "type": "barcode", "left": 20, "top": 230, "width": 360,
      "hasBarcode": false },
    { "id": 5, "type": "heading", "left": 20, "top": 340, "width": 500,
      "content": "Thank you!", "fontSize": 18, "fontWeight": "bold" }
  ]
}"##
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_validate() {
        let templates = vec![
            product_label_template(),
            label_positions_template(),
            multi_page_template(),
            empty_template(),
        ];
        for t in templates {
            for w in &t.widgets {
                assert!(w.validate().is_ok(), "template '{}' has an invalid widget", t.name);
            }
        }
    }

    #[test]
    fn stored_json_parses() {
        let t = Template::from_json(product_label_json()).unwrap();
        assert_eq!(t.widgets.len(), 5);
        assert_eq!(t.widgets[4].kind.tag(), "heading");
        assert_eq!(t.widgets[4].font.weight, FontWeight::Bold);
    }

    #[test]
    fn sample_products_have_ids() {
        let products = sample_products();
        assert!(products[0].is_truthy("productId"));
        assert!(!products[2].is_truthy("productId"));
    }
}
