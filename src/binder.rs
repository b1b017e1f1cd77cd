//! Record binder – merges one data record into a copy of a template's widgets.

use crate::widget::{Record, Template, Widget, WidgetKind};

/// Record field that feeds every barcode widget.
pub const PRODUCT_ID_FIELD: &str = "productId";

/// A template's widgets after record-value resolution.
///
/// Always an independent copy; the template it came from is never touched.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundWidgets {
    pub widgets: Vec<Widget>,
}

impl BoundWidgets {
    pub fn iter(&self) -> std::slice::Iter<'_, Widget> {
        self.widgets.iter()
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

/// Bind `record` into a copy of `template`'s widgets.
///
/// `record_index` is the zero-based position of the record in its batch and
/// only matters for image widgets that carry neither an explicit image name
/// nor an id. With `record = None` the copy is returned unmodified.
pub fn bind(template: &Template, record: Option<&Record>, record_index: usize) -> BoundWidgets {
    let mut widgets = template.widgets.clone();

    if let Some(record) = record {
        for widget in &mut widgets {
            bind_widget(widget, record, record_index);
        }
    }

    BoundWidgets { widgets }
}

fn bind_widget(widget: &mut Widget, record: &Record, record_index: usize) {
    let id = widget.id;
    match &mut widget.kind {
        WidgetKind::LabeledInput {
            label_text,
            input_value,
            ..
        } => {
            if label_text.is_empty() {
                return;
            }
            if let Some(value) = record.text(label_text) {
                *input_value = value;
            }
        }
        WidgetKind::Image {
            image_name,
            image_data,
        } => {
            let key = image_key(image_name.as_deref(), id, record_index);
            if let Some(value) = record.text(&key) {
                log::debug!("binding image widget {id:?} from record field {key:?}");
                *image_data = Some(value).filter(|v| !v.is_empty());
            }
        }
        WidgetKind::Barcode {
            product_id,
            has_barcode,
        } => {
            if record.is_truthy(PRODUCT_ID_FIELD) {
                *product_id = record.text(PRODUCT_ID_FIELD);
                *has_barcode = true;
            }
        }
        WidgetKind::Separator | WidgetKind::Content { .. } => {}
    }
}

/// Resolve the record field an image widget reads from: the explicit image
/// name, then `image<id>`, then `image<record_index + 1>`.
pub fn image_key(image_name: Option<&str>, widget_id: Option<u64>, record_index: usize) -> String {
    match (image_name.filter(|n| !n.is_empty()), widget_id) {
        (Some(name), _) => name.to_string(),
        (None, Some(id)) => format!("image{id}"),
        (None, None) => format!("image{}", record_index + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::LabelPosition;

    fn template() -> Template {
        let mut name_input = Widget::labeled_input(1, 0.0, 0.0, 200.0, "name");
        if let WidgetKind::LabeledInput { input_value, .. } = &mut name_input.kind {
            *input_value = "default".to_string();
        }
        Template::new(
            7,
            "Label",
            vec![
                name_input,
                Widget::labeled_input(2, 0.0, 60.0, 200.0, "price"),
                Widget::image(3, 0.0, 120.0, 200.0),
                Widget::barcode(4, 0.0, 300.0, 200.0),
                Widget::separator(5, 0.0, 400.0, 700.0),
                Widget::content(6, 0.0, 420.0, 300.0, "Static"),
            ],
        )
    }

    fn input_value(w: &Widget) -> &str {
        match &w.kind {
            WidgetKind::LabeledInput { input_value, .. } => input_value,
            other => panic!("not a labeled input: {other:?}"),
        }
    }

    #[test]
    fn labeled_input_takes_matching_field() {
        let t = template();
        let r = Record::new().with("name", "Widget Pro").with("price", 9.5);
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(input_value(&bound.widgets[0]), "Widget Pro");
        assert_eq!(input_value(&bound.widgets[1]), "9.5");
    }

    #[test]
    fn labeled_input_without_field_keeps_prior_value() {
        let t = template();
        let r = Record::new().with("unrelated", "x");
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(input_value(&bound.widgets[0]), "default");
        assert_eq!(input_value(&bound.widgets[1]), "");
    }

    #[test]
    fn empty_label_never_binds() {
        let mut t = template();
        t.widgets[1] = Widget::labeled_input(2, 0.0, 0.0, 100.0, "");
        let r = Record::new().with("", "oops");
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(input_value(&bound.widgets[1]), "");
    }

    #[test]
    fn barcode_binds_product_id() {
        let t = template();
        let r = Record::new().with("productId", "ABC123");
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(
            bound.widgets[3].kind,
            WidgetKind::Barcode {
                product_id: Some("ABC123".into()),
                has_barcode: true
            }
        );
    }

    #[test]
    fn barcode_without_product_id_stays_placeholder() {
        let t = template();
        for r in [Record::new(), Record::new().with("productId", "")] {
            let bound = bind(&t, Some(&r), 0);
            assert_eq!(
                bound.widgets[3].kind,
                WidgetKind::Barcode {
                    product_id: None,
                    has_barcode: false
                }
            );
        }
    }

    #[test]
    fn image_key_priority() {
        assert_eq!(image_key(Some("hero"), Some(3), 0), "hero");
        assert_eq!(image_key(Some(""), Some(3), 0), "image3");
        assert_eq!(image_key(None, Some(3), 4), "image3");
        assert_eq!(image_key(None, None, 4), "image5");
    }

    #[test]
    fn image_binds_by_widget_id() {
        let t = template();
        let r = Record::new().with("image3", "data:image/png;base64,AAAA");
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(
            bound.widgets[2].kind,
            WidgetKind::Image {
                image_name: None,
                image_data: Some("data:image/png;base64,AAAA".into())
            }
        );
    }

    #[test]
    fn image_without_id_uses_record_position() {
        let mut t = template();
        t.widgets[2].id = None;
        let r = Record::new().with("image2", "data:image/png;base64,BBBB");
        let bound = bind(&t, Some(&r), 1);
        assert!(matches!(
            &bound.widgets[2].kind,
            WidgetKind::Image { image_data: Some(d), .. } if d.ends_with("BBBB")
        ));
        let bound = bind(&t, Some(&r), 0);
        assert!(matches!(
            &bound.widgets[2].kind,
            WidgetKind::Image {
                image_data: None,
                ..
            }
        ));
    }

    #[test]
    fn passthrough_variants_are_unchanged() {
        let t = template();
        let r = Record::new().with("content", "nope").with("productId", "P");
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(bound.widgets[4], t.widgets[4]);
        assert_eq!(bound.widgets[5], t.widgets[5]);
    }

    #[test]
    fn binding_leaves_inputs_untouched() {
        let t = template();
        let r = Record::new()
            .with("name", "New")
            .with("productId", "X1")
            .with("image3", "data:image/png;base64,CCCC");
        let t_before = t.clone();
        let r_before = r.clone();
        let bound = bind(&t, Some(&r), 0);
        assert_eq!(t, t_before);
        assert_eq!(r, r_before);
        assert_ne!(bound.widgets, t.widgets);
    }

    #[test]
    fn no_record_returns_plain_copy() {
        let t = template();
        let bound = bind(&t, None, 0);
        assert_eq!(bound.widgets, t.widgets);
        assert!(matches!(
            bound.widgets[0].kind,
            WidgetKind::LabeledInput {
                label_position: LabelPosition::Left,
                ..
            }
        ));
    }
}
