//! Applying a value map to a document's live form fields
//!
//! Every assignment is attempted independently: a wrong-typed value, an
//! unknown option or a structurally broken field logs a warning and leaves
//! that one field untouched, so a single bad field never blocks the rest of
//! the form from updating.

use lopdf::{Document, Object, ObjectId, StringFormat};
use thiserror::Error;
use crate::form::field::{FieldKind, FieldValue, ValueMap};
use crate::form::introspect::{self, collect_fields, RawField};

/// Why one field assignment was skipped. Recovered locally, never surfaced
/// as a cycle failure.
#[derive(Debug, Error)]
enum AssignError {
    #[error("checkbox values must be booleans")]
    ExpectedBool,

    #[error("expected a text value")]
    ExpectedText,

    #[error("\"{0}\" is not one of the field's options")]
    UnknownOption(String),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
}

/// Apply `values` to the document's form fields, in place.
///
/// Keys that match no field are ignored silently. Kind-specific semantics:
/// text replaces the value entirely; checkboxes require a boolean;
/// radio groups and dropdowns select by exact export-value match, and an
/// empty value leaves the current selection alone.
pub fn fill_fields(doc: &mut Document, values: &ValueMap) {
    if values.is_empty() {
        return;
    }

    let fields = collect_fields(doc);
    let mut touched = false;

    for field in &fields {
        let Some(value) = values.get(&field.name) else {
            continue;
        };
        match apply_value(doc, field, value) {
            Ok(()) => touched = true,
            Err(err) => {
                tracing::warn!(field = %field.name, %err, "skipping field assignment");
            }
        }
    }

    if touched {
        // viewers must regenerate widget appearances for the new values
        set_need_appearances(doc);
    }
}

/// Read a field's current value back, for diagnostics and round-trip
/// checks. Checkboxes and radio groups report their state name (`Off` when
/// unchecked); fields that were never set report `None`.
pub fn read_field_value(doc: &Document, name: &str) -> Option<String> {
    let field = collect_fields(doc).into_iter().find(|f| f.name == name)?;
    let dict = doc.get_object(field.id).and_then(Object::as_dict).ok()?;
    match dict.get(b"V").ok().map(|obj| introspect::resolve(doc, obj)) {
        Some(Object::Name(bytes)) => Some(introspect::decode_text_bytes(bytes)),
        Some(Object::String(bytes, _)) => Some(introspect::decode_text_bytes(bytes)),
        _ => None,
    }
}

fn apply_value(doc: &mut Document, field: &RawField, value: &FieldValue) -> Result<(), AssignError> {
    match field.kind {
        FieldKind::Text => set_text(doc, field.id, &value.coerce_text()),
        FieldKind::Checkbox => {
            let checked = value.as_checked().ok_or(AssignError::ExpectedBool)?;
            set_checkbox(doc, field.id, checked)
        }
        FieldKind::RadioGroup => {
            let choice = value.as_text().ok_or(AssignError::ExpectedText)?;
            if choice.is_empty() {
                // an empty value never forces a selection
                return Ok(());
            }
            select_radio(doc, field.id, choice)
        }
        FieldKind::Dropdown => {
            let choice = value.as_text().ok_or(AssignError::ExpectedText)?;
            if choice.is_empty() {
                return Ok(());
            }
            select_dropdown(doc, field.id, choice)
        }
    }
}

fn set_text(doc: &mut Document, field_id: ObjectId, value: &str) -> Result<(), AssignError> {
    let dict = doc.get_object_mut(field_id)?.as_dict_mut()?;
    dict.set("V", text_object(value));
    // a stale appearance stream would shadow the new value
    dict.remove(b"AP");
    Ok(())
}

fn set_checkbox(doc: &mut Document, field_id: ObjectId, checked: bool) -> Result<(), AssignError> {
    let state = if checked {
        checkbox_on_state(doc, field_id)
    } else {
        "Off".to_string()
    };
    let widgets = introspect::widget_ids(doc, field_id);

    {
        let dict = doc.get_object_mut(field_id)?.as_dict_mut()?;
        dict.set("V", Object::Name(state.clone().into_bytes()));
        dict.set("AS", Object::Name(state.clone().into_bytes()));
    }
    for widget_id in widgets {
        if let Ok(widget) = doc.get_object_mut(widget_id).and_then(Object::as_dict_mut) {
            widget.set("AS", Object::Name(state.clone().into_bytes()));
        }
    }
    Ok(())
}

/// The checked-state name of a checkbox, from its widget appearances.
fn checkbox_on_state(doc: &Document, field_id: ObjectId) -> String {
    introspect::radio_export_values(doc, field_id)
        .into_iter()
        .next()
        .unwrap_or_else(|| "Yes".to_string())
}

fn select_radio(doc: &mut Document, field_id: ObjectId, choice: &str) -> Result<(), AssignError> {
    let options = introspect::radio_export_values(doc, field_id);
    if !options.iter().any(|option| option == choice) {
        return Err(AssignError::UnknownOption(choice.to_string()));
    }

    let mut widgets = introspect::widget_ids(doc, field_id);
    if widgets.is_empty() {
        widgets.push(field_id);
    }

    // decide each widget's state before taking any mutable borrow
    let widget_states: Vec<(ObjectId, bool)> = widgets
        .iter()
        .map(|widget_id| {
            let is_on = doc
                .get_object(*widget_id)
                .and_then(Object::as_dict)
                .map(|dict| {
                    introspect::widget_on_states(doc, dict)
                        .iter()
                        .any(|state| state == choice)
                })
                .unwrap_or(false);
            (*widget_id, is_on)
        })
        .collect();

    {
        let dict = doc.get_object_mut(field_id)?.as_dict_mut()?;
        dict.set("V", Object::Name(choice.as_bytes().to_vec()));
    }
    for (widget_id, is_on) in widget_states {
        let state = if is_on { choice } else { "Off" };
        if let Ok(widget) = doc.get_object_mut(widget_id).and_then(Object::as_dict_mut) {
            widget.set("AS", Object::Name(state.as_bytes().to_vec()));
        }
    }
    Ok(())
}

fn select_dropdown(doc: &mut Document, field_id: ObjectId, choice: &str) -> Result<(), AssignError> {
    let options = introspect::choice_options(doc, field_id);
    if !options.iter().any(|option| option == choice) {
        return Err(AssignError::UnknownOption(choice.to_string()));
    }

    let dict = doc.get_object_mut(field_id)?.as_dict_mut()?;
    dict.set("V", text_object(choice));
    dict.remove(b"AP");
    Ok(())
}

/// Encode a text value: plain literal for ASCII, UTF-16BE with BOM
/// otherwise.
fn text_object(value: &str) -> Object {
    if value.is_ascii() {
        Object::string_literal(value)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Literal)
    }
}

/// Flag the AcroForm so viewers rebuild widget appearances; this crate
/// updates values, not appearance streams.
fn set_need_appearances(doc: &mut Document) {
    let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) else {
        return;
    };

    let acroform_id = doc
        .get_object(root_id)
        .and_then(Object::as_dict)
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .and_then(|obj| obj.as_reference().ok());

    match acroform_id {
        Some(id) => {
            if let Ok(dict) = doc.get_object_mut(id).and_then(Object::as_dict_mut) {
                dict.set("NeedAppearances", true);
            }
        }
        None => {
            // AcroForm written inline in the catalog
            if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
                if let Ok(Object::Dictionary(acroform)) = catalog.get_mut(b"AcroForm") {
                    acroform.set("NeedAppearances", true);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    /// One-page document with a merged text field and checkbox.
    fn doc_with_fields() -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let text_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Tx",
            "T" => Object::string_literal("name"),
            "Rect" => vec![50.into(), 700.into(), 300.into(), 720.into()],
        });
        let on_stream = doc.add_object(lopdf::Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form" },
            Vec::new(),
        ));
        let off_stream = doc.add_object(lopdf::Stream::new(
            dictionary! { "Type" => "XObject", "Subtype" => "Form" },
            Vec::new(),
        ));
        let checkbox_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "FT" => "Btn",
            "T" => Object::string_literal("accept"),
            "Rect" => vec![50.into(), 660.into(), 65.into(), 675.into()],
            "AP" => dictionary! {
                "N" => dictionary! { "Yes" => on_stream, "Off" => off_stream },
            },
            "AS" => "Off",
        });

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => vec![text_id.into(), checkbox_id.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let acroform_id = doc.add_object(dictionary! {
            "Fields" => vec![text_id.into(), checkbox_id.into()],
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
            "AcroForm" => acroform_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn text_value_replaces_entirely() {
        let mut doc = doc_with_fields();
        let mut values = ValueMap::new();
        values.insert("name".to_string(), FieldValue::Text("Ada".to_string()));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "name").as_deref(), Some("Ada"));

        values.insert("name".to_string(), FieldValue::Text("Grace".to_string()));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "name").as_deref(), Some("Grace"));
    }

    #[test]
    fn checkbox_toggles_between_states() {
        let mut doc = doc_with_fields();
        let mut values = ValueMap::new();

        values.insert("accept".to_string(), FieldValue::Checked(true));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "accept").as_deref(), Some("Yes"));

        values.insert("accept".to_string(), FieldValue::Checked(false));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "accept").as_deref(), Some("Off"));
    }

    #[test]
    fn wrong_typed_checkbox_value_is_skipped() {
        let mut doc = doc_with_fields();
        let mut values = ValueMap::new();
        values.insert("accept".to_string(), FieldValue::Checked(true));
        fill_fields(&mut doc, &values);

        // a text value on a checkbox leaves the prior state in place
        values.insert("accept".to_string(), FieldValue::Text("yes".to_string()));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "accept").as_deref(), Some("Yes"));
    }

    #[test]
    fn unknown_names_are_ignored() {
        let mut doc = doc_with_fields();
        let mut values = ValueMap::new();
        values.insert("no_such_field".to_string(), FieldValue::Text("x".to_string()));
        fill_fields(&mut doc, &values);
        assert_eq!(read_field_value(&doc, "no_such_field"), None);
        assert_eq!(read_field_value(&doc, "name"), None);
    }

    #[test]
    fn filling_sets_need_appearances() {
        let mut doc = doc_with_fields();
        let mut values = ValueMap::new();
        values.insert("name".to_string(), FieldValue::Text("Ada".to_string()));
        fill_fields(&mut doc, &values);

        let acroform = introspect::acroform_dict(&doc).expect("acroform");
        assert!(matches!(
            acroform.get(b"NeedAppearances"),
            Ok(Object::Boolean(true))
        ));
    }

    #[test]
    fn non_ascii_text_encodes_as_utf16() {
        let obj = text_object("Zoë");
        match obj {
            Object::String(bytes, _) => {
                assert!(bytes.starts_with(&[0xFE, 0xFF]));
                assert_eq!(introspect::decode_text_bytes(&bytes), "Zoë");
            }
            other => panic!("expected string object, got {other:?}"),
        }
    }
}
