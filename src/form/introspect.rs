//! AcroForm discovery and field classification
//!
//! Walks the catalog's `/AcroForm` `/Fields` tree, recursing through `/Kids` for
//! hierarchical fields (partial names joined with `.`), and produces one
//! descriptor per terminal field. A document without an AcroForm yields an
//! empty set, not an error.

use std::collections::HashSet;
use lopdf::{Dictionary, Document, Object, ObjectId};
use crate::form::field::{FieldDescriptor, FieldKind, WidgetPosition};

/// Radio flag bit of `/Ff` (PDF 1.7 table 226)
const FF_RADIO: u32 = 1 << 15;
/// Pushbutton flag bit of `/Ff`
const FF_PUSHBUTTON: u32 = 1 << 16;

/// Recursion bound for the field tree, guards against reference cycles
const MAX_FIELD_DEPTH: usize = 64;

/// A terminal field located in the AcroForm tree.
#[derive(Debug, Clone)]
pub(crate) struct RawField {
    pub name: String,
    pub id: ObjectId,
    pub kind: FieldKind,
}

/// Enumerate the document's fillable fields, in declaration order.
///
/// Classification is by the declared `/FT` capability plus `/Ff` flag bits,
/// never by name heuristics. Geometry comes from the first associated
/// widget's `/Rect`; a field with no widget gets `position: None` and sorts
/// after every positioned field.
pub fn introspect_fields(doc: &Document) -> Vec<FieldDescriptor> {
    collect_fields(doc)
        .into_iter()
        .map(|raw| {
            let options = match raw.kind {
                FieldKind::RadioGroup => radio_export_values(doc, raw.id),
                FieldKind::Dropdown => choice_options(doc, raw.id),
                FieldKind::Text | FieldKind::Checkbox => Vec::new(),
            };
            FieldDescriptor {
                position: first_widget_position(doc, raw.id),
                name: raw.name,
                kind: raw.kind,
                options,
            }
        })
        .collect()
}

/// Locate every terminal field, deduplicated by fully qualified name
/// (first declaration wins). Shared by introspection and filling.
pub(crate) fn collect_fields(doc: &Document) -> Vec<RawField> {
    let mut out = Vec::new();

    for field_id in acroform_field_refs(doc) {
        walk_field_tree(doc, field_id, None, None, 0, &mut out);
    }

    let mut seen = HashSet::new();
    out.retain(|field| seen.insert(field.name.clone()));
    out
}

/// Top-level `/Fields` references, or empty when the document has no form.
fn acroform_field_refs(doc: &Document) -> Vec<ObjectId> {
    let Some(acroform) = acroform_dict(doc) else {
        return Vec::new();
    };
    let Some(fields) = acroform.get(b"Fields").ok().map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };
    let Ok(array) = fields.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|entry| entry.as_reference().ok())
        .collect()
}

/// The `/AcroForm` dictionary from the catalog, if any.
pub(crate) fn acroform_dict(doc: &Document) -> Option<&Dictionary> {
    let catalog = resolve(doc, doc.trailer.get(b"Root").ok()?).as_dict().ok()?;
    resolve(doc, catalog.get(b"AcroForm").ok()?).as_dict().ok()
}

fn walk_field_tree(
    doc: &Document,
    field_id: ObjectId,
    parent_name: Option<&str>,
    inherited_ft: Option<&[u8]>,
    depth: usize,
    out: &mut Vec<RawField>,
) {
    if depth >= MAX_FIELD_DEPTH {
        return;
    }

    let Ok(field_dict) = doc.get_object(field_id).and_then(Object::as_dict) else {
        return;
    };

    let partial_name = field_dict
        .get(b"T")
        .ok()
        .and_then(|obj| text_from_object(doc, obj));

    let full_name = match (parent_name, &partial_name) {
        (Some(parent), Some(name)) => format!("{parent}.{name}"),
        (Some(parent), None) => parent.to_string(),
        (None, Some(name)) => name.clone(),
        (None, None) => String::new(),
    };

    // /FT may be inherited from an ancestor field
    let ft: Option<Vec<u8>> = match field_dict.get(b"FT").map(|obj| resolve(doc, obj)) {
        Ok(Object::Name(name)) => Some(name.clone()),
        _ => inherited_ft.map(<[u8]>::to_vec),
    };

    // A kid carrying /T is a child field; kids without /T are widget
    // annotations of this field.
    if let Ok(kids) = field_dict.get(b"Kids").map(|obj| resolve(doc, obj)) {
        if let Ok(kids_array) = kids.as_array() {
            let child_fields: Vec<ObjectId> = kids_array
                .iter()
                .filter_map(|kid| kid.as_reference().ok())
                .filter(|kid_id| {
                    doc.get_object(*kid_id)
                        .and_then(Object::as_dict)
                        .map(|dict| dict.has(b"T"))
                        .unwrap_or(false)
                })
                .collect();

            if !child_fields.is_empty() {
                for kid_id in child_fields {
                    walk_field_tree(
                        doc,
                        kid_id,
                        Some(&full_name),
                        ft.as_deref(),
                        depth + 1,
                        out,
                    );
                }
                return;
            }
        }
    }

    if full_name.is_empty() {
        return;
    }

    let flags = field_flags(field_dict);
    out.push(RawField {
        name: full_name,
        id: field_id,
        kind: classify(ft.as_deref().unwrap_or(b""), flags),
    });
}

/// Capability dispatch over the closed field-kind set.
fn classify(ft: &[u8], flags: u32) -> FieldKind {
    match ft {
        b"Tx" => FieldKind::Text,
        b"Ch" => FieldKind::Dropdown,
        b"Btn" if flags & FF_RADIO != 0 => FieldKind::RadioGroup,
        // Pushbuttons hold no value; they fall through to the default bucket
        b"Btn" if flags & FF_PUSHBUTTON != 0 => FieldKind::Text,
        b"Btn" => FieldKind::Checkbox,
        _ => FieldKind::Text,
    }
}

fn field_flags(dict: &Dictionary) -> u32 {
    match dict.get(b"Ff") {
        Ok(Object::Integer(n)) => *n as u32,
        _ => 0,
    }
}

/// Lower-left corner of the field's first widget `/Rect`.
///
/// A merged field/widget carries the rect on the field dictionary itself;
/// otherwise the first `/Kids` entry with a rect wins. Widgets past the
/// first are ignored for ordering purposes.
pub(crate) fn first_widget_position(doc: &Document, field_id: ObjectId) -> Option<WidgetPosition> {
    let dict = doc.get_object(field_id).and_then(Object::as_dict).ok()?;

    if let Some(position) = rect_position(doc, dict) {
        return Some(position);
    }

    for widget_id in widget_ids(doc, field_id) {
        if let Ok(widget_dict) = doc.get_object(widget_id).and_then(Object::as_dict) {
            if let Some(position) = rect_position(doc, widget_dict) {
                return Some(position);
            }
        }
    }

    None
}

/// The field's widget annotation ids from `/Kids`. Empty for a merged
/// field/widget, which acts as its own single widget.
pub(crate) fn widget_ids(doc: &Document, field_id: ObjectId) -> Vec<ObjectId> {
    let Ok(dict) = doc.get_object(field_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    let Ok(kids) = dict.get(b"Kids").map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };
    let Ok(array) = kids.as_array() else {
        return Vec::new();
    };
    array
        .iter()
        .filter_map(|kid| kid.as_reference().ok())
        .collect()
}

fn rect_position(doc: &Document, dict: &Dictionary) -> Option<WidgetPosition> {
    let rect = resolve(doc, dict.get(b"Rect").ok()?).as_array().ok()?;
    if rect.len() != 4 {
        return None;
    }
    Some(WidgetPosition {
        x: object_to_f32(&rect[0])?,
        y: object_to_f32(&rect[1])?,
    })
}

/// Declared options of a choice field, from `/Opt`.
///
/// Entries are either plain strings or `[export, display]` pairs; the
/// export value is what selection matches against.
pub(crate) fn choice_options(doc: &Document, field_id: ObjectId) -> Vec<String> {
    let Ok(dict) = doc.get_object(field_id).and_then(Object::as_dict) else {
        return Vec::new();
    };
    let Ok(opt) = dict.get(b"Opt").map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };
    let Ok(entries) = opt.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match resolve(doc, entry) {
            Object::Array(pair) => pair.first().and_then(|export| text_from_object(doc, export)),
            other => text_from_object(doc, other),
        })
        .collect()
}

/// Export values of a radio group: the ordered, distinct on-state names of
/// its widgets' normal appearance dictionaries.
pub(crate) fn radio_export_values(doc: &Document, field_id: ObjectId) -> Vec<String> {
    let mut widgets = widget_ids(doc, field_id);
    if widgets.is_empty() {
        // merged field/widget
        widgets.push(field_id);
    }

    let mut values = Vec::new();
    for widget_id in widgets {
        if let Ok(dict) = doc.get_object(widget_id).and_then(Object::as_dict) {
            for state in widget_on_states(doc, dict) {
                if !values.contains(&state) {
                    values.push(state);
                }
            }
        }
    }
    values
}

/// On-state names of one widget: the keys of `/AP /N`, `Off` excluded.
pub(crate) fn widget_on_states(doc: &Document, widget_dict: &Dictionary) -> Vec<String> {
    let Ok(ap) = widget_dict.get(b"AP").map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };
    let Ok(ap_dict) = ap.as_dict() else {
        return Vec::new();
    };
    let Ok(normal) = ap_dict.get(b"N").map(|obj| resolve(doc, obj)) else {
        return Vec::new();
    };
    let Ok(normal_dict) = normal.as_dict() else {
        return Vec::new();
    };

    normal_dict
        .iter()
        .map(|(key, _)| decode_text_bytes(key))
        .filter(|state| state != "Off")
        .collect()
}

/// Follow a reference one level; non-references pass through unchanged.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Decode a PDF string or name object into text.
pub(crate) fn text_from_object(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj) {
        Object::String(bytes, _) => Some(decode_text_bytes(bytes)),
        Object::Name(bytes) => Some(decode_text_bytes(bytes)),
        _ => None,
    }
}

/// PDF text strings are either UTF-16BE with a BOM or a latin-ish single
/// byte encoding; everything else reads as UTF-8 with replacement.
pub(crate) fn decode_text_bytes(bytes: &[u8]) -> String {
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn object_to_f32(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(f) => Some(*f),
        _ => None,
    }
}
