//! Field descriptors and typed fill values

use std::collections::BTreeMap;

/// The capability of an interactive form field.
///
/// Derived from the `/FT` entry and the `/Ff` flag bits of the field
/// dictionary, never from field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text input (`/FT /Tx`)
    Text,
    /// On/off toggle (`/FT /Btn` without the radio flag)
    Checkbox,
    /// Group of mutually exclusive options (`/FT /Btn` with the radio flag)
    RadioGroup,
    /// Choice from a declared option list (`/FT /Ch`)
    Dropdown,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Checkbox => write!(f, "checkbox"),
            Self::RadioGroup => write!(f, "radio"),
            Self::Dropdown => write!(f, "dropdown"),
        }
    }
}

/// Lower-left corner of a field's first widget rectangle, in page space.
///
/// PDF page space has y increasing upward, so a visually higher widget has
/// the larger `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetPosition {
    pub x: f32,
    pub y: f32,
}

/// One fillable field discovered in a document's AcroForm.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Fully qualified field name (`/T` entries joined with `.`)
    pub name: String,
    /// Field capability
    pub kind: FieldKind,
    /// First widget's position; `None` when the field has no widget
    /// (such a field sorts after all positioned fields)
    pub position: Option<WidgetPosition>,
    /// Export values, declaration-ordered. Empty for Text/Checkbox,
    /// non-empty for RadioGroup/Dropdown.
    pub options: Vec<String>,
}

/// A caller-supplied value for one field.
///
/// Checkboxes take `Checked`; every other kind takes `Text`. A mismatched
/// value is skipped by the filler rather than coerced into a toggle.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Checked(bool),
}

impl FieldValue {
    /// String rendition used for text fields; booleans stringify.
    pub fn coerce_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Checked(b) => b.to_string(),
        }
    }

    pub fn as_checked(&self) -> Option<bool> {
        match self {
            Self::Checked(b) => Some(*b),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Checked(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Checked(b)
    }
}

/// Mapping from field name to the value the caller wants applied.
///
/// Keys that match no field in the document are ignored silently.
pub type ValueMap = BTreeMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_text_stringifies_booleans() {
        assert_eq!(FieldValue::Text("hi".into()).coerce_text(), "hi");
        assert_eq!(FieldValue::Checked(true).coerce_text(), "true");
        assert_eq!(FieldValue::Checked(false).coerce_text(), "false");
    }

    #[test]
    fn as_checked_rejects_text() {
        assert_eq!(FieldValue::Checked(true).as_checked(), Some(true));
        assert_eq!(FieldValue::Text("yes".into()).as_checked(), None);
    }

    #[test]
    fn kind_display_names() {
        assert_eq!(FieldKind::Text.to_string(), "text");
        assert_eq!(FieldKind::Checkbox.to_string(), "checkbox");
        assert_eq!(FieldKind::RadioGroup.to_string(), "radio");
        assert_eq!(FieldKind::Dropdown.to_string(), "dropdown");
    }
}
