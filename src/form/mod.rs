//! AcroForm field discovery, ordering and filling

pub mod field;
pub mod introspect;
pub mod order;
pub mod fill;

// Re-export commonly used items
pub use field::{FieldDescriptor, FieldKind, FieldValue, ValueMap, WidgetPosition};
pub use introspect::introspect_fields;
pub use order::order_fields;
pub use fill::{fill_fields, read_field_value};
