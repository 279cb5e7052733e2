//! Visual reading order for field descriptors
//!
//! Page space puts y = 0 at the bottom, so "top of the page first" means
//! descending y. This ordering only affects how fields are presented to a
//! human; fill correctness never depends on it. Multi-column or rotated
//! layouts may order differently than a human would read them, an accepted
//! limitation of the widget-rectangle heuristic.

use std::cmp::Ordering;
use crate::form::field::FieldDescriptor;

/// Sort descriptors into natural reading order.
///
/// Primary key: descending y (top rows first). Tie-break: ascending x (left
/// before right). Fields without a widget position sort after all positioned
/// fields. The sort is stable, so equal-geometry fields keep their
/// introspection order, and applying it twice yields the same sequence.
pub fn order_fields(mut fields: Vec<FieldDescriptor>) -> Vec<FieldDescriptor> {
    fields.sort_by(compare);
    fields
}

fn compare(a: &FieldDescriptor, b: &FieldDescriptor) -> Ordering {
    match (&a.position, &b.position) {
        (Some(pa), Some(pb)) => pb
            .y
            .partial_cmp(&pa.y)
            .unwrap_or(Ordering::Equal)
            .then(pa.x.partial_cmp(&pb.x).unwrap_or(Ordering::Equal)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldKind, WidgetPosition};

    fn field(name: &str, position: Option<(f32, f32)>) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            kind: FieldKind::Text,
            position: position.map(|(x, y)| WidgetPosition { x, y }),
            options: Vec::new(),
        }
    }

    fn names(fields: &[FieldDescriptor]) -> Vec<&str> {
        fields.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn higher_rows_come_first() {
        let ordered = order_fields(vec![
            field("bottom", Some((50.0, 100.0))),
            field("top", Some((50.0, 700.0))),
            field("middle", Some((50.0, 400.0))),
        ]);
        assert_eq!(names(&ordered), ["top", "middle", "bottom"]);
    }

    #[test]
    fn same_row_sorts_left_to_right() {
        let ordered = order_fields(vec![
            field("right", Some((320.0, 700.0))),
            field("left", Some((50.0, 700.0))),
        ]);
        assert_eq!(names(&ordered), ["left", "right"]);
    }

    #[test]
    fn unpositioned_fields_sort_last() {
        let ordered = order_fields(vec![
            field("hidden", None),
            field("top", Some((50.0, 700.0))),
            field("bottom", Some((50.0, 100.0))),
        ]);
        assert_eq!(names(&ordered), ["top", "bottom", "hidden"]);
    }

    #[test]
    fn equal_geometry_keeps_introspection_order() {
        let ordered = order_fields(vec![
            field("first", Some((50.0, 700.0))),
            field("second", Some((50.0, 700.0))),
            field("third", Some((50.0, 700.0))),
        ]);
        assert_eq!(names(&ordered), ["first", "second", "third"]);
    }

    #[test]
    fn ordering_is_idempotent() {
        let once = order_fields(vec![
            field("c", Some((10.0, 500.0))),
            field("a", Some((10.0, 700.0))),
            field("b", Some((200.0, 700.0))),
            field("d", None),
        ]);
        let twice = order_fields(once.clone());
        assert_eq!(once, twice);
    }
}
