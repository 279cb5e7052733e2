//! Serialization and output-handle lifecycle
//!
//! Each completed fill cycle produces exactly one [`OutputHandle`]. The slot
//! enforces the hand-off discipline: publishing a new handle revokes the
//! previous handle's display resource first, so at any moment exactly one
//! resource is live and nothing is ever revoked twice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use lopdf::Document;
use crate::error::{Error, Result};

/// Re-encode the mutated document into bytes.
///
/// Deterministic with respect to field state, but not guaranteed
/// byte-identical across runs (object ids may differ). Only internal
/// structural corruption makes this fail.
pub fn serialize_document(doc: &mut Document) -> Result<Vec<u8>> {
    doc.compress();
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(bytes)
}

/// Opaque, revocable handle to a display-able resource.
///
/// Cloneable so a display collaborator can hold its own reference; the
/// revoked flag is shared, and revocation is idempotent.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    inner: Arc<ResourceInner>,
}

#[derive(Debug)]
struct ResourceInner {
    id: u64,
    revoked: AtomicBool,
}

impl ResourceRef {
    fn new(id: u64) -> Self {
        Self {
            inner: Arc::new(ResourceInner {
                id,
                revoked: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn is_revoked(&self) -> bool {
        self.inner.revoked.load(Ordering::Acquire)
    }

    /// Release the resource. Returns true only for the call that actually
    /// performed the revocation.
    pub fn revoke(&self) -> bool {
        !self.inner.revoked.swap(true, Ordering::AcqRel)
    }
}

/// The product of one completed fill cycle.
#[derive(Debug)]
pub struct OutputHandle {
    /// The re-serialized document
    pub bytes: Vec<u8>,
    /// Revocable display resource for the bytes
    pub resource: ResourceRef,
}

/// Holder of the single "current" output handle.
#[derive(Debug, Default)]
pub struct OutputSlot {
    current: Option<OutputHandle>,
    next_id: u64,
    revocations: u64,
}

impl OutputSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a freshly serialized document as the current output,
    /// revoking the previous handle's resource.
    pub fn publish(&mut self, bytes: Vec<u8>) -> &OutputHandle {
        if let Some(previous) = self.current.take() {
            if previous.resource.revoke() {
                self.revocations += 1;
            }
        }

        let resource = ResourceRef::new(self.next_id);
        self.next_id += 1;
        self.current.insert(OutputHandle { bytes, resource })
    }

    pub fn current(&self) -> Option<&OutputHandle> {
        self.current.as_ref()
    }

    /// Number of handles revoked so far; after N publishes this is N - 1.
    pub fn revocations(&self) -> u64 {
        self.revocations
    }

    /// Revoke the current handle without publishing a successor.
    pub fn clear(&mut self) {
        if let Some(previous) = self.current.take() {
            if previous.resource.revoke() {
                self.revocations += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_hands_off_strictly() {
        let mut slot = OutputSlot::new();

        let first = slot.publish(b"one".to_vec()).resource.clone();
        assert!(!first.is_revoked());

        let second = slot.publish(b"two".to_vec()).resource.clone();
        assert!(first.is_revoked());
        assert!(!second.is_revoked());
        assert_eq!(slot.revocations(), 1);
    }

    #[test]
    fn n_publishes_leave_one_live_resource() {
        let mut slot = OutputSlot::new();
        let mut refs = Vec::new();
        for i in 0..5u8 {
            refs.push(slot.publish(vec![i]).resource.clone());
        }

        let live: Vec<_> = refs.iter().filter(|r| !r.is_revoked()).collect();
        assert_eq!(live.len(), 1);
        assert_eq!(slot.revocations(), 4);
        assert_eq!(slot.current().unwrap().bytes, vec![4]);
    }

    #[test]
    fn revoke_is_idempotent() {
        let mut slot = OutputSlot::new();
        let resource = slot.publish(b"x".to_vec()).resource.clone();
        assert!(resource.revoke());
        assert!(!resource.revoke());
    }

    #[test]
    fn clear_revokes_current() {
        let mut slot = OutputSlot::new();
        let resource = slot.publish(b"x".to_vec()).resource.clone();
        slot.clear();
        assert!(resource.is_revoked());
        assert!(slot.current().is_none());
        assert_eq!(slot.revocations(), 1);
    }

    #[test]
    fn handle_ids_are_monotonic() {
        let mut slot = OutputSlot::new();
        let a = slot.publish(Vec::new()).resource.id();
        let b = slot.publish(Vec::new()).resource.id();
        assert!(b > a);
    }

    #[test]
    fn serialize_minimal_document() {
        use lopdf::{dictionary, Object};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let bytes = serialize_document(&mut doc).expect("serialize");
        assert!(bytes.starts_with(b"%PDF"));
    }
}
