//! Engine facade: one form-editing session over one document
//!
//! A session probes its candidate sources once, introspects and orders the
//! field set once, and then turns value updates into debounced fill cycles.
//! Every cycle re-loads the document from the winning source so edits are
//! always applied to a clean base, never layered on a previously mutated
//! buffer.

use std::time::Instant;
use crate::error::Result;
use crate::form::{fill_fields, introspect_fields, order_fields};
use crate::form::field::{FieldDescriptor, FieldValue, ValueMap};
use crate::output::{serialize_document, OutputHandle, OutputSlot};
use crate::schedule::{DebounceConfig, UpdateScheduler};
use crate::source::SourceList;
use crate::stamp::{embed_image, ImageAsset};

/// Per-session configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Debounce delays for coalescing edits
    pub debounce: DebounceConfig,
    /// Optional raster stamp applied on every cycle
    pub stamp: Option<ImageAsset>,
    /// Zero-based page the stamp goes on
    pub stamp_page: usize,
}

/// One editing session over one form document.
pub struct FormSession {
    sources: SourceList,
    fields: Vec<FieldDescriptor>,
    values: ValueMap,
    scheduler: UpdateScheduler,
    output: OutputSlot,
    options: SessionOptions,
}

impl FormSession {
    /// Probe the sources, introspect the form and order its fields.
    ///
    /// The descriptor sequence is computed here once and treated as
    /// read-only for the rest of the session; value edits never change the
    /// underlying field set.
    pub fn open(mut sources: SourceList, options: SessionOptions) -> Result<Self> {
        let doc = sources.load()?;
        let fields = order_fields(introspect_fields(&doc));
        tracing::debug!(field_count = fields.len(), "session opened");

        Ok(Self {
            sources,
            fields,
            values: ValueMap::new(),
            scheduler: UpdateScheduler::new(options.debounce),
            output: OutputSlot::new(),
            options,
        })
    }

    /// The ordered field descriptors, for rendering input controls.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Record one value edit at `now`.
    pub fn update(&mut self, name: &str, value: FieldValue, now: Instant) {
        self.values.insert(name.to_string(), value);
        self.scheduler.note_change(now);
    }

    /// Merge a batch of edits as a single change event.
    pub fn update_many(&mut self, values: ValueMap, now: Instant) {
        if values.is_empty() {
            return;
        }
        self.values.extend(values);
        self.scheduler.note_change(now);
    }

    /// Run at most one due fill cycle.
    ///
    /// Returns `Ok(true)` when a cycle ran and published a fresh handle. A
    /// failed cycle surfaces its error but leaves the previously published
    /// handle current (stale-but-valid beats blank) and the session stays
    /// usable; the next edit tries again from scratch.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if !self.scheduler.begin_cycle(now) {
            return Ok(false);
        }
        let outcome = self.run_cycle();
        self.scheduler.finish_cycle(now);
        outcome.map(|()| true)
    }

    /// When the next pending cycle is due, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Run one cycle immediately, bypassing the debounce. For batch
    /// callers that apply all values up front and want the bytes now.
    pub fn render(&mut self) -> Result<&OutputHandle> {
        self.run_cycle()?;
        // publish() always installs a handle on success
        self.output
            .current()
            .ok_or_else(|| crate::error::Error::Serialization("no output published".to_string()))
    }

    /// The currently published output, if any cycle has completed.
    pub fn output(&self) -> Option<&OutputHandle> {
        self.output.current()
    }

    /// How many handles have been revoked over the session's lifetime.
    pub fn revocations(&self) -> u64 {
        self.output.revocations()
    }

    /// One full cycle on a clean base: load, fill, stamp, serialize, publish.
    fn run_cycle(&mut self) -> Result<()> {
        let mut doc = self.sources.load()?;
        fill_fields(&mut doc, &self.values);
        if let Some(asset) = &self.options.stamp {
            embed_image(&mut doc, asset, self.options.stamp_page)?;
        }
        let bytes = serialize_document(&mut doc)?;
        tracing::debug!(bytes = bytes.len(), "fill cycle published");
        self.output.publish(bytes);
        Ok(())
    }
}
