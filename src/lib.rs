//! PDF Form-Fill Library
//!
//! Loads a PDF containing an interactive form (AcroForm), discovers its
//! fillable fields, orders them into natural reading order, applies typed
//! values, optionally stamps a raster image, and re-serializes the document
//! for preview or download. This library provides functionality to:
//! - Probe an ordered list of candidate sources for a valid document
//! - Enumerate and classify form fields (text/checkbox/radio/dropdown)
//! - Apply a value map with per-kind semantics, tolerating bad fields
//! - Embed a PNG/JPEG stamp with aspect-preserving scale-to-fit
//! - Coalesce bursts of edits into debounced, single-flight fill cycles
//!
//! # Example
//!
//! ```no_run
//! use pdf_formfill::session::{FormSession, SessionOptions};
//! use pdf_formfill::source::{Source, SourceList};
//! use std::time::Instant;
//!
//! let sources = SourceList::new(vec![Source::Path("form.pdf".into())]);
//! let mut session = FormSession::open(sources, SessionOptions::default())
//!     .expect("Failed to open form");
//!
//! for field in session.fields() {
//!     println!("{} ({})", field.name, field.kind);
//! }
//!
//! session.update("full_name", "Ada Lovelace".into(), Instant::now());
//! let handle = session.render().expect("Failed to fill form");
//! std::fs::write("filled.pdf", &handle.bytes).expect("Failed to write output");
//! ```

pub mod error;
pub mod source;
pub mod form;
pub mod stamp;
pub mod output;
pub mod schedule;
pub mod session;

// Re-export commonly used items
pub use error::{Error, Result};
pub use form::{FieldDescriptor, FieldKind, FieldValue, ValueMap};
pub use session::{FormSession, SessionOptions};
