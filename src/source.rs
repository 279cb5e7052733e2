//! Candidate-source probing and document loading
//!
//! A session is given an ordered list of byte-buffer origins (files on disk
//! or in-memory buffers). The list is probed front to back until one origin
//! yields a parseable PDF; later fill cycles re-load from that same origin so
//! every cycle starts from a clean, unmutated base.

use std::path::PathBuf;
use lopdf::Document;
use crate::error::{Error, Result};

/// Leading bytes every acceptable document must carry.
const PDF_MAGIC: &[u8] = b"%PDF";

/// Parse raw bytes into an in-memory document.
///
/// Zero-length input fails with [`Error::EmptySource`]; "nothing fetched"
/// and "fetched garbage" are distinct diagnostics. Anything without the
/// `%PDF` magic prefix, or that fails the structural parse, fails with
/// [`Error::InvalidFormat`]. No retry logic lives here; probing multiple
/// candidates is [`SourceList`]'s job.
pub fn load_document(bytes: &[u8]) -> Result<Document> {
    if bytes.is_empty() {
        return Err(Error::EmptySource);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        return Err(Error::InvalidFormat("missing %PDF header".to_string()));
    }
    Document::load_mem(bytes).map_err(|e| Error::InvalidFormat(e.to_string()))
}

/// One candidate origin for document bytes.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on disk, read fresh on every load
    Path(PathBuf),
    /// An in-memory buffer
    Bytes(Vec<u8>),
}

impl Source {
    /// Human-readable label for diagnostics.
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    fn read(&self) -> Result<Vec<u8>> {
        match self {
            Self::Path(path) => Ok(std::fs::read(path)?),
            Self::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Read and parse this origin.
    pub fn load(&self) -> Result<Document> {
        let bytes = self.read()?;
        load_document(&bytes)
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Ordered list of candidate origins.
///
/// The first successful probe is remembered, so subsequent loads go straight
/// to the origin that worked instead of re-probing the whole list.
#[derive(Debug, Clone)]
pub struct SourceList {
    candidates: Vec<Source>,
    resolved: Option<usize>,
}

impl SourceList {
    pub fn new(candidates: Vec<Source>) -> Self {
        Self {
            candidates,
            resolved: None,
        }
    }

    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        Self::new(paths.into_iter().map(Source::Path).collect())
    }

    /// The origin that satisfied the most recent successful probe.
    pub fn resolved(&self) -> Option<&Source> {
        self.resolved.and_then(|i| self.candidates.get(i))
    }

    /// Load a fresh document.
    ///
    /// Probes candidates in order on first use; afterwards re-loads from the
    /// origin that succeeded. A previously good origin that stops working
    /// fails the load (and the fill cycle) rather than silently switching.
    pub fn load(&mut self) -> Result<Document> {
        if let Some(index) = self.resolved {
            return self.candidates[index].load();
        }

        for (index, candidate) in self.candidates.iter().enumerate() {
            match candidate.load() {
                Ok(doc) => {
                    tracing::debug!(source = %candidate.label(), "candidate source accepted");
                    self.resolved = Some(index);
                    return Ok(doc);
                }
                Err(err) => {
                    tracing::debug!(source = %candidate.label(), %err, "candidate source rejected");
                }
            }
        }

        Err(Error::NoValidSource)
    }
}
