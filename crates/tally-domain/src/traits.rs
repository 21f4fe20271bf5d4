//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. Implementations live in other crates.

use crate::page::{PageImage, PageKey};
use std::path::Path;

/// Persistent store for page transcriptions
///
/// Implemented by the infrastructure layer (tally-store). The store holds at
/// most one transcription per key; overwrites only happen through an
/// explicit `put` after a forced refresh.
pub trait TranscriptCache {
    /// Error type for store operations
    type Error;

    /// Fetch the cached transcription for a page, if any
    fn get(&self, key: &PageKey) -> Result<Option<String>, Self::Error>;

    /// Persist a transcription, replacing any existing entry for the key
    fn put(&mut self, key: &PageKey, text: &str) -> Result<(), Self::Error>;

    /// Remove a cached transcription
    fn remove(&mut self, key: &PageKey) -> Result<(), Self::Error>;
}

/// Converts a source document into its ordered page images
///
/// Implemented by an external collaborator (PDF rendering or similar).
/// Retry behavior for transient conversion failures is the implementation's
/// concern; a returned error is final for that document.
pub trait PageConverter {
    /// Error type for conversion operations
    type Error;

    /// Render every page of the document, ordered by page ordinal
    fn pages(&self, doc_path: &Path) -> Result<Vec<PageImage>, Self::Error>;
}
