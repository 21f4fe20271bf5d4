//! Idempotent get-or-compute wrapper over a transcript store

use std::future::Future;
use tally_domain::traits::TranscriptCache;
use tally_domain::PageKey;
use tracing::{debug, warn};

/// Idempotent page-transcription cache
///
/// Wraps any [`TranscriptCache`] with the get-or-compute contract that makes
/// a batch resumable: a cached key never re-invokes the compute closure, and
/// a failed compute persists nothing so the next run can retry.
///
/// Store errors never fail a page. A read error degrades to a cache miss; a
/// write error is logged and the computed text returned uncached, so the
/// page is simply recomputed on the next run.
pub struct PageCache<S: TranscriptCache> {
    store: S,
    force_refresh: bool,
}

impl<S: TranscriptCache> PageCache<S>
where
    S::Error: std::fmt::Display,
{
    /// Wrap a transcript store
    pub fn new(store: S) -> Self {
        Self {
            store,
            force_refresh: false,
        }
    }

    /// Bypass and overwrite cached entries on the next `get_or_compute`
    ///
    /// The overwrite happens when the freshly computed text is persisted;
    /// entries are never deleted up front, so a failed recompute leaves the
    /// prior transcription intact.
    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    /// Whether cached entries are being bypassed
    pub fn force_refresh(&self) -> bool {
        self.force_refresh
    }

    /// The cached transcription for a page, if present and readable
    pub fn cached(&self, key: &PageKey) -> Option<String> {
        match self.store.get(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Return the cached transcription or compute, persist, and return it
    ///
    /// `compute` runs at most once, and only on a miss (or when
    /// force-refresh is set). Its error is the only error this method can
    /// return.
    pub async fn get_or_compute<F, Fut, E>(
        &mut self,
        key: &PageKey,
        compute: F,
    ) -> Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, E>>,
    {
        if !self.force_refresh {
            if let Some(text) = self.cached(key) {
                debug!("cache hit for {}", key);
                return Ok(text);
            }
        }

        let text = compute().await?;

        if let Err(e) = self.store.put(key, &text) {
            warn!(
                "cache write failed for {}: {} (page will be recomputed next run)",
                key, e
            );
        }

        Ok(text)
    }

    /// Access the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the wrapper, returning the underlying store
    pub fn into_store(self) -> S {
        self.store
    }
}
