use super::{GridCoordinates, IndexSearcher};
use crate::util::{Result, safe_read, safe_write};
use rustc_hash::FxHashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Shares index searchers between everything that works on the same coordinate system.
///
/// Searchers are found by the fingerprint of their coordinates and then compared in full,
/// so colliding fingerprints never hand out the wrong index.
#[derive(Debug, Default)]
pub struct IndexSearcherRegistry {
    searchers: RwLock<FxHashMap<u64, Vec<Arc<IndexSearcher>>>>,
}

impl IndexSearcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the searcher for these coordinates, building it on first use
    ///
    /// # Errors
    ///
    /// Fails if a new searcher cannot be built
    ///
    pub fn get_or_build(&self, coordinates: &GridCoordinates) -> Result<Arc<IndexSearcher>> {
        let fingerprint = coordinates.fingerprint();

        if let Some(searcher) = Self::find(&safe_read(&self.searchers), fingerprint, coordinates) {
            return Ok(searcher);
        }

        // built without holding the lock, an index over a large grid takes a while
        let searcher = Arc::new(IndexSearcher::new(coordinates.clone())?);

        let mut searchers = safe_write(&self.searchers);
        if let Some(existing) = Self::find(&searchers, fingerprint, coordinates) {
            return Ok(existing);
        }

        debug!("registered index searcher {fingerprint:x}");
        searchers
            .entry(fingerprint)
            .or_default()
            .push(searcher.clone());

        Ok(searcher)
    }

    fn find(
        searchers: &FxHashMap<u64, Vec<Arc<IndexSearcher>>>,
        fingerprint: u64,
        coordinates: &GridCoordinates,
    ) -> Option<Arc<IndexSearcher>> {
        searchers
            .get(&fingerprint)?
            .iter()
            .find(|searcher| searcher.coordinates() == coordinates)
            .cloned()
    }

    /// Drops the searcher for these coordinates, returns whether there was one
    pub fn remove(&self, coordinates: &GridCoordinates) -> bool {
        let fingerprint = coordinates.fingerprint();
        let mut searchers = safe_write(&self.searchers);

        let Some(bucket) = searchers.get_mut(&fingerprint) else {
            return false;
        };

        let before = bucket.len();
        bucket.retain(|searcher| searcher.coordinates() != coordinates);
        let removed = bucket.len() < before;

        if bucket.is_empty() {
            searchers.remove(&fingerprint);
        }

        removed
    }

    pub fn len(&self) -> usize {
        safe_read(&self.searchers).values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        safe_write(&self.searchers).clear();
    }
}
