use crate::error::Error;
use crate::source::{ZoneFeatureSource, ZoneFeatures};
use crate::util::{Result, safe_lock_mutex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves zone features from memory, keyed by dataset path and zone field
#[derive(Debug, Default)]
pub struct MockZoneSource {
    datasets: Mutex<HashMap<(PathBuf, String), ZoneFeatures>>,
    reads: AtomicUsize,
}

impl MockZoneSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_zones(
        self,
        path: impl Into<PathBuf>,
        zone_field: &str,
        zones: ZoneFeatures,
    ) -> Self {
        safe_lock_mutex(&self.datasets).insert((path.into(), zone_field.to_string()), zones);
        self
    }

    /// How often features were read
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ZoneFeatureSource for MockZoneSource {
    fn read_zone_features(&self, path: &Path, zone_field: &str) -> Result<ZoneFeatures> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let datasets = safe_lock_mutex(&self.datasets);

        if let Some(zones) = datasets.get(&(path.to_owned(), zone_field.to_string())) {
            return Ok(zones.clone());
        }

        if datasets.keys().any(|(known_path, _)| known_path == path) {
            return Err(Error::MissingZoneField {
                path: path.to_owned(),
                field: zone_field.to_string(),
                feature: 0,
            });
        }

        Err(Error::ReadZoneDataset {
            path: path.to_owned(),
            source: std::io::ErrorKind::NotFound.into(),
        })
    }
}
