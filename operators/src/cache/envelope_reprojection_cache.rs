use crate::processing::reprojection::Reprojector;
use crate::util::config::{self, get_config_element};
use crate::util::{Result, safe_lock_mutex};
use hydrogrid_datatypes::primitives::Envelope;
use hydrogrid_datatypes::spatial_reference::SpatialReference;
use lru::LruCache;
use ordered_float::OrderedFloat;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::trace;

/// Identifies a reprojection by value: two keys with the same bounds and
/// reference systems are interchangeable, wherever they were created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvelopeReprojectionKey {
    bounds: [OrderedFloat<f64>; 4],
    from: SpatialReference,
    to: SpatialReference,
}

impl EnvelopeReprojectionKey {
    pub fn new(envelope: &Envelope, from: &SpatialReference, to: &SpatialReference) -> Self {
        Self {
            bounds: [
                envelope.min_x(),
                envelope.max_x(),
                envelope.min_y(),
                envelope.max_y(),
            ]
            .map(OrderedFloat),
            from: from.clone(),
            to: to.clone(),
        }
    }
}

/// Memoizes reprojected envelopes.
///
/// Processing the time slices of one dataset reprojects the same envelope over and over,
/// this cache makes sure that happens (almost) once. Concurrent misses on the same key
/// may both compute the value, the later one overwrites the earlier identical one.
pub struct EnvelopeReprojectionCache {
    reprojector: Reprojector,
    cache: Mutex<LruCache<EnvelopeReprojectionKey, Envelope>>,
}

impl EnvelopeReprojectionCache {
    pub fn new(reprojector: Reprojector, capacity: NonZeroUsize) -> Self {
        Self {
            reprojector,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Creates a cache with the capacity from the `envelope_cache` settings
    pub fn from_config(reprojector: Reprojector) -> Result<Self> {
        let settings = get_config_element::<config::EnvelopeCache>()?;
        let capacity = NonZeroUsize::new(settings.capacity).unwrap_or(NonZeroUsize::MIN);

        Ok(Self::new(reprojector, capacity))
    }

    pub fn reprojector(&self) -> &Reprojector {
        &self.reprojector
    }

    pub fn get(
        &self,
        envelope: &Envelope,
        from: &SpatialReference,
        to: &SpatialReference,
    ) -> Result<Envelope> {
        let key = EnvelopeReprojectionKey::new(envelope, from, to);

        if let Some(reprojected) = safe_lock_mutex(&self.cache).get(&key).copied() {
            trace!("envelope cache hit for {envelope}");
            return Ok(reprojected);
        }

        // computed outside of the lock, so other keys are not blocked by the engine
        let reprojected = self.reprojector.reproject_envelope(envelope, from, to)?;

        safe_lock_mutex(&self.cache).put(key, reprojected);

        Ok(reprojected)
    }

    pub fn len(&self) -> usize {
        safe_lock_mutex(&self.cache).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        safe_lock_mutex(&self.cache).clear();
    }
}

impl std::fmt::Debug for EnvelopeReprojectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeReprojectionCache")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransformEngine;
    use hydrogrid_datatypes::util::crs_definitions::{CONUS_ALBERS, WGS_84};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn engine() -> Arc<MockTransformEngine> {
        Arc::new(MockTransformEngine::new().with_transform(
            SpatialReference::new(WGS_84),
            SpatialReference::new(CONUS_ALBERS),
            |x, y| (x * 2., y * 2.),
        ))
    }

    fn cache(engine: &Arc<MockTransformEngine>, capacity: usize) -> EnvelopeReprojectionCache {
        EnvelopeReprojectionCache::new(
            Reprojector::new(engine.clone()),
            NonZeroUsize::new(capacity).unwrap(),
        )
    }

    #[test]
    fn keys_compare_by_value() {
        let a = EnvelopeReprojectionKey::new(
            &Envelope::new(0.0, 1.0, 2.0, 3.0).unwrap(),
            &SpatialReference::new(String::from(WGS_84)),
            &SpatialReference::new(String::from(CONUS_ALBERS)),
        );
        let b = EnvelopeReprojectionKey::new(
            &Envelope::new(0.0, 1.0, 2.0, 3.0).unwrap(),
            &SpatialReference::new(WGS_84),
            &SpatialReference::new(CONUS_ALBERS),
        );
        let swapped = EnvelopeReprojectionKey::new(
            &Envelope::new(0.0, 1.0, 2.0, 3.0).unwrap(),
            &SpatialReference::new(CONUS_ALBERS),
            &SpatialReference::new(WGS_84),
        );

        assert_eq!(a, b);
        assert_ne!(a, swapped);
        assert_eq!([a, b, swapped].into_iter().collect::<HashSet<_>>().len(), 2);
    }

    #[test]
    fn value_equal_requests_are_computed_once() {
        let engine = engine();
        let cache = cache(&engine, 8);

        let first = cache
            .get(
                &Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap(),
                &SpatialReference::new(String::from(WGS_84)),
                &SpatialReference::new(String::from(CONUS_ALBERS)),
            )
            .unwrap();
        let second = cache
            .get(
                &Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap(),
                &SpatialReference::new(WGS_84),
                &SpatialReference::new(CONUS_ALBERS),
            )
            .unwrap();

        assert_eq!(first, Envelope::new(2.0, 4.0, 6.0, 8.0).unwrap());
        assert_eq!(first, second);
        assert_eq!(engine.envelope_transform_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn different_envelopes_are_computed_separately() {
        let engine = engine();
        let cache = cache(&engine, 8);
        let from = SpatialReference::new(WGS_84);
        let to = SpatialReference::new(CONUS_ALBERS);

        cache
            .get(&Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap(), &from, &to)
            .unwrap();
        cache
            .get(&Envelope::new(1.0, 2.0, 3.0, 5.0).unwrap(), &from, &to)
            .unwrap();

        assert_eq!(engine.envelope_transform_count(), 2);
    }

    #[test]
    fn it_evicts_the_least_recently_used_entry() {
        let engine = engine();
        let cache = cache(&engine, 1);
        let from = SpatialReference::new(WGS_84);
        let to = SpatialReference::new(CONUS_ALBERS);
        let a = Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let b = Envelope::new(5.0, 6.0, 7.0, 8.0).unwrap();

        cache.get(&a, &from, &to).unwrap();
        cache.get(&b, &from, &to).unwrap();
        cache.get(&a, &from, &to).unwrap();

        assert_eq!(engine.envelope_transform_count(), 3);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn it_is_shared_between_threads() {
        let engine = engine();
        let cache = cache(&engine, 8);
        let envelope = Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap();
        let from = SpatialReference::new(WGS_84);
        let to = SpatialReference::new(CONUS_ALBERS);

        let results: Vec<Envelope> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.get(&envelope, &from, &to).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| *r == results[0]));
        assert!((1..=8).contains(&engine.envelope_transform_count()));

        cache.get(&envelope, &from, &to).unwrap();
        assert!(engine.envelope_transform_count() <= 8);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn same_reference_system_bypasses_the_engine() {
        let engine = engine();
        let cache = cache(&engine, 8);
        let crs = SpatialReference::new(WGS_84);
        let envelope = Envelope::new(1.0, 2.0, 3.0, 4.0).unwrap();

        assert_eq!(cache.get(&envelope, &crs, &crs).unwrap(), envelope);
        assert_eq!(engine.envelope_transform_count(), 0);
    }

    #[test]
    fn it_reads_its_capacity_from_the_settings() {
        let cache = EnvelopeReprojectionCache::from_config(Reprojector::new(engine())).unwrap();

        assert!(cache.is_empty());
    }
}
