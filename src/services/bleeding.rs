//! Projected bleeding duration per injury.

use crate::cache::{BoundedLruCache, CacheConfig, LruStats};
use crate::identity::{EntityId, IdentityBuildHasher};
use crate::sim::Injury;

/// Minimum age in ticks before any injury stops bleeding.
const BASE_BLEEDING_TICKS: f32 = 90_000.0;

/// Severities between these bounds bleed proportionally longer.
const MIN_SEVERITY: f32 = 1.0;
const MAX_SEVERITY: f32 = 30.0;

/// Remembers the age at which each injury stops bleeding.
///
/// The stop age only depends on severity, which is fixed once the injury
/// exists, so it is computed once per injury.
#[derive(Debug)]
pub struct InjuryBleedingCache {
    stop_age_by_injury: BoundedLruCache<EntityId, u32, IdentityBuildHasher>,
}

impl InjuryBleedingCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            stop_age_by_injury: BoundedLruCache::with_hasher(
                config.capacity,
                IdentityBuildHasher::default(),
            ),
        }
    }

    pub fn is_bleeding(&mut self, injury: &Injury) -> bool {
        if let Some(&stop_age) = self.stop_age_by_injury.get(&injury.id) {
            return injury.age_ticks < stop_age;
        }

        let stop_age = stop_bleeding_age(injury.severity);
        self.stop_age_by_injury.put(injury.id, stop_age);
        injury.age_ticks < stop_age
    }

    /// Seed a stop age directly, e.g. for injuries that never bleed.
    pub fn record_stop_age(&mut self, injury: EntityId, age_ticks: u32) {
        self.stop_age_by_injury.put(injury, age_ticks);
    }

    pub fn remove_cached_age(&mut self, injury: EntityId) {
        self.stop_age_by_injury.remove(&injury);
    }

    pub fn clear(&mut self) {
        self.stop_age_by_injury.clear();
    }

    pub fn stats(&self) -> LruStats {
        self.stop_age_by_injury.stats()
    }
}

/// Age in ticks at which an injury of `severity` stops bleeding.
pub fn stop_bleeding_age(severity: f32) -> u32 {
    let t = ((severity - MIN_SEVERITY) / (MAX_SEVERITY - MIN_SEVERITY)).clamp(0.0, 1.0);
    (BASE_BLEEDING_TICKS + (BASE_BLEEDING_TICKS * t).round()) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injury(id: u32, severity: f32, age_ticks: u32) -> Injury {
        Injury {
            id: EntityId::new(id),
            owner: EntityId::new(1),
            severity,
            age_ticks,
        }
    }

    #[test]
    fn test_stop_age_formula() {
        assert_eq!(stop_bleeding_age(0.5), 90_000);
        assert_eq!(stop_bleeding_age(1.0), 90_000);
        assert_eq!(stop_bleeding_age(30.0), 180_000);
        assert_eq!(stop_bleeding_age(100.0), 180_000);
        assert_eq!(stop_bleeding_age(15.5), 135_000);
    }

    #[test]
    fn test_is_bleeding_until_stop_age() {
        let mut cache = InjuryBleedingCache::new(CacheConfig::injury_bleeding());

        assert!(cache.is_bleeding(&injury(5, 1.0, 89_999)));
        assert!(!cache.is_bleeding(&injury(5, 1.0, 90_000)));
        assert_eq!(cache.stats().misses, 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn test_zero_stop_age_is_cached() {
        let mut cache = InjuryBleedingCache::new(CacheConfig::injury_bleeding());
        cache.record_stop_age(EntityId::new(7), 0);

        // With a stop age of 0 the injury is not bleeding even at age 0,
        // rather than being recomputed from its severity.
        assert!(!cache.is_bleeding(&injury(7, 30.0, 0)));
        assert_eq!(cache.stats().misses, 0);
    }

    #[test]
    fn test_remove_cached_age_recomputes() {
        let mut cache = InjuryBleedingCache::new(CacheConfig::injury_bleeding());
        cache.record_stop_age(EntityId::new(7), 0);
        cache.remove_cached_age(EntityId::new(7));

        assert!(cache.is_bleeding(&injury(7, 30.0, 0)));
    }
}
