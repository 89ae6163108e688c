//! Cache configuration.

use crate::error::ConfigError;

/// Configuration for a bounded cache instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of distinct keys held at once.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl CacheConfig {
    /// Create a new cache config with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity }
    }

    /// Set capacity (builder pattern).
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Config for directional relation lookups between entities.
    pub fn relations() -> Self {
        Self { capacity: 1024 }
    }

    /// Config for per-injury projected bleeding ages.
    /// Injuries churn faster than relations, so this one is larger.
    pub fn injury_bleeding() -> Self {
        Self { capacity: 2048 }
    }

    /// Reject configs that could never hold an entry.
    pub fn validate(self, name: &'static str) -> Result<Self, ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity { name });
        }
        Ok(self)
    }
}
