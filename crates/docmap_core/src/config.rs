//! Mapper configuration.

use crate::id::IdStrategy;
use crate::metadata::KeyCase;

/// Configuration for building a [`crate::Mapper`].
#[derive(Debug, Clone)]
pub struct MapperConfig {
    /// How type and field names become collection names and document keys,
    /// unless a definition overrides it.
    pub key_case: KeyCase,

    /// How identities are generated for entities persisted without one.
    pub id_strategy: IdStrategy,

    /// Number of compiled queries kept per mapper (0 disables caching).
    pub query_cache_capacity: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            key_case: KeyCase::Upper,
            id_strategy: IdStrategy::Uuid,
            query_cache_capacity: 256,
        }
    }
}

impl MapperConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default key case.
    #[must_use]
    pub const fn key_case(mut self, value: KeyCase) -> Self {
        self.key_case = value;
        self
    }

    /// Sets the identity generation strategy.
    #[must_use]
    pub const fn id_strategy(mut self, value: IdStrategy) -> Self {
        self.id_strategy = value;
        self
    }

    /// Sets the compiled query cache capacity.
    #[must_use]
    pub const fn query_cache_capacity(mut self, capacity: usize) -> Self {
        self.query_cache_capacity = capacity;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = MapperConfig::default();
        assert_eq!(config.key_case, KeyCase::Upper);
        assert_eq!(config.id_strategy, IdStrategy::Uuid);
        assert_eq!(config.query_cache_capacity, 256);
    }

    #[test]
    fn builder_pattern() {
        let config = MapperConfig::new()
            .key_case(KeyCase::Verbatim)
            .id_strategy(IdStrategy::Sequence)
            .query_cache_capacity(0);

        assert_eq!(config.key_case, KeyCase::Verbatim);
        assert_eq!(config.id_strategy, IdStrategy::Sequence);
        assert_eq!(config.query_cache_capacity, 0);
    }
}
