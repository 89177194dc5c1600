use serde::Serialize;

/// Counters describing what a [`ReferenceCache`](crate::ReferenceCache) has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// `get` calls answered from the cache.
    pub hits: u64,
    /// `get` calls that went to the store.
    pub misses: u64,
    /// Misses the store had no record for, answered with an empty record.
    pub created: u64,
    /// Successful `store` calls.
    pub stores: u64,
    /// Successful `destroy` calls.
    pub destroys: u64,
    /// Store calls that failed.
    pub failures: u64,
    /// Entries dropped by the retention policy.
    pub reclaimed: u64,
    /// Live entries at the time of the snapshot.
    pub entries: usize,
}

impl CacheStats {
    /// Fraction of `get` calls served from the cache, if any were made.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.hits + self.misses;
        (lookups > 0).then(|| self.hits as f64 / lookups as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_ratio() {
        assert_eq!(CacheStats::default().hit_ratio(), None);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_ratio(), Some(0.75));
    }
}
