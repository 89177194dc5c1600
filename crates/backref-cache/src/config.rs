use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};

/// Default number of pinned entries for [`RetentionPolicy::Bounded`].
pub const DEFAULT_CAPACITY: usize = 4096;

/// How long the cache keeps its own hold on a record.
///
/// Whatever the policy, a record a caller still holds stays reachable through
/// the cache, so two callers asking for the same target never receive
/// diverging copies. Reclaimed entries are reloaded from the store on the next
/// `get`; reclamation never deletes anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every entry until it is removed or evicted.
    Unbounded,
    /// Only track records; drop an entry as soon as no caller holds it.
    Weak,
    /// Pin the `capacity` most recently used entries. Older entries are
    /// tracked weakly and dropped once no caller holds them.
    Bounded { capacity: usize },
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::Bounded {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Configuration for a [`ReferenceCache`](crate::ReferenceCache).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Retention policy for cached records.
    pub retention: RetentionPolicy,
}

impl CacheConfig {
    /// A configuration that never drops entries on its own.
    pub fn unbounded() -> Self {
        Self {
            retention: RetentionPolicy::Unbounded,
        }
    }

    /// A configuration that holds records only while callers do.
    pub fn weak() -> Self {
        Self {
            retention: RetentionPolicy::Weak,
        }
    }

    /// A configuration pinning at most `capacity` entries.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            retention: RetentionPolicy::Bounded { capacity },
        }
    }

    /// Parse a configuration from TOML text.
    ///
    /// Keys other than the cache's own are ignored, so the cache settings can
    /// share a file with other sections.
    pub fn from_toml_str(text: &str) -> CacheResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| CacheError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the cache cannot honor.
    pub fn validate(&self) -> CacheResult<()> {
        if let RetentionPolicy::Bounded { capacity: 0 } = self.retention {
            return Err(CacheError::Config(
                "bounded retention needs a capacity of at least 1".into(),
            ));
        }
        Ok(())
    }
}
