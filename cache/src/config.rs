//! Declarative cache configuration, for loading cache settings from a config
//! file alongside the rest of an application's settings.

use crate::policy::EvictionPolicy;

use serde::{Deserialize, Serialize};

/// Serializable capacity and eviction settings for a cache.
///
/// Apply with [`CacheBuilder::config`](crate::CacheBuilder::config). An empty
/// config describes an unbounded cache.
///
/// ```
/// use fibre_memo::{CacheConfig, EvictionPolicy};
///
/// let config: CacheConfig = serde_json::from_str(r#"{ "capacity": 128, "policy": "fifo" }"#).unwrap();
/// assert_eq!(config.capacity, Some(128));
/// assert_eq!(config.policy, Some(EvictionPolicy::Fifo));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
  /// Maximum number of entries. `None` means unbounded.
  pub capacity: Option<usize>,
  /// Eviction policy. Defaults to LRU when a capacity is set.
  pub policy: Option<EvictionPolicy>,
}

impl CacheConfig {
  pub fn unbounded() -> Self {
    Self::default()
  }

  pub fn bounded(capacity: usize, policy: EvictionPolicy) -> Self {
    Self {
      capacity: Some(capacity),
      policy: Some(policy),
    }
  }
}
