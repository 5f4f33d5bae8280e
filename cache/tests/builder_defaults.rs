use fibre_memo::{BuildError, CacheBuilder, EvictionPolicy};

#[test]
fn test_unbounded_is_the_default() {
  let cache = CacheBuilder::new().loader(|key: &i32| *key).build().unwrap();
  assert_eq!(cache.capacity(), None);
  assert_eq!(cache.policy(), None);
}

#[test]
fn test_bounded_cache_defaults_to_lru() {
  let cache = CacheBuilder::new()
    .capacity(2)
    .loader(|key: &i32| *key)
    .build()
    .unwrap();
  assert_eq!(cache.policy(), Some(EvictionPolicy::Lru));

  cache.get(&1).unwrap();
  cache.get(&2).unwrap();
  cache.get(&1).unwrap();
  cache.get(&3).unwrap();
  assert!(cache.contains_key(&1), "Recently used key should survive");
  assert!(!cache.contains_key(&2));
}

#[test]
fn test_build_rejects_bad_configurations() {
  let err = CacheBuilder::new()
    .capacity(0)
    .loader(|key: &i32| *key)
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::ZeroCapacity);

  let err = CacheBuilder::<i32, i32>::new().build().unwrap_err();
  assert_eq!(err, BuildError::MissingLoader);

  let err = CacheBuilder::new()
    .policy(EvictionPolicy::Fifo)
    .loader(|key: &i32| *key)
    .build()
    .unwrap_err();
  assert_eq!(err, BuildError::PolicyWithoutCapacity);
}

#[test]
fn test_monitor_rejects_eviction_settings() {
  let err = CacheBuilder::new()
    .capacity(8)
    .loader(|key: &i32| *key)
    .build_monitor()
    .unwrap_err();
  assert_eq!(err, BuildError::EvictionUnsupported);

  let err = CacheBuilder::<i32, i32>::new().build_monitor().unwrap_err();
  assert_eq!(err, BuildError::MissingLoader);

  assert!(CacheBuilder::new().loader(|key: &i32| *key).build_monitor().is_ok());
}

#[test]
fn test_build_error_messages() {
  assert_eq!(
    BuildError::ZeroCapacity.to_string(),
    "bounded cache capacity cannot be zero"
  );
  assert_eq!(
    BuildError::PolicyWithoutCapacity.to_string(),
    "an eviction policy requires a capacity"
  );
}

#[test]
fn test_custom_hasher() {
  let cache = CacheBuilder::with_hasher(std::collections::hash_map::RandomState::new())
    .capacity(4)
    .loader(|key: &String| key.len())
    .build()
    .unwrap();
  assert_eq!(*cache.get(&"hello".to_string()).unwrap(), 5);
}

#[cfg(feature = "serde")]
mod config {
  use super::*;
  use fibre_memo::CacheConfig;

  #[test]
  fn test_builder_from_json_config() {
    let config: CacheConfig = serde_json::from_str(r#"{ "capacity": 2, "policy": "fifo" }"#).unwrap();
    let cache = CacheBuilder::new()
      .config(config)
      .loader(|key: &i32| key * 3)
      .build()
      .unwrap();

    assert_eq!(cache.capacity(), Some(2));
    assert_eq!(cache.policy(), Some(EvictionPolicy::Fifo));
    assert_eq!(*cache.get(&4).unwrap(), 12);
  }

  #[test]
  fn test_invalid_config_is_rejected_at_build() {
    let config: CacheConfig = serde_json::from_str(r#"{ "policy": "lru" }"#).unwrap();
    let err = CacheBuilder::new()
      .config(config)
      .loader(|key: &i32| *key)
      .build()
      .unwrap_err();
    assert_eq!(err, BuildError::PolicyWithoutCapacity);
  }

  #[test]
  fn test_unknown_fields_are_rejected() {
    let parsed = serde_json::from_str::<CacheConfig>(r#"{ "capacity": 2, "shards": 4 }"#);
    assert!(parsed.is_err());
  }
}
