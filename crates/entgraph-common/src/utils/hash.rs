//! Hash map and set aliases backed by `hashbrown` with `ahash`.

/// Hash map with the workspace's default hasher.
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// Hash set with the workspace's default hasher.
pub type FastHashSet<T> = hashbrown::HashSet<T, ahash::RandomState>;
