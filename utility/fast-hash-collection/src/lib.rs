// https://nnethercote.github.io/perf-book/hashing.html

pub use hashbrown::hash_map::Entry as FastHashMapEntry;

pub type FastHasher = rustc_hash::FxHasher;
pub type FastHasherBuilder = std::hash::BuildHasherDefault<FastHasher>;
pub type FastHashMap<K, V> = hashbrown::HashMap<K, V, FastHasherBuilder>;
pub type FastHashSet<K> = hashbrown::HashSet<K, FastHasherBuilder>;

pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
  FastHashMap::with_capacity_and_hasher(capacity, FastHasherBuilder::default())
}

pub fn fast_hash_set_with_capacity<K>(capacity: usize) -> FastHashSet<K> {
  FastHashSet::with_capacity_and_hasher(capacity, FastHasherBuilder::default())
}
