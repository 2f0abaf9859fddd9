//! A bounded, process-local memoization cache (§4.4 "Memoization"), kept close to the teacher
//! crate's `fitness::cache::CachePointer` verbatim: only the cached value's type and the cache key
//! change, from "a chromosome's gene hash" to "the formatter invocation that produced a score".
use lru::LruCache;
use nohash_hasher::NoHashHasher;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};

use crate::population::FitnessValue;

type LruCacheBuildHasher = BuildHasherDefault<NoHashHasher<u64>>;

/// `(command, source_filename, config_bytes)`, hashed to a single `u64` so the cache can use the
/// same `NoHashHasher` trick as the teacher's gene-hash cache.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FileScoreKey {
    pub command: String,
    pub source_filename: String,
    pub config_bytes: Vec<u8>,
}

impl FileScoreKey {
    fn hashed(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// `(edit_distance, deleted_lines)` for a single example file, the unit the fitness evaluator
/// aggregates across a whole corpus.
pub type FileScore = (FitnessValue, FitnessValue);

#[derive(Debug, Clone)]
pub struct CachePointer {
    cache_pointer: Arc<RwLock<LruCache<u64, FileScore, LruCacheBuildHasher>>>,
}

impl CachePointer {
    pub fn new(cache_size: usize) -> Self {
        let non_zero_cache_size = NonZeroUsize::new(cache_size).expect("cache_size must be > 0");
        let cache = LruCache::with_hasher(non_zero_cache_size, LruCacheBuildHasher::default());
        Self {
            cache_pointer: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn read(&self, key: &FileScoreKey) -> Option<FileScore> {
        self.cache_pointer
            .read()
            .expect("fitness cache lock poisoned")
            .peek(&key.hashed())
            .copied()
    }

    pub fn write(&self, key: &FileScoreKey, value: FileScore) {
        self.cache_pointer
            .write()
            .expect("fitness cache lock poisoned")
            .put(key.hashed(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(source_filename: &str) -> FileScoreKey {
        FileScoreKey {
            command: "clang-format".to_string(),
            source_filename: source_filename.to_string(),
            config_bytes: b"ColumnLimit: 100\n".to_vec(),
        }
    }

    #[test]
    fn miss_then_hit_after_write() {
        let cache = CachePointer::new(4);
        assert_eq!(cache.read(&key("a.cc")), None);
        cache.write(&key("a.cc"), (3, 1));
        assert_eq!(cache.read(&key("a.cc")), Some((3, 1)));
    }

    #[test]
    fn distinct_source_filenames_are_distinct_keys() {
        let cache = CachePointer::new(4);
        cache.write(&key("a.cc"), (3, 1));
        assert_eq!(cache.read(&key("b.cc")), None);
    }

    #[test]
    fn eviction_respects_bounded_capacity() {
        let cache = CachePointer::new(1);
        cache.write(&key("a.cc"), (1, 1));
        cache.write(&key("b.cc"), (2, 2));
        assert_eq!(cache.read(&key("a.cc")), None);
        assert_eq!(cache.read(&key("b.cc")), Some((2, 2)));
    }
}
