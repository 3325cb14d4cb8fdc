use std::cell::Cell;

use crate::utils::MyHash;

struct Entry<K, V> {
    key: K,
    value: V,
}

/// Direct-mapped computed table.
///
/// A slot keeps the most recent entry hashed into it; full keys are compared on
/// lookup, so a collision is a miss and never a wrong answer.
pub struct Cache<K, V> {
    data: Vec<Option<Entry<K, V>>>,
    bitmask: u64,
    hits: Cell<usize>,
    misses: Cell<usize>,
}

impl<K, V> Cache<K, V> {
    /// Create a new cache of size `2^bits`.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Bits should be in the range 0..=31");

        let size = 1 << bits;
        let bitmask = (size - 1) as u64;

        Self {
            data: std::iter::repeat_with(|| None).take(size).collect(),
            bitmask,
            hits: Cell::new(0),
            misses: Cell::new(0),
        }
    }

    /// Get the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits.get()
    }
    /// Get the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses.get()
    }

    /// Reset the cache.
    pub fn clear(&mut self) {
        self.data.fill_with(|| None);
    }

    fn index(&self, hash: u64) -> usize {
        (hash & self.bitmask) as usize
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash + Eq,
{
    /// Get the cached result.
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.index(key.hash());
        match &self.data[index] {
            Some(entry) if &entry.key == key => {
                self.hits.set(self.hits.get() + 1);
                Some(&entry.value)
            }
            _ => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// Insert a result into the cache, evicting whatever occupied the slot.
    pub fn insert(&mut self, key: K, value: V) {
        let index = self.index(key.hash());
        self.data[index] = Some(Entry { key, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::pairing2;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Key(u64, u64);

    impl MyHash for Key {
        fn hash(&self) -> u64 {
            pairing2(self.0, self.1)
        }
    }

    #[test]
    fn test_cache() {
        let mut cache = Cache::<Key, i32>::new(3);

        cache.insert(Key(1, 2), 3);
        cache.insert(Key(2, 3), 1);
        cache.insert(Key(1, 3), 2);

        assert_eq!(cache.get(&Key(1, 2)), Some(&3));
        assert_eq!(cache.get(&Key(2, 3)), Some(&1));
        assert_eq!(cache.get(&Key(1, 3)), Some(&2));
        assert_eq!(cache.get(&Key(2, 1)), None);
        assert_eq!(cache.get(&Key(3, 3)), None);
        assert_eq!(cache.hits(), 3);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_collision_is_a_miss() {
        // With a single slot every key collides.
        let mut cache = Cache::<Key, &str>::new(0);
        cache.insert(Key(0, 1), "one");
        cache.insert(Key(0, 2), "two");
        assert_eq!(cache.get(&Key(0, 1)), None);
        assert_eq!(cache.get(&Key(0, 2)), Some(&"two"));
    }

    #[test]
    fn test_clear() {
        let mut cache = Cache::<Key, u64>::new(2);
        cache.insert(Key(1, 0), 10);
        cache.clear();
        assert_eq!(cache.get(&Key(1, 0)), None);
    }
}
