use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

/// Hash-consing table.
///
/// Values are stored in a growing arena and chained into a fixed number of
/// buckets. Index 0 is a sentinel meaning "no entry", so valid indices start at 1.
/// Values are never removed: a table lives as long as the diagrams built in it.
pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T>
where
    T: Default,
{
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_size = 1 << bits;
        let mut data = Vec::with_capacity(buckets_size);
        data.push(Entry {
            value: T::default(),
            next: 0,
        });

        Self {
            data,
            buckets: vec![0; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }
}

impl<T> Table<T> {
    /// Get the number of stored values.
    pub fn size(&self) -> usize {
        self.data.len() - 1
    }

    /// Get the number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        assert_ne!(index, 0, "Index is 0");
        &self.data[index].value
    }

    /// Get the index of the next value in the same bucket.
    pub fn next(&self, index: usize) -> usize {
        assert_ne!(index, 0, "Index is 0");
        self.data[index].next
    }

    /// Append a value without hash-consing it and return its index.
    pub fn push(&mut self, value: T) -> usize {
        self.data.push(Entry { value, next: 0 });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Look up the value, inserting it if absent, and return its index.
    pub fn put(&mut self, value: T) -> usize {
        let bucket = self.bucket_index(&value);
        let mut index = self.buckets[bucket];

        if index == 0 {
            let i = self.push(value);
            self.buckets[bucket] = i;
            return i;
        }

        loop {
            if &value == self.value(index) {
                return index;
            }
            let next = self.next(index);
            if next == 0 {
                let i = self.push(value);
                self.data[index].next = i;
                return i;
            }
            index = next;
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_push() {
        let mut table = Table::new(2);
        let index = table.push(Item(42));
        assert_eq!(index, 1);
        assert_eq!(table[index], Item(42));
        assert_eq!(table.next(index), 0);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn test_put_deduplicates() {
        let mut table = Table::new(2);
        let a = table.put(Item(7));
        let b = table.put(Item(7));
        assert_eq!(a, b);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn test_put_chains_collisions() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(-5));
        assert_ne!(index1, index2);
        assert_eq!(table[index1], Item(5));
        assert_eq!(table[index2], Item(-5));
        assert_eq!(table.next(index1), index2);
    }

    #[test]
    fn test_grows_past_bucket_count() {
        let mut table = Table::new(1);
        for i in 0..100 {
            table.put(Item(i));
        }
        assert_eq!(table.size(), 100);
        assert_eq!(table.num_buckets(), 2);
    }

    #[test]
    #[should_panic(expected = "Index is 0")]
    fn test_sentinel_is_not_addressable() {
        let table = Table::<Item>::new(1);
        table.value(0);
    }
}
