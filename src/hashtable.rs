//! A separate-chaining hash table with FNV-1a hashing, automatic growth,
//! and a cursor that supports deleting the current element mid-iteration.
//!
//! This is the one data structure everything else in the crate is built
//! on: the document table is two of these, the in-memory inverted index
//! is one of these with more of them nested inside, and the on-disk
//! index format is just this table flattened into a file.

/// The hash key type. Keys are produced by [`fnv_hash_64`] for byte-string
/// keys, or used directly for small-integer keys such as document ids.
pub type HashKey = u64;

const FNV1_64_INIT: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a, 64-bit, over a byte buffer.
pub fn fnv_hash_64(buffer: &[u8]) -> HashKey {
    let mut hval = FNV1_64_INIT;
    for &byte in buffer {
        hval ^= u64::from(byte);
        hval = hval.wrapping_mul(FNV_64_PRIME);
    }
    hval
}

/// FNV-1a over the eight little-endian bytes of an integer.
pub fn fnv_hash_int_64(value: u64) -> HashKey {
    fnv_hash_64(&value.to_le_bytes())
}

/// A chained hash table mapping a [`HashKey`] to an owned value.
///
/// A key appears at most once in the table. The table grows itself by 9x
/// whenever the element count reaches three times the bucket count; the
/// growth check runs before an insert is applied, so the table can hold
/// `3 * num_buckets + 1` elements for the duration of that one insert.
///
/// Values are dropped by the table when it is dropped or when an insert
/// replaces them, per ordinary ownership rules.
pub struct HashTable<V> {
    buckets: Vec<Vec<(HashKey, V)>>,
    num_elements: usize,
}

impl<V> HashTable<V> {
    /// Create a table with `num_buckets` initial buckets.
    ///
    /// Panics if `num_buckets` is zero; a zero-bucket table cannot place
    /// any element and is a caller bug.
    pub fn new(num_buckets: usize) -> HashTable<V> {
        assert!(num_buckets > 0, "hash table needs at least one bucket");
        let mut buckets = Vec::with_capacity(num_buckets);
        buckets.resize_with(num_buckets, Vec::new);
        HashTable {
            buckets,
            num_elements: 0,
        }
    }

    /// The number of live key/value pairs in the table.
    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// The current number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// True if the table holds no elements.
    pub fn is_empty(&self) -> bool {
        self.num_elements == 0
    }

    fn bucket_for(&self, key: HashKey) -> usize {
        (key % self.buckets.len() as u64) as usize
    }

    /// The chain for one bucket, in stored order. The serializer walks
    /// chains directly so that the on-disk bucket assignment matches the
    /// in-memory one.
    pub(crate) fn chain(&self, bucket: usize) -> &[(HashKey, V)] {
        &self.buckets[bucket]
    }

    /// Insert `value` under `key`. If the key was already present, the
    /// previous value is returned to the caller and the element count is
    /// unchanged; otherwise `None` is returned.
    pub fn insert(&mut self, key: HashKey, value: V) -> Option<V> {
        self.maybe_resize();

        let bucket = self.bucket_for(key);
        let chain = &mut self.buckets[bucket];
        for entry in chain.iter_mut() {
            if entry.0 == key {
                return Some(std::mem::replace(&mut entry.1, value));
            }
        }
        chain.push((key, value));
        self.num_elements += 1;
        None
    }

    /// Look up the value stored under `key`. Absence is an ordinary
    /// outcome, not an error.
    pub fn lookup(&self, key: HashKey) -> Option<&V> {
        let bucket = self.bucket_for(key);
        self.buckets[bucket]
            .iter()
            .find(|entry| entry.0 == key)
            .map(|entry| &entry.1)
    }

    /// Look up the value stored under `key`, mutably.
    pub fn lookup_mut(&mut self, key: HashKey) -> Option<&mut V> {
        let bucket = self.bucket_for(key);
        self.buckets[bucket]
            .iter_mut()
            .find(|entry| entry.0 == key)
            .map(|entry| &mut entry.1)
    }

    /// Remove `key` from the table, returning the value it mapped to.
    pub fn remove(&mut self, key: HashKey) -> Option<V> {
        let bucket = self.bucket_for(key);
        let chain = &mut self.buckets[bucket];
        let pos = chain.iter().position(|entry| entry.0 == key)?;
        let (_, value) = chain.remove(pos);
        self.num_elements -= 1;
        Some(value)
    }

    /// Iterate over all (key, value) pairs in bucket order, then chain
    /// order. Read-only; use [`HashTable::cursor`] to delete while
    /// iterating.
    pub fn entries(&self) -> impl Iterator<Item = (HashKey, &V)> {
        self.buckets
            .iter()
            .flat_map(|chain| chain.iter().map(|(k, v)| (*k, v)))
    }

    /// Create a cursor positioned at the first element of the
    /// lowest-indexed populated bucket. An empty table yields a cursor
    /// that is already past the end.
    pub fn cursor(&mut self) -> Cursor<'_, V> {
        let bucket = self.buckets.iter().position(|chain| !chain.is_empty());
        match bucket {
            Some(bucket) => Cursor {
                table: self,
                bucket,
                pos: 0,
                valid: true,
            },
            None => Cursor {
                table: self,
                bucket: 0,
                pos: 0,
                valid: false,
            },
        }
    }

    // Grow the table 9x if the load factor has reached 3. Runs before an
    // insert, so the trigger element itself lands in the grown table but
    // the table seen by the check still holds the old element count.
    fn maybe_resize(&mut self) {
        if self.num_elements < 3 * self.buckets.len() {
            return;
        }

        let new_count = self.buckets.len() * 9;
        let mut new_buckets: Vec<Vec<(HashKey, V)>> = Vec::with_capacity(new_count);
        new_buckets.resize_with(new_count, Vec::new);

        for chain in self.buckets.drain(..) {
            for (key, value) in chain {
                let bucket = (key % new_count as u64) as usize;
                new_buckets[bucket].push((key, value));
            }
        }
        self.buckets = new_buckets;
    }
}

/// A cursor over a [`HashTable`] that permits deleting the element it
/// points at without invalidating the rest of the iteration.
///
/// The cursor borrows the table mutably, so the table cannot be modified
/// behind its back while it exists.
pub struct Cursor<'a, V> {
    table: &'a mut HashTable<V>,
    bucket: usize,
    pos: usize,
    valid: bool,
}

impl<'a, V> Cursor<'a, V> {
    /// True once the cursor has moved past the last element.
    pub fn past_end(&self) -> bool {
        !self.valid
    }

    /// The (key, value) pair under the cursor, or `None` past the end.
    pub fn current(&self) -> Option<(HashKey, &V)> {
        if !self.valid {
            return None;
        }
        let (key, value) = &self.table.buckets[self.bucket][self.pos];
        Some((*key, value))
    }

    /// Advance to the next element. Returns false (and goes past the end)
    /// if there is none.
    pub fn advance(&mut self) -> bool {
        if !self.valid {
            return false;
        }
        if self.pos + 1 < self.table.buckets[self.bucket].len() {
            self.pos += 1;
            return true;
        }
        self.seek_next_bucket()
    }

    /// Delete the pair under the cursor and return it, leaving the cursor
    /// on that pair's successor (or past the end if it was the last one).
    ///
    /// Because the cursor lands on the successor before the caller can
    /// observe it, continuing the iteration visits every remaining
    /// element exactly once.
    pub fn delete_current(&mut self) -> Option<(HashKey, V)> {
        if !self.valid {
            return None;
        }
        let removed = self.table.buckets[self.bucket].remove(self.pos);
        self.table.num_elements -= 1;

        // Vec::remove shifted the successor down into `pos`; if the chain
        // is exhausted instead, hop to the next populated bucket.
        if self.pos >= self.table.buckets[self.bucket].len() {
            self.seek_next_bucket();
        }
        Some(removed)
    }

    // Move to the first element of the next populated bucket, or go past
    // the end. Returns whether an element was found.
    fn seek_next_bucket(&mut self) -> bool {
        for bucket in self.bucket + 1..self.table.buckets.len() {
            if !self.table.buckets[bucket].is_empty() {
                self.bucket = bucket;
                self.pos = 0;
                return true;
            }
        }
        self.valid = false;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_lookup_roundtrip() {
        let mut table: HashTable<String> = HashTable::new(4);
        assert!(table.insert(1, "one".to_string()).is_none());
        assert!(table.insert(2, "two".to_string()).is_none());
        assert_eq!(table.lookup(1).map(String::as_str), Some("one"));
        assert_eq!(table.lookup(2).map(String::as_str), Some("two"));
        assert!(table.lookup(3).is_none());
        assert_eq!(table.num_elements(), 2);
    }

    #[test]
    fn insert_replaces_and_returns_old_value() {
        let mut table: HashTable<u32> = HashTable::new(4);
        assert!(table.insert(7, 100).is_none());
        assert_eq!(table.insert(7, 200), Some(100));
        assert_eq!(table.num_elements(), 1);
        assert_eq!(table.lookup(7), Some(&200));
    }

    #[test]
    fn remove_returns_value_and_updates_count() {
        let mut table: HashTable<u32> = HashTable::new(4);
        for key in 0..10 {
            table.insert(key, key as u32 * 10);
        }
        assert_eq!(table.remove(4), Some(40));
        assert!(table.remove(4).is_none());
        assert_eq!(table.num_elements(), 9);
        assert!(table.lookup(4).is_none());
    }

    #[test]
    fn num_elements_tracks_distinct_keys() {
        let mut table: HashTable<u32> = HashTable::new(2);
        for key in 0..50 {
            table.insert(key, 0);
        }
        for key in 0..50 {
            table.insert(key, 1); // overwrites, no count change
        }
        assert_eq!(table.num_elements(), 50);
        for key in (0..50).step_by(2) {
            table.remove(key);
        }
        assert_eq!(table.num_elements(), 25);
    }

    #[test]
    fn resize_preserves_all_entries() {
        let mut table: HashTable<u64> = HashTable::new(2);
        // 2 buckets resize at 6 elements, then 18 buckets at 54; push
        // well past both thresholds.
        for key in 0..100u64 {
            table.insert(key, key * key);
        }
        assert!(table.num_buckets() > 2);
        for key in 0..100u64 {
            assert_eq!(table.lookup(key), Some(&(key * key)), "key {key}");
        }
    }

    #[test]
    fn resize_triggers_before_insert() {
        let mut table: HashTable<u32> = HashTable::new(2);
        for key in 0..6 {
            table.insert(key, 0);
        }
        // Six elements in two buckets: at the trigger threshold but the
        // growth only happens on the way into the next insert.
        assert_eq!(table.num_buckets(), 2);
        table.insert(6, 0);
        assert_eq!(table.num_buckets(), 18);
    }

    #[test]
    fn cursor_visits_every_element_once() {
        let mut table: HashTable<u32> = HashTable::new(4);
        for key in 0..20 {
            table.insert(key, key as u32);
        }
        let mut seen = Vec::new();
        let mut cursor = table.cursor();
        while !cursor.past_end() {
            let (key, _) = cursor.current().unwrap();
            seen.push(key);
            cursor.advance();
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn cursor_on_empty_table_is_past_end() {
        let mut table: HashTable<u32> = HashTable::new(4);
        let cursor = table.cursor();
        assert!(cursor.past_end());
        assert!(cursor.current().is_none());
    }

    #[test]
    fn delete_current_keeps_iteration_intact() {
        let mut table: HashTable<u32> = HashTable::new(4);
        for key in 0..20 {
            table.insert(key, key as u32);
        }

        // Delete every even key while iterating; collect everything the
        // cursor shows us after each deletion.
        let mut survivors = Vec::new();
        let mut cursor = table.cursor();
        while !cursor.past_end() {
            let (key, _) = cursor.current().unwrap();
            if key % 2 == 0 {
                assert!(cursor.delete_current().is_some());
            } else {
                survivors.push(key);
                cursor.advance();
            }
        }

        survivors.sort_unstable();
        assert_eq!(survivors, (0..20).filter(|k| k % 2 == 1).collect::<Vec<_>>());
        assert_eq!(table.num_elements(), 10);
        for key in 0..20 {
            assert_eq!(table.lookup(key).is_some(), key % 2 == 1);
        }
    }

    #[test]
    fn delete_current_drains_whole_table() {
        let mut table: HashTable<u32> = HashTable::new(3);
        for key in 0..9 {
            table.insert(key, 0);
        }
        let mut cursor = table.cursor();
        let mut deleted = 0;
        while cursor.delete_current().is_some() {
            deleted += 1;
        }
        assert!(cursor.past_end());
        assert_eq!(deleted, 9);
        assert!(table.is_empty());
    }

    #[test]
    fn fnv_hash_is_stable() {
        // Reference values for the FNV-1a 64-bit test vectors.
        assert_eq!(fnv_hash_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv_hash_64(b"a"), 0xaf63_dc4c_8601_ec8c);
        // Same bytes, same hash, regardless of how the key was produced.
        assert_eq!(fnv_hash_int_64(0), fnv_hash_64(&[0u8; 8]));
    }

    #[test]
    #[should_panic(expected = "at least one bucket")]
    fn zero_buckets_is_a_caller_bug() {
        let _ = HashTable::<u32>::new(0);
    }
}
