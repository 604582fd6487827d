//! Memo table for perft node counts.
//!
//! One entry per bucket, last write wins. A probe only hits when both the stored
//! hash and the stored depth match, since the same position at a different
//! remaining depth has a different count.

/// A cached subtree count. `data` packs `nodes << 8 | depth`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerftEntry {
    pub hash: u64,
    data: u64,
}

impl PerftEntry {
    #[inline(always)]
    pub fn new(hash: u64, depth: u8, nodes: u64) -> Self {
        debug_assert!(nodes < 1 << 56, "node count does not fit the entry");
        Self {
            hash,
            data: nodes << 8 | depth as u64,
        }
    }

    #[inline(always)]
    pub fn depth(&self) -> u8 {
        (self.data & 0xFF) as u8
    }

    #[inline(always)]
    pub fn nodes(&self) -> u64 {
        self.data >> 8
    }
}

/// Fixed-size perft cache, one per perft run (or per root branch when running in
/// parallel).
pub struct PerftCache {
    /// Power of 2 size for fast modulo via bitmask
    entries: Vec<PerftEntry>,
    size_mask: usize,
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
}

impl PerftCache {
    /// Create a cache with `entries` slots, rounded down to a power of two.
    pub fn with_entries(entries: usize) -> Self {
        let entries = entries.max(1);
        let entries = if entries.is_power_of_two() {
            entries
        } else {
            entries.next_power_of_two() >> 1
        };
        PerftCache {
            entries: vec![PerftEntry::default(); entries],
            size_mask: entries - 1,
            hits: 0,
            misses: 0,
            stores: 0,
        }
    }

    /// Create a cache using approximately `size_mb` megabytes of memory
    pub fn new(size_mb: usize) -> Self {
        Self::with_entries(Self::entries_for_mb(size_mb))
    }

    /// Entries fitting in `size_mb` megabytes, at least 1024
    fn entries_for_mb(size_mb: usize) -> usize {
        let bytes = size_mb.saturating_mul(1024 * 1024);
        (bytes / std::mem::size_of::<PerftEntry>()).max(1024)
    }

    /// Cache sized for a perft of the given depth: 2^20 entries below depth 6,
    /// 2^23 at depth 6 and 2^24 above.
    pub fn for_depth(depth: u8) -> Self {
        let bits = match depth {
            0..=5 => 20,
            6 => 23,
            _ => 24,
        };
        Self::with_entries(1 << bits)
    }

    /// Fold the high half of the hash into the low half before masking
    #[inline(always)]
    pub fn index(&self, hash: u64) -> usize {
        ((hash as u32) ^ ((hash >> 32) as u32)) as usize & self.size_mask
    }

    #[inline]
    pub fn probe(&mut self, hash: u64, depth: u8) -> Option<u64> {
        let entry = &self.entries[self.index(hash)];
        if entry.hash == hash && entry.depth() == depth {
            self.hits += 1;
            Some(entry.nodes())
        } else {
            self.misses += 1;
            None
        }
    }

    #[inline]
    pub fn store(&mut self, hash: u64, depth: u8, nodes: u64) {
        let idx = self.index(hash);
        self.entries[idx] = PerftEntry::new(hash, depth, nodes);
        self.stores += 1;
    }

    pub fn clear(&mut self) {
        self.entries.fill(PerftEntry::default());
        self.hits = 0;
        self.misses = 0;
        self.stores = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
