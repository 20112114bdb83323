//! Process topology and road sharding.

use std::ops::Range;

/// This worker's rank and the total rank count.
///
/// A non-distributed run is a single rank (`ProcessTopology::single()`) that
/// owns the whole road.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ProcessTopology {
    pub rank: usize,
    pub size: usize,
}

impl ProcessTopology {
    pub fn new(rank: usize, size: usize) -> Self {
        debug_assert!(rank < size, "rank {rank} out of range for {size} ranks");
        Self { rank, size }
    }

    pub fn single() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// Rank 0 owns global site 0 and is the only rank that spawns.
    #[inline]
    pub fn is_first(self) -> bool {
        self.rank == 0
    }

    /// The last rank owns the road exit.
    #[inline]
    pub fn is_last(self) -> bool {
        self.rank + 1 == self.size
    }

    /// Rank holding the shard upstream of this one.
    pub fn left(self) -> Option<usize> {
        self.rank.checked_sub(1)
    }

    /// Rank holding the shard downstream of this one.
    pub fn right(self) -> Option<usize> {
        (!self.is_last()).then_some(self.rank + 1)
    }

    /// Global site range owned by this rank.
    ///
    /// Every rank gets `floor(road_length / size)` sites; the remainder is
    /// appended to the last rank's shard.
    pub fn shard(self, road_length: usize) -> Range<usize> {
        let base = road_length / self.size;
        let start = base * self.rank;
        let end = if self.is_last() { road_length } else { start + base };
        start..end
    }
}

impl Default for ProcessTopology {
    fn default() -> Self {
        Self::single()
    }
}

impl std::fmt::Display for ProcessTopology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rank {}/{}", self.rank, self.size)
    }
}
