//! Boundary occupancy shared between neighboring shards.
//!
//! A rank never reads another rank's lanes directly.  Before each gap-refresh
//! phase it publishes the occupancy of its own edges ([`HaloEdges`]) and
//! receives its neighbors' edges, which become its [`Halo`]:
//!
//! ```text
//!          rank r-1                 rank r                  rank r+1
//!   ... [ trailing ] | [ leading ...          ... trailing ] | [ leading ] ...
//!             └──► behind of r                     ahead of r ◄──┘
//! ```
//!
//! Index 0 of every halo row is the site closest to the boundary.

/// Per-lane occupancy rows; `rows[lane][k]`.
pub type OccupancyRows = Vec<Vec<bool>>;

/// Edge occupancy a rank lends its neighbors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HaloEdges {
    /// First sites of each lane (for the left neighbor's forward scans).
    pub leading:  OccupancyRows,
    /// Last sites of each lane, nearest the boundary first (for the right
    /// neighbor's backward scans).
    pub trailing: OccupancyRows,
}

/// Neighbor occupancy visible past this shard's ends.
///
/// `None` on a side means the shard ends at the road boundary there, where
/// every site reads as empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Halo {
    /// Sites downstream of the shard end; `ahead[lane][k]` is local site
    /// `len + k`.
    pub ahead:  Option<OccupancyRows>,
    /// Sites upstream of the shard start; `behind[lane][k]` is local site
    /// `-1 - k`.
    pub behind: Option<OccupancyRows>,
}

impl Halo {
    /// Halo of a shard bounded by the road ends on both sides.
    pub fn open() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn ahead(&self, lane: usize, k: usize) -> bool {
        lookup(self.ahead.as_ref(), lane, k)
    }

    #[inline]
    pub(crate) fn behind(&self, lane: usize, k: usize) -> bool {
        lookup(self.behind.as_ref(), lane, k)
    }
}

#[inline]
fn lookup(rows: Option<&OccupancyRows>, lane: usize, k: usize) -> bool {
    rows.and_then(|r| r.get(lane))
        .and_then(|row| row.get(k))
        .copied()
        .unwrap_or(false)
}
