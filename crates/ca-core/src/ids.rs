//! Strongly typed, zero-cost identifier wrappers.
//!
//! Vehicles are referred to by `VehicleId` handles everywhere outside the
//! registry that owns them; lanes by their ordinal `LaneId`.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Unique, monotonically increasing vehicle handle assigned at spawn.
    pub struct VehicleId(u64);
}

typed_id! {
    /// Lane ordinal.  Lane 0 is the outermost lane; higher ordinals are the
    /// passing side.
    pub struct LaneId(u32);
}

impl VehicleId {
    /// The id handed out after this one.
    #[inline]
    pub fn next(self) -> VehicleId {
        VehicleId(self.0 + 1)
    }
}
