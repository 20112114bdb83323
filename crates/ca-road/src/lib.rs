//! `ca-road` — the road model of the cellular-automaton traffic simulator.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                  |
//! |-----------------|-----------------------------------------------------------|
//! | [`vehicle`]     | `Vehicle`, `VehicleParams`, gap sensing, switch and move  |
//! | [`lane`]        | `Lane` (site queues + spawn countdown), `SpawnContext`    |
//! | [`road`]        | `Road` (one shard of every lane), gap scans, prefill      |
//! | [`halo`]        | `Halo`, `HaloEdges` (neighbor-shard boundary occupancy)   |
//! | [`registry`]    | `VehicleRegistry` (vehicles sorted by id)                 |
//!
//! Vehicles and lanes refer to each other only by id: a lane site holds
//! `VehicleId`s, a vehicle holds its `LaneId`.  Structural changes to the
//! road (relocation, movement, spawn) go through `&mut Road`, so only the
//! thread that owns the road can make them.

pub mod halo;
pub mod lane;
pub mod registry;
pub mod road;
pub mod vehicle;

#[cfg(test)]
mod tests;

pub use halo::{Halo, HaloEdges, OccupancyRows};
pub use lane::{Lane, SpawnContext};
pub use registry::VehicleRegistry;
pub use road::Road;
pub use vehicle::{Gaps, LaneMove, OtherLaneGap, Side, Vehicle, VehicleParams};
