//! `ca-core` — foundational types for the cellular-automaton traffic
//! simulator.
//!
//! This crate is a dependency of every other `ca-*` crate and has no `ca-*`
//! dependencies of its own.
//!
//! # What lives here
//!
//! | Module          | Contents                                              |
//! |-----------------|-------------------------------------------------------|
//! | [`ids`]         | `VehicleId`, `LaneId`                                 |
//! | [`time`]        | `Tick`, `StepClock`                                   |
//! | [`rng`]         | `VehicleRng` (per-vehicle), `SimRng` (coordinator)    |
//! | [`config`]      | `CaConfig`, `Strategy`                                |
//! | [`cdf`]         | `EmpiricalCdf` interarrival sampler + CSV loader      |
//! | [`stats`]       | `Statistic` (mean / sample variance / count)          |
//! | [`topology`]    | `ProcessTopology`, shard ranges                       |
//! | [`error`]       | `CaError`, `CaResult`                                 |

pub mod cdf;
pub mod config;
pub mod error;
pub mod ids;
pub mod rng;
pub mod stats;
pub mod time;
pub mod topology;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cdf::EmpiricalCdf;
pub use config::{CaConfig, Strategy};
pub use error::{CaError, CaResult};
pub use ids::{LaneId, VehicleId};
pub use rng::{SimRng, VehicleRng};
pub use stats::Statistic;
pub use time::{StepClock, Tick};
pub use topology::ProcessTopology;
