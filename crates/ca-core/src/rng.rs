//! Deterministic per-vehicle and coordinator-level RNG handles.
//!
//! # Determinism strategy
//!
//! Every stream is seeded by:
//!
//!   seed = mix(mix(global_seed XOR tag) XOR key * MIXING_CONSTANT)
//!
//! where `mix` is the SplitMix64 finalizer, `tag` names the stream family
//! (vehicle, spawn, initial fill) and `key` is the vehicle id or fill site.
//! The mixing constant is the 64-bit fractional part of the golden ratio.
//! Every slow-down and lane-change draw a vehicle makes comes from its own
//! stream, so the draws it sees do not depend on which worker thread or which shard
//! processes it, nor on the order other vehicles are visited in.  The handle
//! travels with the vehicle when it migrates between shards.
//!
//! Spawn draws (initial-stopped, interarrival) are made by the coordinator
//! through a single `SimRng`, always in ascending lane order.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::VehicleId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

const VEHICLE_TAG: u64 = 0x7665_6869_636c_6573;
const SPAWN_TAG:   u64 = 0x7370_6177_6e69_6e67;
const FILL_TAG:    u64 = 0x6669_6c6c_7369_7465;

/// SplitMix64 output function.
#[inline]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn stream_seed(tag: u64, seed: u64, key: u64) -> u64 {
    mix(mix(seed ^ tag) ^ key.wrapping_mul(MIXING_CONSTANT))
}

// ── VehicleRng ───────────────────────────────────────────────────────────────

/// Per-vehicle deterministic RNG.
#[derive(Clone, Debug)]
pub struct VehicleRng(SmallRng);

impl VehicleRng {
    /// Seed deterministically from the run's global seed and a vehicle id.
    pub fn new(global_seed: u64, vehicle: VehicleId) -> Self {
        VehicleRng(SmallRng::seed_from_u64(stream_seed(VEHICLE_TAG, global_seed, vehicle.0)))
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen()
    }

    /// `true` with probability `p` (clamped to [0, 1]).
    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}

// ── SimRng ───────────────────────────────────────────────────────────────────

/// Coordinator RNG for spawn scheduling.
///
/// Used only by the task that performs end-of-step structural mutation, so it
/// is never shared between threads.
#[derive(Clone, Debug)]
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(stream_seed(SPAWN_TAG, seed, 0)))
    }

    /// A generator keyed by `(seed, key)` that does not consume from any
    /// other stream.  Used for draws that must come out the same no matter
    /// which shard performs them (initial road fill).
    pub fn keyed(seed: u64, key: u64) -> SimRng {
        SimRng(SmallRng::seed_from_u64(stream_seed(FILL_TAG, seed, key)))
    }

    /// Uniform draw in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.0.r#gen()
    }

    #[inline]
    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.0.gen_bool(p.clamp(0.0, 1.0))
    }
}
