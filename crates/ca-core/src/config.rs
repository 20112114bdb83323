//! Run configuration.
//!
//! Loaded once from JSON and immutable for the run.  Every field has a
//! default, so a config file only needs the values it changes:
//!
//! ```json
//! { "road_length": 2000, "num_lanes": 3, "max_time": 20000, "strategy": "shared_memory" }
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CaError, CaResult, StepClock, Tick};

/// How the per-step vehicle update is executed.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One thread, vehicles visited in ascending id order.
    #[default]
    Sequential,
    /// One address space; each phase is split across a fixed worker pool.
    SharedMemory,
    /// The road is sharded across `num_processes` rank workers that exchange
    /// boundary state.
    Distributed,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::Sequential   => "sequential",
            Strategy::SharedMemory => "shared_memory",
            Strategy::Distributed  => "distributed",
        })
    }
}

/// Top-level simulation configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaConfig {
    /// Sites per lane over the whole road.
    pub road_length: usize,
    pub num_lanes: usize,
    /// Maximum speed in sites per step.
    pub max_speed: u32,
    /// Probability of the random slow-down, and of a spawned vehicle entering
    /// stopped.
    pub prob_slow_down: f64,
    /// Probability that an eligible lane switch is carried out.
    pub prob_change: f64,
    pub look_forward: u32,
    pub look_other_forward: u32,
    pub look_other_backward: u32,
    /// Simulated seconds per step.
    pub step_secs: f64,
    /// Number of steps to simulate.
    pub max_time: u64,
    /// Exits at or before this step are not recorded in the travel-time
    /// statistic.
    pub warmup_time: u64,
    /// Fraction of sites occupied at step 0.
    pub initial_density: f64,
    /// Master RNG seed.  The same seed always produces identical trajectories.
    pub seed: u64,
    pub strategy: Strategy,
    /// Worker threads for `Strategy::SharedMemory`.  `None` uses all logical
    /// cores.
    pub num_workers: Option<usize>,
    /// Rank count for `Strategy::Distributed`.
    pub num_processes: usize,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            road_length:         1_000,
            num_lanes:           2,
            max_speed:           5,
            prob_slow_down:      0.1,
            prob_change:         0.5,
            look_forward:        5,
            look_other_forward:  5,
            look_other_backward: 5,
            step_secs:           1.0,
            max_time:            10_000,
            warmup_time:         1_000,
            initial_density:     0.0,
            seed:                42,
            strategy:            Strategy::Sequential,
            num_workers:         None,
            num_processes:       1,
        }
    }
}

impl CaConfig {
    /// Load from a JSON file and validate.
    pub fn load_json(path: &Path) -> CaResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Like [`load_json`](Self::load_json) but accepts any `Read` source.
    pub fn from_reader<R: Read>(reader: R) -> CaResult<Self> {
        let config: CaConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every constraint the simulation relies on.
    pub fn validate(&self) -> CaResult<()> {
        if self.road_length == 0 {
            return Err(CaError::Config("road_length must be positive".into()));
        }
        if self.num_lanes == 0 {
            return Err(CaError::Config("num_lanes must be positive".into()));
        }
        if !(self.step_secs.is_finite() && self.step_secs > 0.0) {
            return Err(CaError::Config(format!(
                "step_secs must be positive, got {}",
                self.step_secs
            )));
        }
        if self.max_speed == 0 {
            return Err(CaError::Config("max_speed must be at least 1".into()));
        }
        for (name, p) in [
            ("prob_slow_down", self.prob_slow_down),
            ("prob_change", self.prob_change),
            ("initial_density", self.initial_density),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(CaError::Config(format!("{name} must be in [0, 1], got {p}")));
            }
        }
        if self.num_workers == Some(0) {
            return Err(CaError::Config("num_workers must be at least 1".into()));
        }
        if self.num_processes == 0 {
            return Err(CaError::Config("num_processes must be at least 1".into()));
        }
        if self.strategy == Strategy::Distributed {
            self.validate_sharding(self.num_processes)?;
        }
        Ok(())
    }

    /// Every shard must be wide enough to hold the halo it lends its
    /// neighbors and to absorb a full-speed move in one step.
    pub fn validate_sharding(&self, num_processes: usize) -> CaResult<()> {
        let shard = self.road_length / num_processes;
        let needed = self
            .halo_ahead()
            .max(self.halo_behind())
            .max(self.max_speed as usize)
            .max(1);
        if shard < needed {
            return Err(CaError::Config(format!(
                "road_length {} split over {num_processes} processes gives {shard}-site shards; \
                 at least {needed} sites per shard are required",
                self.road_length
            )));
        }
        Ok(())
    }

    /// Sites of the right neighbor's shard a rank must see for forward gaps.
    #[inline]
    pub fn halo_ahead(&self) -> usize {
        self.look_forward.max(self.look_other_forward) as usize
    }

    /// Sites of the left neighbor's shard a rank must see for backward gaps.
    #[inline]
    pub fn halo_behind(&self) -> usize {
        self.look_other_backward as usize
    }

    /// The step at which the run ends (exclusive upper bound).
    #[inline]
    pub fn end_tick(&self) -> Tick {
        Tick(self.max_time)
    }

    pub fn make_clock(&self) -> StepClock {
        StepClock::new(self.step_secs)
    }
}
