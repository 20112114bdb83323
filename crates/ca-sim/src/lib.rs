//! `ca-sim` — step driver for the cellular-automaton traffic simulator.
//!
//! # Four-phase step
//!
//! ```text
//! for step in 0..config.max_time:
//!   ① Gaps     — every vehicle scans the road           (parallel)
//!   ② Switch   — decide from ① (parallel), relocate in ascending id order
//!   ③ Gaps     — rescan after the switches              (parallel)
//!   ④ Move     — new speed/position (parallel), update the road
//!   end        — time += 1; migrants → next shard; exits → statistic;
//!                spawn at the road entrance
//! ```
//!
//! # Execution strategies
//!
//! | `Strategy`      | How the phases run                                       |
//! |-----------------|----------------------------------------------------------|
//! | `Sequential`    | Inline on the calling thread.                            |
//! | `SharedMemory`  | Chunked over a rayon [`WorkerPool`], joined per phase.   |
//! | `Distributed`   | One rank thread per shard, [`ChannelExchange`] between.  |
//!
//! All three produce identical trajectories for the same seed.
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use ca_core::{CaConfig, EmpiricalCdf};
//! use ca_sim::{NoopObserver, SimBuilder};
//!
//! let cdf = EmpiricalCdf::load_csv(path)?;
//! let mut sim = SimBuilder::new(config, cdf).build()?;
//! let report = sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod distributed;
pub mod error;
pub mod exchange;
pub mod observer;
pub mod pool;
pub mod report;
pub mod sim;


pub use builder::SimBuilder;
pub use distributed::{ShardedRun, run_sharded};
pub use error::{SimError, SimResult};
pub use exchange::{BoundaryExchange, BoundaryMessage, ChannelExchange, Payload, Standalone};
pub use observer::{NoopObserver, SimObserver, TrajectoryPoint, TrajectoryRecorder};
pub use pool::WorkerPool;
pub use report::RunReport;
pub use sim::{Simulation, StepSummary};
