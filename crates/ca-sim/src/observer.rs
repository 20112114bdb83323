//! Simulation observer trait for progress reporting and data collection.

use ca_core::{LaneId, Tick, VehicleId};
use ca_road::{Road, VehicleRegistry};

use crate::StepSummary;

/// Callbacks invoked by [`Simulation::run`][crate::Simulation::run] at key
/// points in the step loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter { interval: u64 }
///
/// impl SimObserver for ProgressPrinter {
///     fn on_step_end(&mut self, step: Tick, summary: &StepSummary, _: &Road, _: &VehicleRegistry) {
///         if step.0 % self.interval == 0 {
///             println!("step {step}: {} vehicles", summary.live);
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each step, before phase 1.
    fn on_step_start(&mut self, _step: Tick) {}

    /// Called after step `step` is complete (exits removed, spawns placed).
    ///
    /// `road` and `vehicles` are this shard's state entering step `step + 1`.
    fn on_step_end(
        &mut self,
        _step:     Tick,
        _summary:  &StepSummary,
        _road:     &Road,
        _vehicles: &VehicleRegistry,
    ) {}

    /// Called once after the final step completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

// ── TrajectoryRecorder ───────────────────────────────────────────────────────

/// One vehicle's state at the end of one step.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TrajectoryPoint {
    pub step:    Tick,
    pub vehicle: VehicleId,
    pub lane:    LaneId,
    /// Site index on the whole road, not the shard.
    pub site:    usize,
    pub speed:   u32,
}

/// Records every live vehicle after every step.
///
/// Recorders from different shards of one run can be combined with
/// [`merge`](Self::merge); the result equals a single-shard recording.
#[derive(Clone, Debug, Default)]
pub struct TrajectoryRecorder {
    pub points: Vec<TrajectoryPoint>,
}

impl TrajectoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Combine per-shard recordings into one, ordered by step then vehicle.
    pub fn merge(recorders: impl IntoIterator<Item = TrajectoryRecorder>) -> Self {
        let mut points: Vec<TrajectoryPoint> =
            recorders.into_iter().flat_map(|r| r.points).collect();
        points.sort_by_key(|p| (p.step, p.vehicle));
        Self { points }
    }

    /// Points of one vehicle, in step order.
    pub fn vehicle(&self, id: VehicleId) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter().filter(move |p| p.vehicle == id)
    }
}

impl SimObserver for TrajectoryRecorder {
    fn on_step_end(
        &mut self,
        step:     Tick,
        _summary: &StepSummary,
        road:     &Road,
        vehicles: &VehicleRegistry,
    ) {
        self.points.extend(vehicles.iter().map(|v| TrajectoryPoint {
            step,
            vehicle: v.id,
            lane:    v.lane,
            site:    road.global_site(v.position),
            speed:   v.speed,
        }));
    }
}
