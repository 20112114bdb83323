//! The `Simulation` struct and its step loop.

use std::time::Instant;

use tracing::{debug, info, trace};

use ca_core::{CaConfig, SimRng, Statistic, StepClock, Tick, VehicleId};
use ca_road::{Road, Vehicle, VehicleParams, VehicleRegistry};

use crate::{BoundaryExchange, RunReport, SimObserver, SimResult, Standalone, WorkerPool};

// ── Step summary ──────────────────────────────────────────────────────────────

/// Counters for one completed step on one shard.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct StepSummary {
    /// Lane switches carried out.
    pub switches:  usize,
    /// Planned switches refused because the target site was already taken.
    pub rejected:  usize,
    /// Vehicles that left the road.
    pub exited:    usize,
    /// Vehicles handed to the next shard.
    pub migrated:  usize,
    /// Vehicles received from the previous shard.
    pub arrived:   usize,
    pub spawned:   usize,
    /// Vehicles on the shard after the step.
    pub live:      usize,
}

// ── Simulation ────────────────────────────────────────────────────────────────

/// The simulation driver for one shard of the road (the whole road unless
/// `X` connects it to other shards).
///
/// Each step runs four strictly ordered phases over all live vehicles:
///
/// 1. **Gap refresh** (parallel): every vehicle scans the road.
/// 2. **Lane switch**: decisions in parallel from the phase-1 snapshot, then
///    relocations applied sequentially in ascending `VehicleId` order.
/// 3. **Gap refresh** (parallel) on the post-switch road.
/// 4. **Movement**: new speed and position in parallel, then the road is
///    updated sequentially.
///
/// followed by end-of-step bookkeeping on the coordinating thread: advance
/// time, hand migrants to the next shard, remove exited vehicles into the
/// travel-time statistic, spawn at the road entrance.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Simulation<X: BoundaryExchange = Standalone> {
    pub config:   CaConfig,
    pub clock:    StepClock,
    pub road:     Road,
    /// Every vehicle on this shard, in id order.
    pub vehicles: VehicleRegistry,
    /// Travel times of vehicles that left the road after the warm-up.
    pub stats:    Statistic,
    pub(crate) params:    VehicleParams,
    pub(crate) next_id:   VehicleId,
    /// Spawn draws (initial-stopped, interarrival), lane order.
    pub(crate) spawn_rng: SimRng,
    pub(crate) pool:      WorkerPool,
    pub(crate) exchange:  X,
}

impl<X: BoundaryExchange> Simulation<X> {
    // ── Public API ────────────────────────────────────────────────────────

    /// Run from the current step until `config.max_time`, then produce the
    /// report.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<RunReport> {
        let started = Instant::now();
        let first = self.clock.current_tick;
        while self.clock.current_tick < self.config.end_tick() {
            self.step_observed(observer)?;
        }
        observer.on_sim_end(self.clock.current_tick);

        let travel_time = self
            .exchange
            .reduce_statistic(self.stats.clone())?
            .unwrap_or_else(|| self.stats.clone());
        let report = RunReport {
            strategy:    self.config.strategy,
            parallelism: self.parallelism(),
            steps:       self.clock.current_tick - first,
            elapsed:     started.elapsed(),
            travel_time,
        };
        if self.road.topology().is_first() {
            info!(
                steps = report.steps,
                elapsed_secs = report.elapsed.as_secs_f64(),
                samples = report.travel_time.count(),
                mean = report.travel_time.mean(),
                "run finished"
            );
        }
        Ok(report)
    }

    /// Run exactly `n` steps from the current position (ignores `max_time`).
    ///
    /// Useful for tests and incremental stepping.
    pub fn run_steps<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        for _ in 0..n {
            self.step_observed(observer)?;
        }
        Ok(())
    }

    #[inline]
    pub fn now(&self) -> Tick {
        self.clock.current_tick
    }

    /// Id the next spawned vehicle will get.
    pub fn next_id(&self) -> VehicleId {
        self.next_id
    }

    /// Worker threads (shared memory) or ranks (distributed).
    pub fn parallelism(&self) -> usize {
        let ranks = self.road.topology().size;
        if ranks > 1 { ranks } else { self.pool.workers() }
    }

    fn step_observed<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let now = self.clock.current_tick;
        observer.on_step_start(now);
        let summary = self.step()?;
        observer.on_step_end(now, &summary, &self.road, &self.vehicles);
        Ok(())
    }

    // ── Core step processing ──────────────────────────────────────────────

    /// Advance the simulation by one step.
    pub fn step(&mut self) -> SimResult<StepSummary> {
        let now = self.clock.current_tick;
        let mut summary = StepSummary::default();

        // ── Phase 1: gap refresh on the pre-move snapshot ─────────────────
        self.refresh_halo(now)?;
        self.refresh_gaps();

        // ── Phase 2: lane switch ──────────────────────────────────────────
        //
        // Decisions read only the vehicle's own gaps; relocation happens
        // here, in ascending id order, so the outcome of two vehicles
        // claiming the same site does not depend on the worker count.
        let plans = self
            .pool
            .map_mut(self.vehicles.as_mut_slice(), |v| v.plan_lane_switch());
        let road = &mut self.road;
        for (vehicle, plan) in self.vehicles.as_mut_slice().iter_mut().zip(plans) {
            if let Some(target) = plan {
                if vehicle.switch_lane(road, target) {
                    summary.switches += 1;
                } else {
                    summary.rejected += 1;
                }
            }
        }

        // ── Phase 3: gap refresh after switches ───────────────────────────
        self.refresh_halo(now)?;
        self.refresh_gaps();

        // ── Phase 4: movement ─────────────────────────────────────────────
        let lane_len = self.road.len();
        let moves = self
            .pool
            .map_mut(self.vehicles.as_mut_slice(), |v| v.advance(lane_len));
        for mv in &moves {
            self.road.apply_move(mv);
        }

        // ── End of step ───────────────────────────────────────────────────
        self.clock.advance();
        let departed = self.vehicles.drain_past(lane_len);

        let topology = self.road.topology();
        let (exited, outgoing) = if topology.is_last() {
            (departed, Vec::new())
        } else {
            let outgoing: Vec<Vehicle> = departed
                .into_iter()
                .map(|mut v| {
                    v.position -= lane_len;
                    v
                })
                .collect();
            (Vec::new(), outgoing)
        };
        summary.migrated = outgoing.len();

        let arrivals = self.exchange.exchange_migrants(now, outgoing)?;
        summary.arrived = arrivals.len();
        for vehicle in arrivals {
            self.road.place(&vehicle);
            self.vehicles.insert(vehicle);
        }

        summary.exited = exited.len();
        if self.clock.current_tick.0 > self.config.warmup_time {
            for vehicle in &exited {
                self.stats.add(vehicle.travel_time(self.config.step_secs));
            }
        }

        let spawned = self.road.attempt_spawn(
            &mut self.spawn_rng,
            &mut self.next_id,
            self.params,
            self.config.seed,
            &self.clock,
        );
        summary.spawned = spawned.len();
        self.vehicles.extend(spawned);
        summary.live = self.vehicles.len();

        debug!(
            step = now.0,
            live = summary.live,
            switches = summary.switches,
            rejected = summary.rejected,
            exited = summary.exited,
            migrated = summary.migrated,
            arrived = summary.arrived,
            spawned = summary.spawned,
            "step complete"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            for lane in self.road.lanes() {
                trace!(step = now.0, lane = lane.id().0, "{lane}");
            }
        }
        Ok(summary)
    }

    fn refresh_halo(&mut self, now: Tick) -> SimResult<()> {
        if self.road.topology().size > 1 {
            let halo = self.exchange.exchange_halo(now, self.road.edges())?;
            self.road.set_halo(halo);
        }
        Ok(())
    }

    fn refresh_gaps(&mut self) {
        let road = &self.road;
        self.pool
            .for_each_mut(self.vehicles.as_mut_slice(), |v| v.update_gaps(road));
    }
}
