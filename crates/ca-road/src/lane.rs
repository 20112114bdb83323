//! A lane: a fixed-length row of sites plus its spawn schedule.

use std::fmt;

use smallvec::SmallVec;
use tracing::trace;

use ca_core::{EmpiricalCdf, LaneId, SimRng, StepClock, VehicleId, VehicleRng};

use crate::{Vehicle, VehicleParams};

/// Vehicles at one site, in arrival order.  Holds more than one entry only
/// transiently while a phase is being applied.
type Site = SmallVec<[VehicleId; 2]>;

/// Everything a lane needs to create a vehicle at its entrance.
///
/// Borrowed from the road and the driver for the duration of one
/// end-of-step spawn pass.
pub struct SpawnContext<'a> {
    /// Interarrival-time sampler, lent by the road.
    pub interarrival: &'a EmpiricalCdf,
    pub rng:          &'a mut SimRng,
    pub next_id:      &'a mut VehicleId,
    pub params:       VehicleParams,
    /// Run seed, for the new vehicle's own RNG.
    pub seed:         u64,
    pub clock:        &'a StepClock,
}

pub struct Lane {
    id:              LaneId,
    sites:           Vec<Site>,
    /// Steps until the next spawn attempt may succeed.
    spawn_countdown: u64,
}

impl Lane {
    pub fn new(id: LaneId, size: usize) -> Self {
        Self {
            id,
            sites: vec![Site::new(); size],
            spawn_countdown: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// Number of sites.
    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[inline]
    pub fn spawn_countdown(&self) -> u64 {
        self.spawn_countdown
    }

    /// `false` for out-of-range sites.
    #[inline]
    pub fn has_vehicle_in_site(&self, site: usize) -> bool {
        self.sites.get(site).is_some_and(|s| !s.is_empty())
    }

    /// Number of vehicles at `site`.
    pub fn occupancy(&self, site: usize) -> usize {
        self.sites.get(site).map_or(0, |s| s.len())
    }

    /// The vehicle that arrived first at `site`.
    pub fn front(&self, site: usize) -> Option<VehicleId> {
        self.sites.get(site).and_then(|s| s.first().copied())
    }

    /// Queue `vehicle` at `site` behind any vehicle already there.
    pub fn add_vehicle(&mut self, site: usize, vehicle: VehicleId) {
        self.sites[site].push(vehicle);
    }

    /// Take `vehicle` out of `site`'s queue, keeping the others in arrival
    /// order.  Returns `false` if it was not there.
    pub fn remove_vehicle(&mut self, site: usize, vehicle: VehicleId) -> bool {
        let Some(queue) = self.sites.get_mut(site) else {
            return false;
        };
        match queue.iter().position(|&v| v == vehicle) {
            Some(i) => {
                queue.remove(i);
                true
            }
            None => false,
        }
    }

    /// Try to put a new vehicle on site 0.
    ///
    /// While the countdown runs, each call just decrements it.  Once it is
    /// zero, a vehicle is created if site 0 is free and the countdown is
    /// resampled from the interarrival distribution; if site 0 is taken the
    /// attempt is deferred to the next step without touching the countdown.
    pub fn attempt_spawn(&mut self, ctx: &mut SpawnContext<'_>) -> Option<Vehicle> {
        if self.spawn_countdown > 0 {
            self.spawn_countdown -= 1;
            return None;
        }
        if self.has_vehicle_in_site(0) {
            trace!(lane = self.id.0, "entrance blocked, spawn deferred");
            return None;
        }

        let id = *ctx.next_id;
        *ctx.next_id = id.next();

        let entry_speed = if ctx.rng.gen_bool(ctx.params.prob_slow_down) {
            0
        } else {
            ctx.params.max_speed
        };
        let vehicle = Vehicle::new(
            id,
            self.id,
            0,
            entry_speed,
            ctx.params,
            VehicleRng::new(ctx.seed, id),
        );
        self.add_vehicle(0, id);

        let interarrival = ctx.interarrival.sample(ctx.rng);
        self.spawn_countdown = ctx.clock.steps_for_secs(interarrival);
        trace!(lane = self.id.0, vehicle = id.0, countdown = self.spawn_countdown, "spawned");

        Some(vehicle)
    }
}

/// One character per site: `.` empty, `o` one vehicle, `*` more than one.
impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for site in &self.sites {
            let c = match site.len() {
                0 => '.',
                1 => 'o',
                _ => '*',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
