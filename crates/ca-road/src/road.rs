//! The road: every lane of this process's shard plus the shared sampler.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use ca_core::{
    CaConfig, CaError, CaResult, EmpiricalCdf, LaneId, ProcessTopology, SimRng, StepClock,
    VehicleId, VehicleRng,
};

use crate::{Halo, HaloEdges, Lane, LaneMove, Side, SpawnContext, Vehicle, VehicleParams};

pub struct Road {
    lanes:        Vec<Lane>,
    /// Shared, read-only interarrival sampler lent to every lane's spawn.
    interarrival: Arc<EmpiricalCdf>,
    topology:     ProcessTopology,
    /// Global site range of this shard.
    shard:        Range<usize>,
    road_length:  usize,
    halo:         Halo,
    halo_ahead:   usize,
    halo_behind:  usize,
}

impl Road {
    /// Build this rank's shard of the road.
    ///
    /// # Errors
    ///
    /// `CaError::Config` if the configuration is invalid or the shard is too
    /// narrow for the halo.
    pub fn new(
        config:       &CaConfig,
        topology:     ProcessTopology,
        interarrival: Arc<EmpiricalCdf>,
    ) -> CaResult<Self> {
        config.validate()?;
        if topology.size > 1 {
            config.validate_sharding(topology.size)?;
        }
        if interarrival.is_empty() {
            return Err(CaError::Distribution("table has no rows".into()));
        }

        let shard = topology.shard(config.road_length);
        let lanes = (0..config.num_lanes)
            .map(|i| Lane::new(LaneId(i as u32), shard.len()))
            .collect();
        debug!(%topology, lanes = config.num_lanes, sites = shard.len(), start = shard.start, "road shard built");

        Ok(Self {
            lanes,
            interarrival,
            topology,
            shard,
            road_length: config.road_length,
            halo: Halo::open(),
            halo_ahead: config.halo_ahead(),
            halo_behind: config.halo_behind(),
        })
    }

    /// Load the interarrival table from `cdf_path`, then build the shard.
    pub fn load(config: &CaConfig, topology: ProcessTopology, cdf_path: &Path) -> CaResult<Self> {
        let cdf = EmpiricalCdf::load_csv(cdf_path)?;
        Self::new(config, topology, Arc::new(cdf))
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[id.index()]
    }

    pub fn lane_mut(&mut self, id: LaneId) -> &mut Lane {
        &mut self.lanes[id.index()]
    }

    /// Sites per lane in this shard.
    #[inline]
    pub fn len(&self) -> usize {
        self.shard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shard.is_empty()
    }

    pub fn topology(&self) -> ProcessTopology {
        self.topology
    }

    /// Global site range of this shard.
    pub fn shard(&self) -> Range<usize> {
        self.shard.clone()
    }

    pub fn road_length(&self) -> usize {
        self.road_length
    }

    #[inline]
    pub fn global_site(&self, local: usize) -> usize {
        self.shard.start + local
    }

    // ── Occupancy and gaps ───────────────────────────────────────────────

    /// Adjacent lane on `side`, if the road has one.
    pub fn neighbor(&self, lane: LaneId, side: Side) -> Option<LaneId> {
        let ordinal = match side {
            Side::Passing => lane.0.checked_add(1)?,
            Side::Inner   => lane.0.checked_sub(1)?,
        };
        ((ordinal as usize) < self.lanes.len()).then_some(LaneId(ordinal))
    }

    #[inline]
    pub fn has_vehicle_in_site(&self, lane: LaneId, site: usize) -> bool {
        self.lanes[lane.index()].has_vehicle_in_site(site)
    }

    /// Occupancy at a local site that may lie outside the shard; such sites
    /// are answered from the halo, and the road beyond either end is empty.
    pub fn is_occupied(&self, lane: LaneId, site: isize) -> bool {
        let len = self.len() as isize;
        if site < 0 {
            self.halo.behind(lane.index(), (-site - 1) as usize)
        } else if site >= len {
            self.halo.ahead(lane.index(), (site - len) as usize)
        } else {
            self.lanes[lane.index()].has_vehicle_in_site(site as usize)
        }
    }

    /// Consecutive empty sites in front of `site`, at most `range`.
    pub fn gap_ahead(&self, lane: LaneId, site: usize, range: u32) -> u32 {
        let origin = site as isize;
        (1..=range as isize)
            .take_while(|&k| !self.is_occupied(lane, origin + k))
            .count() as u32
    }

    /// Consecutive empty sites behind `site`, at most `range`.
    pub fn gap_behind(&self, lane: LaneId, site: usize, range: u32) -> u32 {
        let origin = site as isize;
        (1..=range as isize)
            .take_while(|&k| !self.is_occupied(lane, origin - k))
            .count() as u32
    }

    // ── Structural mutation (coordinator only) ───────────────────────────

    /// Put an existing vehicle's handle at its current lane and position.
    pub fn place(&mut self, vehicle: &Vehicle) {
        self.lanes[vehicle.lane.index()].add_vehicle(vehicle.position, vehicle.id);
    }

    /// Move `vehicle` sideways from `from` to `to` at `site`.
    ///
    /// Refused if the destination site is occupied.
    pub fn relocate(&mut self, vehicle: VehicleId, from: LaneId, to: LaneId, site: usize) -> bool {
        if self.lanes[to.index()].has_vehicle_in_site(site) {
            return false;
        }
        if !self.lanes[from.index()].remove_vehicle(site, vehicle) {
            return false;
        }
        self.lanes[to.index()].add_vehicle(site, vehicle);
        true
    }

    /// Move a vehicle's handle along its lane; a move past the shard end only
    /// removes it.
    pub fn apply_move(&mut self, mv: &LaneMove) {
        let lane = &mut self.lanes[mv.lane.index()];
        lane.remove_vehicle(mv.from, mv.vehicle);
        if !mv.exits {
            lane.add_vehicle(mv.to, mv.vehicle);
        }
    }

    /// Give every lane its spawn attempt for this step, in lane order.
    ///
    /// Only the shard holding the road entrance spawns.
    pub fn attempt_spawn(
        &mut self,
        rng:     &mut SimRng,
        next_id: &mut VehicleId,
        params:  VehicleParams,
        seed:    u64,
        clock:   &StepClock,
    ) -> Vec<Vehicle> {
        if !self.topology.is_first() {
            return Vec::new();
        }
        let mut ctx = SpawnContext {
            interarrival: &self.interarrival,
            rng,
            next_id,
            params,
            seed,
            clock,
        };
        self.lanes
            .iter_mut()
            .filter_map(|lane| lane.attempt_spawn(&mut ctx))
            .collect()
    }

    /// Populate the shard at step 0.
    ///
    /// Whether a site is filled depends only on `(seed, lane, global site)`,
    /// so every sharding of the road yields the same vehicles with the same
    /// ids (`lane * road_length + global site`).
    pub fn prefill(&mut self, density: f64, params: VehicleParams, seed: u64) -> Vec<Vehicle> {
        if density <= 0.0 {
            return Vec::new();
        }
        let mut vehicles = Vec::new();
        for lane in &mut self.lanes {
            let lane_id = lane.id();
            for local in 0..lane.len() {
                let key = lane_id.0 as u64 * self.road_length as u64 + (self.shard.start + local) as u64;
                if !SimRng::keyed(seed, key).gen_bool(density) {
                    continue;
                }
                let id = VehicleId(key);
                lane.add_vehicle(local, id);
                vehicles.push(Vehicle::new(
                    id,
                    lane_id,
                    local,
                    params.max_speed,
                    params,
                    VehicleRng::new(seed, id),
                ));
            }
        }
        vehicles
    }

    /// First id a spawned vehicle may take, past any prefill ids.
    pub fn first_spawn_id(&self, density: f64) -> VehicleId {
        if density > 0.0 {
            VehicleId((self.lanes.len() * self.road_length) as u64)
        } else {
            VehicleId(0)
        }
    }

    // ── Halo exchange ────────────────────────────────────────────────────

    /// Occupancy of this shard's edges, for the neighbors' halos.
    pub fn edges(&self) -> HaloEdges {
        let len = self.len();
        let leading = self
            .lanes
            .iter()
            .map(|lane| (0..self.halo_ahead.min(len)).map(|s| lane.has_vehicle_in_site(s)).collect())
            .collect();
        let trailing = self
            .lanes
            .iter()
            .map(|lane| {
                (0..self.halo_behind.min(len))
                    .map(|k| lane.has_vehicle_in_site(len - 1 - k))
                    .collect()
            })
            .collect();
        HaloEdges { leading, trailing }
    }

    pub fn set_halo(&mut self, halo: Halo) {
        self.halo = halo;
    }

    /// Highest number of vehicles sharing one site anywhere on the shard.
    pub fn max_site_occupancy(&self) -> usize {
        self.lanes
            .iter()
            .flat_map(|lane| (0..lane.len()).map(move |s| lane.occupancy(s)))
            .max()
            .unwrap_or(0)
    }
}
