//! Fluent builder for constructing a [`Simulation`].

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use ca_core::{CaConfig, EmpiricalCdf, LaneId, SimRng, Strategy, VehicleRng};
use ca_road::{Road, Vehicle, VehicleParams, VehicleRegistry};

use crate::{BoundaryExchange, SimError, SimResult, Simulation, Standalone, WorkerPool};

/// A vehicle requested through [`SimBuilder::with_vehicle`].
#[derive(Copy, Clone, Debug)]
pub(crate) struct Placement {
    lane:  u32,
    /// Global site index.
    site:  usize,
    speed: u32,
}

/// Fluent builder for [`Simulation<X>`].
///
/// # Required inputs
///
/// - [`CaConfig`]
/// - the interarrival distribution ([`EmpiricalCdf`])
///
/// # Optional inputs (have defaults)
///
/// | Method                     | Default                                   |
/// |----------------------------|-------------------------------------------|
/// | `.exchange(x)`             | [`Standalone`] (the whole road, one shard)|
/// | `.workers(n)`              | `config.num_workers`                      |
/// | `.with_vehicle(l, s, v)`   | none beyond `config.initial_density`      |
///
/// # Example
///
/// ```rust,ignore
/// let cdf = EmpiricalCdf::load_csv(path)?;
/// let mut sim = SimBuilder::new(config, cdf).build()?;
/// let report = sim.run(&mut NoopObserver)?;
/// println!("{report}");
/// ```
pub struct SimBuilder<X: BoundaryExchange = Standalone> {
    pub(crate) config:     CaConfig,
    pub(crate) cdf:        Arc<EmpiricalCdf>,
    pub(crate) exchange:   X,
    pub(crate) workers:    Option<usize>,
    pub(crate) placements: Vec<Placement>,
}

impl SimBuilder<Standalone> {
    pub fn new(config: CaConfig, cdf: impl Into<Arc<EmpiricalCdf>>) -> Self {
        Self {
            config,
            cdf: cdf.into(),
            exchange: Standalone,
            workers: None,
            placements: Vec::new(),
        }
    }

    /// Load the interarrival table from `cdf_path`.
    pub fn from_cdf_path(config: CaConfig, cdf_path: &Path) -> SimResult<Self> {
        let cdf = EmpiricalCdf::load_csv(cdf_path)?;
        Ok(Self::new(config, cdf))
    }
}

impl<X: BoundaryExchange> SimBuilder<X> {
    /// Run as one shard of a larger road, connected through `exchange`.
    pub fn exchange<Y: BoundaryExchange>(self, exchange: Y) -> SimBuilder<Y> {
        SimBuilder {
            config:     self.config,
            cdf:        self.cdf,
            exchange,
            workers:    self.workers,
            placements: self.placements,
        }
    }

    /// Worker threads for the shared-memory strategy.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Put a vehicle on `lane` at global `site` at step 0.
    ///
    /// These vehicles get ids after any initial-fill ids, in call order, so
    /// every shard of a run agrees on them.
    pub fn with_vehicle(mut self, lane: u32, site: usize, speed: u32) -> Self {
        self.placements.push(Placement { lane, site, speed });
        self
    }

    /// Validate inputs, build the road shard, fill it, and return a
    /// ready-to-run [`Simulation`].
    pub fn build(self) -> SimResult<Simulation<X>> {
        let config = self.config;
        let topology = self.exchange.topology();
        let mut road = Road::new(&config, topology, self.cdf)?;
        let params = VehicleParams::from_config(&config);

        let workers = self.workers.or(config.num_workers);
        if workers == Some(0) {
            return Err(SimError::Config("worker count must be at least 1".into()));
        }
        let pool = match config.strategy {
            Strategy::SharedMemory => WorkerPool::new(workers)?,
            Strategy::Sequential | Strategy::Distributed => WorkerPool::sequential(),
        };

        // ── Initial road ──────────────────────────────────────────────────
        let mut vehicles = VehicleRegistry::new();
        vehicles.extend(road.prefill(config.initial_density, params, config.seed));

        let mut next_id = road.first_spawn_id(config.initial_density);
        let shard = road.shard();
        for p in &self.placements {
            if p.lane as usize >= config.num_lanes || p.site >= config.road_length {
                return Err(SimError::Config(format!(
                    "vehicle at lane {} site {} is off the road ({} lanes x {} sites)",
                    p.lane, p.site, config.num_lanes, config.road_length
                )));
            }
            let id = next_id;
            next_id = id.next();
            if !shard.contains(&p.site) {
                continue;
            }
            let local = p.site - shard.start;
            let lane = LaneId(p.lane);
            if road.has_vehicle_in_site(lane, local) {
                return Err(SimError::Config(format!(
                    "lane {} site {} is already occupied",
                    p.lane, p.site
                )));
            }
            let vehicle = Vehicle::new(id, lane, local, p.speed, params, VehicleRng::new(config.seed, id));
            road.place(&vehicle);
            vehicles.insert(vehicle);
        }

        debug!(
            %topology,
            strategy = %config.strategy,
            workers = pool.workers(),
            vehicles = vehicles.len(),
            "simulation built"
        );

        Ok(Simulation {
            clock:     config.make_clock(),
            spawn_rng: SimRng::new(config.seed),
            config,
            road,
            vehicles,
            stats:     Default::default(),
            params,
            next_id,
            pool,
            exchange:  self.exchange,
        })
    }
}
