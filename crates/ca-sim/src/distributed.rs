//! Sharded runs: one rank worker per road shard.
//!
//! Each rank is a thread that owns its `Simulation<ChannelExchange>`
//! outright; ranks share nothing but their channels and the read-only
//! interarrival table.

use std::thread;

use tracing::{info_span, warn};

use ca_core::{CaError, ProcessTopology};

use crate::{
    BoundaryExchange, ChannelExchange, RunReport, SimBuilder, SimError, SimObserver, SimResult,
    Simulation, Standalone,
};

/// Results of a sharded run.
pub struct ShardedRun<O> {
    /// Rank 0's report, covering the whole road.
    pub report:    RunReport,
    /// Every rank's own report, in rank order.
    pub ranks:     Vec<RunReport>,
    /// Every rank's observer, in rank order.
    pub observers: Vec<O>,
}

impl SimBuilder<Standalone> {
    /// Build one connected simulation per rank.
    pub fn build_sharded(self, ranks: usize) -> SimResult<Vec<Simulation<ChannelExchange>>> {
        if ranks == 0 {
            return Err(SimError::Config("at least one rank is required".into()));
        }
        ChannelExchange::mesh(ranks)
            .into_iter()
            .map(|exchange| {
                SimBuilder {
                    config:     self.config.clone(),
                    cdf:        self.cdf.clone(),
                    exchange,
                    workers:    self.workers,
                    placements: self.placements.clone(),
                }
                .build()
            })
            .collect()
    }
}

/// Run every rank to completion on its own thread.
///
/// `make_observer` is called once per rank.  If any rank fails, the first
/// error that is not a knock-on disconnect is returned.
pub fn run_sharded<O, F>(
    sims:          Vec<Simulation<ChannelExchange>>,
    make_observer: F,
) -> SimResult<ShardedRun<O>>
where
    O: SimObserver + Send,
    F: Fn(ProcessTopology) -> O + Sync,
{
    let make_observer = &make_observer;
    let results: Vec<SimResult<(RunReport, O)>> = thread::scope(|scope| {
        let handles: Vec<_> = sims
            .into_iter()
            .map(|mut sim| {
                let topology = sim.exchange.topology();
                thread::Builder::new()
                    .name(format!("ca-rank-{}", topology.rank))
                    .spawn_scoped(scope, move || {
                        let _span = info_span!("rank", rank = topology.rank).entered();
                        let mut observer = make_observer(topology);
                        let report = sim.run(&mut observer)?;
                        Ok((report, observer))
                    })
                    .map(|handle| (topology.rank, handle))
            })
            .collect();

        handles
            .into_iter()
            .map(|spawned| match spawned {
                Ok((rank, handle)) => handle
                    .join()
                    .unwrap_or(Err(SimError::RankPanicked { rank })),
                Err(e) => Err(SimError::Core(CaError::Io(e))),
            })
            .collect()
    });

    let mut ranks = Vec::with_capacity(results.len());
    let mut observers = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok((report, observer)) => {
                ranks.push(report);
                observers.push(observer);
            }
            Err(e) => errors.push(e),
        }
    }
    if !errors.is_empty() {
        for e in &errors {
            warn!(error = %e, "rank failed");
        }
        let root = errors
            .iter()
            .position(|e| !matches!(e, SimError::PeerDisconnected { .. }))
            .unwrap_or(0);
        return Err(errors.swap_remove(root));
    }

    let report = ranks
        .first()
        .cloned()
        .ok_or_else(|| SimError::Config("at least one rank is required".into()))?;
    Ok(ShardedRun { report, ranks, observers })
}
