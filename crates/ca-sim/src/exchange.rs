//! Boundary exchange between road shards.
//!
//! # Protocol
//!
//! Every rank runs the same step loop, so every rank sends and receives the
//! same sequence of messages.  Per step:
//!
//! ```text
//! before phase 1   Halo      leading edge → left,  trailing edge → right
//!                            receive right's leading (ahead), left's trailing (behind)
//! before phase 3   Halo      (same, after lane switches)
//! after phase 4    Migrants  vehicles past the shard end → right
//!                            receive left's migrants
//! ```
//!
//! and once at the end of the run every rank but 0 sends its `Statistic` to
//! rank 0.  Each message carries the step and its kind; a receiver that gets
//! anything other than what it is waiting for fails with
//! [`SimError::Protocol`].  Channels are unbounded, so every rank sends
//! before it receives and no exchange can deadlock.

use crossbeam::channel::{Receiver, Sender, unbounded};
use tracing::trace;

use ca_core::{ProcessTopology, Statistic, Tick};
use ca_road::{Halo, HaloEdges, OccupancyRows, Vehicle};

use crate::{SimError, SimResult};

/// What a rank needs from its neighbors each step.
///
/// [`Simulation`](crate::Simulation) is generic over this trait; the
/// in-process [`ChannelExchange`] is one transport, [`Standalone`] the
/// degenerate single-shard case.
pub trait BoundaryExchange {
    fn topology(&self) -> ProcessTopology;

    /// Publish this shard's edges and return the neighbors' edges as a halo.
    fn exchange_halo(&mut self, step: Tick, edges: HaloEdges) -> SimResult<Halo>;

    /// Hand vehicles that left this shard to the right neighbor and take the
    /// left neighbor's.  `outgoing` positions are already local to the
    /// receiving shard.
    fn exchange_migrants(&mut self, step: Tick, outgoing: Vec<Vehicle>) -> SimResult<Vec<Vehicle>>;

    /// Combine every rank's statistic.  Returns the merged result on rank 0
    /// and `None` elsewhere.
    fn reduce_statistic(&mut self, local: Statistic) -> SimResult<Option<Statistic>>;
}

// ── Standalone ───────────────────────────────────────────────────────────────

/// The whole road in one shard: no neighbors, nothing to exchange.
#[derive(Copy, Clone, Debug, Default)]
pub struct Standalone;

impl BoundaryExchange for Standalone {
    fn topology(&self) -> ProcessTopology {
        ProcessTopology::single()
    }

    fn exchange_halo(&mut self, _step: Tick, _edges: HaloEdges) -> SimResult<Halo> {
        Ok(Halo::open())
    }

    fn exchange_migrants(&mut self, _step: Tick, _outgoing: Vec<Vehicle>) -> SimResult<Vec<Vehicle>> {
        Ok(Vec::new())
    }

    fn reduce_statistic(&mut self, local: Statistic) -> SimResult<Option<Statistic>> {
        Ok(Some(local))
    }
}

// ── Messages ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub enum Payload {
    Halo(OccupancyRows),
    Migrants(Vec<Vehicle>),
    Statistic(Statistic),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Halo(_)      => "halo",
            Payload::Migrants(_)  => "migrants",
            Payload::Statistic(_) => "statistic",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BoundaryMessage {
    pub step:    Tick,
    pub from:    usize,
    pub payload: Payload,
}

/// One direction of a link between two ranks.
struct Link {
    peer: usize,
    tx:   Sender<BoundaryMessage>,
    rx:   Receiver<BoundaryMessage>,
}

// ── ChannelExchange ──────────────────────────────────────────────────────────

/// In-process transport: ranks are threads joined by crossbeam channels.
pub struct ChannelExchange {
    topology: ProcessTopology,
    left:     Option<Link>,
    right:    Option<Link>,
    /// Ranks > 0: where the final statistic goes.
    to_root:  Option<Sender<BoundaryMessage>>,
    /// Rank 0: statistics from every other rank.
    at_root:  Option<Receiver<BoundaryMessage>>,
}

impl ChannelExchange {
    /// One connected exchange per rank, in rank order.
    pub fn mesh(size: usize) -> Vec<ChannelExchange> {
        let mut exchanges: Vec<ChannelExchange> = (0..size)
            .map(|rank| ChannelExchange {
                topology: ProcessTopology::new(rank, size),
                left:     None,
                right:    None,
                to_root:  None,
                at_root:  None,
            })
            .collect();

        for rank in 0..size.saturating_sub(1) {
            let (to_right, from_left) = unbounded();
            let (to_left, from_right) = unbounded();
            exchanges[rank].right = Some(Link { peer: rank + 1, tx: to_right, rx: from_right });
            exchanges[rank + 1].left = Some(Link { peer: rank, tx: to_left, rx: from_left });
        }

        let (root_tx, root_rx) = unbounded();
        for ex in exchanges.iter_mut().skip(1) {
            ex.to_root = Some(root_tx.clone());
        }
        if let Some(root) = exchanges.first_mut() {
            root.at_root = Some(root_rx);
        }
        exchanges
    }

    fn send(&self, tx: &Sender<BoundaryMessage>, peer: usize, step: Tick, payload: Payload) -> SimResult<()> {
        let msg = BoundaryMessage { step, from: self.topology.rank, payload };
        tx.send(msg).map_err(|_| SimError::PeerDisconnected {
            rank: self.topology.rank,
            peer,
        })
    }

    fn recv(&self, rx: &Receiver<BoundaryMessage>, peer: usize, step: Tick, expected: &'static str) -> SimResult<Payload> {
        let msg = rx.recv().map_err(|_| SimError::PeerDisconnected {
            rank: self.topology.rank,
            peer,
        })?;
        if msg.step != step || msg.payload.kind() != expected {
            return Err(SimError::Protocol {
                rank: self.topology.rank,
                peer,
                step,
                expected,
                got: format!("{} for step {}", msg.payload.kind(), msg.step),
            });
        }
        Ok(msg.payload)
    }
}

impl BoundaryExchange for ChannelExchange {
    fn topology(&self) -> ProcessTopology {
        self.topology
    }

    fn exchange_halo(&mut self, step: Tick, edges: HaloEdges) -> SimResult<Halo> {
        let HaloEdges { leading, trailing } = edges;
        if let Some(link) = &self.left {
            self.send(&link.tx, link.peer, step, Payload::Halo(leading))?;
        }
        if let Some(link) = &self.right {
            self.send(&link.tx, link.peer, step, Payload::Halo(trailing))?;
        }

        let mut halo = Halo::open();
        if let Some(link) = &self.right {
            if let Payload::Halo(rows) = self.recv(&link.rx, link.peer, step, "halo")? {
                halo.ahead = Some(rows);
            }
        }
        if let Some(link) = &self.left {
            if let Payload::Halo(rows) = self.recv(&link.rx, link.peer, step, "halo")? {
                halo.behind = Some(rows);
            }
        }
        Ok(halo)
    }

    fn exchange_migrants(&mut self, step: Tick, outgoing: Vec<Vehicle>) -> SimResult<Vec<Vehicle>> {
        if let Some(link) = &self.right {
            trace!(rank = self.topology.rank, count = outgoing.len(), "sending migrants");
            self.send(&link.tx, link.peer, step, Payload::Migrants(outgoing))?;
        }
        match &self.left {
            Some(link) => match self.recv(&link.rx, link.peer, step, "migrants")? {
                Payload::Migrants(vehicles) => Ok(vehicles),
                _ => Ok(Vec::new()),
            },
            None => Ok(Vec::new()),
        }
    }

    fn reduce_statistic(&mut self, local: Statistic) -> SimResult<Option<Statistic>> {
        let final_step = Tick(u64::MAX);
        if let Some(tx) = &self.to_root {
            self.send(tx, 0, final_step, Payload::Statistic(local))?;
            return Ok(None);
        }

        // Merge in rank order so the result does not depend on arrival order.
        let size = self.topology.size;
        let mut by_rank: Vec<Option<Statistic>> = vec![None; size];
        by_rank[0] = Some(local);
        if let Some(rx) = &self.at_root {
            for _ in 1..size {
                let missing = by_rank.iter().position(Option::is_none).unwrap_or(0);
                let msg = rx.recv().map_err(|_| SimError::PeerDisconnected { rank: 0, peer: missing })?;
                match msg.payload {
                    Payload::Statistic(stat) if msg.from < size => by_rank[msg.from] = Some(stat),
                    other => {
                        return Err(SimError::Protocol {
                            rank:     0,
                            peer:     msg.from,
                            step:     final_step,
                            expected: "statistic",
                            got:      other.kind().to_string(),
                        });
                    }
                }
            }
        }
        let mut merged = Statistic::new();
        for stat in by_rank.iter().flatten() {
            merged.merge(stat);
        }
        Ok(Some(merged))
    }
}
