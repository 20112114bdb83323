use ca_core::{CaError, Tick};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Core(#[from] CaError),

    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    #[error("rank {rank}: peer rank {peer} disconnected")]
    PeerDisconnected { rank: usize, peer: usize },

    #[error("rank {rank}: expected {expected} for step {step} from rank {peer}, got {got}")]
    Protocol {
        rank:     usize,
        peer:     usize,
        step:     Tick,
        expected: &'static str,
        got:      String,
    },

    #[error("rank {rank} worker thread panicked")]
    RankPanicked { rank: usize },
}

pub type SimResult<T> = Result<T, SimError>;
