use blockseed_core::types::{Height, RoundId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Blockseed core error: {0}")]
    Core(#[from] blockseed_core::BlockseedError),

    #[error("Round id must be nonzero")]
    InvalidRoundId,

    #[error("Seed already committed for round {0}")]
    SeedAlreadyCommitted(RoundId),

    #[error("Seed not committed for round {0}")]
    SeedNotCommitted(RoundId),

    #[error("Seed for round {round_id} not ready: target block {seed_block}, current height {current_height}")]
    SeedNotReady {
        round_id: RoundId,
        seed_block: Height,
        current_height: Height,
    },

    #[error("Seed for round {round_id} expired: block {seed_block} left every history window")]
    SeedExpired {
        round_id: RoundId,
        seed_block: Height,
    },

    #[error("Seed not revealed for round {0}")]
    SeedNotRevealed(RoundId),
}
