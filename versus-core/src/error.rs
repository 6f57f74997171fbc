use thiserror::Error;

use crate::types::ItemId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RankingError {
    #[error("at least two items are needed to rank by comparison, got {found}")]
    InsufficientItems { found: usize },

    #[error("no item is pending insertion; the session is complete")]
    NoPendingItem,

    #[error("invalid choice {choice:?}: {reason}")]
    InvalidChoice { choice: Option<ItemId>, reason: String },

    #[error("session state is inconsistent: {reason}")]
    CorruptState { reason: String },

    #[error("comparison ({item_a}, {item_b}) is not the outstanding one ({expected_a}, {expected_b})")]
    StaleComparison {
        item_a: ItemId,
        item_b: ItemId,
        expected_a: ItemId,
        expected_b: ItemId,
    },
}

pub type RankingResult<T> = Result<T, RankingError>;
