/// versus-core: Binary-tree paired-comparison ranking.
///
/// Ranks N items from "which of these two do you prefer?" answers in
/// O(N log N) comparisons (Silverstein & Farrell, 2001). Each new item is
/// located in a binary search tree by successive comparisons, and the tree
/// is rebuilt balanced after every insertion. No IO: bring your own judge.
///
/// Items are identified by their position in the input list (`0..N`).
///
/// # Quick start
///
/// ```rust
/// use versus_core::SessionState;
///
/// let mut session = SessionState::new(["a.png", "b.png", "c.png"]).unwrap();
///
/// while !session.is_complete() {
///     let comparison = session.next_comparison().unwrap();
///     // Ask a human. Here: always prefer the newcomer.
///     let choice = comparison.item_b.id;
///     session.apply_choice(comparison.with_choice(choice)).unwrap();
/// }
///
/// // Least preferred first.
/// assert_eq!(session.ranked_payloads().unwrap(), vec!["a.png", "b.png", "c.png"]);
/// ```

pub mod budget;
pub mod constants;
pub mod error;
pub mod scoring;
pub mod session;
pub mod tree;
pub mod types;

// Re-export primary public API at crate root.
pub use budget::{balanced_height, comparison_budget, repeat_budget};
pub use error::{RankingError, RankingResult};
pub use scoring::{agreement_scores, score_session};
pub use session::SessionState;
pub use tree::{Node, RankingTree, Side, TreeViolation};
pub use types::{Agreement, ComparedItem, Comparison, Item, ItemId, ItemScore, SessionOutcome};
