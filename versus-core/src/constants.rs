/// Share of the comparison budget reserved for repeated comparisons.
///
/// Only feeds `repeat_budget`; no code path issues repeats yet.
pub const REPEAT_FRACTION: f64 = 0.2;

/// Minimum number of items a session can rank.
pub const MIN_ITEMS: usize = 2;
