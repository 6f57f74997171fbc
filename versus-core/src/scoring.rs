/// Completion scoring: final ranking and agreement fractions.
///
/// Pure functions over the finished tree and the comparison log.
use crate::tree::RankingTree;
use crate::types::{Agreement, Comparison, ItemScore, SessionOutcome};

/// Count, per item, how often it was chosen and how often it was shown.
///
/// Items that never appear in `log` get `Agreement::Unranked`.
pub fn agreement_scores(num_items: usize, log: &[Comparison]) -> Vec<ItemScore> {
    let mut chosen = vec![0usize; num_items];
    let mut seen = vec![0usize; num_items];

    for comparison in log {
        if let Some(choice) = comparison.choice {
            if let Some(count) = chosen.get_mut(choice) {
                *count += 1;
            }
        }
        for id in [comparison.item_a.id, comparison.item_b.id] {
            if let Some(count) = seen.get_mut(id) {
                *count += 1;
            }
        }
    }

    (0..num_items)
        .map(|item| ItemScore {
            item,
            chosen: chosen[item],
            seen: seen[item],
            agreement: Agreement::from_counts(chosen[item], seen[item]),
        })
        .collect()
}

/// Derive the outcome of a completed session.
pub fn score_session(tree: &RankingTree, num_items: usize, log: &[Comparison]) -> SessionOutcome {
    SessionOutcome {
        ranking: tree.in_order(),
        scores: agreement_scores(num_items, log),
    }
}
