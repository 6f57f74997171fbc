/// Simulate command: drives a session with a synthetic judge over a hidden true order.
///
/// Measures how many comparisons the tree method needs against its budget,
/// and how well the final ranking recovers the true order when answers are noisy.
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;
use versus_core::{RankingResult, SessionState};

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub items: usize,
    pub seed: u64,
    pub noise: f64,
    pub comparisons: usize,
    pub comparison_budget: usize,
    pub repeat_budget: usize,
    pub max_height: usize,
    /// Items whose final rank equals their true rank.
    pub exact_positions: usize,
    /// Mean absolute difference between final and true rank.
    pub mean_displacement: f64,
}

/// Run one simulated session of `count` items.
///
/// Each item gets a hidden true rank. The judge prefers the higher rank,
/// except that each answer is flipped with probability `noise`.
pub fn run_simulation(count: usize, seed: u64, noise: f64) -> RankingResult<SimulationReport> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut true_rank: Vec<usize> = (0..count).collect();
    true_rank.shuffle(&mut rng);

    let payloads: Vec<String> = (0..count).map(|i| format!("item-{i}")).collect();
    let mut session = SessionState::new(payloads)?;
    let mut max_height = session.tree_height();

    while !session.is_complete() {
        let comparison = session.next_comparison()?;
        let (a, b) = (comparison.item_a.id, comparison.item_b.id);
        let mut choice = if true_rank[a] > true_rank[b] { a } else { b };
        if rng.random::<f64>() < noise {
            choice = if choice == a { b } else { a };
        }
        session.apply_choice(comparison.with_choice(choice))?;
        max_height = max_height.max(session.tree_height());
    }

    let ranking = session.final_ranking().unwrap_or_default();
    let mut exact_positions = 0;
    let mut displacement = 0usize;
    for (position, &id) in ranking.iter().enumerate() {
        if true_rank[id] == position {
            exact_positions += 1;
        }
        displacement += true_rank[id].abs_diff(position);
    }

    let report = SimulationReport {
        items: count,
        seed,
        noise,
        comparisons: session.comparisons_made(),
        comparison_budget: session.comparison_budget(),
        repeat_budget: session.repeat_budget(),
        max_height,
        exact_positions,
        mean_displacement: displacement as f64 / count as f64,
    };
    debug!(?report, "simulation finished");
    Ok(report)
}

pub fn print_report(report: &SimulationReport) {
    println!("Simulated {} items (seed {}, noise {:.2})", report.items, report.seed, report.noise);
    println!(
        "Comparisons:      {} (budget {}, repeat budget {})",
        report.comparisons, report.comparison_budget, report.repeat_budget
    );
    println!("Max tree height:  {}", report.max_height);
    println!("Exact positions:  {}/{}", report.exact_positions, report.items);
    println!("Mean displacement: {:.3}", report.mean_displacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use versus_core::{balanced_height, RankingError};

    #[test]
    fn test_noiseless_simulation_is_exact() {
        let report = run_simulation(50, 7, 0.0).unwrap();
        assert_eq!(report.exact_positions, 50);
        assert_eq!(report.mean_displacement, 0.0);
        assert!(report.comparisons <= report.comparison_budget);
        assert_eq!(report.max_height, balanced_height(50));
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let first = run_simulation(30, 11, 0.2).unwrap();
        let second = run_simulation(30, 11, 0.2).unwrap();
        assert_eq!(first.comparisons, second.comparisons);
        assert_eq!(first.exact_positions, second.exact_positions);
    }

    #[test]
    fn test_simulation_needs_two_items() {
        assert_eq!(
            run_simulation(1, 0, 0.0).unwrap_err(),
            RankingError::InsufficientItems { found: 1 }
        );
    }
}
