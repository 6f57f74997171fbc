/// Ranking session: the resumable state machine driven by a judge.
///
/// No IO. The host asks for the next comparison, shows it to a human,
/// and feeds the answer back whenever it arrives. Between round trips the
/// state is plain data the host can persist.
use std::collections::VecDeque;

use tracing::{debug, info};

use crate::budget::{comparison_budget, repeat_budget};
use crate::constants::MIN_ITEMS;
use crate::error::{RankingError, RankingResult};
use crate::scoring::score_session;
use crate::tree::{RankingTree, Side};
use crate::types::{Agreement, Comparison, Item, ItemId, SessionOutcome};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionState {
    /// Item registry, fixed at creation.
    items: Vec<Item>,
    tree: RankingTree,
    /// Node the pending item is currently compared against.
    test_node: ItemId,
    /// Item being located in the tree. `None` once every item is placed.
    pending_item: Option<ItemId>,
    /// Items not yet introduced, in input order.
    queue: VecDeque<ItemId>,
    /// Every answered comparison, in order.
    comparisons: Vec<Comparison>,
    comparison_budget: usize,
    repeat_budget: usize,
    /// Set exactly once, by the first `is_complete` call that sees no pending item.
    outcome: Option<SessionOutcome>,
}

impl SessionState {
    /// Start a session. The first item becomes the root, the second the first pending item.
    pub fn new<I, S>(payloads: I) -> RankingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Item> = payloads
            .into_iter()
            .enumerate()
            .map(|(id, payload)| Item { id, payload: payload.into() })
            .collect();
        let num_items = items.len();
        if num_items < MIN_ITEMS {
            return Err(RankingError::InsufficientItems { found: num_items });
        }

        let mut queue: VecDeque<ItemId> = (0..num_items).collect();
        let root = queue.pop_front().unwrap_or_default();
        let pending_item = queue.pop_front();

        debug!(num_items, root, ?pending_item, "session created");

        Ok(SessionState {
            items,
            tree: RankingTree::with_root(num_items, root),
            test_node: root,
            pending_item,
            queue,
            comparisons: Vec::new(),
            comparison_budget: comparison_budget(num_items),
            repeat_budget: repeat_budget(num_items),
            outcome: None,
        })
    }

    /// The comparison the judge should answer next: (node under test, pending item).
    pub fn next_comparison(&self) -> RankingResult<Comparison> {
        let pending = self.pending_item.ok_or(RankingError::NoPendingItem)?;
        Ok(Comparison::new(
            (&self.items[self.test_node]).into(),
            (&self.items[pending]).into(),
        ))
    }

    /// Apply an answered comparison.
    ///
    /// Preferring the pending item moves right, otherwise left. An empty slot
    /// inserts the pending item and rebalances; an occupied one moves the cursor.
    pub fn apply_choice(&mut self, comparison: Comparison) -> RankingResult<()> {
        let pending = self.pending_item.ok_or_else(|| RankingError::InvalidChoice {
            choice: comparison.choice,
            reason: "no item is pending".to_string(),
        })?;
        let chosen = match comparison.choice {
            Some(chosen) if comparison.involves(chosen) => chosen,
            Some(_) => {
                return Err(RankingError::InvalidChoice {
                    choice: comparison.choice,
                    reason: "choice is not one of the compared items".to_string(),
                })
            }
            None => {
                return Err(RankingError::InvalidChoice {
                    choice: None,
                    reason: "comparison has not been answered".to_string(),
                })
            }
        };
        if comparison.item_a.id != self.test_node || comparison.item_b.id != pending {
            return Err(RankingError::StaleComparison {
                item_a: comparison.item_a.id,
                item_b: comparison.item_b.id,
                expected_a: self.test_node,
                expected_b: pending,
            });
        }

        debug!(
            root = self.tree.root(),
            test_node = self.test_node,
            pending,
            chosen,
            "applying choice"
        );

        let side = if chosen == pending { Side::Right } else { Side::Left };
        let child = self.tree.node(self.test_node).and_then(|node| node.child(side));
        match child {
            Some(next) => self.test_node = next,
            None => self.insert_pending(side, pending),
        }

        self.comparisons.push(comparison);
        Ok(())
    }

    fn insert_pending(&mut self, side: Side, pending: ItemId) {
        self.tree.attach(self.test_node, side, pending);
        self.tree.rebalance();
        self.test_node = self.tree.root();
        self.pending_item = self.queue.pop_front();

        debug!(
            inserted = pending,
            root = self.test_node,
            height = self.tree.height(),
            next = ?self.pending_item,
            queued = self.queue.len(),
            "inserted and rebalanced"
        );
    }

    /// True once every item is placed. Scores the session on the first such call.
    pub fn is_complete(&mut self) -> bool {
        if self.pending_item.is_some() {
            return false;
        }
        if self.outcome.is_none() {
            let outcome = score_session(&self.tree, self.items.len(), &self.comparisons);
            info!(
                items = self.items.len(),
                comparisons = self.comparisons.len(),
                "ranking complete"
            );
            self.outcome = Some(outcome);
        }
        true
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }

    /// In-order item identities, least preferred first. `None` until complete.
    pub fn final_ranking(&self) -> Option<&[ItemId]> {
        self.outcome.as_ref().map(|o| o.ranking.as_slice())
    }

    /// Agreement fraction per item, indexed by identity. `None` until complete.
    pub fn agreement_fractions(&self) -> Option<Vec<Agreement>> {
        self.outcome
            .as_ref()
            .map(|o| o.scores.iter().map(|s| s.agreement).collect())
    }

    /// Final ranking mapped to payloads, least preferred first.
    pub fn ranked_payloads(&self) -> Option<Vec<&str>> {
        self.final_ranking().map(|ranking| {
            ranking.iter().map(|&id| self.items[id].payload.as_str()).collect()
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn tree(&self) -> &RankingTree {
        &self.tree
    }

    pub fn test_node(&self) -> ItemId {
        self.test_node
    }

    pub fn pending_item(&self) -> Option<ItemId> {
        self.pending_item
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn comparisons_made(&self) -> usize {
        self.comparisons.len()
    }

    pub fn placed_count(&self) -> usize {
        self.tree.len()
    }

    /// Items not yet placed, including the pending one.
    pub fn remaining(&self) -> usize {
        self.queue.len() + usize::from(self.pending_item.is_some())
    }

    pub fn comparison_budget(&self) -> usize {
        self.comparison_budget
    }

    pub fn repeat_budget(&self) -> usize {
        self.repeat_budget
    }

    pub fn tree_height(&self) -> usize {
        self.tree.height()
    }

    /// Verify a state that came from outside (e.g. a session file).
    ///
    /// Every identity must index the registry, the tree must be a valid rooted
    /// tree holding the cursor, and every item must be placed, pending or queued
    /// exactly once. A state built only through this type's methods always passes.
    pub fn check(&self) -> RankingResult<()> {
        let corrupt = |reason: String| Err(RankingError::CorruptState { reason });
        let n = self.items.len();

        if n < MIN_ITEMS {
            return corrupt(format!("{n} items registered"));
        }
        if let Some((slot, item)) = self.items.iter().enumerate().find(|(i, item)| item.id != *i) {
            return corrupt(format!("item at position {slot} has identity {}", item.id));
        }
        if let Err(violation) = self.tree.validate() {
            return corrupt(violation.to_string());
        }
        if !self.tree.contains(self.test_node) {
            return corrupt(format!("cursor {} is not a tree node", self.test_node));
        }

        let mut placed = vec![false; n];
        let unplaced = self.pending_item.into_iter().chain(self.queue.iter().copied());
        for id in self.tree.in_order().into_iter().chain(unplaced) {
            match placed.get_mut(id) {
                None => return corrupt(format!("identity {id} is out of range")),
                Some(true) => return corrupt(format!("identity {id} appears twice")),
                Some(slot) => *slot = true,
            }
        }
        if let Some(missing) = placed.iter().position(|&p| !p) {
            return corrupt(format!("item {missing} is neither placed nor queued"));
        }
        if self.pending_item.is_none() && !self.queue.is_empty() {
            return corrupt("items are queued but none is pending".to_string());
        }

        for (i, comparison) in self.comparisons.iter().enumerate() {
            let in_range = comparison.item_a.id < n && comparison.item_b.id < n;
            let answered = comparison.choice.is_some_and(|c| comparison.involves(c));
            if !in_range || !answered {
                return corrupt(format!("comparison {i} is out of range or unanswered"));
            }
        }

        if let Some(outcome) = &self.outcome {
            if self.pending_item.is_some()
                || outcome.ranking.len() != n
                || outcome.scores.len() != n
                || outcome.ranking.iter().any(|&id| id >= n)
            {
                return corrupt("cached outcome does not match the registry".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("u{i}")).collect()
    }

    /// Answer the outstanding comparison with `pick(test_node, pending)`.
    fn answer(state: &mut SessionState, pick: impl Fn(ItemId, ItemId) -> ItemId) {
        let comparison = state.next_comparison().unwrap();
        let choice = pick(comparison.item_a.id, comparison.item_b.id);
        state.apply_choice(comparison.with_choice(choice)).unwrap();
    }

    /// Drive a session to completion, checking tree invariants after every step.
    fn drive(state: &mut SessionState, pick: impl Fn(ItemId, ItemId) -> ItemId) {
        while !state.is_complete() {
            let placed = state.placed_count();
            answer(state, &pick);
            state.check().unwrap();
            if state.placed_count() > placed {
                let size = state.placed_count();
                let bound = (size as f64).log2().ceil() as usize + 1;
                assert!(state.tree_height() <= bound, "height {} > {bound} at size {size}", state.tree_height());
            }
        }
    }

    #[test]
    fn test_create_session() {
        let state = SessionState::new(urls(5)).unwrap();
        assert_eq!(state.tree().root(), 0);
        assert_eq!(state.test_node(), 0);
        assert_eq!(state.pending_item(), Some(1));
        assert_eq!(state.remaining(), 4);
        assert_eq!(state.placed_count(), 1);
        assert_eq!(state.comparison_budget(), 11); // floor(5 * 2.32)
        assert_eq!(state.repeat_budget(), 3);
        assert!(state.outcome().is_none());
    }

    #[test]
    fn test_create_session_needs_two_items() {
        assert_eq!(
            SessionState::new(vec!["only"]),
            Err(RankingError::InsufficientItems { found: 1 })
        );
        assert_eq!(
            SessionState::new(Vec::<String>::new()),
            Err(RankingError::InsufficientItems { found: 0 })
        );
    }

    #[test]
    fn test_next_comparison_has_no_side_effect() {
        let state = SessionState::new(urls(3)).unwrap();
        let first = state.next_comparison().unwrap();
        let second = state.next_comparison().unwrap();
        assert_eq!(first, second);
        assert_eq!((first.item_a.id, first.item_b.id), (0, 1));
        assert_eq!(first.item_a.payload, "u0");
        assert_eq!(first.item_b.payload, "u1");
        assert_eq!(state.comparisons_made(), 0);
    }

    #[test]
    fn test_three_item_walkthrough() {
        let mut state = SessionState::new(vec!["u0", "u1", "u2"]).unwrap();

        let c1 = state.next_comparison().unwrap();
        assert_eq!((c1.item_a.id, c1.item_b.id), (0, 1));
        state.apply_choice(c1.with_choice(1)).unwrap();

        let root = state.tree().node(1).unwrap();
        assert_eq!(state.tree().root(), 1);
        assert_eq!((root.left, root.right), (Some(0), None));
        assert_eq!(state.pending_item(), Some(2));
        assert!(!state.is_complete());

        let c2 = state.next_comparison().unwrap();
        assert_eq!((c2.item_a.id, c2.item_b.id), (1, 2));
        state.apply_choice(c2.with_choice(2)).unwrap();

        let root = state.tree().node(1).unwrap();
        assert_eq!(state.tree().root(), 1);
        assert_eq!((root.left, root.right), (Some(0), Some(2)));
        assert_eq!(state.pending_item(), None);

        assert!(state.is_complete());
        assert_eq!(state.final_ranking(), Some(&[0, 1, 2][..]));
        assert_eq!(state.ranked_payloads(), Some(vec!["u0", "u1", "u2"]));
        assert_eq!(
            state.agreement_fractions(),
            Some(vec![
                Agreement::Fraction(0.0),
                Agreement::Fraction(0.5),
                Agreement::Fraction(1.0),
            ])
        );
    }

    #[test]
    fn test_descends_into_occupied_slot() {
        let mut state = SessionState::new(urls(4)).unwrap();
        answer(&mut state, |_, pending| pending); // root 1, left 0
        let pending = state.pending_item();

        // Prefer the node under test: go left, slot holds 0, so the cursor moves.
        answer(&mut state, |test_node, _| test_node);
        assert_eq!(state.test_node(), 0);
        assert_eq!(state.pending_item(), pending);
        assert_eq!(state.placed_count(), 2);
        assert_eq!(state.comparisons_made(), 2);

        let comparison = state.next_comparison().unwrap();
        assert_eq!((comparison.item_a.id, comparison.item_b.id), (0, 2));
    }

    #[test]
    fn test_next_comparison_after_completion() {
        let mut state = SessionState::new(urls(2)).unwrap();
        answer(&mut state, |a, _| a);
        assert!(state.is_complete());
        assert_eq!(state.next_comparison(), Err(RankingError::NoPendingItem));
    }

    #[test]
    fn test_apply_choice_after_completion() {
        let mut state = SessionState::new(urls(2)).unwrap();
        let stale = state.next_comparison().unwrap();
        answer(&mut state, |a, _| a);
        let err = state.apply_choice(stale.with_choice(0)).unwrap_err();
        assert!(matches!(err, RankingError::InvalidChoice { .. }));
    }

    #[test]
    fn test_choice_outside_pair_is_rejected() {
        let mut state = SessionState::new(urls(3)).unwrap();
        let before = state.clone();
        let comparison = state.next_comparison().unwrap();

        let err = state.apply_choice(comparison.clone().with_choice(2)).unwrap_err();
        assert!(matches!(err, RankingError::InvalidChoice { choice: Some(2), .. }));

        let err = state.apply_choice(comparison).unwrap_err();
        assert!(matches!(err, RankingError::InvalidChoice { choice: None, .. }));
        assert_eq!(state, before);
    }

    #[test]
    fn test_stale_comparison_is_rejected() {
        let mut state = SessionState::new(urls(4)).unwrap();
        answer(&mut state, |_, pending| pending);
        let stale = state.next_comparison().unwrap(); // (1, 2)
        answer(&mut state, |test_node, _| test_node); // cursor moves to 0
        let before = state.clone();

        let err = state.apply_choice(stale.with_choice(2)).unwrap_err();
        assert_eq!(
            err,
            RankingError::StaleComparison { item_a: 1, item_b: 2, expected_a: 0, expected_b: 2 }
        );
        assert_eq!(state, before);
    }

    fn assert_corrupt(state: &SessionState) {
        assert!(matches!(state.check(), Err(RankingError::CorruptState { .. })), "{state:?}");
    }

    #[test]
    fn test_check_accepts_states_built_by_the_protocol() {
        let mut state = SessionState::new(urls(5)).unwrap();
        state.check().unwrap();
        drive(&mut state, |a, b| a.min(b));
        state.check().unwrap();
    }

    #[test]
    fn test_check_rejects_out_of_range_cursor() {
        let mut state = SessionState::new(urls(3)).unwrap();
        state.test_node = 99;
        assert_corrupt(&state);
    }

    #[test]
    fn test_check_rejects_bad_pending_and_queue() {
        let mut state = SessionState::new(urls(4)).unwrap();
        state.pending_item = Some(7);
        assert_corrupt(&state);

        let mut state = SessionState::new(urls(4)).unwrap();
        state.queue.push_back(0); // already the root
        assert_corrupt(&state);

        let mut state = SessionState::new(urls(4)).unwrap();
        state.queue.pop_back();
        assert_corrupt(&state);
    }

    #[test]
    fn test_check_rejects_bad_registry_and_log() {
        let mut state = SessionState::new(urls(3)).unwrap();
        state.items[1].id = 2;
        assert_corrupt(&state);

        let mut state = SessionState::new(urls(3)).unwrap();
        let mut comparison = state.next_comparison().unwrap().with_choice(1);
        comparison.item_b.id = 5;
        state.comparisons.push(comparison);
        assert_corrupt(&state);
    }

    #[test]
    fn test_check_rejects_mismatched_outcome() {
        let mut state = SessionState::new(urls(3)).unwrap();
        drive(&mut state, |a, b| a.max(b));
        if let Some(outcome) = state.outcome.as_mut() {
            outcome.ranking.push(9);
        }
        assert_corrupt(&state);
    }

    #[test]
    fn test_is_complete_is_idempotent() {
        let mut state = SessionState::new(urls(6)).unwrap();
        drive(&mut state, |a, b| a.max(b));
        let first = state.outcome().cloned();
        assert!(state.is_complete());
        assert!(state.is_complete());
        assert_eq!(state.outcome().cloned(), first);
    }

    #[test]
    fn test_consistent_judge_recovers_true_order() {
        // Judge prefers higher identities, so in-order must be ascending.
        let mut state = SessionState::new(urls(20)).unwrap();
        drive(&mut state, |a, b| a.max(b));
        let expected: Vec<ItemId> = (0..20).collect();
        assert_eq!(state.final_ranking(), Some(expected.as_slice()));
    }

    #[test]
    fn test_reverse_judge_recovers_reverse_order() {
        let mut state = SessionState::new(urls(12)).unwrap();
        drive(&mut state, |a, b| a.min(b));
        let expected: Vec<ItemId> = (0..12).rev().collect();
        assert_eq!(state.final_ranking(), Some(expected.as_slice()));
    }

    #[test]
    fn test_comparison_count_is_logarithmic() {
        let n = 64;
        let mut state = SessionState::new(urls(n)).unwrap();
        drive(&mut state, |a, b| a.max(b));
        assert!(
            state.comparisons_made() <= state.comparison_budget(),
            "{} comparisons for budget {}",
            state.comparisons_made(),
            state.comparison_budget()
        );
    }

    #[rstest]
    #[case(2, 1)]
    #[case(3, 2)]
    #[case(7, 3)]
    #[case(16, 4)]
    #[case(33, 5)]
    #[case(100, 6)]
    fn test_random_judge_places_every_item(#[case] n: usize, #[case] seed: u64) {
        let mut rng = SmallRng::seed_from_u64(seed);
        let coin: Vec<bool> = (0..n * n).map(|_| rng.random()).collect();
        let mut state = SessionState::new(urls(n)).unwrap();

        let mut step = 0;
        while !state.is_complete() {
            let comparison = state.next_comparison().unwrap();
            let choice = if coin[step % coin.len()] { comparison.item_a.id } else { comparison.item_b.id };
            state.apply_choice(comparison.with_choice(choice)).unwrap();
            state.tree().validate().unwrap();
            step += 1;
        }

        assert_eq!(state.placed_count(), n);
        let mut ranking = state.final_ranking().unwrap().to_vec();
        ranking.sort_unstable();
        assert_eq!(ranking, (0..n).collect::<Vec<_>>());

        for agreement in state.agreement_fractions().unwrap() {
            let fraction = agreement.fraction().expect("every placed item was compared");
            assert!((0.0..=1.0).contains(&fraction));
        }
        assert_eq!(state.comparisons_made(), step);
    }
}
