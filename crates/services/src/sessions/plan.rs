use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeSet;

use drill_core::model::{QuestionBank, QuestionId};

use crate::error::SessionError;

/// Builds the randomized question queue for one drill pass.
///
/// Every permutation of the matching ids is equally likely; there is no
/// weighting by past performance.
pub struct SessionPlanner {
    rng: StdRng,
}

impl SessionPlanner {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_rng(&mut rand::rng()),
        }
    }

    /// Planner with a fixed seed, for reproducible runs.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Collect the ids of every question in `categories` and shuffle them.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::EmptySelection` if no question matches.
    pub fn build_queue(
        &mut self,
        bank: &QuestionBank,
        categories: &BTreeSet<String>,
    ) -> Result<Vec<QuestionId>, SessionError> {
        let mut queue: Vec<QuestionId> = bank
            .records_in(categories)
            .into_iter()
            .map(|record| record.id())
            .collect();

        if queue.is_empty() {
            return Err(SessionError::EmptySelection);
        }

        queue.as_mut_slice().shuffle(&mut self.rng);
        Ok(queue)
    }
}

impl Default for SessionPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bank() -> QuestionBank {
        QuestionBank::parse("A;q0;a0\nB;q1;a1\nA;q2;a2\nC;q3;a3\nA;q4;a4\n").unwrap()
    }

    fn categories(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn queue_is_a_permutation_of_matching_ids() {
        let mut planner = SessionPlanner::new();
        for _ in 0..20 {
            let mut queue = planner
                .build_queue(&bank(), &categories(&["A", "C"]))
                .unwrap();
            queue.sort();
            let raw: Vec<_> = queue.iter().map(QuestionId::value).collect();
            assert_eq!(raw, vec![0, 2, 3, 4]);
        }
    }

    #[test]
    fn empty_selection_is_rejected() {
        let mut planner = SessionPlanner::with_seed(1);
        let err = planner
            .build_queue(&bank(), &categories(&["Missing"]))
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptySelection));

        let err = planner.build_queue(&bank(), &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, SessionError::EmptySelection));
    }

    #[test]
    fn seeded_planners_agree() {
        let a = SessionPlanner::with_seed(42)
            .build_queue(&bank(), &categories(&["A", "B", "C"]))
            .unwrap();
        let b = SessionPlanner::with_seed(42)
            .build_queue(&bank(), &categories(&["A", "B", "C"]))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_ordering_shows_up_evenly() {
        let bank = QuestionBank::parse("A;q0;a0\nA;q1;a1\nA;q2;a2\n").unwrap();
        let selection = categories(&["A"]);
        let mut planner = SessionPlanner::with_seed(7);
        let mut seen: HashMap<Vec<QuestionId>, usize> = HashMap::new();

        for _ in 0..6000 {
            let queue = planner.build_queue(&bank, &selection).unwrap();
            *seen.entry(queue).or_insert(0) += 1;
        }

        assert_eq!(seen.len(), 6);
        for count in seen.values() {
            assert!((800..=1200).contains(count), "skewed shuffle: {seen:?}");
        }
    }
}
