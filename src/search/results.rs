// Solutions and the results store.
//
// During the search, solutions are appended (per worker, merged after
// join); once the workers finish, the set is sorted under a total
// deterministic order, deduplicated, and every retained entry is replayed
// through the evaluator. The sorted-and-revalidated set is what the caller
// sees, regardless of worker count or scheduling.

use std::cmp::Ordering;
use std::fmt;

use crate::ops::Op;

use super::evaluator::Evaluator;

// ---------------------------------------------------------------------------
// Solution
// ---------------------------------------------------------------------------

/// A validated checksum expression: applying `operations` over the fields
/// of `field_indices` (with `constant` feeding the const-using operators)
/// reproduces every expected checksum in the dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Field indices in evaluation order; pairwise distinct.
    pub field_indices: Vec<u8>,
    /// Operator sequence, at most `field_indices.len() + 1` long.
    pub operations: Vec<Op>,
    /// The constant swept for this candidate.
    pub constant: u64,
    /// Checksum width in bytes.
    pub checksum_size: usize,
    /// Set when post-search re-validation succeeded.
    pub validated: bool,
}

impl Solution {
    /// The total deterministic ordering of the results store: fewer fields,
    /// then fewer operations, then lexicographic fields, lexicographic
    /// operations (registry order), constant, checksum size.
    pub fn order(&self, other: &Solution) -> Ordering {
        self.field_indices
            .len()
            .cmp(&other.field_indices.len())
            .then_with(|| self.operations.len().cmp(&other.operations.len()))
            .then_with(|| self.field_indices.cmp(&other.field_indices))
            .then_with(|| self.operations.cmp(&other.operations))
            .then_with(|| self.constant.cmp(&other.constant))
            .then_with(|| self.checksum_size.cmp(&other.checksum_size))
    }

    fn same_key(&self, other: &Solution) -> bool {
        self.order(other) == Ordering::Equal
    }
}

impl fmt::Display for Solution {
    /// Compact one-line rendering: `fields=[1,2] ops=[ADD] constant=0x00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fields=[")?;
        for (i, field) in self.field_indices.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, "] ops=[")?;
        for (i, op) in self.operations.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", op.short_name())?;
        }
        write!(
            f,
            "] constant={:#04x} width={}",
            self.constant, self.checksum_size
        )
    }
}

// ---------------------------------------------------------------------------
// SolutionSet
// ---------------------------------------------------------------------------

/// Append-only collector with a single finalization pass.
#[derive(Debug, Default)]
pub struct SolutionSet {
    solutions: Vec<Solution>,
}

impl SolutionSet {
    pub fn new() -> SolutionSet {
        SolutionSet::default()
    }

    pub fn push(&mut self, solution: Solution) {
        self.solutions.push(solution);
    }

    /// Merge a worker's local solutions. Callers merge workers in partition
    /// order; the final sort makes the merge order immaterial anyway.
    pub fn merge(&mut self, solutions: Vec<Solution>) {
        self.solutions.extend(solutions);
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Sort under the six-key order, drop duplicates, and replay every
    /// survivor through the evaluator. A solution that fails re-validation
    /// is discarded, so the caller only ever sees entries that reproduce
    /// every expected checksum; in a correct run nothing is dropped and the
    /// flag records that re-validation passed.
    pub fn finalize(&mut self, evaluator: &Evaluator<'_>) {
        self.solutions.sort_by(|a, b| a.order(b));
        self.solutions.dedup_by(|a, b| a.same_key(b));
        for solution in &mut self.solutions {
            solution.validated = evaluator.evaluate(
                &solution.field_indices,
                &solution.operations,
                solution.constant,
            );
        }
        self.solutions.retain(|s| s.validated);
    }

    /// Keep at most `max` solutions (0 means unlimited).
    pub fn truncate(&mut self, max: u32) {
        if max > 0 {
            self.solutions.truncate(max as usize);
        }
    }

    pub fn into_vec(self) -> Vec<Solution> {
        self.solutions
    }

    pub fn as_slice(&self) -> &[Solution] {
        &self.solutions
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Dataset, Packet};

    fn solution(fields: &[u8], ops: &[Op], constant: u64) -> Solution {
        Solution {
            field_indices: fields.to_vec(),
            operations: ops.to_vec(),
            constant,
            checksum_size: 1,
            validated: false,
        }
    }

    #[test]
    fn ordering_keys_in_priority_order() {
        let a = solution(&[1], &[Op::Identity], 0);
        let b = solution(&[1, 2], &[Op::Add], 0);
        assert_eq!(a.order(&b), Ordering::Less); // fewer fields first

        let c = solution(&[1, 2], &[Op::Add, Op::Identity], 0);
        assert_eq!(b.order(&c), Ordering::Less); // fewer operations next

        let d = solution(&[1, 3], &[Op::Add], 0);
        assert_eq!(b.order(&d), Ordering::Less); // lexicographic fields

        let e = solution(&[1, 2], &[Op::Xor], 0);
        assert_eq!(b.order(&e), Ordering::Less); // registry order (ADD < XOR)

        let f = solution(&[1, 2], &[Op::Add], 1);
        assert_eq!(b.order(&f), Ordering::Less); // lower constant
    }

    #[test]
    fn sort_is_stable_under_permutation() {
        let mut set1 = SolutionSet::new();
        let mut set2 = SolutionSet::new();
        let solutions = vec![
            solution(&[2, 1], &[Op::Xor], 3),
            solution(&[1], &[Op::Identity], 0),
            solution(&[1, 2], &[Op::Add], 0),
            solution(&[1, 2], &[Op::Add], 7),
        ];
        for s in &solutions {
            set1.push(s.clone());
        }
        for s in solutions.iter().rev() {
            set2.push(s.clone());
        }

        let ds = Dataset::new(vec![Packet::new(vec![0; 4], 0, 1, "x").unwrap()]).unwrap();
        let ev = Evaluator::new(&ds, 1);
        set1.finalize(&ev);
        set2.finalize(&ev);

        let strip =
            |set: SolutionSet| -> Vec<(Vec<u8>, Vec<Op>, u64)> {
                set.into_vec()
                    .into_iter()
                    .map(|s| (s.field_indices, s.operations, s.constant))
                    .collect()
            };
        assert_eq!(strip(set1), strip(set2));
    }

    #[test]
    fn duplicates_collapse_but_distinct_constants_survive() {
        let mut set = SolutionSet::new();
        set.push(solution(&[0, 1], &[Op::Xor], 5));
        set.push(solution(&[0, 1], &[Op::Xor], 5));
        set.push(solution(&[0, 1], &[Op::Xor], 6));

        let ds = Dataset::new(vec![Packet::new(vec![3, 5], 6, 1, "x").unwrap()]).unwrap();
        let ev = Evaluator::new(&ds, 1);
        set.finalize(&ev);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn finalize_revalidates() {
        let ds = Dataset::new(vec![Packet::new(vec![3, 5], 6, 1, "x").unwrap()]).unwrap();
        let ev = Evaluator::new(&ds, 1);
        let mut set = SolutionSet::new();
        set.push(solution(&[0, 1], &[Op::Xor], 0)); // 3 ^ 5 == 6
        set.finalize(&ev);
        assert!(set.as_slice()[0].validated);
    }

    #[test]
    fn finalize_discards_solutions_that_fail_replay() {
        let ds = Dataset::new(vec![Packet::new(vec![3, 5], 6, 1, "x").unwrap()]).unwrap();
        let ev = Evaluator::new(&ds, 1);
        let mut set = SolutionSet::new();
        set.push(solution(&[0, 1], &[Op::Xor], 0)); // 3 ^ 5 == 6
        set.push(solution(&[0, 1], &[Op::And], 0)); // 3 & 5 == 1: must not survive
        set.finalize(&ev);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].operations, vec![Op::Xor]);
        assert!(set.as_slice()[0].validated);
    }

    #[test]
    fn truncate_caps_but_zero_is_unlimited() {
        let mut set = SolutionSet::new();
        for c in 0..5 {
            set.push(solution(&[0, 1], &[Op::Xor], c));
        }
        set.truncate(0);
        assert_eq!(set.len(), 5);
        set.truncate(2);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_is_compact() {
        let s = solution(&[1, 2], &[Op::Add, Op::ConstXor], 0x1F);
        assert_eq!(s.to_string(), "fields=[1,2] ops=[ADD,C^] constant=0x1f width=1");
    }
}
