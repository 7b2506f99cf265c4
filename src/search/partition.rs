// Work partitioner: splits the enumeration across workers by assigning each
// a disjoint set of *starting operators*, balanced by a search-space ×
// cost-weight workload estimate.
//
// The partitioning is a pure function of (active list, worker count, field
// count, max_fields, max_constants): no randomness, no clock. The same
// inputs always produce the same partitions, which the thread-count
// independence guarantee rests on.

use crate::ops::Op;

// ---------------------------------------------------------------------------
// Search-space arithmetic
// ---------------------------------------------------------------------------

/// `P(n, k)` — ordered selections of `k` distinct items from `n`.
pub fn falling_factorial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    (0..k).fold(1u128, |acc, i| acc * (n - i) as u128)
}

/// Workload estimate for a single starting operator:
///
/// ```text
/// weight(op) * constants * Σ_{k=1..max_fields} P(n, k) * m^k
/// ```
///
/// where `m` is the active operator count. A worker owning the operator is
/// responsible for `m^k` completions of each length-(k+1) sequence per
/// subset permutation and constant.
pub fn operator_workload(
    op: Op,
    active_len: usize,
    n: usize,
    max_fields: usize,
    max_constants: u64,
) -> u128 {
    let m = active_len as u128;
    let mut space = 0u128;
    for k in 1..=max_fields {
        space += falling_factorial(n, k) * m.pow(k as u32);
    }
    op.cost_weight() as u128 * max_constants as u128 * space
}

/// Total number of evaluator leaves the full search visits:
///
/// ```text
/// constants * Σ_{k=1..max_fields} P(n, k) * m^(k+1)
/// ```
///
/// The same sum as [`operator_workload`] aggregated over all `m` starting
/// operators (without cost weighting); it is exact, not approximate, and is
/// shared by the partitioner and the progress tracker.
pub fn total_estimate(active_len: usize, n: usize, max_fields: usize, max_constants: u64) -> u128 {
    let m = active_len as u128;
    let mut space = 0u128;
    for k in 1..=max_fields {
        space += falling_factorial(n, k) * m.pow(k as u32 + 1);
    }
    max_constants as u128 * space
}

// ---------------------------------------------------------------------------
// Partitions
// ---------------------------------------------------------------------------

/// One worker's share of the search: its starting operators and their
/// combined workload estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub ops: Vec<Op>,
    pub workload: u128,
}

/// Split `active` into at most `workers` non-empty disjoint partitions
/// whose union is `active`. A worker count above the operator count is
/// clamped, since a worker without a starting operator has nothing to do.
///
/// Operators are sorted by descending workload (ties broken by active-list
/// position) and placed first-fit-decreasing onto the bin with the lowest
/// running total (ties to the lowest bin index).
pub fn partition_operators(
    active: &[Op],
    workers: usize,
    n: usize,
    max_fields: usize,
    max_constants: u64,
) -> Vec<Partition> {
    let bins = workers.min(active.len()).max(1);
    let mut weighted: Vec<(usize, Op, u128)> = active
        .iter()
        .enumerate()
        .map(|(i, &op)| {
            (
                i,
                op,
                operator_workload(op, active.len(), n, max_fields, max_constants),
            )
        })
        .collect();
    weighted.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    let mut partitions = vec![
        Partition {
            ops: Vec::new(),
            workload: 0,
        };
        bins
    ];
    for (_, op, workload) in weighted {
        let lightest = partitions
            .iter()
            .enumerate()
            .min_by_key(|(index, p)| (p.workload, *index))
            .map(|(index, _)| index)
            .unwrap_or(0);
        partitions[lightest].ops.push(op);
        partitions[lightest].workload += workload;
    }
    partitions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Complexity, active_operators};

    #[test]
    fn falling_factorial_values() {
        assert_eq!(falling_factorial(8, 1), 8);
        assert_eq!(falling_factorial(8, 2), 56);
        assert_eq!(falling_factorial(8, 3), 336);
        assert_eq!(falling_factorial(4, 4), 24);
        assert_eq!(falling_factorial(3, 4), 0);
        assert_eq!(falling_factorial(5, 0), 1);
    }

    #[test]
    fn estimate_matches_manual_sum() {
        // n=4, m=3, max_fields=2, constants=10:
        //   k=1: P(4,1)*3^2 = 4*9 = 36
        //   k=2: P(4,2)*3^3 = 12*27 = 324
        assert_eq!(total_estimate(3, 4, 2, 10), 10 * (36 + 324));
    }

    #[test]
    fn partitions_are_disjoint_and_exhaustive() {
        for workers in 1..=12 {
            let active = active_operators(Complexity::Advanced, None);
            let partitions = partition_operators(&active, workers, 8, 4, 128);
            assert_eq!(partitions.len(), workers.min(active.len()));

            let mut seen: Vec<Op> = partitions.iter().flat_map(|p| p.ops.clone()).collect();
            assert_eq!(seen.len(), active.len());
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), active.len());
            for p in &partitions {
                assert!(!p.ops.is_empty());
            }
        }
    }

    #[test]
    fn worker_count_clamps_to_operator_count() {
        let active = [Op::Add, Op::Xor];
        let partitions = partition_operators(&active, 8, 8, 3, 16);
        assert_eq!(partitions.len(), 2);
        assert_eq!(partitions.iter().map(|p| p.ops.len()).sum::<usize>(), 2);
    }

    #[test]
    fn partitioning_is_deterministic() {
        let active = active_operators(Complexity::Advanced, None);
        let a = partition_operators(&active, 7, 8, 5, 256);
        let b = partition_operators(&active, 7, 8, 5, 256);
        assert_eq!(a, b);
    }

    #[test]
    fn heaviest_operator_lands_first() {
        // DIV and MOD carry weight 30; whichever sorts first (DIV, by
        // registry order) must open bin 0.
        let active = active_operators(Complexity::Intermediate, None);
        let partitions = partition_operators(&active, 4, 8, 4, 128);
        assert_eq!(partitions[0].ops[0], Op::Div);
    }

    #[test]
    fn balance_is_reasonable() {
        let active = active_operators(Complexity::Advanced, None);
        let partitions = partition_operators(&active, 4, 8, 4, 256);
        let max = partitions.iter().map(|p| p.workload).max().unwrap();
        let min = partitions.iter().map(|p| p.workload).min().unwrap();
        // FFD keeps the spread well under the heaviest single item.
        let heaviest = active
            .iter()
            .map(|&op| operator_workload(op, active.len(), 8, 4, 256))
            .max()
            .unwrap();
        assert!(max - min <= heaviest);
    }
}
