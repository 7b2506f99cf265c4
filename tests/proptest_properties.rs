// Property tests for the core invariants: evaluator purity, mask and
// extraction correctness, operator arity semantics, partition
// exhaustiveness, and sort determinism.

use proptest::prelude::*;

use cads::dataset::{Dataset, Packet};
use cads::ops::{ArityClass, Complexity, Op, active_operators};
use cads::search::evaluator::{Evaluator, extract_field, mask_to_size};
use cads::search::partition::partition_operators;
use cads::search::results::{Solution, SolutionSet};

fn arb_op() -> impl Strategy<Value = Op> {
    (0..Op::ALL.len()).prop_map(|i| Op::ALL[i])
}

proptest! {
    // -----------------------------------------------------------------
    // P2: mask correctness
    // -----------------------------------------------------------------
    #[test]
    fn prop_mask_matches_definition(value in any::<u64>(), size in 1usize..=8) {
        let expected = (((1u128 << (8 * size)) - 1) & value as u128) as u64;
        prop_assert_eq!(mask_to_size(value, size), expected);
    }

    // -----------------------------------------------------------------
    // P3: extraction correctness
    // -----------------------------------------------------------------
    #[test]
    fn prop_extract_is_big_endian(
        bytes in proptest::collection::vec(any::<u8>(), 1..64),
        index in 0usize..64,
        size in 1usize..=8
    ) {
        prop_assume!(index < bytes.len());
        let end = (index + size).min(bytes.len());
        let expected = bytes[index..end]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | b as u64);
        prop_assert_eq!(extract_field(&bytes, index, size), expected);
    }

    // -----------------------------------------------------------------
    // P4: arity semantics — fuzzing the ignored operands never changes
    // the result
    // -----------------------------------------------------------------
    #[test]
    fn prop_ignored_operands_are_ignored(
        op in arb_op(),
        a in any::<u64>(),
        b in any::<u64>(),
        c in any::<u64>(),
        b_alt in any::<u64>(),
        c_alt in any::<u64>()
    ) {
        let base = op.apply(a, b, c);
        match op.arity() {
            ArityClass::Unary => {
                prop_assert_eq!(base, op.apply(a, b_alt, c_alt));
            }
            ArityClass::ConstUsing => {
                prop_assert_eq!(base, op.apply(a, b_alt, c));
            }
            ArityClass::Binary => {
                prop_assert_eq!(base, op.apply(a, b, c_alt));
            }
        }
    }

    // -----------------------------------------------------------------
    // P1: the evaluator is a pure function
    // -----------------------------------------------------------------
    #[test]
    fn prop_evaluator_is_pure(
        packets in proptest::collection::vec(
            (proptest::collection::vec(any::<u8>(), 2..10), any::<u64>()),
            1..4
        ),
        perm_seed in proptest::collection::vec(0u8..2, 1..3),
        ops in proptest::collection::vec(arb_op(), 1..4),
        constant in 0u64..256
    ) {
        let dataset = Dataset::new(
            packets
                .into_iter()
                .map(|(bytes, checksum)| Packet::new(bytes, checksum, 1, "p").unwrap())
                .collect(),
        )
        .unwrap();
        // Distinct in-bounds indices.
        let mut perm: Vec<u8> = perm_seed;
        perm.sort_unstable();
        perm.dedup();

        let evaluator = Evaluator::new(&dataset, 1);
        let first = evaluator.evaluate(&perm, &ops, constant);
        for _ in 0..8 {
            prop_assert_eq!(evaluator.evaluate(&perm, &ops, constant), first);
        }

        // The cached evaluator agrees with the inline one.
        let cached = Evaluator::with_cache(&dataset, 1);
        prop_assert_eq!(cached.evaluate(&perm, &ops, constant), first);
    }

    // -----------------------------------------------------------------
    // P5: partitions are pairwise disjoint and their union is the
    // active list
    // -----------------------------------------------------------------
    #[test]
    fn prop_partitions_cover_active_list(
        workers in 1usize..=32,
        n in 1usize..=16,
        max_fields in 1usize..=8,
        max_constants in 1u64..=256,
        tier in 0usize..3
    ) {
        let complexity =
            [Complexity::Basic, Complexity::Intermediate, Complexity::Advanced][tier];
        let active = active_operators(complexity, None);
        let partitions = partition_operators(&active, workers, n, max_fields, max_constants);

        prop_assert_eq!(partitions.len(), workers.min(active.len()));
        let mut all: Vec<Op> = partitions.iter().flat_map(|p| p.ops.clone()).collect();
        prop_assert_eq!(all.len(), active.len());
        all.sort();
        all.dedup();
        prop_assert_eq!(all.len(), active.len());
        for partition in &partitions {
            prop_assert!(!partition.ops.is_empty());
        }
    }

    // -----------------------------------------------------------------
    // P7: sorting is deterministic under input permutation
    // -----------------------------------------------------------------
    #[test]
    fn prop_sort_is_order_insensitive(
        entries in proptest::collection::vec(
            (
                proptest::collection::vec(0u8..8, 1..4),
                proptest::collection::vec(arb_op(), 1..4),
                0u64..16,
            ),
            1..20
        ).prop_shuffle()
    ) {
        let build = |rows: &[(Vec<u8>, Vec<Op>, u64)]| -> Vec<String> {
            let mut set = SolutionSet::new();
            for (fields, ops, constant) in rows {
                set.push(Solution {
                    field_indices: fields.clone(),
                    operations: ops.clone(),
                    constant: *constant,
                    checksum_size: 1,
                    validated: false,
                });
            }
            let dataset =
                Dataset::new(vec![Packet::new(vec![0; 8], 0, 1, "d").unwrap()]).unwrap();
            let evaluator = Evaluator::new(&dataset, 1);
            set.finalize(&evaluator);
            set.as_slice().iter().map(|s| s.to_string()).collect()
        };

        let forward = build(&entries);
        let mut reversed = entries.clone();
        reversed.reverse();
        prop_assert_eq!(forward, build(&reversed));
    }
}
