// Recursive sequence enumerator: every operator sequence of a fixed depth
// beginning with a required starting operator.
//
// The depth is always `perm_len + 1` so that a trailing unary or
// const-using operator can run after the binary operators have consumed
// every field. Partitioning hands each worker a disjoint set of starting
// operators; the enumerator explores the `|active|^(depth-1)` completions
// under one of them.

use crate::ops::Op;

use super::evaluator::Evaluator;

/// What the solution callback tells the enumerator to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    /// Keep enumerating.
    Yes,
    /// Unwind immediately (early exit).
    Stop,
}

/// Enumerate every sequence `[start_op, x_1, .., x_{depth-1}]` with each
/// `x_i` drawn from `active`, evaluating each against the dataset.
///
/// `tests` is bumped once per evaluated sequence (the leaf count). The
/// callback receives each matching sequence; returning [`Continue::Stop`]
/// unwinds the whole enumeration. Returns `true` when stopped early.
pub fn enumerate_from(
    active: &[Op],
    evaluator: &Evaluator<'_>,
    perm: &[u8],
    depth: usize,
    start_op: Op,
    constant: u64,
    tests: &mut u64,
    on_match: &mut dyn FnMut(&[Op]) -> Continue,
) -> bool {
    debug_assert!(depth >= 1);
    let mut sequence = Vec::with_capacity(depth);
    sequence.push(start_op);
    fill_remaining(active, evaluator, perm, depth, constant, &mut sequence, tests, on_match)
}

fn fill_remaining(
    active: &[Op],
    evaluator: &Evaluator<'_>,
    perm: &[u8],
    depth: usize,
    constant: u64,
    sequence: &mut Vec<Op>,
    tests: &mut u64,
    on_match: &mut dyn FnMut(&[Op]) -> Continue,
) -> bool {
    if sequence.len() == depth {
        *tests += 1;
        if evaluator.evaluate(perm, sequence, constant)
            && on_match(sequence) == Continue::Stop
        {
            return true;
        }
        return false;
    }
    for &op in active {
        sequence.push(op);
        let stopped =
            fill_remaining(active, evaluator, perm, depth, constant, sequence, tests, on_match);
        sequence.pop();
        if stopped {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
