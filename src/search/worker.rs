// Worker pool and search session.
//
// One OS thread per partition plus a monitor thread. Each worker owns a
// disjoint set of starting operators and walks the identical outer
// iteration (subset size → subset → permutation → constant → start op),
// so the union of all workers' enumerations is exactly the full search
// space, with no work stealing and no scheduling-dependent coverage.
//
// Shared state is deliberately coarse: a cancellation atomic, a
// mutex-guarded published-test counter, and the tracker behind its own
// mutex. Workers buffer solutions and test counts locally and publish at
// progress-interval granularity; nothing inside the evaluator synchronizes.

use std::sync::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::config::{ConfigError, SearchConfig};
use crate::dataset::Dataset;
use crate::ops::{Op, active_operators};

use super::combiner::{MAX_SUBSET_SIZE, PermutationIter, SubsetIter};
use super::enumerator::{Continue, enumerate_from};
use super::evaluator::Evaluator;
use super::partition::{Partition, partition_operators, total_estimate};
use super::progress::{ProgressSnapshot, ProgressTracker};
use super::results::{Solution, SolutionSet};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for search setup; the search itself is pure CPU work with no
/// transient failures.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no active operators (empty custom operation list)")]
    NoOperators,
}

// ---------------------------------------------------------------------------
// Observers and outcome
// ---------------------------------------------------------------------------

/// Receives tracker snapshots from the monitor thread. Implementations
/// render; the tracker itself never does I/O.
pub trait ProgressObserver: Sync {
    fn on_update(&self, snapshot: &ProgressSnapshot);
    fn on_finish(&self, _snapshot: &ProgressSnapshot) {}
}

/// Result of one search run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Sorted, deduplicated, re-validated solutions.
    pub solutions: Vec<Solution>,
    /// Evaluator leaves visited, summed over all workers.
    pub tests_performed: u64,
    /// Exact size of the enumerated space (shared with the progress
    /// tracker's estimate).
    pub total_estimate: u128,
    /// True when the enumeration ran to exhaustion.
    pub completed: bool,
    /// True when early exit cut the search short.
    pub early_exit_triggered: bool,
    /// Wall-clock duration of the search.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

struct SharedState {
    /// Cooperative cancellation flag; checked between constants and between
    /// start operators.
    interrupted: AtomicBool,
    /// Set only by the early-exit path, to distinguish it from the
    /// reached-the-estimate shutdown.
    early_exit_triggered: AtomicBool,
    /// Global test counter; workers add their local deltas periodically.
    published_tests: Mutex<u64>,
    /// Solution tally; the monitor reads it relaxed, no ordering needed.
    solution_count: AtomicU64,
    tracker: Mutex<ProgressTracker>,
    /// Monitor shutdown handshake: flag plus a condvar so the monitor wakes
    /// immediately instead of finishing its sleep.
    monitor_stop: Mutex<bool>,
    monitor_wake: Condvar,
}

// ---------------------------------------------------------------------------
// Search entry point
// ---------------------------------------------------------------------------

/// Run the exhaustive search described by `config` over `dataset`.
///
/// With `early_exit` off, the returned solution set is identical for any
/// thread count; with it on, the first discovered solution wins whatever
/// race produced it (every returned solution re-validates either way).
pub fn run_search(
    dataset: &Dataset,
    config: &SearchConfig,
    observer: Option<&dyn ProgressObserver>,
) -> Result<SearchOutcome, SearchError> {
    config.validate()?;

    let active = active_operators(config.complexity, config.custom_operations.as_deref());
    if active.is_empty() {
        return Err(SearchError::NoOperators);
    }

    // Field indices are drawn from the shortest packet, capped at the
    // 16-field bitmask domain; the subset size is additionally capped by the
    // combiner's hard limit. Both clamps are silent by contract.
    let n = dataset.min_packet_len().min(16);
    let max_fields = config.max_fields.min(n).min(MAX_SUBSET_SIZE);

    let worker_request = if config.threads == 0 {
        thread::available_parallelism().map(usize::from).unwrap_or(1)
    } else {
        config.threads
    };
    let partitions = partition_operators(&active, worker_request, n, max_fields, config.max_constants);
    let total = total_estimate(active.len(), n, max_fields, config.max_constants);

    for (index, partition) in partitions.iter().enumerate() {
        debug!(
            "worker {index}: {} start ops, workload {}",
            partition.ops.len(),
            partition.workload
        );
    }

    let evaluator = Evaluator::with_cache(dataset, config.checksum_size);
    let shared = SharedState {
        interrupted: AtomicBool::new(false),
        early_exit_triggered: AtomicBool::new(false),
        published_tests: Mutex::new(0),
        solution_count: AtomicU64::new(0),
        tracker: Mutex::new(ProgressTracker::new(
            total,
            config.progress_interval_ms,
            partitions.len(),
        )),
        monitor_stop: Mutex::new(false),
        monitor_wake: Condvar::new(),
    };

    let started = Instant::now();
    let mut per_worker: Vec<(Vec<Solution>, u64)> = Vec::with_capacity(partitions.len());

    thread::scope(|scope| {
        let monitor = scope.spawn(|| monitor_loop(&shared, total, config.progress_interval_ms, observer));

        let handles: Vec<_> = partitions
            .iter()
            .enumerate()
            .map(|(index, partition)| {
                let shared = &shared;
                let evaluator = &evaluator;
                let active = &active;
                scope.spawn(move || {
                    run_worker(index, partition, active, evaluator, config, n, max_fields, shared)
                })
            })
            .collect();

        for handle in handles {
            // A worker panicking is a bug; propagate it.
            per_worker.push(handle.join().expect("search worker panicked"));
        }

        *shared.monitor_stop.lock().unwrap() = true;
        shared.monitor_wake.notify_all();
        monitor.join().expect("progress monitor panicked");
    });

    let tests_performed: u64 = per_worker.iter().map(|(_, tests)| *tests).sum();
    let early_exit_triggered = shared.early_exit_triggered.load(Ordering::Relaxed);

    // Merge in partition order, then impose the canonical order.
    let mut set = SolutionSet::new();
    for (solutions, _) in per_worker {
        set.merge(solutions);
    }
    set.finalize(&evaluator);
    set.truncate(config.max_solutions);

    // One last tracker update so the final snapshot is exact.
    let final_snapshot = {
        let mut tracker = shared.tracker.lock().unwrap();
        tracker.record(tests_performed, set.len() as u64);
        tracker.snapshot()
    };
    if let Some(observer) = observer {
        observer.on_finish(&final_snapshot);
    }

    Ok(SearchOutcome {
        solutions: set.into_vec(),
        tests_performed,
        total_estimate: total,
        completed: !early_exit_triggered,
        early_exit_triggered,
        elapsed: started.elapsed(),
    })
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
fn run_worker(
    index: usize,
    partition: &Partition,
    active: &[Op],
    evaluator: &Evaluator<'_>,
    config: &SearchConfig,
    n: usize,
    max_fields: usize,
    shared: &SharedState,
) -> (Vec<Solution>, u64) {
    let mut local_solutions: Vec<Solution> = Vec::new();
    let mut local_tests: u64 = 0;
    let mut published: u64 = 0;
    let mut last_publish = Instant::now();
    let publish_interval = Duration::from_millis(config.progress_interval_ms.max(1));
    let checksum_size = config.checksum_size;
    let early_exit = config.early_exit;

    'outer: for subset_size in 1..=max_fields {
        let depth = subset_size + 1;
        for subset in SubsetIter::new(n, subset_size) {
            for perm in PermutationIter::new(&subset) {
                for constant in 0..config.max_constants {
                    for &start_op in &partition.ops {
                        let stopped = enumerate_from(
                            active,
                            evaluator,
                            &perm,
                            depth,
                            start_op,
                            constant,
                            &mut local_tests,
                            &mut |sequence| {
                                local_solutions.push(Solution {
                                    field_indices: perm.clone(),
                                    operations: sequence.to_vec(),
                                    constant,
                                    checksum_size,
                                    validated: false,
                                });
                                shared.solution_count.fetch_add(1, Ordering::Relaxed);
                                if early_exit {
                                    shared.early_exit_triggered.store(true, Ordering::Relaxed);
                                    shared.interrupted.store(true, Ordering::Relaxed);
                                    Continue::Stop
                                } else {
                                    Continue::Yes
                                }
                            },
                        );
                        if stopped || shared.interrupted.load(Ordering::Relaxed) {
                            break 'outer;
                        }
                    }

                    // Between constants: cancellation check and periodic
                    // counter publication.
                    if shared.interrupted.load(Ordering::Relaxed) {
                        break 'outer;
                    }
                    if last_publish.elapsed() >= publish_interval {
                        publish_progress(
                            index,
                            shared,
                            local_tests,
                            &mut published,
                            local_solutions.len() as u64,
                        );
                        last_publish = Instant::now();
                    }
                }
            }
        }
    }

    publish_progress(
        index,
        shared,
        local_tests,
        &mut published,
        local_solutions.len() as u64,
    );
    shared.tracker.lock().unwrap().finish_worker(index);
    (local_solutions, local_tests)
}

fn publish_progress(
    index: usize,
    shared: &SharedState,
    local_tests: u64,
    published: &mut u64,
    solutions_found: u64,
) {
    let delta = local_tests - *published;
    if delta > 0 {
        *shared.published_tests.lock().unwrap() += delta;
        *published = local_tests;
    }
    shared
        .tracker
        .lock()
        .unwrap()
        .record_worker(index, local_tests, solutions_found);
}

// ---------------------------------------------------------------------------
// Monitor loop
// ---------------------------------------------------------------------------

fn monitor_loop(
    shared: &SharedState,
    total: u128,
    progress_interval_ms: u64,
    observer: Option<&dyn ProgressObserver>,
) {
    let interval = Duration::from_millis(progress_interval_ms.clamp(10, 1_000));
    let mut stop = shared.monitor_stop.lock().unwrap();
    loop {
        let (guard, _) = shared
            .monitor_wake
            .wait_timeout(stop, interval)
            .expect("monitor lock poisoned");
        stop = guard;
        if *stop {
            return;
        }

        let completed = *shared.published_tests.lock().unwrap();
        let solutions = shared.solution_count.load(Ordering::Relaxed);

        let snapshot = {
            let mut tracker = shared.tracker.lock().unwrap();
            tracker.record(completed, solutions);
            tracker.should_display().then(|| tracker.snapshot())
        };

        // All published work done: tell any straggler to wind down.
        if completed as u128 >= total {
            shared.interrupted.store(true, Ordering::Relaxed);
        }

        if let (Some(observer), Some(snapshot)) = (observer, snapshot) {
            observer.on_update(&snapshot);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Packet;
    use crate::ops::Complexity;

    fn add_dataset() -> Dataset {
        Dataset::new(vec![
            Packet::new(vec![0x9C, 0x30, 0x01], 0x31, 1, "t1").unwrap(),
            Packet::new(vec![0x9C, 0x30, 0x05], 0x35, 1, "t2").unwrap(),
        ])
        .unwrap()
    }

    fn quick_config() -> SearchConfig {
        SearchConfig {
            complexity: Complexity::Basic,
            max_fields: 2,
            max_constants: 4,
            checksum_size: 1,
            progress_interval_ms: 50,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn finds_the_planted_add_solution() {
        let dataset = add_dataset();
        let outcome = run_search(&dataset, &quick_config(), None).unwrap();
        assert!(outcome.completed);
        assert!(!outcome.early_exit_triggered);
        assert!(outcome.solutions.iter().any(|s| {
            s.field_indices == [1, 2] && s.operations.first() == Some(&Op::Add)
        }));
        for solution in &outcome.solutions {
            assert!(solution.validated);
        }
    }

    #[test]
    fn test_count_matches_estimate_without_early_exit() {
        let dataset = add_dataset();
        let config = quick_config();
        let outcome = run_search(&dataset, &config, None).unwrap();
        assert_eq!(outcome.tests_performed as u128, outcome.total_estimate);
    }

    #[test]
    fn thread_counts_agree() {
        let dataset = add_dataset();
        let mut config = quick_config();
        let mut reference: Option<Vec<String>> = None;
        for threads in [1usize, 2, 4, 8] {
            config.threads = threads;
            let outcome = run_search(&dataset, &config, None).unwrap();
            let rendered: Vec<String> =
                outcome.solutions.iter().map(|s| s.to_string()).collect();
            match &reference {
                None => reference = Some(rendered),
                Some(expected) => assert_eq!(&rendered, expected, "threads={threads}"),
            }
        }
    }

    #[test]
    fn early_exit_returns_one_validated_solution() {
        let dataset = add_dataset();
        let config = SearchConfig {
            early_exit: true,
            max_solutions: 1,
            threads: 4,
            ..quick_config()
        };
        let outcome = run_search(&dataset, &config, None).unwrap();
        assert!(outcome.early_exit_triggered);
        assert!(!outcome.completed);
        assert_eq!(outcome.solutions.len(), 1);
        assert!(outcome.solutions[0].validated);
    }

    #[test]
    fn max_solutions_truncates_the_sorted_set() {
        let dataset = add_dataset();
        let config = SearchConfig {
            max_solutions: 2,
            ..quick_config()
        };
        let full = run_search(&dataset, &quick_config(), None).unwrap();
        let capped = run_search(&dataset, &config, None).unwrap();
        assert!(full.solutions.len() > 2);
        assert_eq!(capped.solutions.len(), 2);
        // The cap keeps the head of the canonical order.
        for (a, b) in capped.solutions.iter().zip(&full.solutions) {
            assert_eq!(a.to_string(), b.to_string());
        }
    }

    #[test]
    fn empty_custom_operations_is_an_error() {
        let dataset = add_dataset();
        let config = SearchConfig {
            custom_operations: Some(Vec::new()),
            ..quick_config()
        };
        assert!(matches!(
            run_search(&dataset, &config, None),
            Err(SearchError::NoOperators)
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_spawning() {
        let dataset = add_dataset();
        let config = SearchConfig {
            checksum_size: 9,
            ..quick_config()
        };
        assert!(matches!(
            run_search(&dataset, &config, None),
            Err(SearchError::Config(_))
        ));
    }

    #[test]
    fn max_fields_clamps_to_packet_len() {
        let dataset = Dataset::new(vec![
            Packet::new(vec![0x05, 0x03], 0x08, 1, "short").unwrap(),
        ])
        .unwrap();
        let config = SearchConfig {
            max_fields: 16,
            ..quick_config()
        };
        // Must not panic or enumerate impossible subsets.
        let outcome = run_search(&dataset, &config, None).unwrap();
        assert!(outcome.solutions.iter().all(|s| s.field_indices.len() <= 2));
    }
}
