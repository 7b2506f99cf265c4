// The search engine: exhaustive enumeration of checksum expressions over
// (field subset × permutation × operator sequence × constant), partitioned
// across worker threads by starting operator.
//
// # Modules
//
// - `combiner`   — field subsets and permutations, in deterministic order
// - `evaluator`  — candidate evaluation against the dataset (+ field cache)
// - `enumerator` — depth-first operator-sequence generation
// - `partition`  — workload-balanced starting-operator partitions
// - `worker`     — the worker pool, monitor thread, and `run_search`
// - `results`    — solutions, canonical ordering, re-validation
// - `progress`   — counters, smoothed rate/ETA, renderer snapshots

pub mod combiner;
pub mod enumerator;
pub mod evaluator;
pub mod partition;
pub mod progress;
pub mod results;
pub mod worker;

// Re-export key types for convenience.
pub use evaluator::{Evaluator, FieldCache, extract_field, mask_to_size};
pub use partition::{Partition, partition_operators, total_estimate};
pub use progress::{ProgressSnapshot, ProgressTracker, WorkerSnapshot};
pub use results::{Solution, SolutionSet};
pub use worker::{ProgressObserver, SearchError, SearchOutcome, run_search};
