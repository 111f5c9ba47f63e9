//! Statistics aggregation
//!
//! Folds per-worker snapshots into the single integers the driver asks for.
//! Snapshots are passed in worker creation order; that order defines the
//! 1-based worker identifiers used in responses.
//!
//! # Example
//!
//! ```
//! use adder_pool::stats::StatsSnapshot;
//! use adder_pool::stats::aggregator;
//!
//! let workers = [
//!     StatsSnapshot { sum: 6, count: 2 },
//!     StatsSnapshot { sum: 10, count: 1 },
//!     StatsSnapshot { sum: 0, count: 0 },
//! ];
//!
//! assert_eq!(aggregator::total_sum(&workers), 16);
//! assert_eq!(aggregator::max_sum_index(&workers), 2);
//! assert_eq!(aggregator::total_count(&workers), 3);
//! ```

use crate::stats::StatsSnapshot;

/// Sum of every worker's running sum (wrapping)
pub fn total_sum(workers: &[StatsSnapshot]) -> i32 {
    workers
        .iter()
        .fold(0i32, |acc, s| acc.wrapping_add(s.sum))
}

/// 1-based index of the worker with the largest sum
///
/// Only a strictly larger sum replaces the current leader, so the earliest
/// worker wins ties. An empty pool reports 1, since the leader starts at the
/// first slot and is never replaced.
pub fn max_sum_index(workers: &[StatsSnapshot]) -> i32 {
    let mut leader = 0usize;
    for (i, s) in workers.iter().enumerate().skip(1) {
        if workers[leader].sum < s.sum {
            leader = i;
        }
    }

    (leader as i32).wrapping_add(1)
}

/// Total number of values received across all workers (wrapping)
pub fn total_count(workers: &[StatsSnapshot]) -> i32 {
    workers
        .iter()
        .fold(0u32, |acc, s| acc.wrapping_add(s.count)) as i32
}
