//! Chunked bulk writes
//!
//! Items are processed in fixed-size chunks. Within a chunk every item runs on
//! its own scoped thread with its own pooled connection; chunks run one after
//! another. A failed item is recorded and never stops the rest.

use serde::Serialize;

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Done,
    /// Nothing to do (already present, no matching rows)
    Skipped,
}

/// Counts for a bulk run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl BulkOutcome {
    fn record(&mut self, result: Result<Applied, String>) {
        match result {
            Ok(Applied::Done) => self.succeeded += 1,
            Ok(Applied::Skipped) => self.skipped += 1,
            Err(e) => {
                self.failed += 1;
                self.errors.push(e);
            }
        }
    }
}

/// Progress after a chunk finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkProgress {
    pub completed: usize,
    pub total: usize,
}

/// Run `op` over `items` in chunks of `chunk_size`, reporting progress after each chunk
pub fn run_chunked<T, F, P>(items: &[T], chunk_size: usize, op: F, mut progress: P) -> BulkOutcome
where
    T: Sync,
    F: Fn(&T) -> Result<Applied, String> + Sync,
    P: FnMut(ChunkProgress),
{
    let chunk_size = chunk_size.max(1);
    let total = items.len();
    let mut outcome = BulkOutcome::default();
    let mut completed = 0;

    for chunk in items.chunks(chunk_size) {
        let op = &op;
        let results: Vec<Result<Applied, String>> = std::thread::scope(|s| {
            let handles: Vec<_> = chunk.iter().map(|item| s.spawn(move || op(item))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|_| Err("worker thread panicked".to_string())))
                .collect()
        });

        for result in results {
            if let Err(ref e) = result {
                tracing::warn!("Bulk item failed: {}", e);
            }
            outcome.record(result);
        }

        completed += chunk.len();
        progress(ChunkProgress { completed, total });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_progress() {
        let items: Vec<i32> = (1..=25).collect();
        let mut seen = Vec::new();
        let outcome = run_chunked(
            &items,
            10,
            |n| match n % 5 {
                0 => Err(format!("item {} failed", n)),
                1 => Ok(Applied::Skipped),
                _ => Ok(Applied::Done),
            },
            |p| seen.push(p),
        );

        assert_eq!(outcome.failed, 5);
        assert_eq!(outcome.skipped, 5);
        assert_eq!(outcome.succeeded, 15);
        assert_eq!(outcome.errors.len(), 5);
        assert_eq!(
            seen,
            vec![
                ChunkProgress { completed: 10, total: 25 },
                ChunkProgress { completed: 20, total: 25 },
                ChunkProgress { completed: 25, total: 25 },
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<i32> = Vec::new();
        let mut calls = 0;
        let outcome = run_chunked(&items, 10, |_| Ok(Applied::Done), |_| calls += 1);
        assert_eq!(outcome, BulkOutcome::default());
        assert_eq!(calls, 0);
    }
}
