//! Bounded-concurrency, rate-limited batch dispatch
//!
//! [`process_batches`] partitions an ordered input into provider-sized
//! chunks and fans them out to an async worker through a fixed-size worker
//! pool. Chunks race, but each writes to its own slot, so the flattened
//! output always matches input order.
//!
//! A worker error propagates and aborts remaining scheduled chunks; callers
//! that want partial-failure semantics catch inside their worker and emit
//! per-item failed results instead.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::try_join_all;

use crate::error::{Error, Result};

/// Concurrency and pacing knobs for [`process_batches`].
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Maximum chunks in flight at once.
    pub concurrency: usize,

    /// Aggregate dispatch ceiling in requests per second; `0` disables
    /// pacing.
    pub rate_limit: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        // Conservative defaults sized for typical provider throughput caps.
        Self {
            concurrency: 5,
            rate_limit: 10,
        }
    }
}

/// Partition `items` into contiguous chunks of at most `size` elements,
/// preserving order.
///
/// # Errors
///
/// Returns [`Error::InvalidChunkSize`] when `size` is zero.
pub fn chunk<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(Error::InvalidChunkSize);
    }
    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}

/// Dispatch `items` to `worker` in chunks of `chunk_size`, at most
/// `options.concurrency` chunks in flight, pacing dispatch to stay under
/// `options.rate_limit` requests per second system-wide.
///
/// The worker receives one owned chunk per call and must return one result
/// per chunk element, in order. The flattened return value has exactly
/// `items.len()` entries in input order regardless of chunk completion
/// order. Empty input returns an empty vector without invoking the worker.
///
/// # Errors
///
/// Returns [`Error::InvalidChunkSize`] for a zero `chunk_size`, or the
/// first worker error, cancelling chunks that have not yet dispatched.
pub async fn process_batches<T, R, F, Fut>(
    items: &[T],
    chunk_size: usize,
    options: &BatchOptions,
    worker: F,
) -> Result<Vec<R>>
where
    T: Clone + Send + Sync,
    R: Send,
    F: Fn(Vec<T>) -> Fut + Sync,
    Fut: Future<Output = Result<Vec<R>>> + Send,
{
    let chunks = chunk(items, chunk_size)?;
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let total = chunks.len();
    let pool_size = options.concurrency.max(1).min(total);
    let interval_ms = if options.rate_limit > 0 {
        1000u64.div_ceil(u64::from(options.rate_limit))
    } else {
        0
    };

    // Workers pull chunk indices from a shared counter; the pool size alone
    // bounds in-flight dispatches.
    let next_index = AtomicUsize::new(0);
    let chunks = &chunks;
    let worker = &worker;
    let next_index = &next_index;

    let pool = (0..pool_size).map(|_| async move {
        let mut completed = Vec::new();
        loop {
            let index = next_index.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }

            // Stagger by pool slot so the aggregate rate across concurrent
            // workers stays within the configured ceiling.
            if interval_ms > 0 && index > 0 {
                let stagger = interval_ms * (index % pool_size) as u64;
                if stagger > 0 {
                    tokio::time::sleep(Duration::from_millis(stagger)).await;
                }
            }

            let results = worker(chunks[index].clone()).await?;
            completed.push((index, results));
        }
        Ok::<_, Error>(completed)
    });

    let per_worker = try_join_all(pool).await?;

    // Fixed slots indexed by chunk position, flattened in order.
    let mut slots: Vec<Option<Vec<R>>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, results) in per_worker.into_iter().flatten() {
        slots[index] = Some(results);
    }

    let mut flattened = Vec::with_capacity(items.len());
    for slot in slots {
        if let Some(results) = slot {
            flattened.extend(results);
        }
    }
    Ok(flattened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn chunk_splits_with_remainder() {
        let chunks = chunk(&[1, 2, 3, 4, 5, 6, 7], 3).unwrap();
        assert_eq!(chunks, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
    }

    #[test]
    fn chunk_smaller_than_size_is_single() {
        let chunks = chunk(&[1, 2], 5).unwrap();
        assert_eq!(chunks, vec![vec![1, 2]]);
    }

    #[test]
    fn chunk_empty_input() {
        let chunks = chunk::<i32>(&[], 5).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn chunk_zero_size_rejected() {
        assert!(matches!(
            chunk(&[1, 2, 3], 0),
            Err(Error::InvalidChunkSize)
        ));
    }

    #[tokio::test]
    async fn empty_input_skips_worker() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_worker = Arc::clone(&calls);

        let results: Vec<i32> = process_batches(&[], 3, &BatchOptions::default(), |batch| {
            calls_in_worker.fetch_add(1, Ordering::Relaxed);
            async move { Ok(batch) }
        })
        .await
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn processes_all_items_in_order() {
        let items: Vec<i32> = (1..=5).collect();
        let results = process_batches(&items, 2, &BatchOptions::default(), |batch| async move {
            Ok(batch.into_iter().map(|n| n * 2).collect())
        })
        .await
        .unwrap();

        assert_eq!(results, vec![2, 4, 6, 8, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn order_survives_shuffled_completion_latency() {
        let items: Vec<u64> = (0..100).collect();
        let options = BatchOptions {
            concurrency: 4,
            rate_limit: 0,
        };

        // Derive a deliberately non-monotonic delay from the chunk contents
        // so later chunks often finish before earlier ones.
        let results = process_batches(&items, 7, &options, |batch| async move {
            let delay = (batch[0] * 37) % 50;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(batch)
        })
        .await
        .unwrap();

        assert_eq!(results, items);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_never_exceeds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let items: Vec<u64> = (0..40).collect();
        let options = BatchOptions {
            concurrency: 3,
            rate_limit: 0,
        };

        let in_flight_ref = Arc::clone(&in_flight);
        let peak_ref = Arc::clone(&peak);
        let results = process_batches(&items, 2, &options, move |batch| {
            let in_flight = Arc::clone(&in_flight_ref);
            let peak = Arc::clone(&peak_ref);
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(batch)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn worker_error_propagates() {
        let items: Vec<i32> = (0..10).collect();
        let options = BatchOptions {
            concurrency: 2,
            rate_limit: 0,
        };

        let result = process_batches(&items, 2, &options, |batch| async move {
            if batch.contains(&4) {
                return Err(Error::Transport("connection reset".into()));
            }
            Ok(batch)
        })
        .await;

        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
