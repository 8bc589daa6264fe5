//! Bounded concurrent fan-out for batch analysis.
//!
//! Batch requests used to be unbounded; a semaphore caps how many items are
//! in flight at once so a large batch cannot flood the inference endpoint
//! or the pool.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Run `f` over every item with at most `limit` items in flight. Results
/// come back in input order; a panicking task drops only its own slot.
pub async fn map_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, f: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(usize, T) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut set = JoinSet::new();
    let total = items.len();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let f = f.clone();
        set.spawn(async move {
            // Never closed: a clone of the semaphore lives in every task.
            let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
            (index, f(index, item).await)
        });
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        if let Ok((index, result)) = joined {
            slots[index] = Some(result);
        }
    }
    slots.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn results_preserve_input_order() {
        let items: Vec<u64> = (0..8).collect();
        let results = map_bounded(items, 3, |_, n| async move {
            // later items finish first
            sleep(Duration::from_millis(40 - n * 5)).await;
            n * 2
        })
        .await;
        assert_eq!(results, vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[tokio::test]
    async fn concurrency_never_exceeds_limit() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let in_flight2 = in_flight.clone();
        let peak2 = peak.clone();
        let results = map_bounded((0..20).collect::<Vec<u32>>(), 3, move |_, n| {
            let in_flight = in_flight2.clone();
            let peak = peak2.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                n
            }
        })
        .await;

        assert_eq!(results.len(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3, "peak was {}", peak.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn per_item_failures_are_isolated() {
        let results = map_bounded(vec![1u32, 0, 3], 2, |_, n| async move {
            if n == 0 {
                Err("zero".to_string())
            } else {
                Ok(n * 10)
            }
        })
        .await;

        assert_eq!(results[0], Ok(10));
        assert_eq!(results[1], Err("zero".to_string()));
        assert_eq!(results[2], Ok(30));
    }

    #[tokio::test]
    async fn zero_limit_is_treated_as_one() {
        let results = map_bounded(vec![1u32, 2], 0, |_, n| async move { n }).await;
        assert_eq!(results, vec![1, 2]);
    }
}
