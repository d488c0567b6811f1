//! Pluggable concurrency strategy over a uniform list of operations.

use futures::future::BoxFuture;

/// How a list of independent side-effecting operations is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyStrategy {
    /// Strict sequence: each operation starts only after the previous one
    /// succeeded. The first failure stops the sequence; later operations are
    /// never started.
    Sequential,
    /// Fan out and join: all operations run concurrently and all of them
    /// settle before the first failure (in list order) is reported.
    Concurrent,
}

impl ConcurrencyStrategy {
    /// Maps a feature flag decision onto a strategy.
    pub fn from_flag(sequential: bool) -> Self {
        if sequential {
            Self::Sequential
        } else {
            Self::Concurrent
        }
    }
}

/// Drives `operations` with the chosen strategy.
///
/// Rust futures are inert until polled, so the list itself is the uniform
/// "deferred unit of work" representation: nothing starts before this
/// function decides it should. Either way, when this function returns there
/// is no operation still in flight, which is what lets an enclosing trace
/// close safely afterwards.
///
/// Returns the collected outputs in list order, or the first failure.
pub async fn run_all<T, E>(
    strategy: ConcurrencyStrategy,
    operations: Vec<BoxFuture<'_, Result<T, E>>>,
) -> Result<Vec<T>, E> {
    match strategy {
        ConcurrencyStrategy::Sequential => {
            let mut outputs = Vec::with_capacity(operations.len());
            for operation in operations {
                outputs.push(operation.await?);
            }
            Ok(outputs)
        }
        ConcurrencyStrategy::Concurrent => {
            let mut outputs = Vec::with_capacity(operations.len());
            for result in futures::future::join_all(operations).await {
                outputs.push(result?);
            }
            Ok(outputs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn counting_op(
        log: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        outcome: Result<u32, String>,
    ) -> BoxFuture<'static, Result<u32, String>> {
        Box::pin(async move {
            log.lock().unwrap().push(name);
            outcome
        })
    }

    #[tokio::test]
    async fn sequential_runs_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ops = vec![
            counting_op(log.clone(), "first", Ok(1)),
            counting_op(log.clone(), "second", Ok(2)),
        ];

        let outputs = run_all(ConcurrencyStrategy::Sequential, ops).await.unwrap();
        assert_eq!(outputs, vec![1, 2]);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn sequential_stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let ops = vec![
            counting_op(log.clone(), "first", Err("boom".to_string())),
            counting_op(log.clone(), "second", Ok(2)),
        ];

        let error = run_all(ConcurrencyStrategy::Sequential, ops)
            .await
            .unwrap_err();
        assert_eq!(error, "boom");
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn concurrent_settles_everything_before_reporting_failure() {
        let started = Arc::new(AtomicUsize::new(0));
        let ops: Vec<BoxFuture<'_, Result<u32, String>>> = vec![
            {
                let started = started.clone();
                Box::pin(async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    Err("first failure".to_string())
                })
            },
            {
                let started = started.clone();
                Box::pin(async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    Err("second failure".to_string())
                })
            },
        ];

        let error = run_all(ConcurrencyStrategy::Concurrent, ops)
            .await
            .unwrap_err();
        assert_eq!(error, "first failure", "first failure in list order wins");
        assert_eq!(started.load(Ordering::SeqCst), 2, "all operations ran");
    }

    #[tokio::test]
    async fn concurrent_collects_outputs_in_list_order() {
        let ops: Vec<BoxFuture<'_, Result<u32, String>>> = vec![
            Box::pin(async {
                tokio::task::yield_now().await;
                Ok(1)
            }),
            Box::pin(async { Ok(2) }),
        ];

        let outputs = run_all(ConcurrencyStrategy::Concurrent, ops).await.unwrap();
        assert_eq!(outputs, vec![1, 2]);
    }

    #[test]
    fn flag_selects_strategy() {
        assert_eq!(
            ConcurrencyStrategy::from_flag(true),
            ConcurrencyStrategy::Sequential
        );
        assert_eq!(
            ConcurrencyStrategy::from_flag(false),
            ConcurrencyStrategy::Concurrent
        );
    }
}
