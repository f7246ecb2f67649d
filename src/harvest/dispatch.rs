//! Parallel dispatch of independent operations
//!
//! Each input runs as its own tokio task with its own orchestrator, so one
//! operation's failures never perturb another's. The number of inputs is
//! bounded up front; excess inputs are rejected, not queued.

use crate::config::DispatchConfig;
use crate::{QueryError, QueryResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a dispatched task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    TimedOut,
    Cancelled,
    /// The task panicked
    Failed(String),
}

/// Bounds applied to one dispatch
#[derive(Debug, Clone)]
pub struct DispatchLimits {
    pub max_parallel: usize,
    pub task_timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl DispatchLimits {
    /// Host parallelism, further capped by the configured maximum
    pub fn from_config(config: &DispatchConfig) -> Self {
        let host = host_parallelism();
        Self {
            max_parallel: config.max_parallel.map_or(host, |max| max.min(host)).max(1),
            task_timeout: config.task_timeout_secs.map(Duration::from_secs),
            cancel: CancellationToken::new(),
        }
    }
}

/// Number of operations the host can run in parallel
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Runs `task` once per input, concurrently, and returns outcomes in input order
///
/// # Errors
///
/// Returns `QueryError::TooManyQueries` when there are more inputs than
/// `limits.max_parallel`; nothing is spawned in that case.
pub async fn dispatch<I, T, F, Fut>(
    inputs: Vec<I>,
    limits: &DispatchLimits,
    task: F,
) -> QueryResult<Vec<TaskOutcome<T>>>
where
    F: Fn(usize, I) -> Fut,
    Fut: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    if inputs.len() > limits.max_parallel {
        return Err(QueryError::TooManyQueries {
            requested: inputs.len(),
            limit: limits.max_parallel,
        });
    }

    tracing::debug!("Dispatching {} operations", inputs.len());

    let handles: Vec<_> = inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let operation = task(index, input);
            let cancel = limits.cancel.clone();
            let timeout = limits.task_timeout;

            tokio::spawn(async move {
                let bounded = async move {
                    match timeout {
                        Some(limit) => tokio::time::timeout(limit, operation).await.ok(),
                        None => Some(operation.await),
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => TaskOutcome::Cancelled,
                    finished = bounded => match finished {
                        Some(value) => TaskOutcome::Completed(value),
                        None => TaskOutcome::TimedOut,
                    },
                }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Operation {} failed: {}", index, e);
                TaskOutcome::Failed(e.to_string())
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(max_parallel: usize) -> DispatchLimits {
        DispatchLimits {
            max_parallel,
            task_timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_results_in_input_order() {
        let outcomes = dispatch(vec![30u64, 10, 20], &limits(3), |index, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            (index, delay)
        })
        .await
        .unwrap();

        assert_eq!(
            outcomes,
            vec![
                TaskOutcome::Completed((0, 30)),
                TaskOutcome::Completed((1, 10)),
                TaskOutcome::Completed((2, 20)),
            ]
        );
    }

    #[tokio::test]
    async fn test_too_many_inputs_rejected() {
        let result = dispatch(vec![1, 2, 3], &limits(2), |_, n| async move { n }).await;
        assert_eq!(
            result,
            Err(QueryError::TooManyQueries {
                requested: 3,
                limit: 2,
            })
        );
    }

    #[tokio::test]
    async fn test_timeout_isolates_runaway_task() {
        let mut limits = limits(2);
        limits.task_timeout = Some(Duration::from_millis(50));

        let outcomes = dispatch(vec![0u64, 10_000], &limits, |_, delay| async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay
        })
        .await
        .unwrap();

        assert_eq!(outcomes, vec![TaskOutcome::Completed(0), TaskOutcome::TimedOut]);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_tasks() {
        let limits = limits(1);
        limits.cancel.cancel();

        let outcomes = dispatch(vec![()], &limits, |_, _| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        })
        .await
        .unwrap();

        assert_eq!(outcomes, vec![TaskOutcome::Cancelled]);
    }

    #[test]
    fn test_limits_capped_by_host() {
        let limits = DispatchLimits::from_config(&DispatchConfig {
            max_parallel: Some(usize::MAX),
            task_timeout_secs: Some(60),
        });
        assert_eq!(limits.max_parallel, host_parallelism());
        assert_eq!(limits.task_timeout, Some(Duration::from_secs(60)));
    }
}
