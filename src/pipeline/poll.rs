//! Task polling: drive an asynchronous protection task to a terminal state.
//!
//! ## Policy
//!
//! A fixed [`PollPolicy::interval`] separates consecutive status checks and
//! at most [`PollPolicy::max_attempts`] checks are made. With the defaults
//! (1.5 s, 15 checks) a task gets about 21 s. The loop ends on the first of:
//!
//! * `Succeeded` → the result document handle
//! * `Failed`    → [`MemoError::TaskFailed`], without further checks
//! * attempts exhausted → [`MemoError::PollingTimeout`]
//! * a failing status request → that error, unchanged
//!
//! No wait happens before the first check or after the last one, so N checks
//! cost N-1 waits.
//!
//! ## Waiting
//!
//! The wait goes through the [`Waiter`] trait. [`TokioWaiter`] suspends only
//! the current task (`tokio::time::sleep`), so concurrent pipelines poll
//! independently; tests inject waiters that record the requested delays
//! instead of sleeping.

use crate::client::{DocumentHandle, TaskHandle, TaskReport, TaskStatus};
use crate::config::ServiceConfig;
use crate::error::{MemoError, Stage};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Interval and attempt cap for status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1500),
            max_attempts: 15,
        }
    }
}

impl From<&ServiceConfig> for PollPolicy {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            interval: config.poll_interval,
            max_attempts: config.poll_max_attempts.max(1),
        }
    }
}

/// Suspends the current poll loop between two status checks.
#[async_trait]
pub trait Waiter: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// [`Waiter`] backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioWaiter;

#[async_trait]
impl Waiter for TokioWaiter {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Stateful poll loop for one task.
pub struct Poller {
    policy: PollPolicy,
    waiter: Arc<dyn Waiter>,
    attempts: u32,
}

impl Poller {
    pub fn new(policy: PollPolicy, waiter: Arc<dyn Waiter>) -> Self {
        Self {
            policy,
            waiter,
            attempts: 0,
        }
    }

    /// Status checks performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Call `check` until the task reaches a terminal state or the attempt
    /// cap is hit.
    ///
    /// `check` receives the 1-based attempt number.
    pub async fn run<F, Fut>(
        &mut self,
        task: &TaskHandle,
        mut check: F,
    ) -> Result<DocumentHandle, MemoError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<TaskReport, MemoError>>,
    {
        let started = Instant::now();

        loop {
            self.attempts += 1;
            let attempt = self.attempts;
            let report = check(attempt).await?;
            debug!(
                "Task {}: check {}/{} → {:?} ('{}')",
                task, attempt, self.policy.max_attempts, report.status, report.raw_status
            );

            match report.status {
                TaskStatus::Succeeded => {
                    info!("Task {} succeeded after {} checks", task, attempt);
                    return report.result.ok_or_else(|| {
                        MemoError::malformed(
                            Stage::Polling,
                            "task succeeded without a result document",
                            report.raw_status.as_bytes(),
                        )
                    });
                }
                TaskStatus::Failed => {
                    let detail = report
                        .detail
                        .unwrap_or_else(|| format!("service reported '{}'", report.raw_status));
                    warn!("Task {} failed: {}", task, detail);
                    return Err(MemoError::TaskFailed {
                        task_id: task.to_string(),
                        detail,
                    });
                }
                TaskStatus::Pending | TaskStatus::Running | TaskStatus::Unknown => {}
            }

            if attempt >= self.policy.max_attempts {
                let elapsed = started.elapsed();
                warn!(
                    "Task {}: no terminal status after {} checks ({}ms)",
                    task,
                    attempt,
                    elapsed.as_millis()
                );
                return Err(MemoError::PollingTimeout {
                    task_id: task.to_string(),
                    attempts: attempt,
                    elapsed,
                });
            }

            self.waiter.wait(self.policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWaiter {
        waits: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Waiter for RecordingWaiter {
        async fn wait(&self, duration: Duration) {
            self.waits.lock().unwrap().push(duration);
        }
    }

    fn report(status: TaskStatus, raw: &str, result: Option<&str>) -> TaskReport {
        TaskReport {
            status,
            raw_status: raw.to_string(),
            result: result.map(DocumentHandle::new),
            detail: None,
        }
    }

    fn policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1500),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn succeeds_after_pending_checks() {
        let waiter = Arc::new(RecordingWaiter::default());
        let mut poller = Poller::new(policy(15), waiter.clone());
        let task = TaskHandle::new("task1");

        let result = poller
            .run(&task, |attempt| async move {
                Ok(if attempt < 4 {
                    report(TaskStatus::Pending, "pending", None)
                } else {
                    report(TaskStatus::Succeeded, "success", Some("doc2"))
                })
            })
            .await
            .unwrap();

        assert_eq!(result.as_str(), "doc2");
        assert_eq!(poller.attempts(), 4);
        assert_eq!(
            *waiter.waits.lock().unwrap(),
            vec![Duration::from_millis(1500); 3]
        );
    }

    #[tokio::test]
    async fn exhausting_attempts_is_a_timeout_not_a_failure() {
        let waiter = Arc::new(RecordingWaiter::default());
        let mut poller = Poller::new(policy(5), waiter.clone());
        let task = TaskHandle::new("slow");

        let err = poller
            .run(&task, |_| async {
                Ok(report(TaskStatus::Running, "processing", None))
            })
            .await
            .unwrap_err();

        assert!(
            matches!(err, MemoError::PollingTimeout { attempts: 5, .. }),
            "got: {err:?}"
        );
        assert_eq!(waiter.waits.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failure_stops_polling_immediately() {
        let waiter = Arc::new(RecordingWaiter::default());
        let mut poller = Poller::new(policy(15), waiter.clone());
        let task = TaskHandle::new("bad");

        let err = poller
            .run(&task, |attempt| async move {
                Ok(if attempt == 1 {
                    report(TaskStatus::Pending, "pending", None)
                } else {
                    TaskReport {
                        detail: Some("encrypted input".into()),
                        ..report(TaskStatus::Failed, "error", None)
                    }
                })
            })
            .await
            .unwrap_err();

        match err {
            MemoError::TaskFailed { task_id, detail } => {
                assert_eq!(task_id, "bad");
                assert_eq!(detail, "encrypted input");
            }
            other => panic!("expected TaskFailed, got {other:?}"),
        }
        assert_eq!(poller.attempts(), 2);
    }

    #[tokio::test]
    async fn unknown_statuses_keep_polling() {
        let waiter = Arc::new(RecordingWaiter::default());
        let mut poller = Poller::new(policy(3), waiter);
        let task = TaskHandle::new("t");

        let result = poller
            .run(&task, |attempt| async move {
                Ok(match attempt {
                    1 => report(TaskStatus::Unknown, "warming_up", None),
                    _ => report(TaskStatus::Succeeded, "done", Some("r")),
                })
            })
            .await;
        assert!(result.is_ok());
        assert_eq!(poller.attempts(), 2);
    }

    #[tokio::test]
    async fn status_request_errors_propagate_unchanged() {
        let mut poller = Poller::new(policy(15), Arc::new(RecordingWaiter::default()));
        let task = TaskHandle::new("t");
        let err = poller
            .run(&task, |_| async {
                Err(MemoError::http_failure(Stage::Polling, 502, b"bad gateway"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MemoError::StatusCheckFailed { status: 502, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_waiter_reports_elapsed_time() {
        let mut poller = Poller::new(policy(3), Arc::new(TokioWaiter));
        let task = TaskHandle::new("t");
        let err = poller
            .run(&task, |_| async {
                Ok(report(TaskStatus::Pending, "pending", None))
            })
            .await
            .unwrap_err();
        match err {
            MemoError::PollingTimeout { elapsed, .. } => {
                assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}")
            }
            other => panic!("expected PollingTimeout, got {other:?}"),
        }
    }
}
