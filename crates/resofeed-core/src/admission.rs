//! Interval-capped admission queue gating outgoing feed calls.
//!
//! Concurrency is fixed at one in-flight task; rate budget refills over a
//! fixed interval up to the configured cap, with unused capacity carried
//! over across window boundaries (governor burst capacity). `pause` and
//! `start` suspend and resume admission without discarding queued work —
//! the bracket the auth hook uses to keep credential refresh exclusive
//! with respect to this queue's own admissions.

use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use tokio::sync::{watch, Mutex};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Admission window configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionConfig {
    /// Refill window.
    pub duration: Duration,
    /// Tasks admitted per window.
    pub points: u32,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(60),
            points: 100,
        }
    }
}

/// Concurrency-1, interval-capped task gate.
#[derive(Clone)]
pub struct AdmissionQueue {
    limiter: Arc<DirectRateLimiter>,
    gate: Arc<Mutex<()>>,
    paused: Arc<watch::Sender<bool>>,
}

impl AdmissionQueue {
    pub fn new(config: AdmissionConfig) -> Self {
        let quota = quota_from_window(config.duration, config.points);
        let (paused, _) = watch::channel(false);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            gate: Arc::new(Mutex::new(())),
            paused: Arc::new(paused),
        }
    }

    /// Enqueues a task, resolving with its output once it has been admitted
    /// and run. Admission takes the single concurrency slot, then waits for
    /// the unpaused state and rate budget — so a pause landing while a task
    /// still queues for the slot is honored once the slot frees. Task errors
    /// are never caught here.
    pub async fn add<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.gate.lock().await;
        self.wait_until_started().await;
        self.limiter.until_ready().await;
        task().await
    }

    /// Suspends admission. Queued work is retained; a task already past
    /// admission is unaffected.
    pub fn pause(&self) {
        let _ = self.paused.send(true);
        tracing::debug!("admission queue paused");
    }

    /// Resumes admission of queued work.
    pub fn start(&self) {
        let _ = self.paused.send(false);
        tracing::debug!("admission queue started");
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.subscribe().borrow()
    }

    async fn wait_until_started(&self) {
        let mut paused = self.paused.subscribe();
        while *paused.borrow_and_update() {
            if paused.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Spreads the window across its points, allowing the full cap as burst so
/// unused capacity carries over between windows.
fn quota_from_window(duration: Duration, points: u32) -> Quota {
    let safe_points = points.max(1);
    let burst = NonZeroU32::new(safe_points).expect("points are clamped to at least one");

    let seconds_per_cell = (duration.as_secs_f64() / f64::from(safe_points)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_one_minute_hundred_points() {
        let config = AdmissionConfig::default();
        assert_eq!(config.duration, Duration::from_secs(60));
        assert_eq!(config.points, 100);
    }

    #[tokio::test]
    async fn add_runs_the_task_and_returns_its_output() {
        let queue = AdmissionQueue::new(AdmissionConfig::default());
        let value = queue.add(|| async { 21 * 2 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn paused_queue_holds_work_until_started() {
        let queue = AdmissionQueue::new(AdmissionConfig::default());
        queue.pause();
        assert!(queue.is_paused());

        let gated = queue.clone();
        let handle = tokio::spawn(async move { gated.add(|| async { 7 }).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_finished(), "paused queue must not admit work");

        queue.start();
        assert_eq!(handle.await.expect("task should finish"), 7);
        assert!(!queue.is_paused());
    }

    #[tokio::test]
    async fn pause_landing_while_work_queues_for_the_slot_still_holds_it() {
        let queue = AdmissionQueue::new(AdmissionConfig::default());

        let (entered_tx, entered_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .add(|| async {
                        let _ = entered_tx.send(());
                        let _ = release_rx.await;
                    })
                    .await
            })
        };
        entered_rx.await.expect("first task should start");

        let second = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.add(|| async { 9 }).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Pause lands while the second task is still queued for the slot.
        queue.pause();
        let _ = release_tx.send(());
        first.await.expect("first task should finish");

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(
            !second.is_finished(),
            "pause must hold queued work even after the slot frees"
        );

        queue.start();
        assert_eq!(second.await.expect("second task should finish"), 9);
    }

    #[tokio::test]
    async fn exhausted_budget_delays_admission() {
        let queue = AdmissionQueue::new(AdmissionConfig {
            duration: Duration::from_secs(60),
            points: 1,
        });

        queue.add(|| async {}).await;

        let waited = tokio::time::timeout(
            Duration::from_millis(50),
            queue.add(|| async {}),
        )
        .await;
        assert!(
            waited.is_err(),
            "second admission within the window must wait for budget"
        );
    }

    #[tokio::test]
    async fn tasks_are_admitted_one_at_a_time() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let queue = AdmissionQueue::new(AdmissionConfig::default());
        let running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let queue = queue.clone();
            let running = running.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .add(|| async {
                        let live = running.fetch_add(1, Ordering::SeqCst) + 1;
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        live
                    })
                    .await
            }));
        }

        for handle in handles {
            let observed = handle.await.expect("task should finish");
            assert_eq!(observed, 1, "no two tasks may run concurrently");
        }
    }
}
