//! Adaptive worker pool control loop
//!
//! Every `update_period` the foreman reads the queue backlog, floors it at
//! `optimal_work_estimate`, smooths it over the last six readings and sizes
//! the pool to `floor(ln(sma)^2.5)` bounded by `[min_workers, max_workers]`.
//! Workers are recruited directly; they are retired by queueing `Quit`
//! commands, which the dispatcher hands to whichever worker is available.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::ForemanConfig;
use crate::consumer::load::{LoadHistory, compute_target, floor_estimate};
use crate::consumer::registry::{ForemanCommand, dispatch_commands};
use crate::consumer::site::Site;
use crate::consumer::worker::Worker;
use crate::queue::QueueError;

/// What one sizing cycle observed and did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CycleReport {
    /// Raw backlog, `None` when it could not be read
    pub estimate: Option<i64>,
    pub floored: i64,
    pub sma: f64,
    pub target: i64,
    pub recruited: i64,
    pub retired: i64,
}

pub struct Foreman {
    site: Arc<Site>,
    config: ForemanConfig,
    history: LoadHistory,
    commands: mpsc::Sender<ForemanCommand>,
    pending_commands: Option<mpsc::Receiver<ForemanCommand>>,
    dispatcher: Option<JoinHandle<()>>,
    workers: JoinSet<()>,
}

impl Foreman {
    pub fn new(site: Arc<Site>, config: ForemanConfig) -> Self {
        let capacity = usize::try_from(config.max_workers.max(1)).unwrap_or(1);
        let (commands, receiver) = mpsc::channel(capacity);

        Self {
            site,
            config,
            history: LoadHistory::default(),
            commands,
            pending_commands: Some(receiver),
            dispatcher: None,
            workers: JoinSet::new(),
        }
    }

    pub fn site(&self) -> &Arc<Site> {
        &self.site
    }

    pub fn history(&self) -> &LoadHistory {
        &self.history
    }

    /// Starts the dispatcher, seeds the load history with a real reading and
    /// recruits `min_workers`.
    ///
    /// # Errors
    ///
    /// Returns the queue error when the first backlog reading fails.
    pub async fn init(&mut self) -> Result<(), QueueError> {
        if let Some(receiver) = self.pending_commands.take() {
            let registry = Arc::clone(&self.site.registry);
            self.dispatcher = Some(tokio::spawn(dispatch_commands(registry, receiver)));
        }

        let estimate = self.site.queue.backlog().await?;
        let floored = floor_estimate(Some(estimate), self.config.optimal_work_estimate);
        self.history.fill(floored);

        for _ in 0..self.config.min_workers {
            self.recruit();
        }

        tracing::info!(
            queue = self.site.queue.name(),
            backlog = estimate,
            workers = self.site.registry.live_count(),
            min_workers = self.config.min_workers,
            max_workers = self.config.max_workers,
            "Foreman initialized"
        );
        Ok(())
    }

    /// Sizes the pool once against the current backlog
    pub async fn cycle(&mut self) -> CycleReport {
        self.reap();

        let estimate = match self.site.queue.backlog().await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                tracing::warn!(
                    queue = self.site.queue.name(),
                    error = %e,
                    "Failed to estimate load"
                );
                None
            }
        };
        let floored = floor_estimate(estimate, self.config.optimal_work_estimate);
        self.history.push(floored);
        let sma = self.history.sma();
        let target = compute_target(sma, self.config.min_workers, self.config.max_workers);

        let (recruited, retired) = self.reconcile(target);
        tracing::debug!(
            ?estimate,
            floored,
            sma,
            target,
            recruited,
            retired,
            workers = self.site.registry.live_count(),
            "Sizing cycle complete"
        );

        CycleReport {
            estimate,
            floored,
            sma,
            target,
            recruited,
            retired,
        }
    }

    fn reconcile(&mut self, target: i64) -> (i64, i64) {
        let registry = Arc::clone(&self.site.registry);
        let current = registry.effective_count();
        let (mut recruited, mut retired) = (0, 0);

        if target > current {
            for _ in 0..target - current {
                if registry.live_count() >= self.config.max_workers {
                    tracing::warn!(
                        target,
                        workers = registry.live_count(),
                        max_workers = self.config.max_workers,
                        "Worker ceiling reached"
                    );
                    break;
                }
                self.recruit();
                recruited += 1;
            }
        } else if target < current {
            for _ in 0..current - target {
                if registry.effective_count() <= self.config.min_workers {
                    tracing::warn!(
                        target,
                        workers = registry.effective_count(),
                        min_workers = self.config.min_workers,
                        "Worker floor reached"
                    );
                    break;
                }
                if !self.retire() {
                    break;
                }
                retired += 1;
            }
        }

        (recruited, retired)
    }

    fn recruit(&mut self) {
        let worker = Worker::new(Arc::clone(&self.site));
        tracing::debug!(worker_id = %worker.id(), "Recruited worker");
        self.workers.spawn(worker.run());
    }

    fn retire(&self) -> bool {
        self.site.registry.request_quit();
        match self.commands.try_send(ForemanCommand::Quit) {
            Ok(()) => true,
            Err(e) => {
                self.site.registry.cancel_quit();
                tracing::warn!(error = %e, "Failed to queue quit command");
                false
            }
        }
    }

    /// Collects workers that have already exited
    fn reap(&mut self) {
        while let Some(joined) = self.workers.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker task failed");
            }
        }
    }

    /// Cycles every `update_period` until `cancel` fires, then shuts down
    pub async fn run(&mut self, cancel: CancellationToken) {
        let period = self.config.update_period();

        while !cancel.is_cancelled() {
            let started = Instant::now();
            self.cycle().await;
            let elapsed = started.elapsed();

            if elapsed >= period {
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    period_ms = period.as_millis() as u64,
                    "Sizing cycle overran update period"
                );
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep(period - elapsed) => {}
                _ = cancel.cancelled() => break,
            }
        }

        self.shutdown().await;
    }

    /// Retires every worker and waits up to `shutdown_grace` for them to
    /// exit. Returns the number still running when the grace period ended.
    pub async fn shutdown(&mut self) -> i64 {
        let registry = Arc::clone(&self.site.registry);
        let outstanding = registry.effective_count();
        tracing::info!(workers = registry.live_count(), "Shutting down worker pool");

        for _ in 0..outstanding {
            if !self.retire() {
                break;
            }
        }

        let grace = self.config.shutdown_grace();
        let workers = &mut self.workers;
        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Worker task failed");
                }
            }
        })
        .await;

        let remaining = registry.live_count();
        if drained.is_err() {
            tracing::warn!(
                remaining,
                grace_secs = grace.as_secs(),
                "Workers still running after grace period, aborting"
            );
            self.workers.shutdown().await;
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }

        tracing::info!("Worker pool stopped");
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::consumer::test_support::{site_with, test_settings};
    use crate::models::kinds;
    use crate::queue::{InMemoryQueue, MessageQueue, QueueMessage, Receipt};
    use crate::services::notifications::test_support::RecordingSender;
    use crate::store::InMemoryStore;

    fn config(min: i64, max: i64, optimal: i64) -> ForemanConfig {
        ForemanConfig {
            min_workers: min,
            max_workers: max,
            optimal_work_estimate: optimal,
            update_period: 60,
            shutdown_grace: 30,
            ..ForemanConfig::default()
        }
    }

    fn site(queue: Arc<dyn MessageQueue>) -> Arc<Site> {
        let store = Arc::new(InMemoryStore::new());
        let email = Arc::new(RecordingSender::succeeding(kinds::EMAIL));
        let webhook = Arc::new(RecordingSender::succeeding(kinds::WEBHOOK));
        Arc::new(site_with(queue, store, email, webhook).with_settings(test_settings()))
    }

    fn memory_queue() -> Arc<InMemoryQueue> {
        Arc::new(InMemoryQueue::new("check_results", Duration::from_secs(30)))
    }

    /// Lets retired workers finish their current receive and exit
    async fn settle() {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_recruits_min_and_seeds_history() {
        let queue = memory_queue();
        queue.set_reported_backlog(Some(5)).await;
        let mut foreman = Foreman::new(site(queue), config(2, 5, 1000));

        foreman.init().await.unwrap();

        assert_eq!(foreman.site().registry.live_count(), 2);
        assert_eq!(foreman.history().samples().collect::<Vec<_>>(), vec![1000; 6]);
        assert_eq!(foreman.shutdown().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_fails_when_backlog_unreadable() {
        let queue = memory_queue();
        queue.fail_next_backlogs(1);
        let mut foreman = Foreman::new(site(queue), config(1, 5, 1));

        assert!(foreman.init().await.is_err());
        assert_eq!(foreman.site().registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_backlog_is_floored() {
        let queue = memory_queue();
        queue.set_reported_backlog(Some(5000)).await;
        let mut foreman = Foreman::new(site(queue.clone()), config(1, 25, 1000));
        foreman.init().await.unwrap();

        queue.fail_next_backlogs(1);
        let report = foreman.cycle().await;

        assert_eq!(report.estimate, None);
        assert_eq!(report.floored, 1000);
        assert!(report.target >= 1 && report.target <= 25);
        foreman.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_spike_and_recovery() {
        let queue = memory_queue();
        queue.set_reported_backlog(Some(10)).await;
        let mut foreman = Foreman::new(site(queue.clone()), config(1, 25, 1));
        foreman.init().await.unwrap();
        let registry = Arc::clone(&foreman.site().registry);

        let report = foreman.cycle().await;
        assert_eq!(report.target, 8);
        assert_eq!(report.recruited, 7);
        assert_eq!(registry.live_count(), 8);

        queue.set_reported_backlog(Some(5000)).await;
        let mut previous = report.target;
        for _ in 0..6 {
            let report = foreman.cycle().await;
            assert!(report.target >= previous);
            assert!(registry.live_count() <= 25);
            previous = report.target;
        }
        assert_eq!(previous, 25);
        assert_eq!(registry.live_count(), 25);

        queue.set_reported_backlog(Some(10)).await;
        let mut targets = Vec::new();
        for _ in 0..6 {
            targets.push(foreman.cycle().await.target);
            settle().await;
        }
        assert!(targets.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(targets[0], 25);
        assert_eq!(targets[5], 8);
        assert_eq!(registry.live_count(), 8);
        assert_eq!(registry.pending_quits(), 0);

        assert_eq!(foreman.shutdown().await, 0);
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_quits_hold_the_ceiling() {
        let queue = memory_queue();
        queue.set_reported_backlog(Some(5000)).await;
        let mut foreman = Foreman::new(site(queue.clone()), config(1, 3, 1));
        foreman.init().await.unwrap();
        let registry = Arc::clone(&foreman.site().registry);

        foreman.cycle().await;
        assert_eq!(registry.live_count(), 3);

        queue.set_reported_backlog(Some(1)).await;
        let mut report = foreman.cycle().await;
        while report.target > 1 {
            report = foreman.cycle().await;
        }
        assert_eq!(report.retired, 2);
        assert_eq!(registry.effective_count(), 1);

        // Quits are still outstanding: no room to recruit above the ceiling
        queue.set_reported_backlog(Some(5000)).await;
        let report = foreman.cycle().await;
        assert_eq!(report.target, 3);
        assert_eq!(report.recruited, 0);
        assert_eq!(registry.live_count(), 3);

        settle().await;
        assert_eq!(registry.live_count(), 1);
        let report = foreman.cycle().await;
        assert_eq!(report.recruited, 2);
        assert_eq!(registry.live_count(), 3);

        foreman.shutdown().await;
    }

    /// Backlog reads that take a fixed time, counted
    struct SlowBacklog {
        inner: InMemoryQueue,
        delay: Duration,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl MessageQueue for SlowBacklog {
        async fn receive(
            &self,
            max_messages: u32,
            wait: Duration,
        ) -> Result<Vec<QueueMessage>, QueueError> {
            self.inner.receive(max_messages, wait).await
        }

        async fn delete(&self, receipt: &Receipt) -> Result<(), QueueError> {
            self.inner.delete(receipt).await
        }

        async fn backlog(&self) -> Result<i64, QueueError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.inner.backlog().await
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    fn slow_queue(delay: Duration) -> Arc<SlowBacklog> {
        Arc::new(SlowBacklog {
            inner: InMemoryQueue::new("check_results", Duration::from_secs(30)),
            delay,
            reads: AtomicUsize::new(0),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_paces_cycles_and_shuts_down() {
        let queue = slow_queue(Duration::ZERO);
        let mut foreman = Foreman::new(site(queue.clone()), config(2, 5, 1));
        foreman.init().await.unwrap();
        let registry = Arc::clone(&foreman.site().registry);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let running = tokio::spawn(async move { foreman.run(token).await });

        tokio::time::sleep(Duration::from_secs(150)).await;
        // init plus cycles at 0s, 60s and 120s
        assert_eq!(queue.reads.load(Ordering::SeqCst), 4);

        cancel.cancel();
        running.await.unwrap();
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycles_run_back_to_back() {
        let queue = slow_queue(Duration::from_secs(90));
        let mut foreman = Foreman::new(site(queue.clone()), config(1, 5, 1));
        foreman.init().await.unwrap();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let running = tokio::spawn(async move { foreman.run(token).await });

        tokio::time::sleep(Duration::from_secs(150)).await;
        // init read ends at 90s; cycles then start at 90s and 180s without pausing
        assert_eq!(queue.reads.load(Ordering::SeqCst), 3);

        cancel.cancel();
        running.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ignores_the_floor() {
        let queue = memory_queue();
        let mut foreman = Foreman::new(site(queue), config(3, 5, 1));
        foreman.init().await.unwrap();
        assert_eq!(foreman.site().registry.live_count(), 3);

        assert_eq!(foreman.shutdown().await, 0);
        assert_eq!(foreman.site().registry.live_count(), 0);
        assert_eq!(foreman.site().registry.pending_quits(), 0);
    }
}
