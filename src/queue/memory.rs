//! In-memory queue with visibility timeouts
//!
//! Mirrors the acknowledgement semantics of the pgmq adapter: a received
//! message is hidden until its visibility timeout lapses, then becomes
//! receivable again unless it was deleted. Failures can be injected for
//! receive, delete and backlog calls.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::queue::{MessageQueue, QueueError, QueueMessage, Receipt};

#[derive(Debug)]
struct StoredMessage {
    id: u64,
    body: Option<String>,
    visible_at: Instant,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct QueueState {
    next_id: u64,
    messages: VecDeque<StoredMessage>,
    /// Delete calls per receipt, including deletes of already removed messages
    deletes: HashMap<String, u32>,
    reported_backlog: Option<i64>,
}

#[derive(Debug)]
pub struct InMemoryQueue {
    name: String,
    visibility_timeout: Duration,
    state: Mutex<QueueState>,
    arrivals: Notify,
    receive_failures: AtomicU32,
    delete_failures: AtomicU32,
    backlog_failures: AtomicU32,
}

impl InMemoryQueue {
    pub fn new(name: impl Into<String>, visibility_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            visibility_timeout,
            state: Mutex::new(QueueState::default()),
            arrivals: Notify::new(),
            receive_failures: AtomicU32::new(0),
            delete_failures: AtomicU32::new(0),
            backlog_failures: AtomicU32::new(0),
        }
    }

    /// Enqueues a body and returns its receipt
    pub async fn push(&self, body: impl Into<String>) -> Receipt {
        self.push_raw(Some(body.into())).await
    }

    /// Enqueues a message whose payload may be missing
    pub async fn push_raw(&self, body: Option<String>) -> Receipt {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.messages.push_back(StoredMessage {
            id,
            body,
            visible_at: Instant::now(),
            receive_count: 0,
        });
        drop(state);

        self.arrivals.notify_waiters();
        Receipt::new(id.to_string())
    }

    /// Messages not yet deleted, visible or not
    pub async fn len(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, receipt: &Receipt) -> bool {
        let state = self.state.lock().await;
        state.messages.iter().any(|m| m.id.to_string() == receipt.as_str())
    }

    /// Number of delete calls made for `receipt`
    pub async fn delete_count(&self, receipt: &Receipt) -> u32 {
        let state = self.state.lock().await;
        state.deletes.get(receipt.as_str()).copied().unwrap_or(0)
    }

    pub async fn receive_count(&self, receipt: &Receipt) -> u32 {
        let state = self.state.lock().await;
        state
            .messages
            .iter()
            .find(|m| m.id.to_string() == receipt.as_str())
            .map(|m| m.receive_count)
            .unwrap_or(0)
    }

    /// Reports `backlog` from `backlog()` instead of the real length
    pub async fn set_reported_backlog(&self, backlog: Option<i64>) {
        self.state.lock().await.reported_backlog = backlog;
    }

    pub fn fail_next_receives(&self, count: u32) {
        self.receive_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_deletes(&self, count: u32) {
        self.delete_failures.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_backlogs(&self, count: u32) {
        self.backlog_failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn take_visible(&self, max_messages: u32) -> Vec<QueueMessage> {
        let now = Instant::now();
        let hidden_until = now + self.visibility_timeout;
        let mut state = self.state.lock().await;

        state
            .messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max_messages as usize)
            .map(|m| {
                m.visible_at = hidden_until;
                m.receive_count += 1;
                QueueMessage {
                    receipt: Receipt::new(m.id.to_string()),
                    body: m.body.clone(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(
        &self,
        max_messages: u32,
        wait: Duration,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        if Self::take_failure(&self.receive_failures) {
            return Err(QueueError::Unavailable(format!(
                "injected receive failure on '{}'",
                self.name
            )));
        }

        let deadline = Instant::now() + wait;
        loop {
            let arrived = self.arrivals.notified();
            let batch = self.take_visible(max_messages).await;
            if !batch.is_empty() || Instant::now() >= deadline {
                return Ok(batch);
            }

            // Wake on new messages; hidden ones are rechecked at the deadline
            let _ = tokio::time::timeout_at(deadline, arrived).await;
        }
    }

    async fn delete(&self, receipt: &Receipt) -> Result<(), QueueError> {
        if Self::take_failure(&self.delete_failures) {
            return Err(QueueError::Unavailable(format!(
                "injected delete failure for receipt {receipt}"
            )));
        }

        let mut state = self.state.lock().await;
        *state.deletes.entry(receipt.as_str().to_string()).or_insert(0) += 1;
        state.messages.retain(|m| m.id.to_string() != receipt.as_str());
        Ok(())
    }

    async fn backlog(&self) -> Result<i64, QueueError> {
        if Self::take_failure(&self.backlog_failures) {
            return Err(QueueError::Unavailable(format!(
                "injected backlog failure on '{}'",
                self.name
            )));
        }

        let state = self.state.lock().await;
        Ok(state
            .reported_backlog
            .unwrap_or(state.messages.len() as i64))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> InMemoryQueue {
        InMemoryQueue::new("check_results", Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_hides_message_until_timeout() {
        let queue = queue();
        queue.push("body-1").await;

        let first = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(queue.receive(10, Duration::ZERO).await.unwrap().is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        let again = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(queue.receive_count(&again[0].receipt).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_respects_batch_size() {
        let queue = queue();
        for i in 0..12 {
            queue.push(format!("body-{i}")).await;
        }

        let batch = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(batch.len(), 10);
        assert_eq!(batch[0].body.as_deref(), Some("body-0"));
        assert_eq!(queue.receive(10, Duration::ZERO).await.unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_waits_for_arrivals() {
        let queue = std::sync::Arc::new(queue());
        let producer = queue.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            producer.push("late").await;
        });

        let batch = queue.receive(10, Duration::from_secs(20)).await.unwrap();
        assert_eq!(batch.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_receive_returns_after_wait() {
        let queue = queue();
        let started = Instant::now();
        assert!(queue.receive(10, Duration::from_secs(20)).await.unwrap().is_empty());
        assert!(started.elapsed() >= Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_delete_removes_and_counts() {
        let queue = queue();
        let receipt = queue.push("body").await;

        queue.delete(&receipt).await.unwrap();
        queue.delete(&receipt).await.unwrap();

        assert!(queue.is_empty().await);
        assert_eq!(queue.delete_count(&receipt).await, 2);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let queue = queue();
        let receipt = queue.push("body").await;
        queue.fail_next_receives(1);
        queue.fail_next_deletes(2);
        queue.fail_next_backlogs(1);

        assert!(queue.receive(10, Duration::ZERO).await.is_err());
        assert!(queue.delete(&receipt).await.is_err());
        assert!(queue.delete(&receipt).await.is_err());
        assert!(queue.backlog().await.is_err());

        assert_eq!(queue.backlog().await.unwrap(), 1);
        queue.delete(&receipt).await.unwrap();
        assert_eq!(queue.delete_count(&receipt).await, 1);
    }

    #[tokio::test]
    async fn test_reported_backlog_override() {
        let queue = queue();
        queue.set_reported_backlog(Some(5000)).await;
        assert_eq!(queue.backlog().await.unwrap(), 5000);

        queue.set_reported_backlog(None).await;
        assert_eq!(queue.backlog().await.unwrap(), 0);
    }
}
