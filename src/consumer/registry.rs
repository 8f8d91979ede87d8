//! Worker registry
//!
//! Every live worker holds a `WorkerRegistration`; its command handle sits
//! in the available pool until the dispatcher claims it to deliver a
//! command. Registration and the live count change together under one lock,
//! so the count never disagrees with pool membership.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

pub type WorkerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForemanCommand {
    Quit,
}

/// Command channel of one worker, claimable once
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: WorkerId,
    commands: mpsc::Sender<ForemanCommand>,
}

impl WorkerHandle {
    /// Fails when the worker has already exited
    pub fn deliver(&self, command: ForemanCommand) -> Result<(), ForemanCommand> {
        self.commands.try_send(command).map_err(|e| e.into_inner())
    }
}

#[derive(Debug, Default)]
struct Pool {
    available: VecDeque<WorkerHandle>,
    claimed: HashSet<WorkerId>,
}

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    pool: Mutex<Pool>,
    live: AtomicI64,
    /// Quits requested but not yet acted on by a worker
    pending_quits: AtomicI64,
    released: Notify,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds a worker to the pool and counts it, as one step
    pub fn register(self: &Arc<Self>) -> WorkerRegistration {
        let id = Uuid::new_v4();
        let (commands, receiver) = mpsc::channel(1);

        {
            let mut pool = self.pool();
            pool.available.push_back(WorkerHandle { id, commands });
            self.live.fetch_add(1, Ordering::SeqCst);
        }
        self.released.notify_one();

        WorkerRegistration {
            id,
            commands: receiver,
            registry: Arc::clone(self),
            quit_received: false,
        }
    }

    fn deregister(&self, id: WorkerId, quit_received: bool) {
        let mut pool = self.pool();
        pool.available.retain(|handle| handle.id != id);
        pool.claimed.remove(&id);
        self.live.fetch_sub(1, Ordering::SeqCst);
        if quit_received {
            self.pending_quits.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Takes the longest-waiting available handle, if any
    pub fn try_claim(&self) -> Option<WorkerHandle> {
        let mut pool = self.pool();
        let handle = pool.available.pop_front()?;
        pool.claimed.insert(handle.id);
        Some(handle)
    }

    /// Waits until some worker's handle is available and claims it
    pub async fn claim(&self) -> WorkerHandle {
        loop {
            let released = self.released.notified();
            if let Some(handle) = self.try_claim() {
                return handle;
            }
            released.await;
        }
    }

    /// Records a quit about to be issued so the effective count drops at once
    pub fn request_quit(&self) {
        self.pending_quits.fetch_add(1, Ordering::SeqCst);
    }

    /// Withdraws a quit that could not be issued
    pub fn cancel_quit(&self) {
        self.pending_quits.fetch_sub(1, Ordering::SeqCst);
    }

    /// Workers currently running
    pub fn live_count(&self) -> i64 {
        self.live.load(Ordering::SeqCst)
    }

    pub fn pending_quits(&self) -> i64 {
        self.pending_quits.load(Ordering::SeqCst)
    }

    /// Running workers that have not been asked to quit
    pub fn effective_count(&self) -> i64 {
        self.live_count() - self.pending_quits()
    }

    pub fn available_count(&self) -> usize {
        self.pool().available.len()
    }
}

/// A worker's membership; dropping it removes the worker from the registry
#[derive(Debug)]
pub struct WorkerRegistration {
    id: WorkerId,
    commands: mpsc::Receiver<ForemanCommand>,
    registry: Arc<WorkerRegistry>,
    quit_received: bool,
}

impl WorkerRegistration {
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Non-blocking check for a delivered command
    pub fn poll_command(&mut self) -> Option<ForemanCommand> {
        let command = self.commands.try_recv().ok();
        if command == Some(ForemanCommand::Quit) {
            self.quit_received = true;
        }
        command
    }
}

impl Drop for WorkerRegistration {
    fn drop(&mut self) {
        // A quit delivered but never polled still settles its pending count
        if !self.quit_received {
            self.poll_command();
        }
        self.registry.deregister(self.id, self.quit_received);
    }
}

/// Forwards each queued command to exactly one available worker
pub async fn dispatch_commands(
    registry: Arc<WorkerRegistry>,
    mut commands: mpsc::Receiver<ForemanCommand>,
) {
    while let Some(command) = commands.recv().await {
        let mut command = command;
        loop {
            let handle = registry.claim().await;
            match handle.deliver(command) {
                Ok(()) => {
                    tracing::debug!(worker_id = %handle.id, ?command, "Delivered command");
                    break;
                }
                // The worker exited after its handle was claimed; try another
                Err(returned) => command = returned,
            }
        }
    }
    tracing::debug!("Command queue closed, dispatcher stopping");
}
