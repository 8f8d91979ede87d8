//! Queue consumption: the foreman sizes a pool of workers to the backlog,
//! each worker turns queued check results into notifications.

pub mod foreman;
pub mod load;
pub mod registry;
pub mod retry;
pub mod site;
pub mod worker;

pub use foreman::{CycleReport, Foreman};
pub use load::{LoadHistory, compute_target, floor_estimate};
pub use registry::{ForemanCommand, WorkerId, WorkerRegistry};
pub use retry::RetryPolicy;
pub use site::{EventBuilderFactory, MAX_BATCH, NotifierFactory, Site, WorkerSettings};
pub use worker::{MessageOutcome, WorkStatus, Worker};
