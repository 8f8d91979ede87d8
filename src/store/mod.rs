//! Notification configuration and integration credentials
//!
//! The tables belong to the configuration service; this crate only reads them.

mod error;
pub mod memory;
pub mod postgres;
mod traits;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use postgres::PgStore;
pub use traits::{CredentialStore, NotificationStore};
