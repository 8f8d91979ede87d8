//! Command handlers for CLI operations

pub mod run;
pub mod send_test;

pub use run::RunCommandHandler;
pub use send_test::SendTestCommandHandler;
