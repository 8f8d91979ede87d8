//! Process-level errors
//!
//! Component modules keep their own error enums; `AppError` is what crosses
//! into startup, the CLI handlers and `main`.

mod app_error;

pub use app_error::{AppError, AppResult};
