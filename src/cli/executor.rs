//! Dispatches a parsed command to its handler

use super::handlers::{RunCommandHandler, SendTestCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Runs the command named by `cli`; `run` when none is given
///
/// # Errors
/// Returns argument validation errors and any handler failure
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    cli.validate().map_err(|reason| AppError::Validation {
        field: "cli_arguments".to_string(),
        reason,
    })?;

    match &cli.command {
        Some(Commands::Run { dry_run, .. }) => {
            RunCommandHandler::new(settings).execute(*dry_run).await
        }
        None => RunCommandHandler::new(settings).execute(false).await,
        Some(Commands::SendTest {
            kind,
            value,
            customer_id,
        }) => {
            SendTestCommandHandler::new(settings)
                .execute(kind, value, customer_id.as_deref())
                .await
        }
    }
}
