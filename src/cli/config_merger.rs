//! Applies command-line overrides on top of file and environment settings

use super::parser::{Cli, Commands};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, settings::Settings};

/// Holds the loaded settings and merges CLI overrides into a copy
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Loads settings honouring `--config` and `--env`
    ///
    /// # Errors
    /// Returns ConfigError if loading or validation fails
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(env) = cli.env {
            loader = loader.with_environment(env.into());
        }
        if let Some(ref path) = cli.config {
            loader = loader.with_file(path.clone());
        }

        Ok(Self::new(loader.load()?))
    }

    /// Returns the settings with CLI overrides applied and revalidated.
    ///
    /// Command flags win over the global `--verbose`/`--quiet`.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }

        if let Some(Commands::Run {
            min_workers,
            max_workers,
            log_level,
            dry_run: _,
        }) = &cli.command
        {
            if let Some(min) = min_workers {
                config.foreman.min_workers = *min;
            }
            if let Some(max) = max_workers {
                config.foreman.max_workers = *max;
            }
            if let Some(level) = log_level {
                config.logger.level = (*level).into();
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
