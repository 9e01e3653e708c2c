use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use vidpilot_core::client::BackendKind;
use vidpilot_core::config::ClientSettings;

/// Command-line flags that take precedence over `vidpilot.yaml` and the
/// environment.
#[derive(Args, Debug, Clone, Default)]
pub struct CliOverrides {
    /// Read this YAML file instead of searching for `vidpilot.yaml`.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    /// Backend to talk to: `http` or `mock`.
    #[arg(long, global = true)]
    pub backend: Option<String>,
    /// Base URL of the dashboard API.
    #[arg(long, global = true)]
    pub api_url: Option<Url>,
    #[arg(long, global = true)]
    pub user_id: Option<String>,
    /// Status polling interval in milliseconds.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,
}

impl CliOverrides {
    /// Load from `--config` or the usual search path, then layer the flags.
    pub fn load_settings(&self) -> Result<ClientSettings> {
        let loaded = match &self.config {
            Some(path) => ClientSettings::load_from(path),
            None => ClientSettings::load(),
        };
        let mut settings = loaded.map_err(|err| anyhow!(err.user_message()))?;
        self.apply(&mut settings)?;
        Ok(settings)
    }

    pub fn apply(&self, settings: &mut ClientSettings) -> Result<()> {
        if let Some(raw) = &self.backend {
            settings.backend = BackendKind::parse(raw)
                .ok_or_else(|| anyhow!("unknown backend `{raw}`; expected `http` or `mock`"))?;
        }
        if let Some(url) = &self.api_url {
            settings.api_url = url.clone();
        }
        if let Some(user_id) = &self.user_id {
            let trimmed = user_id.trim();
            if trimmed.is_empty() {
                return Err(anyhow!("--user-id cannot be empty"));
            }
            settings.user_id = trimmed.to_string();
        }
        if let Some(ms) = self.poll_interval_ms {
            if ms == 0 {
                return Err(anyhow!("--poll-interval-ms must be greater than zero"));
            }
            settings.poll_interval = Duration::from_millis(ms);
        }
        Ok(())
    }
}
