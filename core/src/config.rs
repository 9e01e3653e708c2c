use crate::client::BackendKind;
use directories::BaseDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "default_user";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 30_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub backend: BackendKind,
    pub api_url: Url,
    pub user_id: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("configuration invalid: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Io { path, .. } => {
                format!("Could not read {}. Check file permissions.", path.display())
            }
            Self::Invalid(detail) => format!("Vidpilot is misconfigured: {detail}. Update vidpilot.yaml."),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Http,
            api_url: default_api_url(),
            user_id: DEFAULT_USER_ID.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        }
    }
}

impl ClientSettings {
    /// Load `vidpilot.yaml` from the first candidate location that exists, then
    /// apply `VIDPILOT_*` environment overrides. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match locate_config_file() {
            Some(path) => read_config_file(&path)?,
            None => FileSettings::default(),
        };
        resolve(file, &EnvOverrides::from_process())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = read_config_file(path)?;
        resolve(file, &EnvOverrides::from_process())
    }
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).unwrap_or_else(|_| unreachable!("default url parses"))
}

fn read_config_file(path: &Path) -> Result<FileSettings, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: VidpilotConfig = serde_yaml::from_str(&contents)
        .map_err(|err| ConfigError::Invalid(format!("invalid {}: {err}", path.display())))?;
    Ok(config.client.unwrap_or_default())
}

fn resolve(file: FileSettings, env: &EnvOverrides) -> Result<ClientSettings, ConfigError> {
    let backend = match env.backend.as_deref().or(file.backend.as_deref()) {
        Some(raw) => BackendKind::parse(raw.trim())
            .ok_or_else(|| ConfigError::Invalid(format!("unknown backend `{raw}`")))?,
        None => BackendKind::Http,
    };

    let api_url = match env.api_url.as_deref().or(file.api_url.as_deref()) {
        Some(raw) => Url::parse(raw.trim())
            .map_err(|err| ConfigError::Invalid(format!("api_url `{raw}`: {err}")))?,
        None => default_api_url(),
    };

    let user_id = env
        .user_id
        .clone()
        .or(file.user_id)
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
    if user_id.is_empty() {
        return Err(ConfigError::Invalid("user_id cannot be empty".to_string()));
    }

    let poll_interval_ms = match &env.poll_interval_ms {
        Some(raw) => parse_millis("VIDPILOT_POLL_INTERVAL_MS", raw)?,
        None => file.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
    };
    let request_timeout_ms = match &env.request_timeout_ms {
        Some(raw) => parse_millis("VIDPILOT_REQUEST_TIMEOUT_MS", raw)?,
        None => file.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
    };
    if poll_interval_ms == 0 {
        return Err(ConfigError::Invalid(
            "poll_interval_ms must be greater than zero".to_string(),
        ));
    }
    if request_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "request_timeout_ms must be greater than zero".to_string(),
        ));
    }

    Ok(ClientSettings {
        backend,
        api_url,
        user_id,
        poll_interval: Duration::from_millis(poll_interval_ms),
        request_timeout: Duration::from_millis(request_timeout_ms),
    })
}

fn parse_millis(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} must be a whole number, got `{raw}`")))
}

fn locate_config_file() -> Option<PathBuf> {
    config_candidates().into_iter().find(|path| path.exists())
}

fn config_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(base) = BaseDirs::new() {
        let config_dir = base.config_dir().join("vidpilot");
        paths.push(config_dir.join("vidpilot.yaml"));
        paths.push(config_dir.join("vidpilot.yml"));
        let home_dir = base.home_dir();
        paths.push(home_dir.join(".vidpilot").join("vidpilot.yaml"));
        paths.push(home_dir.join(".vidpilot").join("vidpilot.yml"));
    } else {
        paths.push(PathBuf::from("vidpilot.yaml"));
        paths.push(PathBuf::from("vidpilot.yml"));
    }
    paths
}

#[derive(Debug, Default, Clone)]
struct EnvOverrides {
    backend: Option<String>,
    api_url: Option<String>,
    user_id: Option<String>,
    poll_interval_ms: Option<String>,
    request_timeout_ms: Option<String>,
}

impl EnvOverrides {
    fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            backend: var("VIDPILOT_BACKEND"),
            api_url: var("VIDPILOT_API_URL"),
            user_id: var("VIDPILOT_USER_ID"),
            poll_interval_ms: var("VIDPILOT_POLL_INTERVAL_MS"),
            request_timeout_ms: var("VIDPILOT_REQUEST_TIMEOUT_MS"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VidpilotConfig {
    client: Option<FileSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    backend: Option<String>,
    api_url: Option<String>,
    user_id: Option<String>,
    poll_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}
