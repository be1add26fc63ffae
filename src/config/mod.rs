use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::contract::ContractVersion;
use crate::services::poller::{PollFailurePolicy, PollSettings};

/// Marker left in the URL by the deployment template until it is filled in.
const DEPLOY_PLACEHOLDER: &str = "REPLACE";

#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    /// Backend base URL (e.g., "https://privacyscrub-api.example.run.app")
    #[serde(default)]
    pub api_url: Option<String>,

    /// Sent as `X-API-KEY` on every request when set
    #[serde(default)]
    pub api_key: Option<String>,

    /// Backend contract revision to speak
    #[serde(default)]
    pub contract_version: ContractVersion,

    /// Seconds between job status polls
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Give up polling after this many seconds; 0 polls without a limit
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// What a failed status request does to the polling loop
    #[serde(default)]
    pub poll_failure_policy: PollFailurePolicy,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Default completion webhook for contracts that accept one
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// "text" or "json"
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Values given on the command line; each one replaces its env counterpart.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub contract: Option<ContractVersion>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_poll_timeout_secs() -> u64 {
    1800
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            contract_version: ContractVersion::default(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            poll_failure_policy: PollFailurePolicy::default(),
            request_timeout_secs: default_request_timeout_secs(),
            webhook_url: None,
            log_format: LogFormat::default(),
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Decode from explicit `(NAME, value)` pairs; names are matched case-insensitively.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars).map_err(ConfigError::Env)
    }

    /// Apply command-line values on top of the environment.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(url) = overrides.api_url {
            self.api_url = Some(url);
        }
        if let Some(key) = overrides.api_key {
            self.api_key = Some(key);
        }
        if let Some(contract) = overrides.contract {
            self.contract_version = contract;
        }
        self
    }

    /// Resolve the backend URL. Fails before any request is attempted.
    pub fn api_base(&self) -> Result<ApiBase, ConfigError> {
        let raw = self.api_url.as_deref().ok_or(ConfigError::MissingApiUrl)?;
        ApiBase::parse(raw)
    }

    /// The key to send, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            timeout: (self.poll_timeout_secs > 0)
                .then(|| Duration::from_secs(self.poll_timeout_secs)),
            on_failure: self.poll_failure_policy,
        }
    }
}

/// Validated backend base URL, without a trailing slash.
///
/// Plain `http://` is upgraded to `https://` unless the host is loopback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiBase(String);

impl ApiBase {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        if trimmed.contains(DEPLOY_PLACEHOLDER) {
            return Err(ConfigError::NotDeployed(trimmed.to_string()));
        }

        let candidate = match trimmed.split_once("://") {
            Some((scheme, rest)) => match scheme.to_ascii_lowercase().as_str() {
                "https" => format!("https://{rest}"),
                "http" => {
                    let plain = format!("http://{rest}");
                    let url = Url::parse(&plain)
                        .map_err(|e| ConfigError::InvalidUrl(format!("{trimmed}: {e}")))?;
                    if is_loopback(&url) {
                        plain
                    } else {
                        tracing::warn!(api_url = %trimmed, "Upgrading plain-text API URL to https");
                        format!("https://{rest}")
                    }
                }
                _ => return Err(ConfigError::UnsupportedScheme(scheme.to_string())),
            },
            None => format!("https://{trimmed}"),
        };

        let url = Url::parse(&candidate)
            .map_err(|e| ConfigError::InvalidUrl(format!("{candidate}: {e}")))?;
        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!("{candidate}: missing host")));
        }

        Ok(Self(candidate))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join an absolute endpoint path (e.g. "/v1/jobs/abc") onto the base.
    pub fn join(&self, path: &str) -> String {
        format!("{}{}", self.0, path)
    }
}

impl fmt::Display for ApiBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("API URL is not configured (set API_URL or pass --api-url)")]
    MissingApiUrl,

    #[error("System not fully deployed: API URL is still the placeholder '{0}'")]
    NotDeployed(String),

    #[error("Unsupported URL scheme '{0}' (use https)")]
    UnsupportedScheme(String),

    #[error("Invalid API URL {0}")]
    InvalidUrl(String),
}
