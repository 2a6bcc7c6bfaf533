use crate::retry::{RetryConfig, RetryPolicy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8888";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_SUGGESTION_MODEL: &str = "gemini-2.5-flash-preview-05-20";
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Base64 image supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageInput {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

/// Successful image composition body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageArtifact {
    pub base64_image: String,
}

/// Successful suggestion body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextArtifact {
    pub text: String,
}

/// Failure body shared by every error response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent keys are reported per request rather than failing startup.
    pub api_key: Option<String>,
    pub bind_addr: SocketAddr,
    pub gemini_base_url: String,
    pub image_model: String,
    pub suggestion_model: String,
    pub retry: RetryConfig,
    pub upstream_timeout: Duration,
    pub request_deadline: Option<Duration>,
    pub enable_cors: bool,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8888)),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            suggestion_model: DEFAULT_SUGGESTION_MODEL.to_string(),
            retry: RetryConfig::default(),
            upstream_timeout: Duration::from_secs(120),
            request_deadline: None,
            enable_cors: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("BIND_ADDR is not a socket address: {}", e)))?;

        let policy = match var("RETRY_POLICY") {
            Some(raw) => raw.parse::<RetryPolicy>()?,
            None => RetryPolicy::default(),
        };

        let max_attempts: u32 = parse_var(&var, "RETRY_MAX_ATTEMPTS")?.unwrap_or(5);
        if max_attempts == 0 {
            return Err(Error::Config(
                "RETRY_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        let base_delay_ms: u64 = parse_var(&var, "RETRY_BASE_DELAY_MS")?.unwrap_or(1000);

        let upstream_timeout_secs: u64 = parse_var(&var, "UPSTREAM_TIMEOUT_SECS")?.unwrap_or(120);
        let request_deadline = parse_var::<u64, _>(&var, "REQUEST_DEADLINE_SECS")?
            .map(Duration::from_secs);

        let enable_cors = match var("ENABLE_CORS") {
            Some(raw) => parse_bool(&raw)
                .ok_or_else(|| Error::Config(format!("ENABLE_CORS is not a boolean: {}", raw)))?,
            None => true,
        };

        Ok(Self {
            api_key: var("GEMINI_API_KEY"),
            bind_addr,
            gemini_base_url: var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            image_model: var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            suggestion_model: var("SUGGESTION_MODEL")
                .unwrap_or_else(|| DEFAULT_SUGGESTION_MODEL.to_string()),
            retry: RetryConfig {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
                policy,
            },
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            request_deadline,
            enable_cors,
            max_body_bytes: parse_var(&var, "MAX_BODY_BYTES")?.unwrap_or(DEFAULT_MAX_BODY_BYTES),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| Error::Config(format!("{} is invalid ({}): {}", key, raw, e)))
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
