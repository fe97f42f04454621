use crate::error::ConfigError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default location of the agent configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/logship/config.yaml";

/// Agent configuration, loaded once at startup and read-only afterwards
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub analyzer: AnalyzerConfig,
    pub discovery: DiscoveryConfig,
    pub monitoring: MonitoringConfig,
    pub services: ServicesConfig,
    pub delivery: DeliveryConfig,
    pub shutdown: ShutdownConfig,
}

/// Where qualifying chunks are sent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Base URL; records are posted to `<endpoint>/api/analyze`
    pub endpoint: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000".to_string(),
        }
    }
}

/// Discovery scheduling. Parsed and validated, but discovery only runs once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub enabled: bool,
    /// Re-scan interval such as `30s`, `5m` or `1h`
    pub scan_interval: Option<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval: Some("30s".to_string()),
        }
    }
}

/// Log files to follow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Glob patterns expanded once at startup
    pub log_paths: Vec<String>,
    /// Not applied to discovery, classification or forwarding
    pub exclude_patterns: Vec<String>,
    /// Size of each follower's read buffer, and so the maximum chunk size
    pub read_buffer_bytes: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_paths: Vec::new(),
            exclude_patterns: Vec::new(),
            read_buffer_bytes: 1024,
        }
    }
}

/// Which service-management backends to query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServicesConfig {
    pub auto_detect: bool,
    pub docker: bool,
    pub systemd: bool,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            auto_detect: true,
            docker: true,
            systemd: true,
        }
    }
}

/// Outbound request behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeliveryConfig {
    pub timeout_seconds: u64,
    /// Resends allowed after a connection could not be established
    pub max_retries: u32,
    /// Delay before the first resend; doubled for each following one
    pub retry_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_retries: 2,
            retry_delay_ms: 500,
        }
    }
}

impl DeliveryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for followers to finish after cancellation
    pub timeout_seconds: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self { timeout_seconds: 5 }
    }
}

impl ShutdownConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl AgentConfig {
    /// Load and validate configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::YamlError` if it is not valid YAML for this schema, and
    /// `ConfigError::ValidationError` if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{} ({})", e, path.display())))?;
        let config = Self::from_yaml(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes to unit, not to an empty mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AgentConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = reqwest::Url::parse(&self.analyzer.endpoint).map_err(|e| {
            ConfigError::ValidationError(format!(
                "analyzer.endpoint '{}' is not a valid URL: {}",
                self.analyzer.endpoint, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "analyzer.endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        if self.monitoring.read_buffer_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "monitoring.read_buffer_bytes must be greater than 0".to_string(),
            ));
        }

        if self.delivery.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "delivery.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(interval) = &self.discovery.scan_interval {
            parse_interval(interval).ok_or_else(|| {
                ConfigError::ValidationError(format!(
                    "discovery.scan_interval '{}' must look like 30s, 5m or 1h",
                    interval
                ))
            })?;
        }

        Ok(())
    }

    /// Parsed re-scan interval, if one is configured
    pub fn scan_interval(&self) -> Option<Duration> {
        self.discovery.scan_interval.as_deref().and_then(parse_interval)
    }
}

/// Parse `<n>s`, `<n>m` or `<n>h` into a duration
fn parse_interval(value: &str) -> Option<Duration> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let amount: u64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    let seconds = match unit {
        's' => amount,
        'm' => amount.checked_mul(60)?,
        'h' => amount.checked_mul(3600)?,
        _ => return None,
    };
    Some(Duration::from_secs(seconds))
}
