use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use larch::matcher::CYRILLIC_NAME_PATTERN;
use larch::overpass::{OverpassOptions, DEFAULT_OVERPASS_ENDPOINT};
use larch::pip::{SeamRetry, DEFAULT_BUFFER_DEGREES};
use larch::pipeline::{RateLimiter, DEFAULT_RADIUS_KM};

const DEFAULT_BORDER_SOURCE: &str =
    "https://raw.githubusercontent.com/johan/world.geo.json/master/countries/RUS.geo.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub border: BorderConfig,
    pub lookup: LookupConfig,
    pub matcher: MatcherConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    pub points: PathBuf,
    pub exclusions: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            points: PathBuf::from("grid.csv"),
            exclusions: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BorderConfig {
    /// File path or http(s) URL of the boundary GeoJSON
    pub source: String,
    pub buffer_degrees: f64,
    pub parallel_filter: bool,
    pub seam_retry: SeamRetryConfig,
}

impl Default for BorderConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_BORDER_SOURCE.to_string(),
            buffer_degrees: DEFAULT_BUFFER_DEGREES,
            parallel_filter: false,
            seam_retry: SeamRetryConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SeamRetryConfig {
    pub enabled: bool,
    pub threshold_degrees: f64,
    pub shift_degrees: f64,
}

impl Default for SeamRetryConfig {
    fn default() -> Self {
        let retry = SeamRetry::default();
        Self {
            enabled: true,
            threshold_degrees: retry.threshold_degrees,
            shift_degrees: retry.shift_degrees,
        }
    }
}

impl SeamRetryConfig {
    pub fn policy(&self) -> Option<SeamRetry> {
        self.enabled.then_some(SeamRetry {
            threshold_degrees: self.threshold_degrees,
            shift_degrees: self.shift_degrees,
        })
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LookupConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub radius_km: f64,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
    /// At most `max_calls` lookups start within `per_secs`
    pub max_calls: u32,
    pub per_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        let options = OverpassOptions::default();
        Self {
            endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            user_agent: options.user_agent,
            radius_km: DEFAULT_RADIUS_KM,
            timeout_secs: options.timeout.as_secs(),
            max_attempts: options.max_attempts,
            retry_delay_secs: options.retry_delay.as_secs(),
            max_calls: 1,
            per_secs: 1,
        }
    }
}

impl LookupConfig {
    pub fn overpass_options(&self) -> OverpassOptions {
        OverpassOptions {
            endpoint: self.endpoint.clone(),
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            max_attempts: self.max_attempts,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(self.max_calls, Duration::from_secs(self.per_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MatcherConfig {
    /// Regex every settlement name must match in full
    pub name_pattern: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            name_pattern: CYRILLIC_NAME_PATTERN.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("nearby_settlements.csv"),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.lookup.radius_km, 100.0);
        assert_eq!(config.border.buffer_degrees, 0.0001);
        assert_eq!(
            config.border.seam_retry.policy(),
            Some(SeamRetry::default())
        );
        assert_eq!(config.lookup.rate_limiter().interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            r#"
            [input]
            points = "data/grid.csv"
            exclusions = "data/excluded.txt"

            [border]
            source = "data/RUS.geo.json"

            [border.seam_retry]
            enabled = false

            [lookup]
            radius_km = 50.0
            max_calls = 2
            per_secs = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.input.points, PathBuf::from("data/grid.csv"));
        assert_eq!(
            config.input.exclusions,
            Some(PathBuf::from("data/excluded.txt"))
        );
        assert_eq!(config.border.source, "data/RUS.geo.json");
        assert_eq!(config.border.seam_retry.policy(), None);
        assert_eq!(config.lookup.radius_km, 50.0);
        assert_eq!(
            config.lookup.rate_limiter().interval(),
            Duration::from_millis(500)
        );
        assert_eq!(config.lookup.endpoint, DEFAULT_OVERPASS_ENDPOINT);
        assert_eq!(config.matcher.name_pattern, CYRILLIC_NAME_PATTERN);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load_from_file("/nonexistent/survey.toml").is_err());
    }
}
