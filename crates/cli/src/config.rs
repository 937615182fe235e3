//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::UtcOffset;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub marketplace: MarketplaceConfig,

    #[serde(default)]
    pub caption: CaptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_state_db_path")]
    pub state_db_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Admin whose stored configuration and ledger rows this process owns
    #[serde(default = "default_admin_id")]
    pub admin_id: String,

    /// Fixed UTC offset for daily quota accounting, as `+HH:MM` or `-HH:MM`
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u64,

    /// Running rows older than this are treated as crashed leftovers
    #[serde(default = "default_run_timeout_minutes")]
    pub run_timeout_minutes: u64,

    /// How far back a published product blocks re-selection
    #[serde(default = "default_dedup_window_days")]
    pub dedup_window_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    #[serde(default = "default_query")]
    pub query: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Regex patterns; products whose title matches any are never published
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    #[serde(default = "default_disclosure")]
    pub disclosure: String,

    /// Candidate hashtags, most important first; empty uses the built-in set
    #[serde(default)]
    pub hashtags: Vec<String>,
}

// Default value functions
fn default_state_db_path() -> PathBuf {
    PathBuf::from("./autopromo.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_admin_id() -> String {
    "default".to_string()
}

fn default_timezone() -> String {
    "+00:00".to_string()
}

fn default_interval_hours() -> u64 {
    4
}

fn default_run_timeout_minutes() -> u64 {
    30
}

fn default_dedup_window_days() -> u64 {
    3
}

fn default_query() -> String {
    "best sellers".to_string()
}

fn default_page_size() -> usize {
    10
}

fn default_disclosure() -> String {
    "#ad".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            state_db_path: default_state_db_path(),
            log_level: default_log_level(),
            admin_id: default_admin_id(),
            timezone: default_timezone(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            run_timeout_minutes: default_run_timeout_minutes(),
            dedup_window_days: default_dedup_window_days(),
        }
    }
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            category: None,
            page_size: default_page_size(),
            exclude_patterns: vec![],
        }
    }
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            disclosure: default_disclosure(),
            hashtags: vec![],
        }
    }
}

impl GeneralConfig {
    /// Parse the configured timezone string into a fixed offset
    pub fn timezone_offset(&self) -> Result<UtcOffset> {
        parse_utc_offset(&self.timezone)
    }
}

fn parse_utc_offset(value: &str) -> Result<UtcOffset> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(UtcOffset::UTC);
    }

    let (sign, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (1i8, rest)
    } else if let Some(rest) = trimmed.strip_prefix('-') {
        (-1i8, rest)
    } else {
        anyhow::bail!("Invalid timezone (expected +HH:MM or -HH:MM): {}", value);
    };

    let (hours, minutes) = rest
        .split_once(':')
        .with_context(|| format!("Invalid timezone (expected +HH:MM or -HH:MM): {}", value))?;

    let hours: i8 = hours
        .parse()
        .with_context(|| format!("Invalid timezone hours: {}", value))?;
    let minutes: i8 = minutes
        .parse()
        .with_context(|| format!("Invalid timezone minutes: {}", value))?;

    UtcOffset::from_hms(sign * hours, sign * minutes, 0)
        .with_context(|| format!("Timezone offset out of range: {}", value))
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("AUTOPROMO")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r##"# autopromo configuration

[general]
state_db_path = "./autopromo.sqlite"
log_level = "info"
admin_id = "default"
# Fixed UTC offset used for "posts today" accounting
timezone = "+00:00"

[scheduler]
# Hours between scheduled runs
interval_hours = 4
# Runs older than this are treated as crashed and recovered at startup
run_timeout_minutes = 30
# Days a published product stays excluded from re-selection
dedup_window_days = 3

[marketplace]
query = "best sellers"
# category = "electronics"
page_size = 10
# Products whose title matches any pattern are never published
# exclude_patterns = ["(?i)gift card", "(?i)subscription"]

[caption]
disclosure = "#ad"
# Empty uses the built-in hashtag set (#AmazonFinds, #BestDeals, ...)
# hashtags = ["#AmazonFinds", "#BestDeals"]
"##
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_and_negative_offsets() {
        assert_eq!(parse_utc_offset("+00:00").unwrap(), UtcOffset::UTC);
        assert_eq!(
            parse_utc_offset("+05:30").unwrap(),
            UtcOffset::from_hms(5, 30, 0).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-08:00").unwrap(),
            UtcOffset::from_hms(-8, 0, 0).unwrap()
        );
        assert_eq!(parse_utc_offset("UTC").unwrap(), UtcOffset::UTC);
        assert_eq!(parse_utc_offset("").unwrap(), UtcOffset::UTC);
    }

    #[test]
    fn rejects_malformed_offsets() {
        assert!(parse_utc_offset("05:30").is_err());
        assert!(parse_utc_offset("+0530").is_err());
        assert!(parse_utc_offset("+aa:bb").is_err());
        assert!(parse_utc_offset("+99:00").is_err());
    }

    #[test]
    fn example_toml_parses_into_defaults() {
        let parsed: AppConfig = config::Config::builder()
            .add_source(config::File::from_str(
                &AppConfig::example_toml(),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(parsed.general.admin_id, "default");
        assert_eq!(parsed.scheduler.interval_hours, 4);
        assert_eq!(parsed.scheduler.dedup_window_days, 3);
        assert_eq!(parsed.marketplace.page_size, 10);
        assert_eq!(parsed.caption.disclosure, "#ad");
        assert!(parsed.general.timezone_offset().is_ok());
    }
}
