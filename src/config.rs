use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub review: ReviewConfig,
    pub target: TargetConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API credential
    pub bot_token: String,
    /// Long-poll hold time in seconds
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_poll_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Privileged reviewer: always in the fan-out, treated like any other
    /// reviewer outwardly, but the only identity allowed to pull archives.
    pub oversight_id: i64,
    /// Ordinary reviewer identities
    #[serde(default)]
    pub reviewer_ids: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Destination chat for accepted submissions
    pub chat_id: i64,
    /// Optional sub-destination (topic). 0 is a valid topic id; only an
    /// absent value means "no topic".
    #[serde(default)]
    pub topic_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-submitter cooldown window in seconds
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

fn default_cooldown() -> u64 {
    30
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for registry snapshots
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Directory for the archival sink
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
    /// How long resolution records are retained for "already handled"
    /// answers before being pruned at startup
    #[serde(default = "default_retention")]
    pub resolution_retention_secs: u64,
}

fn default_state_dir() -> String {
    "state".to_string()
}

fn default_archive_dir() -> String {
    "archive".to_string()
}

fn default_retention() -> u64 {
    7 * 24 * 3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            archive_dir: default_archive_dir(),
            resolution_retention_secs: default_retention(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("limits.cooldown_secs", 30)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Override with environment variables (MODRELAY_TELEGRAM__BOT_TOKEN, etc.)
            .add_source(
                Environment::with_prefix("MODRELAY")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Identities allowed to resolve submissions (reviewers plus oversight).
    pub fn authorized_reviewers(&self) -> HashSet<i64> {
        let mut set: HashSet<i64> = self.review.reviewer_ids.iter().copied().collect();
        set.insert(self.review.oversight_id);
        set
    }

    /// Fan-out targets in config order, oversight included, deduplicated.
    pub fn fanout_targets(&self) -> Vec<i64> {
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for &id in self
            .review
            .reviewer_ids
            .iter()
            .chain(std::iter::once(&self.review.oversight_id))
        {
            if seen.insert(id) {
                targets.push(id);
            }
        }
        targets
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.telegram.bot_token.trim().is_empty() {
            errors.push("telegram.bot_token must be set".to_string());
        }
        if self.target.chat_id == 0 {
            errors.push("target.chat_id must be set".to_string());
        }
        if self.review.oversight_id == 0 {
            errors.push("review.oversight_id must be set".to_string());
        }
        if self.limits.cooldown_secs == 0 {
            errors.push("limits.cooldown_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            telegram: TelegramConfig {
                bot_token: "123:abc".to_string(),
                poll_timeout_secs: 30,
            },
            review: ReviewConfig {
                oversight_id: 1,
                reviewer_ids: vec![2, 3, 1],
            },
            target: TargetConfig {
                chat_id: -100,
                topic_id: None,
            },
            limits: LimitsConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    #[test]
    fn test_fanout_targets_dedup_and_include_oversight() {
        let config = base_config();
        assert_eq!(config.fanout_targets(), vec![2, 3, 1]);

        let mut no_oversight_listed = base_config();
        no_oversight_listed.review.reviewer_ids = vec![2, 3];
        assert_eq!(no_oversight_listed.fanout_targets(), vec![2, 3, 1]);
    }

    #[test]
    fn test_authorized_includes_oversight() {
        let mut config = base_config();
        config.review.reviewer_ids = vec![2];
        let authorized = config.authorized_reviewers();
        assert!(authorized.contains(&1));
        assert!(authorized.contains(&2));
        assert!(!authorized.contains(&3));
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let mut config = base_config();
        config.telegram.bot_token = "".to_string();
        let errors = config.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("bot_token")));
    }

    #[test]
    fn test_topic_zero_is_a_value() {
        let mut config = base_config();
        config.target.topic_id = Some(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.target.topic_id, Some(0));
    }
}
