//! Configuration for gatekeeperd

use crate::error::{DaemonError, DaemonResult};
use gatekeeper_ledger::LedgerLayout;
use gatekeeper_types::{CommunityId, FieldLimits, UserId};
use gatekeeper_workflow::WorkflowSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatekeeperConfig {
    /// Community, reviewer and role
    #[serde(default)]
    pub community: CommunityConfig,

    /// Verify form settings
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Ledger column layout and formulas
    #[serde(default)]
    pub ledger: LedgerLayout,

    /// Cooldowns, timeouts and field lengths
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityConfig {
    /// Community the role lives in
    #[serde(default = "default_community_id")]
    pub id: u64,

    /// User who receives post and publish notices
    #[serde(default = "default_reviewer")]
    pub reviewer: u64,

    /// Role granted on verification and required to publish
    #[serde(default = "default_role_name")]
    pub role_name: String,

    /// Users who already hold the role when the daemon starts
    #[serde(default)]
    pub role_holders: Vec<u64>,
}

impl Default for CommunityConfig {
    fn default() -> Self {
        Self {
            id: default_community_id(),
            reviewer: default_reviewer(),
            role_name: default_role_name(),
            role_holders: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationConfig {
    /// Phrase the acknowledgment field must match, ignoring case
    #[serde(default = "default_confirmation_phrase")]
    pub confirmation_phrase: String,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            confirmation_phrase: default_confirmation_phrase(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Per user and command; 0 disables cooldowns
    #[serde(default = "default_cooldown")]
    pub command_cooldown_secs: u64,

    /// Bound on every ledger, role and transport call
    #[serde(default = "default_call_timeout")]
    pub external_call_timeout_ms: u64,

    #[serde(default = "default_title_max")]
    pub title_max: usize,

    #[serde(default = "default_description_max")]
    pub description_max: usize,

    #[serde(default = "default_url_max")]
    pub url_max: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            command_cooldown_secs: default_cooldown(),
            external_call_timeout_ms: default_call_timeout(),
            title_max: default_title_max(),
            description_max: default_description_max(),
            url_max: default_url_max(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_community_id() -> u64 {
    1
}

fn default_reviewer() -> u64 {
    1
}

fn default_role_name() -> String {
    "Registered Creator".to_string()
}

fn default_confirmation_phrase() -> String {
    "I Agree".to_string()
}

fn default_cooldown() -> u64 {
    5
}

fn default_call_timeout() -> u64 {
    10_000
}

fn default_title_max() -> usize {
    100
}

fn default_description_max() -> usize {
    1000
}

fn default_url_max() -> usize {
    2048
}

fn default_log_level() -> String {
    "info".to_string()
}

impl GatekeeperConfig {
    /// Load configuration: defaults, then `path` if given, then
    /// `GATEKEEPER_*` environment variables (`__` separates sections).
    pub fn load(path: Option<&str>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&GatekeeperConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GATEKEEPER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DaemonResult<()> {
        if self.community.role_name.trim().is_empty() {
            return Err(DaemonError::InvalidConfig(
                "community.role_name must not be empty".to_string(),
            ));
        }
        if self.verification.confirmation_phrase.trim().is_empty() {
            return Err(DaemonError::InvalidConfig(
                "verification.confirmation_phrase must not be empty".to_string(),
            ));
        }
        if self.limits.external_call_timeout_ms == 0 {
            return Err(DaemonError::InvalidConfig(
                "limits.external_call_timeout_ms must be positive".to_string(),
            ));
        }
        self.ledger.validate()?;
        Ok(())
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.limits.external_call_timeout_ms)
    }

    pub fn community_id(&self) -> CommunityId {
        CommunityId::new(self.community.id)
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings::new(self.community_id(), UserId::new(self.community.reviewer))
            .with_role_name(self.community.role_name.trim())
            .with_confirmation_phrase(self.verification.confirmation_phrase.trim())
            .with_command_cooldown(Duration::from_secs(self.limits.command_cooldown_secs))
            .with_external_call_timeout(self.call_timeout())
            .with_limits(FieldLimits {
                title: self.limits.title_max,
                description: self.limits.description_max,
                url: self.limits.url_max,
            })
    }
}
