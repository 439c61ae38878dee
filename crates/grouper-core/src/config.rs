use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::types::UserId;

const DEFAULT_AUTO_APPROVE_RANKS: [&str; 6] = ["ראל", "אלף", "תאל", "אלם", "סאל", "רסן"];
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 7200;
const DEFAULT_DIRECTORY_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default, rename = "auto-approve-ranks")]
    auto_approve_ranks: Option<Vec<String>>,
    #[serde(default, rename = "default-approver-ids")]
    default_approver_ids: Vec<UserId>,
    #[serde(default, rename = "approver-cache")]
    approver_cache: Option<RawApproverCache>,
    #[serde(default)]
    directory: Option<RawDirectory>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawApproverCache {
    #[serde(default, rename = "refresh-interval-secs")]
    refresh_interval_secs: Option<u64>,
    #[serde(default, rename = "max-staleness-secs")]
    max_staleness_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawDirectory {
    #[serde(default, rename = "timeout-secs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApproverCacheConfig {
    refresh_interval: Duration,
    max_staleness: Duration,
}

impl Default for ApproverCacheConfig {
    fn default() -> Self {
        let refresh_interval = Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS);
        Self {
            refresh_interval,
            max_staleness: refresh_interval * 2,
        }
    }
}

impl ApproverCacheConfig {
    /// # Errors
    ///
    /// Fails when the interval is zero or the staleness window is shorter
    /// than one refresh interval.
    pub fn new(refresh_interval: Duration, max_staleness: Duration) -> Result<Self, ConfigError> {
        if refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "approver-cache.refresh-interval-secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if max_staleness < refresh_interval {
            return Err(ConfigError::InvalidValue {
                field: "approver-cache.max-staleness-secs",
                reason: format!(
                    "{}s is shorter than the refresh interval of {}s",
                    max_staleness.as_secs(),
                    refresh_interval.as_secs()
                ),
            });
        }
        Ok(Self {
            refresh_interval,
            max_staleness,
        })
    }

    /// How often the default approvers are reloaded.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Age after which a snapshot is no longer served.
    #[must_use]
    pub fn max_staleness(&self) -> Duration {
        self.max_staleness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryConfig {
    timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_DIRECTORY_TIMEOUT_SECS),
        }
    }
}

impl DirectoryConfig {
    /// Upper bound on a single provisioning call.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Settings for the request workflows, usually read from `grouper.toml`.
///
/// ```toml
/// auto-approve-ranks = ["סאל", "רסן"]
/// default-approver-ids = ["5e5688324203fc40043591aa"]
///
/// [approver-cache]
/// refresh-interval-secs = 7200
///
/// [directory]
/// timeout-secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrouperConfig {
    auto_approve_ranks: Vec<String>,
    default_approver_ids: Vec<UserId>,
    approver_cache: ApproverCacheConfig,
    directory: DirectoryConfig,
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            auto_approve_ranks: DEFAULT_AUTO_APPROVE_RANKS
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_approver_ids: Vec::new(),
            approver_cache: ApproverCacheConfig::default(),
            directory: DirectoryConfig::default(),
        }
    }
}

impl GrouperConfig {
    /// Parses a configuration document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::InvalidValue`] for out-of-range durations.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::ParseFile`] if it is not a valid configuration.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cache = raw.approver_cache.unwrap_or_default();
        let refresh_interval = cache
            .refresh_interval_secs
            .map_or(defaults.approver_cache.refresh_interval, Duration::from_secs);
        let max_staleness = cache
            .max_staleness_secs
            .map_or(refresh_interval * 2, Duration::from_secs);
        let timeout = raw
            .directory
            .unwrap_or_default()
            .timeout_secs
            .map_or(defaults.directory.timeout, Duration::from_secs);
        if timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "directory.timeout-secs",
                reason: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            auto_approve_ranks: raw
                .auto_approve_ranks
                .unwrap_or(defaults.auto_approve_ranks),
            default_approver_ids: raw.default_approver_ids,
            approver_cache: ApproverCacheConfig::new(refresh_interval, max_staleness)?,
            directory: DirectoryConfig { timeout },
        })
    }

    /// Ranks whose requests skip the approver.
    #[must_use]
    pub fn auto_approve_ranks(&self) -> &[String] {
        &self.auto_approve_ranks
    }

    /// Whether a requester of this rank skips the approval step.
    ///
    /// Ranks coming from the identity provider may carry stray quotes.
    #[must_use]
    pub fn is_auto_approved(&self, rank: &str) -> bool {
        let rank = rank.replace('"', "");
        self.auto_approve_ranks.iter().any(|r| *r == rank)
    }

    /// Users accepted as approvers for any group.
    #[must_use]
    pub fn default_approver_ids(&self) -> &[UserId] {
        &self.default_approver_ids
    }

    /// Refresh settings for the default approver cache.
    #[must_use]
    pub fn approver_cache(&self) -> &ApproverCacheConfig {
        &self.approver_cache
    }

    /// Settings for calls to the directory service.
    #[must_use]
    pub fn directory(&self) -> &DirectoryConfig {
        &self.directory
    }

    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn with_auto_approve_ranks(mut self, ranks: &[&str]) -> Self {
        self.auto_approve_ranks = ranks.iter().map(ToString::to_string).collect();
        self
    }

    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn with_default_approver_ids(mut self, ids: Vec<UserId>) -> Self {
        self.default_approver_ids = ids;
        self
    }

    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn with_directory_timeout(mut self, timeout: Duration) -> Self {
        self.directory = DirectoryConfig { timeout };
        self
    }

    #[cfg(any(test, feature = "testing"))]
    #[must_use]
    pub fn with_approver_cache(mut self, approver_cache: ApproverCacheConfig) -> Self {
        self.approver_cache = approver_cache;
        self
    }
}
