//! # Test Settings
//!
//! Knobs of the test fixture itself, loaded from environment variables.
//!
//! # Environment Variables
//! - `PLATFORM_TEST_TEMP_ROOT`: parent directory for bundle directories
//!   (default: OS temp dir)
//! - `PLATFORM_TEST_TEMP_PREFIX`: name prefix of bundle directories
//!   (default: "platform-test-")
//! - `PLATFORM_TEST_TEMP_DIR_POLICY`: `per-call` or `per-instance`
//!   (default: `per-call`)
//! - `PLATFORM_TEST_KEEP_TEMP_DIRS`: keep bundle directories after the
//!   fixture is dropped (true/false, default: false)

use platform_errors::{ConfigError, Result};
use std::env;
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::str::FromStr;
use validator::Validate;

pub const ENV_TEMP_ROOT: &str = "PLATFORM_TEST_TEMP_ROOT";
pub const ENV_TEMP_PREFIX: &str = "PLATFORM_TEST_TEMP_PREFIX";
pub const ENV_TEMP_DIR_POLICY: &str = "PLATFORM_TEST_TEMP_DIR_POLICY";
pub const ENV_KEEP_TEMP_DIRS: &str = "PLATFORM_TEST_KEEP_TEMP_DIRS";

/// When bundle directories are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempDirPolicy {
    /// Fresh directories on every application-defaults computation.
    #[default]
    PerCall,

    /// One pair of directories for the lifetime of the fixture.
    PerInstance,
}

impl FromStr for TempDirPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-call" | "per_call" => Ok(Self::PerCall),
            "per-instance" | "per_instance" => Ok(Self::PerInstance),
            other => Err(format!(
                "expected 'per-call' or 'per-instance', got '{}'",
                other
            )),
        }
    }
}

impl Display for TempDirPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerCall => f.write_str("per-call"),
            Self::PerInstance => f.write_str("per-instance"),
        }
    }
}

/// Fixture settings.
///
/// ## Validation
/// - `temp_prefix`: 1-64 characters, no path separators
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct TestSettings {
    /// Parent directory for bundle directories
    pub temp_root: Option<PathBuf>,

    /// Name prefix of bundle directories
    #[validate(length(min = 1, max = 64), custom(function = "validate_temp_prefix"))]
    pub temp_prefix: String,

    pub temp_dir_policy: TempDirPolicy,

    /// Leave bundle directories on disk when the fixture is dropped
    pub keep_temp_dirs: bool,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            temp_root: None,
            temp_prefix: "platform-test-".to_string(),
            temp_dir_policy: TempDirPolicy::default(),
            keep_temp_dirs: false,
        }
    }
}

impl TestSettings {
    /// Load settings from `PLATFORM_TEST_*` environment variables, falling
    /// back to defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let settings = Self {
            temp_root: env::var_os(ENV_TEMP_ROOT)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            temp_prefix: env::var(ENV_TEMP_PREFIX).unwrap_or(defaults.temp_prefix),
            temp_dir_policy: parse_env(ENV_TEMP_DIR_POLICY)?.unwrap_or(defaults.temp_dir_policy),
            keep_temp_dirs: parse_env(ENV_KEEP_TEMP_DIRS)?.unwrap_or(defaults.keep_temp_dirs),
        };
        settings.check()?;
        Ok(settings)
    }

    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    pub fn with_temp_dir_policy(mut self, policy: TempDirPolicy) -> Self {
        self.temp_dir_policy = policy;
        self
    }

    /// Validate, mapping failures to `ConfigError::Initialization`.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| ConfigError::initialization_caused_by("invalid test settings", e))
    }
}

fn validate_temp_prefix(value: &str) -> std::result::Result<(), validator::ValidationError> {
    if value.contains(['/', '\\']) {
        return Err(validator::ValidationError::new(
            "Temp prefix must not contain path separators",
        ));
    }
    Ok(())
}

fn parse_env<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
            .map_err(|e| ConfigError::initialization_caused_by("invalid test settings", e)),
        Err(_) => Ok(None),
    }
}
