//! Test support for an embedded billing platform instance.
//!
//! Provides the configuration a test platform boots with:
//! - Database connection properties read from an embedded database handle
//! - Fast polling for the notification queue and persistent buses
//! - Temporary plugin bundle directories
//! - Caller overrides on top of all defaults

pub mod config_source;
pub mod db;
pub mod logging;
pub mod settings;
pub mod temp_dirs;

pub use config_source::{AssemblyPhase, TestConfigSource};
pub use db::{DatabaseHandle, DatabaseHandleProvider, StaticDatabaseProvider};
pub use logging::init_test_logging;
pub use platform_config::{PropertyConfigSource, PropertySet, PropertySource};
pub use platform_errors::{ConfigError, Result};
pub use settings::{TempDirPolicy, TestSettings};
pub use temp_dirs::{BundleDirs, TempDirAllocator};
