//! # Platform Configuration
//!
//! Configuration primitives for the embedded billing platform.
//!
//! This crate provides:
//! - Ordered property sets with source tracking
//! - Configuration precedence (file > overrides > platform defaults > library
//!   defaults)
//! - Base configuration file loading (properties/TOML/YAML/JSON)
//! - The base config source that installs defaults under file values

pub mod defaults;
pub mod file_loader;
pub mod properties;
pub mod source;

pub use defaults::{DefaultsProvider, LibraryDefaults};
pub use file_loader::{ConfigFileError, load_from_file, resolve_location};
pub use platform_errors::{ConfigError, Result};
pub use properties::{PropertySet, PropertySource};
pub use source::PropertyConfigSource;
