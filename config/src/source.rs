//! # Property Config Source
//!
//! The effective configuration of a platform instance: values from the base
//! configuration file, backed by installed defaults.

use crate::defaults::DefaultsProvider;
use crate::file_loader::{ConfigFileError, load_from_file, resolve_location};
use crate::properties::{PropertySet, describe_entry};
use platform_errors::{ConfigError, Result};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Base configuration source.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Loads the base configuration file (if any) and resolves lookups against
/// it first, falling back to the defaults installed by
/// [`populate_defaults`](Self::populate_defaults). Defaults never shadow a
/// value from the file.
///
/// ## Usage
/// ```rust
/// use platform_config::{LibraryDefaults, PropertyConfigSource};
///
/// let mut source = PropertyConfigSource::from_location(None).unwrap();
/// source.populate_defaults(&LibraryDefaults).unwrap();
/// assert_eq!(
///     source.get_string("persistent.bus.external.tableName"),
///     Some("bus_ext_events")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct PropertyConfigSource {
    location: Option<PathBuf>,
    file: PropertySet,
    defaults: PropertySet,
    process_defaults: PropertySet,
}

impl PropertyConfigSource {
    /// Load the base configuration from `location`, or start empty when no
    /// location is given.
    ///
    /// ## Error Handling
    /// Returns `ConfigError::Initialization` when the location is malformed
    /// or the file cannot be read or parsed.
    pub fn from_location(location: Option<&str>) -> Result<Self> {
        let Some(location) = location else {
            return Ok(Self::default());
        };

        let path = resolve_location(location).map_err(|e| file_error(location, e))?;
        let file = load_from_file(&path).map_err(|e| file_error(location, e))?;

        tracing::info!(
            "Base configuration loaded from {} ({} properties)",
            path.display(),
            file.len()
        );

        Ok(Self {
            location: Some(path),
            file,
            ..Self::default()
        })
    }

    /// Build a source from properties already in memory.
    pub fn from_properties(file: PropertySet) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Replace the installed defaults with a fresh computation from
    /// `provider`.
    pub fn populate_defaults<D>(&mut self, provider: &D) -> Result<()>
    where
        D: DefaultsProvider + ?Sized,
    {
        let defaults = provider.default_properties()?;
        let process_defaults = provider.default_process_properties();

        let changes: Vec<String> = defaults
            .iter_with_source()
            .filter(|(key, value, _)| self.defaults.get(key) != Some(*value))
            .map(|(key, value, source)| {
                format!("{} ({})", describe_entry(key, value), source.description())
            })
            .collect();
        let shadowed = defaults
            .keys()
            .filter(|key| self.file.contains_key(key))
            .count();

        if !changes.is_empty() {
            tracing::trace!("Default properties changed: {:?}", changes);
        }
        tracing::debug!(
            "Installed {} default properties ({} shadowed by file), {} process defaults",
            defaults.len(),
            shadowed,
            process_defaults.len()
        );

        self.defaults = defaults;
        self.process_defaults = process_defaults;
        Ok(())
    }

    /// Look up a property, file first.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.file.get(key).or_else(|| self.defaults.get(key))
    }

    /// Look up and parse a property.
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// `ConfigError::InvalidValue` when it does not parse.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_string(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Effective configuration: defaults with file values merged on top.
    pub fn properties(&self) -> PropertySet {
        let mut merged = self.defaults.clone();
        merged.merge(&self.file);
        merged
    }

    pub fn file_properties(&self) -> &PropertySet {
        &self.file
    }

    pub fn default_properties(&self) -> &PropertySet {
        &self.defaults
    }

    pub fn process_properties(&self) -> &PropertySet {
        &self.process_defaults
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

fn file_error(location: &str, error: ConfigFileError) -> ConfigError {
    ConfigError::initialization_caused_by(
        format!("cannot load base configuration from {:?}", location),
        error,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::LibraryDefaults;
    use crate::properties::PropertySource;
    use std::fs;
    use tempfile::TempDir;

    struct FixedDefaults(Vec<(&'static str, &'static str)>);

    impl DefaultsProvider for FixedDefaults {
        fn default_properties(&self) -> Result<PropertySet> {
            let mut props = LibraryDefaults.default_properties()?;
            props.extend(self.0.iter().copied(), PropertySource::PlatformDefault);
            Ok(props)
        }

        fn default_process_properties(&self) -> PropertySet {
            LibraryDefaults.default_process_properties()
        }
    }

    #[test]
    fn test_from_location_none_is_empty() {
        let source = PropertyConfigSource::from_location(None).unwrap();
        assert!(source.file_properties().is_empty());
        assert!(source.location().is_none());
        assert_eq!(source.get_string("dao.url"), None);
    }

    #[test]
    fn test_file_values_win_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("killbill.properties");
        fs::write(&path, "notificationq.main.sleep=3000\n").unwrap();

        let mut source =
            PropertyConfigSource::from_location(Some(path.to_str().unwrap())).unwrap();
        source
            .populate_defaults(&FixedDefaults(vec![
                ("notificationq.main.sleep", "100"),
                ("notificationq.main.nbThreads", "1"),
            ]))
            .unwrap();

        assert_eq!(source.get_string("notificationq.main.sleep"), Some("3000"));
        assert_eq!(source.get_string("notificationq.main.nbThreads"), Some("1"));

        let effective = source.properties();
        assert_eq!(
            effective.get_with_source("notificationq.main.sleep"),
            Some(("3000", PropertySource::File))
        );
        assert_eq!(source.location(), Some(path.as_path()));
    }

    #[test]
    fn test_populate_defaults_replaces_previous_defaults() {
        let mut source = PropertyConfigSource::default();
        source
            .populate_defaults(&FixedDefaults(vec![("osgi.root.dir", "/tmp/first")]))
            .unwrap();
        source
            .populate_defaults(&FixedDefaults(vec![
                ("osgi.root.dir", "/tmp/second"),
                ("dao.url", "jdbc:test"),
            ]))
            .unwrap();

        assert_eq!(source.get_string("osgi.root.dir"), Some("/tmp/second"));
        assert_eq!(source.get_string("dao.url"), Some("jdbc:test"));
        assert_eq!(
            source.default_properties().get("osgi.root.dir"),
            Some("/tmp/second")
        );
        assert_eq!(
            source.process_properties().get("user.timezone"),
            Some("UTC")
        );
    }

    #[test]
    fn test_get_parsed() {
        let mut file = PropertySet::new();
        file.set("notificationq.main.nbThreads", "4", PropertySource::File);
        file.set("notificationq.main.sleep", "soon", PropertySource::File);
        let source = PropertyConfigSource::from_properties(file);

        assert_eq!(
            source.get_parsed::<u32>("notificationq.main.nbThreads").unwrap(),
            Some(4)
        );
        assert_eq!(source.get_parsed::<u32>("missing").unwrap(), None);

        let err = source
            .get_parsed::<u64>("notificationq.main.sleep")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "notificationq.main.sleep"));
    }

    #[test]
    fn test_malformed_location_is_initialization_error() {
        let err = PropertyConfigSource::from_location(Some("")).unwrap_err();
        assert!(err.is_initialization());

        let err =
            PropertyConfigSource::from_location(Some("ftp://host/killbill.properties")).unwrap_err();
        assert!(err.is_initialization());
    }

    #[test]
    fn test_missing_file_is_initialization_error() {
        let err = PropertyConfigSource::from_location(Some("/nonexistent/killbill.properties"))
            .unwrap_err();
        assert!(err.is_initialization());
    }
}
