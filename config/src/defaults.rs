//! # Library Defaults
//!
//! Built-in defaults shipped with the configuration library and the seam
//! through which fixtures contribute their own.

use crate::properties::{PropertySet, PropertySource};
use platform_errors::Result;

/// Application defaults every platform instance starts from.
pub const LIBRARY_DEFAULT_PROPERTIES: &[(&str, &str)] = &[
    ("persistent.bus.external.tableName", "bus_ext_events"),
    (
        "persistent.bus.external.historyTableName",
        "bus_ext_events_history",
    ),
];

/// Process-wide defaults every platform instance starts from.
pub const LIBRARY_DEFAULT_PROCESS_PROPERTIES: &[(&str, &str)] =
    &[("user.timezone", "UTC"), ("file.encoding", "UTF-8")];

/// Source of default property sets.
///
/// Implementations typically start from [`LibraryDefaults`] and layer their
/// own values on top with a higher [`PropertySource`].
pub trait DefaultsProvider {
    /// Application defaults. Recomputed on every call.
    fn default_properties(&self) -> Result<PropertySet>;

    /// Process-wide defaults.
    fn default_process_properties(&self) -> PropertySet;
}

/// The library's own built-in defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibraryDefaults;

impl DefaultsProvider for LibraryDefaults {
    fn default_properties(&self) -> Result<PropertySet> {
        let mut props = PropertySet::with_capacity(LIBRARY_DEFAULT_PROPERTIES.len());
        props.extend(
            LIBRARY_DEFAULT_PROPERTIES.iter().copied(),
            PropertySource::LibraryDefault,
        );
        Ok(props)
    }

    fn default_process_properties(&self) -> PropertySet {
        let mut props = PropertySet::with_capacity(LIBRARY_DEFAULT_PROCESS_PROPERTIES.len());
        props.extend(
            LIBRARY_DEFAULT_PROCESS_PROPERTIES.iter().copied(),
            PropertySource::LibraryDefault,
        );
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_defaults_are_lowest_priority() {
        let props = LibraryDefaults.default_properties().unwrap();
        assert_eq!(
            props.get_with_source("persistent.bus.external.tableName"),
            Some(("bus_ext_events", PropertySource::LibraryDefault))
        );
        assert_eq!(props.len(), LIBRARY_DEFAULT_PROPERTIES.len());
    }

    #[test]
    fn test_library_process_defaults() {
        let props = LibraryDefaults.default_process_properties();
        assert_eq!(props.get("user.timezone"), Some("UTC"));
        assert_eq!(props.get("file.encoding"), Some("UTF-8"));
    }
}
