//! # Property Sets
//!
//! Ordered string-keyed configuration with source tracking.
//!
//! # Precedence Order
//! 1. Base configuration file (highest priority)
//! 2. Caller overrides
//! 3. Platform derived defaults
//! 4. Library defaults (lowest priority)

use indexmap::IndexMap;
use serde::{Serialize, Serializer};

/// Origin of a property value.
///
/// Variants are declared from lowest to highest priority, so the derived
/// `Ord` is the precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertySource {
    /// Built-in defaults shipped with the configuration library
    LibraryDefault,

    /// Defaults derived by the platform (database, queue tuning, directories)
    PlatformDefault,

    /// Values supplied by the caller
    Override,

    /// Values read from the base configuration file
    File,
}

impl PropertySource {
    pub const fn description(self) -> &'static str {
        match self {
            Self::LibraryDefault => "library default",
            Self::PlatformDefault => "platform default",
            Self::Override => "caller override",
            Self::File => "configuration file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    value: String,
    source: PropertySource,
}

/// Insertion-ordered property mapping.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Holds configuration key/value pairs together with the source that wrote
/// each one. A write never replaces a value coming from a higher-priority
/// source; a write from the same or a higher source replaces it in place.
///
/// ## Usage
/// ```rust
/// use platform_config::{PropertySet, PropertySource};
///
/// let mut props = PropertySet::new();
/// props.set("dao.url", "jdbc:test", PropertySource::PlatformDefault);
/// props.set("dao.url", "jdbc:custom", PropertySource::Override);
/// assert!(!props.set("dao.url", "jdbc:lib", PropertySource::LibraryDefault));
/// assert_eq!(props.get("dao.url"), Some("jdbc:custom"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: IndexMap<String, Entry>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Set a property, honouring source priority.
    ///
    /// Returns `true` if the value was written.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
        source: PropertySource,
    ) -> bool {
        let key = key.into();

        if let Some(existing) = self.entries.get_mut(&key) {
            if existing.source > source {
                return false;
            }
            existing.value = value.into();
            existing.source = source;
            return true;
        }

        self.entries.insert(
            key,
            Entry {
                value: value.into(),
                source,
            },
        );
        true
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|e| e.value.as_str())
    }

    pub fn get_with_source(&self, key: &str) -> Option<(&str, PropertySource)> {
        self.entries
            .get(key)
            .map(|e| (e.value.as_str(), e.source))
    }

    pub fn source_of(&self, key: &str) -> Option<PropertySource> {
        self.entries.get(key).map(|e| e.source)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a property regardless of its source, keeping the order of the
    /// remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key).map(|e| e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str()))
    }

    pub fn iter_with_source(&self) -> impl Iterator<Item = (&str, &str, PropertySource)> {
        self.entries
            .iter()
            .map(|(k, e)| (k.as_str(), e.value.as_str(), e.source))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge another set into this one, entry by entry, keeping each entry's
    /// own source.
    ///
    /// Returns the keys whose value changed.
    pub fn merge(&mut self, other: &PropertySet) -> Vec<String> {
        let mut changed = Vec::new();
        for (key, entry) in &other.entries {
            let before = self.get(key).map(str::to_owned);
            if self.set(key.clone(), entry.value.clone(), entry.source)
                && before.as_deref() != Some(entry.value.as_str())
            {
                changed.push(key.clone());
            }
        }
        changed
    }

    /// Write every pair with the same source.
    pub fn extend<I, K, V>(&mut self, iter: I, source: PropertySource)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in iter {
            self.set(key, value, source);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PropertySet
where
    K: Into<String>,
    V: Into<String>,
{
    /// Collected pairs are treated as caller overrides.
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut props = Self::new();
        props.extend(iter, PropertySource::Override);
        props
    }
}

impl Serialize for PropertySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// Whether a key holds a secret that must not appear in logs.
pub fn is_secret_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.contains("password") || lower.contains("secret")
}

/// Render `key = value` for logging, masking secrets.
pub fn describe_entry(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        format!("{} = ***", key)
    } else {
        format!("{} = {}", key, value)
    }
}
