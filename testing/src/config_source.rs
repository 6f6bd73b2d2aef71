//! # Test Configuration Source
//!
//! Assembles the default configuration of an embedded platform instance for
//! tests: database connection properties, fast queue/bus polling and
//! temporary plugin bundle directories, with caller overrides on top.

use crate::db::{DatabaseHandle, DatabaseHandleProvider};
use crate::settings::TestSettings;
use crate::temp_dirs::TempDirAllocator;
use platform_config::{
    DefaultsProvider, LibraryDefaults, PropertyConfigSource, PropertySet, PropertySource,
};
use platform_errors::{ConfigError, Result};
use std::fmt::{self, Display};
use std::str::FromStr;

pub const DAO_URL: &str = "dao.url";
pub const OSGI_DAO_URL: &str = "osgi.dao.url";
pub const DAO_USER: &str = "dao.user";
pub const OSGI_DAO_USER: &str = "osgi.dao.user";
pub const DAO_PASSWORD: &str = "dao.password";
pub const OSGI_DAO_PASSWORD: &str = "osgi.dao.password";
pub const OSGI_ROOT_DIR: &str = "osgi.root.dir";
pub const OSGI_BUNDLE_INSTALL_DIR: &str = "osgi.bundle.install.dir";

/// Queues and buses polled faster than in production.
pub const QUEUE_TUNING_PREFIXES: &[&str] = &[
    "notificationq.main",
    "persistent.bus.main",
    "persistent.bus.external",
];

/// Per-queue tuning applied under each of [`QUEUE_TUNING_PREFIXES`].
pub const QUEUE_TUNING: &[(&str, &str)] = &[
    ("sleep", "100"),
    ("nbThreads", "1"),
    ("claimed", "1"),
    ("queue.mode", "STICKY_POLLING"),
];

pub const PROCESS_DEFAULTS: &[(&str, &str)] = &[
    ("ehcache.skipUpdateCheck", "true"),
    ("slf4j.simpleLogger.showDateTime", "true"),
];

/// Construction phase in which defaults were installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyPhase {
    /// Before the database handle is known.
    Bootstrap,

    /// After the database handle and overrides are stored.
    Ready,
}

impl Display for AssemblyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => f.write_str("bootstrap"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

/// Defaults contributed by the test platform on top of the library's.
#[derive(Debug)]
struct PlatformDefaults {
    handle: DatabaseHandle,
    overrides: PropertySet,
    temp_dirs: TempDirAllocator,
}

impl DefaultsProvider for PlatformDefaults {
    fn default_properties(&self) -> Result<PropertySet> {
        let mut props = LibraryDefaults.default_properties()?;
        let platform = PropertySource::PlatformDefault;

        if let Some(url) = self.handle.connection_string() {
            props.set(DAO_URL, url, platform);
            props.set(OSGI_DAO_URL, url, platform);
        }
        if let Some(user) = self.handle.username() {
            props.set(DAO_USER, user, platform);
            props.set(OSGI_DAO_USER, user, platform);
        }
        if let Some(password) = self.handle.password() {
            props.set(DAO_PASSWORD, password, platform);
            props.set(OSGI_DAO_PASSWORD, password, platform);
        }

        for prefix in QUEUE_TUNING_PREFIXES {
            for (name, value) in QUEUE_TUNING {
                props.set(format!("{}.{}", prefix, name), *value, platform);
            }
        }

        let dirs = self.temp_dirs.bundle_dirs()?;
        props.set(OSGI_ROOT_DIR, dirs.root, platform);
        props.set(OSGI_BUNDLE_INSTALL_DIR, dirs.install, platform);

        props.merge(&self.overrides);
        Ok(props)
    }

    fn default_process_properties(&self) -> PropertySet {
        let mut props = LibraryDefaults.default_process_properties();
        props.extend(
            PROCESS_DEFAULTS.iter().copied(),
            PropertySource::PlatformDefault,
        );
        props
    }
}

/// Configuration source for an embedded platform under test.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Produces the application defaults and process defaults a test platform
/// starts with, and the effective configuration (base file over defaults).
///
/// ## Construction
/// 1. Load the base configuration file, if any.
/// 2. Install defaults computed without database information
///    ([`AssemblyPhase::Bootstrap`]).
/// 3. Invoke the provider factory with the bootstrap configuration.
/// 4. Store the provider's [`DatabaseHandle`] and the overrides.
/// 5. Install database-aware defaults ([`AssemblyPhase::Ready`]).
///
/// ## Usage
/// ```rust
/// use platform_test::{DatabaseHandle, StaticDatabaseProvider, TestConfigSource};
///
/// let handle = DatabaseHandle::default().with_connection_string("jdbc:test");
/// let source = TestConfigSource::new(
///     None,
///     |_bootstrap| Ok(StaticDatabaseProvider::new(handle)),
///     [("dao.url", "jdbc:custom")],
/// )
/// .unwrap();
///
/// let defaults = source.application_defaults().unwrap();
/// assert_eq!(defaults.get("dao.url"), Some("jdbc:custom"));
/// assert_eq!(defaults.get("osgi.dao.url"), Some("jdbc:test"));
/// ```
///
/// ## Temporary Directories
/// Under the default [`TempDirPolicy::PerCall`](crate::TempDirPolicy) every
/// [`application_defaults`](Self::application_defaults) call creates two new
/// bundle directories, so `osgi.root.dir` differs between calls. All
/// directories are removed when the source is dropped unless
/// `keep_temp_dirs` is set.
#[derive(Debug)]
pub struct TestConfigSource {
    base: PropertyConfigSource,
    defaults: PlatformDefaults,
}

impl TestConfigSource {
    /// No base file, no overrides.
    pub fn for_provider<F, P>(factory: F) -> Result<Self>
    where
        F: FnOnce(&PropertyConfigSource) -> anyhow::Result<P>,
        P: DatabaseHandleProvider,
    {
        Self::new(None, factory, std::iter::empty::<(String, String)>())
    }

    /// Base file, no overrides.
    pub fn from_file<F, P>(file: Option<&str>, factory: F) -> Result<Self>
    where
        F: FnOnce(&PropertyConfigSource) -> anyhow::Result<P>,
        P: DatabaseHandleProvider,
    {
        Self::new(file, factory, std::iter::empty::<(String, String)>())
    }

    /// Assemble with settings taken from the environment.
    pub fn new<F, P, I, K, V>(file: Option<&str>, factory: F, overrides: I) -> Result<Self>
    where
        F: FnOnce(&PropertyConfigSource) -> anyhow::Result<P>,
        P: DatabaseHandleProvider,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::with_settings(file, factory, overrides, TestSettings::from_env()?)
    }

    pub fn with_settings<F, P, I, K, V>(
        file: Option<&str>,
        factory: F,
        overrides: I,
        settings: TestSettings,
    ) -> Result<Self>
    where
        F: FnOnce(&PropertyConfigSource) -> anyhow::Result<P>,
        P: DatabaseHandleProvider,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        settings.check()?;

        let mut base = PropertyConfigSource::from_location(file)?;
        let mut defaults = PlatformDefaults {
            handle: DatabaseHandle::default(),
            overrides: PropertySet::new(),
            temp_dirs: TempDirAllocator::new(&settings),
        };
        install(&mut base, &defaults, AssemblyPhase::Bootstrap)?;

        let provider = factory(&base).map_err(|e| {
            ConfigError::initialization_caused_by("database handle provider factory failed", e)
        })?;
        defaults.handle = provider.instance().clone();
        defaults.overrides = overrides.into_iter().collect();

        tracing::info!(
            "Database handle acquired: {:?} ({} overrides)",
            defaults.handle,
            defaults.overrides.len()
        );

        install(&mut base, &defaults, AssemblyPhase::Ready)?;

        Ok(Self { base, defaults })
    }

    /// Freshly merged application defaults.
    ///
    /// Library defaults, then platform defaults, then overrides. Creates new
    /// bundle directories per the temp-dir policy. Under
    /// [`TempDirPolicy::PerCall`](crate::TempDirPolicy) each call adds two
    /// directories that stay on disk until the source is dropped or
    /// [`release_stale_temp_dirs`](Self::release_stale_temp_dirs) runs.
    pub fn application_defaults(&self) -> Result<PropertySet> {
        self.defaults.default_properties()
    }

    /// Process-wide defaults. Independent of the database handle.
    pub fn process_defaults(&self) -> PropertySet {
        self.defaults.default_process_properties()
    }

    /// Recompute defaults and install them into the effective
    /// configuration, picking up override changes.
    pub fn refresh_defaults(&mut self) -> Result<()> {
        install(&mut self.base, &self.defaults, AssemblyPhase::Ready)
    }

    pub fn database_handle(&self) -> &DatabaseHandle {
        &self.defaults.handle
    }

    pub fn overrides(&self) -> &PropertySet {
        &self.defaults.overrides
    }

    /// Visible on the next [`application_defaults`](Self::application_defaults)
    /// call, and in the effective configuration after
    /// [`refresh_defaults`](Self::refresh_defaults).
    pub fn set_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.defaults
            .overrides
            .set(key, value, PropertySource::Override);
    }

    pub fn remove_override(&mut self, key: &str) -> Option<String> {
        self.defaults.overrides.remove(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.base.get_string(key)
    }

    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.base.get_parsed(key)
    }

    /// Effective configuration: base file values over installed defaults.
    pub fn properties(&self) -> PropertySet {
        self.base.properties()
    }

    pub fn base(&self) -> &PropertyConfigSource {
        &self.base
    }

    /// Remove owned bundle directories that are not installed in the
    /// effective configuration. Paths from earlier
    /// [`application_defaults`](Self::application_defaults) results become
    /// dangling. Returns how many directories were removed.
    pub fn release_stale_temp_dirs(&self) -> usize {
        let installed = self.base.default_properties();
        let keep: Vec<&str> = [OSGI_ROOT_DIR, OSGI_BUNDLE_INSTALL_DIR]
            .into_iter()
            .filter_map(|key| installed.get(key))
            .collect();
        self.defaults.temp_dirs.release_except(&keep)
    }

    /// Bundle directories currently owned by this source.
    pub fn temp_dirs_held(&self) -> usize {
        self.defaults.temp_dirs.held()
    }
}

fn install(
    base: &mut PropertyConfigSource,
    defaults: &PlatformDefaults,
    phase: AssemblyPhase,
) -> Result<()> {
    base.populate_defaults(defaults)?;
    tracing::debug!(
        "Defaults installed ({} phase, {} default properties)",
        phase,
        base.default_properties().len()
    );
    Ok(())
}
