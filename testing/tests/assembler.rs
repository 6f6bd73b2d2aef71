use platform_test::config_source::{DAO_URL, OSGI_DAO_URL, OSGI_ROOT_DIR};
use platform_test::settings::{ENV_TEMP_DIR_POLICY, ENV_TEMP_ROOT};
use platform_test::{
    DatabaseHandle, DatabaseHandleProvider, PropertySource, StaticDatabaseProvider,
    TestConfigSource, TestSettings, init_test_logging,
};
use serial_test::serial;
use std::fs;
use std::sync::OnceLock;
use tempfile::TempDir;

fn embedded_db() -> &'static StaticDatabaseProvider {
    static DB: OnceLock<StaticDatabaseProvider> = OnceLock::new();
    DB.get_or_init(|| {
        StaticDatabaseProvider::new(
            DatabaseHandle::default()
                .with_connection_string("jdbc:test")
                .with_username("killbill")
                .with_password("killbill"),
        )
    })
}

fn settings(parent: &TempDir) -> TestSettings {
    TestSettings::default().with_temp_root(parent.path())
}

#[test]
fn test_override_wins_over_database_handle() {
    init_test_logging();
    let parent = TempDir::new().unwrap();

    let source = TestConfigSource::with_settings(
        None,
        |_| Ok(embedded_db()),
        [("dao.url", "jdbc:custom")],
        settings(&parent),
    )
    .unwrap();

    let defaults = source.application_defaults().unwrap();
    assert_eq!(defaults.get(DAO_URL), Some("jdbc:custom"));
    assert_eq!(defaults.get(OSGI_DAO_URL), Some("jdbc:test"));
    assert_eq!(source.get_string(DAO_URL), Some("jdbc:custom"));
}

#[test]
fn test_every_override_key_is_honoured() {
    let parent = TempDir::new().unwrap();
    let overrides = vec![
        ("dao.password", "other"),
        ("persistent.bus.main.queue.mode", "POLLING"),
        ("osgi.root.dir", "/opt/bundles"),
        ("brand.new.key", "value"),
    ];

    let source = TestConfigSource::with_settings(
        None,
        |_| Ok(embedded_db()),
        overrides.clone(),
        settings(&parent),
    )
    .unwrap();

    let defaults = source.application_defaults().unwrap();
    for (key, value) in overrides {
        assert_eq!(defaults.get(key), Some(value), "override for {}", key);
    }
}

#[test]
fn test_empty_handle_still_yields_process_defaults() {
    let parent = TempDir::new().unwrap();
    let source = TestConfigSource::with_settings(
        None,
        |_| Ok(StaticDatabaseProvider::default()),
        Vec::<(String, String)>::new(),
        settings(&parent),
    )
    .unwrap();

    assert!(source.database_handle().is_empty());

    let app = source.application_defaults().unwrap();
    assert!(!app.contains_key(DAO_URL));
    assert!(!app.contains_key(OSGI_DAO_URL));

    let process = source.process_defaults();
    assert_eq!(process.get("ehcache.skipUpdateCheck"), Some("true"));
    assert_eq!(process.get("slf4j.simpleLogger.showDateTime"), Some("true"));
}

#[test]
fn test_base_file_wins_in_effective_configuration() {
    let parent = TempDir::new().unwrap();
    let file = parent.path().join("killbill.properties");
    fs::write(
        &file,
        "dao.url=jdbc:from-file\nnotificationq.main.nbThreads=8\n",
    )
    .unwrap();

    let source = TestConfigSource::with_settings(
        Some(file.to_str().unwrap()),
        |_| Ok(embedded_db()),
        [("notificationq.main.nbThreads", "2")],
        settings(&parent),
    )
    .unwrap();

    assert_eq!(source.get_string(DAO_URL), Some("jdbc:from-file"));
    assert_eq!(
        source.get_parsed::<u32>("notificationq.main.nbThreads").unwrap(),
        Some(8)
    );

    let effective = source.properties();
    assert_eq!(
        effective.get_with_source(DAO_URL),
        Some(("jdbc:from-file", PropertySource::File))
    );
    assert_eq!(
        effective.get_with_source("dao.user"),
        Some(("killbill", PropertySource::PlatformDefault))
    );
}

#[test]
fn test_malformed_file_location_aborts_construction() {
    let parent = TempDir::new().unwrap();
    let mut factory_called = false;

    let result = TestConfigSource::with_settings(
        Some("https://example.com/killbill.properties"),
        |_| {
            factory_called = true;
            Ok(embedded_db())
        },
        Vec::<(String, String)>::new(),
        settings(&parent),
    );

    assert!(result.unwrap_err().is_initialization());
    assert!(!factory_called);
}

#[test]
fn test_provider_behind_trait_object() {
    let parent = TempDir::new().unwrap();
    let source = TestConfigSource::with_settings(
        None,
        |_| {
            let provider: Box<dyn DatabaseHandleProvider> = Box::new(embedded_db());
            Ok(provider)
        },
        Vec::<(String, String)>::new(),
        settings(&parent),
    )
    .unwrap();

    assert_eq!(source.database_handle().username(), Some("killbill"));
}

#[test]
fn test_bundle_dirs_cleaned_up_with_source() {
    let parent = TempDir::new().unwrap();
    let source = TestConfigSource::with_settings(
        None,
        |_| Ok(embedded_db()),
        Vec::<(String, String)>::new(),
        settings(&parent),
    )
    .unwrap();

    let root = source
        .application_defaults()
        .unwrap()
        .get(OSGI_ROOT_DIR)
        .map(str::to_owned)
        .unwrap();
    assert!(fs::metadata(&root).unwrap().is_dir());
    // bootstrap, ready and the call above each allocate a pair
    assert_eq!(source.temp_dirs_held(), 6);

    drop(source);
    assert!(fs::metadata(&root).is_err());
}

#[test]
#[serial]
fn test_for_provider_uses_defaults() {
    let source = TestConfigSource::for_provider(|_| Ok(embedded_db())).unwrap();

    assert!(source.overrides().is_empty());
    assert!(source.base().location().is_none());
    assert_eq!(source.get_string("dao.user"), Some("killbill"));
}

#[test]
#[serial]
fn test_from_file_with_toml_base() {
    let parent = TempDir::new().unwrap();
    let file = parent.path().join("platform.toml");
    fs::write(&file, "[persistent.bus.main]\nsleep = 2000\n").unwrap();

    let source =
        TestConfigSource::from_file(Some(file.to_str().unwrap()), |_| Ok(embedded_db())).unwrap();

    assert_eq!(source.get_string("persistent.bus.main.sleep"), Some("2000"));
    assert_eq!(
        source.application_defaults().unwrap().get("persistent.bus.main.sleep"),
        Some("100")
    );
}

#[test]
#[serial]
fn test_settings_from_environment() {
    let parent = TempDir::new().unwrap();
    unsafe {
        std::env::set_var(ENV_TEMP_ROOT, parent.path());
        std::env::set_var(ENV_TEMP_DIR_POLICY, "per-instance");
    }

    let source = TestConfigSource::new(
        None,
        |_| Ok(embedded_db()),
        Vec::<(String, String)>::new(),
    );

    unsafe {
        std::env::remove_var(ENV_TEMP_ROOT);
        std::env::remove_var(ENV_TEMP_DIR_POLICY);
    }

    let source = source.unwrap();
    let first = source.application_defaults().unwrap();
    let second = source.application_defaults().unwrap();

    assert_eq!(first.get(OSGI_ROOT_DIR), second.get(OSGI_ROOT_DIR));
    assert!(
        first
            .get(OSGI_ROOT_DIR)
            .unwrap()
            .starts_with(parent.path().to_str().unwrap())
    );
}
