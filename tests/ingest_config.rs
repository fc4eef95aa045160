// tests/ingest_config.rs
use newswire_ingest::ingest::config::{AppConfig, DEFAULT_CONFIG_PATH, ENV_CONFIG_PATH};
use std::{env, fs};

#[test]
fn partial_toml_keeps_defaults_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("newswire.toml");
    fs::write(
        &p,
        r#"
[source]
page_capacity = 20
max_pages = 5

[dedup.near_duplicate]
enabled = true
threshold = 0.9

[schedule]
incremental_categories = ["COPPER", "ZINC"]

[classifier.priority]
min_score = 2
"#,
    )
    .unwrap();

    let cfg = AppConfig::load_from(&p).unwrap();
    assert_eq!(cfg.source.page_capacity, 20);
    assert_eq!(cfg.source.max_pages, Some(5));
    assert_eq!(cfg.source.max_page_capacity, 100);
    assert_eq!(cfg.source.max_attempts, 3);
    assert!(cfg.dedup.near_duplicate.enabled);
    assert_eq!(cfg.dedup.near_duplicate.window_hours, 24);
    assert_eq!(cfg.schedule.incremental_categories, ["COPPER", "ZINC"]);
    assert_eq!(cfg.classifier.priority.min_score, Some(2));
    assert_eq!(cfg.classifier.priority.keywords.get("lme"), Some(&3));
    assert!(cfg.classifier.category("copper").is_some());
}

#[test]
fn invalid_values_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [
        ("cap.toml", "[source]\npage_capacity = 200\n"),
        ("attempts.toml", "[source]\nmax_attempts = 0\n"),
        ("threshold.toml", "[dedup.near_duplicate]\nthreshold = 1.5\n"),
        ("hour.toml", "[schedule]\ndaily_batch_hour = 24\n"),
    ] {
        let p = dir.path().join(name);
        fs::write(&p, body).unwrap();
        assert!(AppConfig::load_from(&p).is_err(), "{name} should be rejected");
    }
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallback() {
    // isolate cwd so the test never reads a real config/ directory
    let old = env::current_dir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    env::remove_var(ENV_CONFIG_PATH);

    let cfg = AppConfig::load_default().unwrap();
    assert_eq!(cfg.source.page_capacity, 50);

    fs::create_dir_all("config").unwrap();
    fs::write(DEFAULT_CONFIG_PATH, "[source]\npage_capacity = 10\n").unwrap();
    assert_eq!(AppConfig::load_default().unwrap().source.page_capacity, 10);

    let explicit = dir.path().join("other.toml");
    fs::write(&explicit, "[source]\npage_capacity = 7\n").unwrap();
    env::set_var(ENV_CONFIG_PATH, &explicit);
    assert_eq!(AppConfig::load_default().unwrap().source.page_capacity, 7);

    env::set_var(ENV_CONFIG_PATH, dir.path().join("missing.toml"));
    assert!(AppConfig::load_default().is_err());

    env::remove_var(ENV_CONFIG_PATH);
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn shipped_example_config_is_valid() {
    let cfg = AppConfig::load_from(std::path::Path::new("config/newswire.example.toml")).unwrap();
    assert_eq!(cfg.schedule.incremental_categories.len(), 4);
    assert_eq!(cfg.classifier.priority.category_min_score.get("COPPER"), Some(&2));
    assert!(cfg.metrics.listen_addr.is_none());
}
