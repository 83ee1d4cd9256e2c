use std::path::PathBuf;
use std::sync::Mutex;

use casework::config::Config;
use casework::config::secrets::ExposeSecret;
use casework::error::Error;
use casework::locator::DEFAULT_BASE_URL;

// Tests in this file mutate process-wide environment variables.
static ENV_LOCK: Mutex<()> = Mutex::new(());

const VARS: [&str; 5] = [
    "DATABASE_URL",
    "DATA_DIR",
    "CORPUS_BASE_URL",
    "OTEL_ENDPOINT",
    "LOG_LEVEL",
];

fn reset_env() {
    for var in VARS {
        unsafe { std::env::remove_var(var) };
    }
}

#[test]
fn config_from_env_loads_required_fields_and_defaults() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_env();
    unsafe { std::env::set_var("DATABASE_URL", "sqlite://findings.db") };

    let config = Config::from_env().unwrap();
    assert_eq!(config.database_url.expose_secret(), "sqlite://findings.db");
    assert_eq!(config.data_dir, PathBuf::from("data"));
    assert_eq!(config.corpus_base_url, DEFAULT_BASE_URL);
    assert_eq!(config.otel_endpoint, None);
    assert_eq!(config.log_level, "info");

    reset_env();
}

#[test]
fn config_from_env_reads_overrides() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_env();
    unsafe {
        std::env::set_var("DATABASE_URL", "sqlite::memory:");
        std::env::set_var("DATA_DIR", "/srv/catalog");
        std::env::set_var("CORPUS_BASE_URL", "http://mirror.local/files");
        std::env::set_var("OTEL_ENDPOINT", "http://localhost:4317");
        std::env::set_var("LOG_LEVEL", "DEBUG");
    }

    let config = Config::from_env().unwrap();
    assert_eq!(config.data_dir, PathBuf::from("/srv/catalog"));
    assert_eq!(config.corpus_base_url, "http://mirror.local/files");
    assert_eq!(config.otel_endpoint.as_deref(), Some("http://localhost:4317"));
    assert_eq!(config.log_level, "debug");

    reset_env();
}

#[test]
fn config_from_env_fails_without_required() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_env();

    assert!(matches!(Config::from_env(), Err(Error::Config(_))));
}

#[test]
fn config_from_env_rejects_unknown_log_level() {
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    reset_env();
    unsafe {
        std::env::set_var("DATABASE_URL", "sqlite::memory:");
        std::env::set_var("LOG_LEVEL", "loud");
    }

    assert!(matches!(Config::from_env(), Err(Error::Config(_))));

    reset_env();
}
