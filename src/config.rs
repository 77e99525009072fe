use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const DEFAULT_TEST_SIZE: usize = 50;
pub const MAX_TEST_SIZE: usize = 250;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub images_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub test_size: usize,
    pub wipe_password_hash: Option<String>,
    pub update: UpdateConfig,
}

#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub feed_url: Option<String>,
    pub current_version: String,
    pub asset_suffix: String,
    pub check_interval_hours: u64,
    pub startup_delay_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let test_size: usize = get_env_parse_or("TEST_SIZE", DEFAULT_TEST_SIZE)?;
        if test_size == 0 || test_size > MAX_TEST_SIZE {
            return Err(Error::Config(format!(
                "TEST_SIZE must be between 1 and {}",
                MAX_TEST_SIZE
            )));
        }

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "127.0.0.1:8379"),
            database_url: get_env_or("DATABASE_URL", "sqlite://test_questions.db?mode=rwc"),
            images_dir: PathBuf::from(get_env_or("IMAGES_DIR", "images")),
            backup_dir: PathBuf::from(get_env_or("BACKUP_DIR", "backups")),
            test_size,
            wipe_password_hash: non_empty_env("WIPE_PASSWORD_HASH"),
            update: UpdateConfig {
                feed_url: non_empty_env("UPDATE_FEED_URL"),
                current_version: env!("CARGO_PKG_VERSION").to_string(),
                asset_suffix: get_env_or("UPDATE_ASSET_SUFFIX", default_asset_suffix()),
                check_interval_hours: get_env_parse_or("UPDATE_CHECK_INTERVAL_HOURS", 24)?,
                startup_delay_secs: get_env_parse_or("UPDATE_STARTUP_DELAY_SECS", 3)?,
            },
        })
    }
}

fn default_asset_suffix() -> &'static str {
    if cfg!(windows) {
        ".exe"
    } else {
        ""
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
