use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::agent::DEFAULT_AGENT_API_URL;

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub jobs_path: PathBuf,
    pub profiles_path: PathBuf,
    pub cv_upload_dir: PathBuf,
    pub agent_api_url: String,
    pub agent_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: env_or("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            jobs_path: env_or("JOBS_PATH", "data/jobs.json").into(),
            profiles_path: env_or("PROFILES_PATH", "data/profiles.json").into(),
            cv_upload_dir: env_or("CV_UPLOAD_DIR", "uploads/cvs").into(),
            agent_api_url: env_or("AGENT_API_URL", DEFAULT_AGENT_API_URL),
            agent_timeout_secs: env_or("AGENT_TIMEOUT_SECS", "60")
                .parse::<u64>()
                .context("AGENT_TIMEOUT_SECS must be a whole number of seconds")?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
