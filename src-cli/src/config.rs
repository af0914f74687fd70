//! Client configuration
//!
//! One recognized option: the analysis service base URL. A CLI flag beats
//! the environment variable, which beats the built-in default.

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";
pub const API_URL_ENV: &str = "SPEAKTRAINER_API_URL";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
}

impl Config {
    pub fn resolve(cli_url: Option<String>) -> Self {
        let api_base_url = cli_url
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        tracing::debug!("Using analysis service at {}", api_base_url);
        Self { api_base_url }
    }
}
