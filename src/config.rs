use std::env;

use crate::table::DEFAULT_PAGE_SIZE;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the device backend, without trailing slash
    pub api_url: String,
    /// Initial rows per table page
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self::from_vars(
            env::var("DEVICE_API_URL").ok(),
            env::var("DEVICE_PAGE_SIZE").ok(),
        )
    }

    fn from_vars(api_url: Option<String>, page_size: Option<String>) -> Self {
        let api_url = api_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let page_size = page_size
            .and_then(|p| p.trim().parse::<usize>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        Self { api_url, page_size }
    }

    /// Apply a command-line `--api-url`, which wins over the environment.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        self
    }
}
