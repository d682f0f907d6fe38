//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hubcrawl_github::config::{
    DEFAULT_API_URL, DEFAULT_WINDOW_MINUTES, MAX_PAGE_SIZE, SATURATION_THRESHOLD,
};
use hubcrawl_github::quota::DEFAULT_RESET_MARGIN;
use hubcrawl_github::{CrawlArgs, RetryPolicy};
use serde::Deserialize;

/// Global configuration for hubcrawl
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub github: GithubConfig,
    pub crawl: CrawlConfig,
    pub retry: RetryConfig,
    pub output: OutputConfig,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: std::env::var("GITHUB_TOKEN").ok(),
        }
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub periods: Vec<String>,
    pub window_minutes: u32,
    pub page_size: usize,
    pub saturation_threshold: usize,
    pub resume: bool,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            periods: Vec::new(),
            window_minutes: DEFAULT_WINDOW_MINUTES,
            page_size: MAX_PAGE_SIZE,
            saturation_threshold: SATURATION_THRESHOLD,
            resume: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_secs: u64,
    pub reset_margin_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_secs: policy.backoff.as_secs(),
            reset_margin_secs: DEFAULT_RESET_MARGIN.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data/github-profile"),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./hubcrawl.toml (current directory)
    /// 2. ~/.config/hubcrawl/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("hubcrawl.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "hubcrawl") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Library-facing crawl arguments. Token fallback and validation happen
    /// in the `Config` conversion on the library side.
    pub fn to_crawl_args(&self) -> CrawlArgs {
        CrawlArgs {
            api_url: self.github.api_url.clone(),
            token: self.github.token.clone(),
            periods: self.crawl.periods.clone(),
            window_minutes: self.crawl.window_minutes,
            page_size: self.crawl.page_size,
            saturation_threshold: self.crawl.saturation_threshold,
            resume: self.crawl.resume,
            max_attempts: self.retry.max_attempts,
            backoff_secs: self.retry.backoff_secs,
            reset_margin_secs: self.retry.reset_margin_secs,
            output_dir: self.output.dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.dir, PathBuf::from("./data/github-profile"));
        assert_eq!(config.crawl.window_minutes, 10);
        assert_eq!(config.crawl.page_size, 100);
        assert_eq!(config.crawl.saturation_threshold, 1000);
        assert!(config.crawl.resume);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_secs, 30);
        assert_eq!(config.retry.reset_margin_secs, 60);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("HUBCRAWL_TEST_VAR", "test_value");
        assert_eq!(
            expand_env_var("${HUBCRAWL_TEST_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("HUBCRAWL_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("ghp_literal"), Some("ghp_literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[github]
token = "ghp_inline"

[crawl]
periods = ["2021-01", "2022-01"]
window_minutes = 5
resume = false

[retry]
backoff_secs = 10

[output]
dir = "/tmp/profiles"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.github.token.as_deref(), Some("ghp_inline"));
        assert_eq!(config.crawl.periods, ["2021-01", "2022-01"]);
        assert_eq!(config.crawl.window_minutes, 5);
        assert_eq!(config.crawl.page_size, 100);
        assert!(!config.crawl.resume);
        assert_eq!(config.retry.backoff_secs, 10);
        assert_eq!(config.retry.max_attempts, 5);

        let args = config.to_crawl_args();
        assert_eq!(args.output_dir, PathBuf::from("/tmp/profiles"));
        assert_eq!(args.periods.len(), 2);
        assert!(!args.resume);
    }

    #[test]
    fn from_file_reports_path_on_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hubcrawl.toml");
        std::fs::write(&path, "[crawl]\nwindow_minutes = \"ten\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("hubcrawl.toml"));
    }

    #[test]
    fn debug_hides_token() {
        let config: Config = toml::from_str("[github]\ntoken = \"ghp_secret\"\n").unwrap();
        assert!(!format!("{config:?}").contains("ghp_secret"));
    }
}
