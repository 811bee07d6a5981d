use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::{self, Credentials};
use crate::github::{PageOptions, RepoName};

const CONFIG_FILE: &str = ".pr-harvest.toml";
const CREDS_VAR: &str = "GITHUB_CREDS";
const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("GITHUB_CREDS must look like username:token")]
    MalformedCredentials,
}

/// Top-level configuration loaded from .pr-harvest.toml.
/// Every section is optional; the tool runs with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// Login sent along with the token. If unset, falls back to GITHUB_CREDS.
    pub username: Option<String>,
    /// Personal access token
    pub token: Option<String>,
    /// Defaults to https://api.github.com
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Retries after a network failure
    pub max_retries: u32,
    /// Minimum milliseconds between two requests; 0 disables the limit
    pub rate_limit_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            rate_limit_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub per_page: u32,
    /// Pages or pull requests in flight at once
    pub max_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            per_page: 100,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Root directory; entries go under `<dir>/<owner>/<repo>`.
    /// Defaults to `pr-harvest` in the system temp directory.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from .pr-harvest.toml in the current directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(CONFIG_FILE);
        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Config::default())
        }
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve credentials: both config file values take precedence,
    /// falls back to the GITHUB_CREDS env var. `None` means anonymous access.
    pub fn credentials(&self) -> Result<Option<Credentials>, ConfigError> {
        if let (Some(username), Some(token)) = (&self.github.username, &self.github.token) {
            return Ok(Some(Credentials::new(username, token)));
        }
        match std::env::var(CREDS_VAR) {
            Ok(raw) => parse_credentials(&raw).map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn api_url(&self) -> &str {
        self.github.api_url.as_deref().unwrap_or("https://api.github.com")
    }

    pub fn client_options(&self, log_requests: bool) -> Result<client::Options, ConfigError> {
        Ok(client::Options {
            credentials: self.credentials()?,
            rate_limit: Some(Duration::from_millis(self.client.rate_limit_ms)),
            max_retries: self.client.max_retries,
            log_requests,
        })
    }

    /// GitHub serves at most 100 items per page.
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            per_page: self.fetch.per_page.clamp(1, MAX_PER_PAGE),
            max_pages: None,
            max_concurrency: self.fetch.max_concurrency,
        }
    }

    /// Directory holding the cached pull requests of `repo`.
    pub fn cache_dir(&self, repo: &RepoName) -> PathBuf {
        let root = self
            .cache
            .dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("pr-harvest"));
        root.join(&repo.owner).join(&repo.name)
    }
}

/// Split `username:token`. The token may itself contain colons.
pub fn parse_credentials(raw: &str) -> Result<Credentials, ConfigError> {
    let (username, token) = raw
        .trim()
        .split_once(':')
        .ok_or(ConfigError::MalformedCredentials)?;
    if username.is_empty() || token.is_empty() {
        return Err(ConfigError::MalformedCredentials);
    }
    Ok(Credentials::new(username, token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoName {
        RepoName {
            owner: "octo".to_string(),
            name: "widgets".to_string(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert_eq!(config.api_url(), "https://api.github.com");
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.client.rate_limit_ms, 100);
        assert_eq!(config.fetch.per_page, 100);
        assert_eq!(config.fetch.max_concurrency, 8);
        assert!(config.cache.dir.is_none());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[github]
username = "alice"
token = "ghp_secret"
api_url = "https://github.example.com/api/v3"

[client]
rate_limit_ms = 0

[fetch]
per_page = 50

[cache]
dir = "/var/cache/prs"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_url(), "https://github.example.com/api/v3");
        assert_eq!(config.client.rate_limit_ms, 0);
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.fetch.per_page, 50);
        assert_eq!(config.fetch.max_concurrency, 8);
        assert_eq!(config.page_options().per_page, 50);
        assert_eq!(
            config.cache_dir(&repo()),
            PathBuf::from("/var/cache/prs/octo/widgets")
        );

        let credentials = config.credentials().unwrap().unwrap();
        assert_eq!(credentials.username, "alice");
    }

    #[test]
    fn test_per_page_clamped_to_github_maximum() {
        let mut config = Config::default();
        config.fetch.per_page = 200;
        assert_eq!(config.page_options().per_page, 100);

        config.fetch.per_page = 0;
        assert_eq!(config.page_options().per_page, 1);
    }

    #[test]
    fn test_default_cache_dir_is_per_repo() {
        let dir = Config::default().cache_dir(&repo());
        assert!(dir.starts_with(std::env::temp_dir()));
        assert!(dir.ends_with("pr-harvest/octo/widgets"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[github]\nusername = \"bob\"\ntoken = \"t\"\n\n[client]\nmax_retries = 7\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.client.max_retries, 7);
        let options = config.client_options(true).unwrap();
        assert_eq!(options.max_retries, 7);
        assert_eq!(options.rate_limit, Some(Duration::from_millis(100)));
        assert!(options.log_requests);
        assert_eq!(options.credentials.unwrap().username, "bob");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[client\nmax_retries = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_credentials() {
        let credentials = parse_credentials("alice:ghp_a:b").unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.token, "ghp_a:b");

        assert!(parse_credentials("alice").is_err());
        assert!(parse_credentials(":token").is_err());
        assert!(parse_credentials("alice:").is_err());
    }
}
