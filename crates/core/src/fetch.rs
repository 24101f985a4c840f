//! Page fetching.
//!
//! All requests are synchronous; the orchestrator runs one plain thread
//! per candidate record, so a blocking client keeps the workers simple.
//! Responses come back as raw bytes because the site serves ISO-8859-1
//! and the decode happens in [`crate::parse::Document::parse_bytes`].

use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use crate::error::{Error, Result};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 30,
            user_agent: "Mozilla/5.0 (compatible; Fabula/1.0; +https://github.com/stormlightlabs/fabula)"
                .to_string(),
        }
    }
}

/// A fetched page: the URL the server actually delivered plus the raw
/// body bytes.
///
/// Searches with a single hit redirect straight to the record page, so
/// callers need the final URL to tell a result list from a record.
#[derive(Debug)]
pub struct Page {
    pub url: String,
    pub bytes: Vec<u8>,
}

/// Blocking HTTP client shared by searches and record fetches.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Creates a fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(Error::Http)?;
        Ok(Self { client, config })
    }

    /// Fetches a URL and returns the final URL and body bytes.
    ///
    /// Redirects are followed; the returned URL is the one the last
    /// response came from.
    pub fn get(&self, url: &str) -> Result<Page> {
        let parsed_url = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let response = self
            .client
            .get(parsed_url)
            .header("User-Agent", &self.config.user_agent)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout { timeout: self.config.timeout }
                } else {
                    Error::Http(e)
                }
            })?;

        let final_url = response.url().to_string();
        let bytes = response.bytes()?.to_vec();
        Ok(Page { url: final_url, bytes })
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        // The default config always builds a valid client.
        Self::new(FetchConfig::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 30);
        assert!(config.user_agent.contains("Fabula"));
    }

    #[test]
    fn test_get_invalid_url() {
        let fetcher = Fetcher::default();
        let result = fetcher.get("not-a-url");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
