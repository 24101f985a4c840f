//! URL templates and record-kind detection for the ISFDB site.
//!
//! All outbound requests go to a small fixed set of CGI endpoints. The
//! base URL is configurable so tests can point the whole pipeline at a
//! local mock server.

use std::sync::LazyLock;

use regex::Regex;

/// Default base URL of the live site.
pub const DEFAULT_BASE_URL: &str = "https://www.isfdb.org";

static TRAILING_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)$").unwrap());

/// Resolved endpoint set for one site instance.
#[derive(Debug, Clone)]
pub struct Site {
    base: String,
}

impl Site {
    pub fn new(base_url: &str) -> Self {
        Self { base: base_url.trim_end_matches('/').to_string() }
    }

    /// Advanced search endpoint (field/operator/term triples).
    pub fn advanced_search_url(&self) -> String {
        format!("{}/cgi-bin/adv_search_results.cgi?", self.base)
    }

    /// Simple search endpoint (single `arg` parameter), usable without
    /// a logged-in session.
    pub fn simple_search_url(&self) -> String {
        format!("{}/cgi-bin/se.cgi?", self.base)
    }

    pub fn publication_url(&self, id: &str) -> String {
        format!("{}/cgi-bin/pl.cgi?{id}", self.base)
    }

    pub fn title_url(&self, id: &str) -> String {
        format!("{}/cgi-bin/title.cgi?{id}", self.base)
    }

    pub fn series_url(&self, id: &str) -> String {
        format!("{}/cgi-bin/pe.cgi?{id}", self.base)
    }

    pub fn title_covers_url(&self, title_id: &str) -> String {
        format!("{}/cgi-bin/titlecovers.cgi?{title_id}", self.base)
    }

    /// Resolves a page-relative href against the site base.
    pub fn absolute(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with('/') {
            format!("{}{href}", self.base)
        } else {
            format!("{}/{href}", self.base)
        }
    }

    pub fn is_publication_url(&self, url: &str) -> bool {
        url.contains("/cgi-bin/pl.cgi?")
    }

    pub fn is_title_url(&self, url: &str) -> bool {
        url.contains("/cgi-bin/title.cgi?")
    }

    /// Author pages share the link shape of series pages; a "series"
    /// link pointing here must not be followed as a series.
    pub fn is_author_url(&self, url: &str) -> bool {
        url.contains("/cgi-bin/ea.cgi?")
    }
}

/// Extracts the trailing numeric record id from a detail URL.
pub fn id_from_url(url: &str) -> Option<String> {
    TRAILING_ID.captures(url).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_templates() {
        let site = Site::new("https://www.isfdb.org/");
        assert_eq!(site.publication_url("675613"), "https://www.isfdb.org/cgi-bin/pl.cgi?675613");
        assert_eq!(site.title_url("41896"), "https://www.isfdb.org/cgi-bin/title.cgi?41896");
        assert!(site.advanced_search_url().ends_with("adv_search_results.cgi?"));
    }

    #[test]
    fn test_record_kind_detection() {
        let site = Site::new(DEFAULT_BASE_URL);
        assert!(site.is_publication_url("https://www.isfdb.org/cgi-bin/pl.cgi?1"));
        assert!(site.is_title_url("https://www.isfdb.org/cgi-bin/title.cgi?2"));
        assert!(!site.is_title_url("https://www.isfdb.org/cgi-bin/pl.cgi?1"));
        assert!(site.is_author_url("https://www.isfdb.org/cgi-bin/ea.cgi?249"));
    }

    #[test]
    fn test_absolute() {
        let site = Site::new(DEFAULT_BASE_URL);
        assert_eq!(
            site.absolute("/cgi-bin/pe.cgi?186"),
            "https://www.isfdb.org/cgi-bin/pe.cgi?186"
        );
        assert_eq!(
            site.absolute("https://www.isfdb.org/cgi-bin/pe.cgi?186"),
            "https://www.isfdb.org/cgi-bin/pe.cgi?186"
        );
    }

    #[test]
    fn test_id_from_url() {
        assert_eq!(id_from_url("https://www.isfdb.org/cgi-bin/pl.cgi?675613"), Some("675613".into()));
        assert_eq!(id_from_url("https://www.isfdb.org/cgi-bin/index.cgi"), None);
    }
}
