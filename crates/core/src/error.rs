//! Error types for fabula operations.
//!
//! [`Error`] covers everything that can go wrong while searching,
//! fetching and parsing ISFDB pages. Per-candidate failures are not
//! surfaced through the `identify` call itself — workers log and drop
//! them — but the individual fetch/parse helpers all return [`Result`].

use thiserror::Error;

/// Main error type for metadata lookup operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request errors from reqwest (network, DNS, connection).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Request exceeded the caller-supplied timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// A URL could not be parsed or does not belong to the site.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The URL is neither a publication nor a title detail page.
    #[error("Unrecognised record URL: {0}")]
    UnrecognisedUrl(String),

    /// HTML could not be parsed, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParse(String),

    /// A detail page yielded neither a title nor any authors.
    #[error("Insufficient metadata found for {0}")]
    InsufficientData(String),

    /// A record id could not be extracted from a page or URL.
    #[error("No record id in {0}")]
    MissingId(String),

    /// Cache dump could not be serialized or loaded.
    #[error("Cache serialization failed: {0}")]
    CacheFormat(#[from] serde_json::Error),
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
