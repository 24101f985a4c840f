//! Lookup configuration.
//!
//! [`SearchConfig`] collects every user-tunable knob of the pipeline:
//! which record types to search, how many candidates to keep, how
//! series and series numbers are folded into the result, and which
//! language to filter on. Defaults match the behaviour most users want
//! out of the box.

use crate::site::DEFAULT_BASE_URL;

/// Conjunction applied between search terms in an advanced query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchOperator {
    /// Terms must contain the word (substring word match).
    #[default]
    Contains,
    /// Terms must match the field exactly.
    ExactMatch,
}

impl SearchOperator {
    pub(crate) fn as_query_value(self) -> &'static str {
        match self {
            SearchOperator::Contains => "contains",
            SearchOperator::ExactMatch => "exact",
        }
    }
}

/// Policy for deriving a series index from magazine Vol/No/Issue notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeriesIndexPolicy {
    /// Combine volume and number as `vol + no / 100`, fraction capped
    /// below 1 so the volume ordering survives.
    #[default]
    VolumeAndNumber,
    /// Use the whole-issue number alone.
    IssueNumberOnly,
}

/// Configuration for a metadata lookup session.
///
/// # Example
///
/// ```rust
/// use fabula_core::SearchConfig;
///
/// let config = SearchConfig::builder()
///     .max_results(10)
///     .search_titles(false)
///     .target_language("ger")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of search result stubs to keep per search
    /// (default: 25).
    pub max_results: usize,

    /// Maximum number of cover URLs returned by a cover lookup
    /// (default: 10).
    pub max_covers: usize,

    /// Whether publication records are searched (default: true).
    pub search_publications: bool,

    /// Whether title records are searched (default: true).
    pub search_titles: bool,

    /// Word-match operator for advanced search terms (default: contains).
    pub search_operator: SearchOperator,

    /// Whether a sub-series name is folded into its parent series
    /// (default: false).
    pub combine_series: bool,

    /// Separator used when folding series names (default: ". ").
    pub combine_series_with: String,

    /// Tags removed from merged results, lowercase (default: empty).
    pub unwanted_tags: Vec<String>,

    /// ISO 639-2 code of the only language kept in title searches
    /// (default: "eng").
    pub target_language: String,

    /// How magazine Vol/No notes become a series index (default:
    /// volume-and-number).
    pub series_index_policy: SeriesIndexPolicy,

    /// Two-letter country code used to pick between per-locale ASIN
    /// links (default: "us").
    pub locale_country: String,

    /// Base URL of the site, overridable for testing.
    pub base_url: String,

    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 25,
            max_covers: 10,
            search_publications: true,
            search_titles: true,
            search_operator: SearchOperator::default(),
            combine_series: false,
            combine_series_with: ". ".to_string(),
            unwanted_tags: Vec::new(),
            target_language: "eng".to_string(),
            series_index_policy: SeriesIndexPolicy::default(),
            locale_country: "us".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SearchConfig {
    /// Creates a new builder for SearchConfig.
    pub fn builder() -> SearchConfigBuilder {
        SearchConfigBuilder::new()
    }
}

/// Builder for SearchConfig.
///
/// # Example
///
/// ```rust
/// use fabula_core::{SearchConfig, SearchOperator};
///
/// let config = SearchConfig::builder()
///     .search_operator(SearchOperator::ExactMatch)
///     .combine_series(true)
///     .build();
/// ```
pub struct SearchConfigBuilder {
    config: SearchConfig,
}

impl SearchConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: SearchConfig::default() }
    }

    /// Sets the maximum number of search results kept per search.
    pub fn max_results(mut self, value: usize) -> Self {
        self.config.max_results = value;
        self
    }

    /// Sets the maximum number of cover URLs returned.
    pub fn max_covers(mut self, value: usize) -> Self {
        self.config.max_covers = value;
        self
    }

    /// Sets whether publication records are searched.
    pub fn search_publications(mut self, value: bool) -> Self {
        self.config.search_publications = value;
        self
    }

    /// Sets whether title records are searched.
    pub fn search_titles(mut self, value: bool) -> Self {
        self.config.search_titles = value;
        self
    }

    /// Sets the advanced-search term operator.
    pub fn search_operator(mut self, value: SearchOperator) -> Self {
        self.config.search_operator = value;
        self
    }

    /// Sets whether sub-series names are folded into their parent.
    pub fn combine_series(mut self, value: bool) -> Self {
        self.config.combine_series = value;
        self
    }

    /// Sets the separator used when folding series names.
    pub fn combine_series_with(mut self, value: impl Into<String>) -> Self {
        self.config.combine_series_with = value.into();
        self
    }

    /// Sets the tags removed from merged results.
    pub fn unwanted_tags(mut self, value: Vec<String>) -> Self {
        self.config.unwanted_tags = value.iter().map(|t| t.to_lowercase()).collect();
        self
    }

    /// Sets the ISO 639-2 code kept in title searches.
    pub fn target_language(mut self, value: impl Into<String>) -> Self {
        self.config.target_language = value.into();
        self
    }

    /// Sets the magazine series-index policy.
    pub fn series_index_policy(mut self, value: SeriesIndexPolicy) -> Self {
        self.config.series_index_policy = value;
        self
    }

    /// Sets the country code used to pick per-locale ASIN links.
    pub fn locale_country(mut self, value: impl Into<String>) -> Self {
        self.config.locale_country = value.into();
        self
    }

    /// Sets the base URL of the site.
    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.config.base_url = value.into();
        self
    }

    /// Sets the per-request timeout in seconds.
    pub fn timeout_secs(mut self, value: u64) -> Self {
        self.config.timeout_secs = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> SearchConfig {
        self.config
    }
}

impl Default for SearchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
