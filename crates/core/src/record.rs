//! Record types extracted from the site.
//!
//! The site distinguishes *publications* (a concrete printing, with
//! ISBN, publisher and format) from *titles* (the abstract work, with
//! language, synopsis and rating). Searches yield [`SearchStub`]s, the
//! detail parsers yield [`PublicationRecord`] and [`TitleRecord`], and
//! the merge step folds a pair of them into one [`BookRecord`].

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use serde::Serialize;

/// Identifier key for publication record ids.
pub const ID_PUBLICATION: &str = "isfdb";
/// Identifier key for title record ids.
pub const ID_TITLE: &str = "isfdb-title";
/// Identifier key for publisher catalog ids.
pub const ID_CATALOG: &str = "isfdb-catalog";

/// Map of record type names (as shown on the site) to the tags they
/// contribute to a merged record.
static TYPE_TO_TAG: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("ANTHOLOGY", "anthology"),
        ("CHAPBOOK", "chapbook"),
        ("COLLECTION", "collection"),
        ("ESSAY", "essay"),
        ("FANZINE", "fanzine"),
        ("MAGAZINE", "magazine"),
        ("NONFICTION", "non-fiction"),
        ("NOVEL", "novel"),
        ("OMNIBUS", "omnibus"),
        ("POEM", "poem"),
        ("SERIAL", "serial"),
        ("SHORTFICTION", "short fiction"),
    ])
});

/// Returns the tags a record type contributes, comma-split and trimmed.
pub fn tags_for_type(record_type: &str) -> Vec<String> {
    TYPE_TO_TAG
        .get(record_type)
        .map(|tags| tags.split(',').map(|t| t.trim().to_string()).collect())
        .unwrap_or_default()
}

/// How relevant a search hit is to the query that produced it.
///
/// Lower is better. Candidates found through an id lookup or an exact
/// normalized title match rank first, ISBN hits second, everything else
/// last.
pub type Relevance = u8;

pub const RELEVANCE_EXACT: Relevance = 0;
pub const RELEVANCE_ISBN: Relevance = 1;
pub const RELEVANCE_OTHER: Relevance = 2;

/// One search hit.
///
/// The result-list parser fills in everything except `relevance`, which
/// the orchestrator assigns after comparing the stub's title with the
/// query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStub {
    pub title: String,
    /// Detail URL; rows without a link yield `None` and are skipped by
    /// the orchestrator.
    pub url: Option<String>,
    pub authors: Vec<String>,
    /// Free-text date column, used only for ordering.
    pub date: String,
    pub relevance: Relevance,
}

/// A series membership with its numeric position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub name: String,
    pub index: Option<f64>,
    /// Set when the printed series number was lossy (roman numeral,
    /// double issue) and the conversion deserves a comment.
    pub note: Option<String>,
}

/// Everything extracted from a publication page (`pl.cgi`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublicationRecord {
    pub id: String,
    pub title: String,
    /// Credited authors; editors carry an `" (Editor)"` suffix.
    pub authors: Vec<String>,
    /// First credited author, kept for fallback title lookups.
    pub author_string: Option<String>,
    pub record_type: Option<String>,
    pub format: Option<String>,
    pub publisher: Option<String>,
    pub series: Option<SeriesInfo>,
    pub cover_url: Option<String>,
    /// Identifier map: isbn, isbn-10/isbn-13 pairs, catalog and
    /// external ids keyed by their lowercase catalog abbreviation.
    pub identifiers: BTreeMap<String, String>,
    pub pubdate: Option<NaiveDateTime>,
    pub tags: Vec<String>,
    /// Comment fragments in page order, joined by the merge step.
    pub comments: Vec<String>,
    /// The title record this publication belongs to, when the page
    /// links one.
    pub title_id: Option<String>,
}

/// Everything extracted from a title page (`title.cgi`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct TitleRecord {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    /// Length category shown for short fiction ("novella", "short story").
    pub length: Option<String>,
    pub record_type: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub series: Option<SeriesInfo>,
    /// ISO 639-2 code of the work's language.
    pub language: Option<String>,
    pub webpages: Vec<String>,
    /// Rating on the host's 5-star scale.
    pub rating: Option<f64>,
    pub tags: Vec<String>,
    pub comments: Vec<String>,
    /// Title id of the canonical title when this one is a variant.
    pub variant_of: Option<String>,
    /// Publications of this title, in page order.
    pub publication_ids: Vec<String>,
}

/// The reconciled record handed back to callers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BookRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub pubdate: Option<NaiveDateTime>,
    pub publisher: Option<String>,
    pub series: Option<String>,
    pub series_index: Option<f64>,
    pub identifiers: BTreeMap<String, String>,
    pub tags: Vec<String>,
    pub comments: Option<String>,
    pub rating: Option<f64>,
    pub language: Option<String>,
    pub cover_url: Option<String>,
    /// Sort key: lower is a better match for the query.
    pub relevance: Relevance,
}

impl BookRecord {
    /// Gets the publication record id, if the record has one.
    pub fn publication_id(&self) -> Option<&str> {
        self.identifiers.get(ID_PUBLICATION).map(String::as_str)
    }

    /// Gets the title record id, if the record has one.
    pub fn title_id(&self) -> Option<&str> {
        self.identifiers.get(ID_TITLE).map(String::as_str)
    }
}
