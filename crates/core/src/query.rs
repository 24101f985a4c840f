//! Search query construction.
//!
//! The advanced search endpoint takes numbered field/operator/term
//! triples joined by explicit conjunctions; the simple endpoint takes a
//! single `arg`. Both expect ISO-8859-1 percent-encoding, handled by
//! [`crate::encoding::encode_term`]. Parameter order is stable so the
//! URLs are reproducible in logs and tests.

use crate::config::SearchOperator;
use crate::encoding::encode_term;
use crate::site::Site;

/// Record type selector of an advanced search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchType {
    Publication,
    Title,
}

impl SearchType {
    fn as_str(self) -> &'static str {
        match self {
            SearchType::Publication => "Publication",
            SearchType::Title => "Title",
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            SearchType::Publication => "pub_title",
            SearchType::Title => "title_title",
        }
    }
}

/// Ordered parameter list for one advanced search.
struct AdvancedQuery {
    search_type: SearchType,
    params: Vec<(String, String)>,
    fields: usize,
}

impl AdvancedQuery {
    fn new(search_type: SearchType) -> Self {
        Self { search_type, params: Vec::new(), fields: 0 }
    }

    fn field(mut self, use_field: &str, operator: &str, term: &str) -> Self {
        self.fields += 1;
        let n = self.fields;
        self.params.push((format!("USE_{n}"), use_field.to_string()));
        self.params.push((format!("OPERATOR_{n}"), operator.to_string()));
        self.params.push((format!("TERM_{n}"), encode_term(term)));
        self
    }

    fn into_url(mut self, site: &Site) -> String {
        // Multi-field searches need explicit AND conjunctions.
        for n in 1..self.fields {
            self.params.push((format!("CONJUNCTION_{n}"), "AND".to_string()));
        }
        self.params.push(("ORDERBY".to_string(), self.search_type.order_by().to_string()));
        self.params.push(("START".to_string(), "0".to_string()));
        self.params.push(("TYPE".to_string(), self.search_type.as_str().to_string()));

        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}{}", site.advanced_search_url(), query)
    }
}

/// Builds a publication search for an exact ISBN.
pub fn publications_by_isbn(site: &Site, isbn: &str) -> String {
    AdvancedQuery::new(SearchType::Publication)
        .field("pub_isbn", "exact", isbn)
        .into_url(site)
}

/// Builds a publication search on title and/or author.
///
/// Either term may be empty; an empty term contributes no field.
pub fn publications_by_title_author(
    site: &Site,
    title: &str,
    author: &str,
    operator: SearchOperator,
) -> String {
    let mut query = AdvancedQuery::new(SearchType::Publication);
    if !title.is_empty() {
        query = query.field("pub_title", operator.as_query_value(), title);
    }
    if !author.is_empty() {
        query = query.field("author_canonical", "contains", author);
    }
    query.into_url(site)
}

/// Builds a title search on title and/or author.
pub fn titles_by_title_author(
    site: &Site,
    title: &str,
    author: &str,
    operator: SearchOperator,
) -> String {
    let mut query = AdvancedQuery::new(SearchType::Title);
    if !title.is_empty() {
        query = query.field("title_title", operator.as_query_value(), title);
    }
    if !author.is_empty() {
        query = query.field("author_canonical", "contains", author);
    }
    query.into_url(site)
}

/// Builds an exact title search narrowed to a record type.
///
/// The title must match exactly; the author, when given, is a contains
/// match because the site's canonical author form may carry initials
/// the caller does not have.
pub fn titles_by_exact_title(site: &Site, title: &str, author: &str, record_type: &str) -> String {
    let mut query = AdvancedQuery::new(SearchType::Title).field("title_title", "exact", title);
    if !author.is_empty() {
        query = query.field("author_canonical", "contains", author);
    }
    query.field("title_ttype", "exact", record_type).into_url(site)
}

/// Builds a simple search usable when advanced searches are refused.
///
/// The endpoint honours only `arg` and `type`; filtering on author,
/// type and language happens client-side on the result list.
pub fn simple_title_search(site: &Site, title: &str) -> String {
    format!("{}arg={}&type=All+Titles", site.simple_search_url(), encode_term(title))
}
