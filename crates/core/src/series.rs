//! Series page parsing.
//!
//! When a record names its series with a link, the series page has to
//! be fetched to learn whether the series is a sub-series of another.
//! The displayed name then depends on the combine-series configuration.
//! Author pages share the link shape of series pages and must be
//! recognized and skipped.

use tracing::debug;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::parse::Document;
use crate::text::clean_text;

/// Everything of interest on a series page.
#[derive(Debug, Clone, Default)]
pub struct SeriesPage {
    pub name: String,
    /// The owning series when this one declares "Sub-series of".
    pub parent: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub webpages: Option<String>,
}

/// Parses a series page (`pe.cgi`).
///
/// Returns `None` when the page is actually an author record, which the
/// site serves under a link shape indistinguishable from a series link.
pub fn parse_series_page(doc: &Document) -> Result<Option<SeriesPage>> {
    if doc.text_content().contains("Author Record #") {
        debug!("series link led to an author page");
        return Ok(None);
    }

    let mut page = SeriesPage::default();

    let mut lines = Vec::new();
    if let Some(content) = doc.select_first("div#content div.ContentBox")? {
        for run in content.br_runs() {
            lines.push(run.text);
        }
        for item in content.select("ul li")? {
            lines.push(clean_text(&item.text()));
        }
    }

    for line in &lines {
        if let Some(rest) = line.split_once("Publication Series:").map(|(_, r)| r) {
            page.name = clean_text(rest.split("Pub. Series Record #").next().unwrap_or(rest));
        } else if let Some(rest) = line.split_once("Series:").map(|(_, r)| r) {
            // "Series Tags:" also contains the caption; skip it here.
            if line.contains("Series Tags:") {
                continue;
            }
            page.name = clean_text(rest.split("Series Record #").next().unwrap_or(rest));
        }
        if let Some(rest) = line.split_once("Sub-series of:").map(|(_, r)| r) {
            page.parent = Some(clean_text(rest));
        }
        if let Some(rest) = line.split_once("Series Tags:").map(|(_, r)| r) {
            page.tags = rest
                .split(',')
                .map(|tag| {
                    // Drop the per-tag vote count, e.g. "fantasy (15)".
                    clean_text(tag.split('(').next().unwrap_or(tag))
                })
                .filter(|tag| !tag.is_empty() && !tag.starts_with("and "))
                .collect();
        }
        if let Some(rest) = line.split_once("Note:").map(|(_, r)| r) {
            page.notes = Some(clean_text(rest));
        }
        if let Some(rest) = line.split_once("Webpages:").map(|(_, r)| r) {
            page.webpages = Some(clean_text(rest));
        }
    }

    if page.name.is_empty() { Ok(None) } else { Ok(Some(page)) }
}

/// Computes the name a series is displayed under.
///
/// A sub-series shows its parent; with the combine option on, parent
/// and child are joined with the configured separator.
pub fn display_name(page: &SeriesPage, config: &SearchConfig) -> String {
    match &page.parent {
        None => page.name.clone(),
        Some(parent) if config.combine_series => {
            format!("{}{}{}", parent, config.combine_series_with, page.name)
        }
        Some(parent) => parent.clone(),
    }
}

/// Fetches a series link and resolves its display name.
///
/// `Ok(None)` means the link was an author page or carried no series
/// name; callers fall back to the link text.
pub fn resolve_display_name(
    fetcher: &Fetcher,
    config: &SearchConfig,
    url: &str,
) -> Result<Option<String>> {
    let page = fetcher.get(url)?;
    let doc = Document::parse_bytes(&page.bytes)?;
    Ok(parse_series_page(&doc)?.map(|page| display_name(&page, config)))
}
