//! Search-result list parsing.
//!
//! Publication results live in a plain table under `div#main`; title
//! results from the advanced endpoint live in a table inside a form.
//! Simple-search results share the publication table shape but need
//! client-side filtering because the endpoint ignores every parameter
//! except the search string. Two degraded shapes also land here: the
//! "advanced search refused" page and the immediate redirect to a
//! detail page when a search has exactly one hit.

use tracing::debug;

use crate::error::Result;
use crate::lang;
use crate::parse::{Document, Element};
use crate::record::{RELEVANCE_OTHER, SearchStub};
use crate::text::{clean_text, stripped};

/// Message shown in place of results when the advanced endpoint turns
/// an anonymous user away.
const ADVANCED_SEARCH_REFUSED: &str = "Advanced Searches are currently restricted";

/// Record types kept when filtering simple-search rows; everything else
/// (interior art, reviews, cover art) is not a text title.
const TEXT_TITLE_TYPES: [&str; 10] = [
    "ANTHOLOGY",
    "CHAPBOOK",
    "COLLECTION",
    "ESSAY",
    "MAGAZINE",
    "NONFICTION",
    "NOVEL",
    "OMNIBUS",
    "POEM",
    "SHORTFICTION",
];

/// Client-side narrowing applied to simple-search rows.
#[derive(Debug, Default)]
pub struct SimpleSearchFilter {
    /// Keep only rows whose title matches this exactly, case-folded.
    pub exact_title: Option<String>,
    /// Keep only rows whose author cell contains this, case-folded.
    pub author: Option<String>,
}

/// Returns true if the page is the advanced-search refusal notice.
pub fn advanced_search_refused(doc: &Document) -> bool {
    doc.text_content().contains(ADVANCED_SEARCH_REFUSED)
}

/// Gets the cells of a result row, or `None` for header rows.
fn cells<'a>(row: &'a Element<'a>) -> Option<Vec<Element<'a>>> {
    let cells = row.select("td").ok()?;
    if cells.is_empty() { None } else { Some(cells) }
}

/// Extracts the linked title of a result cell.
///
/// The title is usually a direct link, sometimes wrapped in a tooltip
/// div, occasionally plain text with no link at all.
fn linked_title(cell: &Element<'_>) -> (String, Option<String>) {
    if let Ok(Some(anchor)) = cell.select_first("a") {
        let url = anchor.attr("href").map(str::to_string);
        return (clean_text(&anchor.text()), url);
    }
    (clean_text(&cell.text()), None)
}

fn cell_authors(cell: &Element<'_>) -> Vec<String> {
    cell.links().into_iter().map(|(_, name)| name).collect()
}

/// Returns true when a language display name passes the row filter.
///
/// Rows in the site's default language are always kept; a single
/// user-configured target language is kept as well.
fn language_kept(name: &str, target_language: &str) -> bool {
    name == "English" || Some(name) == lang::name_for_code(target_language)
}

/// Parses a publication search-result page into stubs.
///
/// Row layout: title (cell 1, linked), year (cell 2), authors (cell 3).
pub fn publication_stubs(doc: &Document) -> Result<Vec<SearchStub>> {
    let mut stubs = Vec::new();
    for row in doc.select("div#main > table tr")? {
        let Some(cells) = cells(&row) else { continue };
        if cells.len() < 3 {
            continue;
        }
        let (title, url) = linked_title(&cells[0]);
        stubs.push(SearchStub {
            title,
            url,
            authors: cell_authors(&cells[2]),
            date: clean_text(&cells[1].text()),
            relevance: RELEVANCE_OTHER,
        });
    }
    debug!(count = stubs.len(), "parsed publication result rows");
    Ok(stubs)
}

/// Parses an advanced title search-result page into stubs.
///
/// Row layout: date (cell 1), record type (cell 2), language (cell 3),
/// series (cell 4), title (cell 5, linked), authors (cell 6). Rows in
/// other languages than the default or the target are dropped.
pub fn title_stubs(doc: &Document, target_language: &str) -> Result<Vec<SearchStub>> {
    let mut stubs = Vec::new();
    for row in doc.select("div#main form table tr")? {
        let Some(cells) = cells(&row) else { continue };
        if cells.len() < 6 {
            continue;
        }
        let language = clean_text(&cells[2].text());
        if !language_kept(&language, target_language) {
            debug!(language, "result row dropped by language filter");
            continue;
        }
        let (title, url) = linked_title(&cells[4]);
        stubs.push(SearchStub {
            title,
            url,
            authors: cell_authors(&cells[5]),
            date: clean_text(&cells[0].text()),
            relevance: RELEVANCE_OTHER,
        });
    }
    debug!(count = stubs.len(), "parsed title result rows");
    Ok(stubs)
}

/// Parses a simple-search result page into stubs.
///
/// Row layout: date (cell 1), record type (cell 2), language (cell 3),
/// title (cell 4, linked), authors (cell 5). The endpoint matches the
/// search string against every record type and language, so type,
/// language, author and (optionally) exact-title filtering all happen
/// here.
pub fn simple_title_stubs(
    doc: &Document,
    target_language: &str,
    filter: &SimpleSearchFilter,
) -> Result<Vec<SearchStub>> {
    let mut stubs = Vec::new();
    for row in doc.select("div#main > table tr")? {
        let Some(cells) = cells(&row) else { continue };
        if cells.len() < 5 {
            continue;
        }
        let record_type = clean_text(&cells[1].text());
        if !TEXT_TITLE_TYPES.contains(&record_type.as_str()) {
            continue;
        }
        let language = clean_text(&cells[2].text());
        if !language_kept(&language, target_language) {
            continue;
        }
        let (title, url) = linked_title(&cells[3]);
        if let Some(wanted) = &filter.exact_title
            && title.to_lowercase() != wanted.to_lowercase()
        {
            continue;
        }
        let authors = cell_authors(&cells[4]);
        if let Some(wanted) = &filter.author {
            let haystack = clean_text(&cells[4].text()).to_lowercase();
            if !haystack.contains(&wanted.to_lowercase()) {
                continue;
            }
        }
        stubs.push(SearchStub {
            title,
            url,
            authors,
            date: clean_text(&cells[0].text()),
            relevance: RELEVANCE_OTHER,
        });
    }
    debug!(count = stubs.len(), "parsed simple search rows");
    Ok(stubs)
}

/// Synthesizes a stub when a search redirected straight to a title page.
///
/// A single-hit search skips the result list entirely; the record page
/// is recognized by its "Title Record #" id span, and the stub points
/// back at the redirect location.
pub fn single_title_redirect(doc: &Document, location: &str) -> Option<SearchStub> {
    let record_span = doc.select_first("span.recordID").ok()??;
    if !record_span.text().contains("Title Record #") {
        return None;
    }

    let content = doc.select_first("div.ContentBox").ok()??;
    let mut title = String::new();
    let mut authors = Vec::new();
    let mut date = String::new();
    for run in content.br_runs() {
        if let Some(rest) = run.text.strip_prefix("Title:") {
            // The id span text rides along in the first run.
            title = clean_text(rest.split("Title Record #").next().unwrap_or(rest));
        } else if run.text.starts_with("Author:") || run.text.starts_with("Authors:") {
            authors = run.links.into_iter().map(|(_, name)| name).collect();
        } else if let Some(rest) = run.text.strip_prefix("Date:") {
            date = clean_text(rest);
        }
    }
    if title.is_empty() {
        return None;
    }
    debug!(location, title, "search redirected to a single title record");
    Some(SearchStub {
        title,
        url: Some(location.to_string()),
        authors,
        date,
        relevance: RELEVANCE_OTHER,
    })
}

/// Returns true when a stub's title is an exact match for a query title
/// under case and punctuation normalization.
pub fn exact_title_match(stub_title: &str, query_title: &str) -> bool {
    stripped(stub_title) == stripped(query_title)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLICATION_ROWS: &str = r#"
        <div id="main">
            <table>
                <tr><th>Title</th><th>Date</th><th>Authors</th></tr>
                <tr>
                    <td><a href="https://www.isfdb.org/cgi-bin/pl.cgi?31061">All Flesh Is Grass</a></td>
                    <td>1965-00-00</td>
                    <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?180">Clifford D. Simak</a></td>
                </tr>
                <tr>
                    <td><div class="tooltip"><a href="https://www.isfdb.org/cgi-bin/pl.cgi?418331">All Flesh Is Grass</a></div></td>
                    <td>1968-00-00</td>
                    <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?180">Clifford D. Simak</a></td>
                </tr>
            </table>
        </div>
    "#;

    #[test]
    fn test_publication_stubs() {
        let doc = Document::parse(PUBLICATION_ROWS).unwrap();
        let stubs = publication_stubs(&doc).unwrap();

        assert_eq!(stubs.len(), 2);
        assert_eq!(stubs[0].title, "All Flesh Is Grass");
        assert_eq!(stubs[0].url.as_deref(), Some("https://www.isfdb.org/cgi-bin/pl.cgi?31061"));
        assert_eq!(stubs[0].authors, vec!["Clifford D. Simak"]);
        assert_eq!(stubs[0].date, "1965-00-00");
        // Tooltip wrapper still yields the link.
        assert_eq!(stubs[1].url.as_deref(), Some("https://www.isfdb.org/cgi-bin/pl.cgi?418331"));
    }

    const TITLE_ROWS: &str = r#"
        <div id="main">
            <form>
                <table>
                    <tr><th>Date</th><th>Type</th><th>Language</th><th>Series</th><th>Title</th><th>Authors</th></tr>
                    <tr>
                        <td>1955-08-00</td>
                        <td>NOVEL</td>
                        <td>English</td>
                        <td></td>
                        <td><a href="https://www.isfdb.org/cgi-bin/title.cgi?1178">The End of Eternity</a></td>
                        <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?5">Isaac Asimov</a></td>
                    </tr>
                    <tr>
                        <td>1959-00-00</td>
                        <td>NOVEL</td>
                        <td>Italian</td>
                        <td></td>
                        <td><a href="https://www.isfdb.org/cgi-bin/title.cgi?999999">La fine dell'eternit&agrave;</a></td>
                        <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?5">Isaac Asimov</a></td>
                    </tr>
                </table>
            </form>
        </div>
    "#;

    #[test]
    fn test_title_stubs_filter_language() {
        let doc = Document::parse(TITLE_ROWS).unwrap();
        let stubs = title_stubs(&doc, "eng").unwrap();

        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].title, "The End of Eternity");
        assert_eq!(stubs[0].date, "1955-08-00");
    }

    #[test]
    fn test_title_stubs_keep_target_language() {
        let doc = Document::parse(TITLE_ROWS).unwrap();
        let stubs = title_stubs(&doc, "ita").unwrap();
        assert_eq!(stubs.len(), 2);
    }

    const SIMPLE_ROWS: &str = r#"
        <div id="main">
            <table>
                <tr><th>Date</th><th>Type</th><th>Language</th><th>Title</th><th>Authors</th></tr>
                <tr>
                    <td>1955-08-00</td>
                    <td>NOVEL</td>
                    <td>English</td>
                    <td><a href="https://www.isfdb.org/cgi-bin/title.cgi?1178">The End of Eternity</a></td>
                    <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?5">Isaac Asimov</a></td>
                </tr>
                <tr>
                    <td>2015-00-00</td>
                    <td>COVERART</td>
                    <td>English</td>
                    <td><a href="https://www.isfdb.org/cgi-bin/title.cgi?222">The End of Eternity</a></td>
                    <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?7">Somebody Else</a></td>
                </tr>
                <tr>
                    <td>1987-00-00</td>
                    <td>NOVEL</td>
                    <td>English</td>
                    <td><a href="https://www.isfdb.org/cgi-bin/title.cgi?333">The End of Eternity and Other Stories</a></td>
                    <td><a href="https://www.isfdb.org/cgi-bin/ea.cgi?8">Another Writer</a></td>
                </tr>
            </table>
        </div>
    "#;

    #[test]
    fn test_simple_stubs_filter_type() {
        let doc = Document::parse(SIMPLE_ROWS).unwrap();
        let stubs = simple_title_stubs(&doc, "eng", &SimpleSearchFilter::default()).unwrap();
        // COVERART row dropped, both NOVEL rows kept.
        assert_eq!(stubs.len(), 2);
    }

    #[test]
    fn test_simple_stubs_author_and_exact_filters() {
        let doc = Document::parse(SIMPLE_ROWS).unwrap();

        let by_author = simple_title_stubs(
            &doc,
            "eng",
            &SimpleSearchFilter { author: Some("isaac asimov".to_string()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].authors, vec!["Isaac Asimov"]);

        let by_exact = simple_title_stubs(
            &doc,
            "eng",
            &SimpleSearchFilter {
                exact_title: Some("The End of Eternity".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(by_exact.len(), 1);
        assert_eq!(by_exact[0].url.as_deref(), Some("https://www.isfdb.org/cgi-bin/title.cgi?1178"));
    }

    #[test]
    fn test_advanced_search_refused() {
        let doc = Document::parse(
            "<html><body><div id=\"main\">For performance reasons, Advanced Searches \
             are currently restricted to registered users.</div></body></html>",
        )
        .unwrap();
        assert!(advanced_search_refused(&doc));

        let ok = Document::parse(PUBLICATION_ROWS).unwrap();
        assert!(!advanced_search_refused(&ok));
    }

    #[test]
    fn test_single_title_redirect() {
        let html = r#"
            <div id="content">
                <div class="ContentBox">
                    <b>Title:</b> The War Beneath the Tree
                    <span class="recordID"><b>Title Record # </b>57407</span>
                    <br><b>Author:</b> <a href="https://www.isfdb.org/cgi-bin/ea.cgi?171">Gene Wolfe</a>
                    <br><b>Date:</b> 1979-12-00
                    <br><b>Type:</b> SHORTFICTION
                </div>
            </div>
        "#;
        let doc = Document::parse(html).unwrap();
        let stub =
            single_title_redirect(&doc, "https://www.isfdb.org/cgi-bin/title.cgi?57407").unwrap();

        assert_eq!(stub.title, "The War Beneath the Tree");
        assert_eq!(stub.authors, vec!["Gene Wolfe"]);
        assert_eq!(stub.date, "1979-12-00");
        assert_eq!(stub.url.as_deref(), Some("https://www.isfdb.org/cgi-bin/title.cgi?57407"));
    }

    #[test]
    fn test_redirect_detection_requires_record_span() {
        let doc = Document::parse("<div class=\"ContentBox\"><b>Title:</b> X</div>").unwrap();
        assert!(single_title_redirect(&doc, "u").is_none());
    }

    #[test]
    fn test_exact_title_match_normalizes() {
        assert!(exact_title_match("The End of Eternity", "the end of eternity!"));
        assert!(!exact_title_match("The End of Eternity", "End of Eternity"));
    }
}
