//! Cover gallery parsing.
//!
//! The `titlecovers.cgi` page shows every cover the site has for a
//! title. Publication pages carry at most one cover; the gallery is
//! how more than one candidate image is found.

use crate::config::SearchConfig;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::parse::Document;
use crate::site::Site;

/// Extracts cover image URLs from a title covers gallery, capped at
/// `max_covers` and deduplicated in page order.
pub fn parse_cover_gallery(doc: &Document, max_covers: usize) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    for img in doc.select("div#main a img")? {
        let Some(src) = img.attr("src") else { continue };
        if !urls.iter().any(|u| u == src) {
            urls.push(src.to_string());
        }
        if urls.len() == max_covers {
            break;
        }
    }
    Ok(urls)
}

/// Fetches the cover gallery of a title record.
pub fn fetch_title_covers(
    fetcher: &Fetcher,
    config: &SearchConfig,
    title_id: &str,
) -> Result<Vec<String>> {
    let site = Site::new(&config.base_url);
    let page = fetcher.get(&site.title_covers_url(title_id))?;
    let doc = Document::parse_bytes(&page.bytes)?;
    parse_cover_gallery(&doc, config.max_covers)
}
