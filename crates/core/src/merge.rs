//! Record reconciliation.
//!
//! A candidate usually yields both a publication record and a title
//! record describing the same book. [`merge`] folds the pair into one
//! [`BookRecord`], with the publication winning every collision since
//! it describes the physical book in hand. The display title carries a
//! record marker so two printings of the same work stay distinct in a
//! result list.

use crate::config::SearchConfig;
use crate::record::{
    BookRecord, ID_PUBLICATION, ID_TITLE, PublicationRecord, Relevance, TitleRecord,
};

/// Folds a publication and/or title record into one [`BookRecord`].
///
/// Either side may be absent; a candidate found through a title search
/// whose publications all failed still produces a usable record.
pub fn merge(
    publication: Option<PublicationRecord>,
    title: Option<TitleRecord>,
    config: &SearchConfig,
    relevance: Relevance,
) -> BookRecord {
    let mut record = BookRecord { relevance, ..Default::default() };

    let mut comments: Vec<String> = Vec::new();
    let mut series = None;

    if let Some(title) = &title {
        record.title = title.title.clone();
        record.authors = title.authors.clone();
        record.pubdate = title.date;
        record.rating = title.rating;
        record.language = title.language.clone();
        record.tags = title.tags.clone();
        series = title.series.clone();
        comments.extend(title.comments.iter().cloned());
        if !title.id.is_empty() {
            record.identifiers.insert(ID_TITLE.to_string(), title.id.clone());
        }
    }

    if let Some(publication) = &publication {
        if !publication.title.is_empty() {
            record.title = publication.title.clone();
        }
        if !publication.authors.is_empty() {
            record.authors = publication.authors.clone();
        }
        if publication.pubdate.is_some() {
            record.pubdate = publication.pubdate;
        }
        record.publisher = publication.publisher.clone();
        record.cover_url = publication.cover_url.clone();
        if publication.series.is_some() {
            series = publication.series.clone();
        }
        // Publication tags come first; the title's are appended.
        let mut tags = publication.tags.clone();
        tags.extend(std::mem::take(&mut record.tags));
        record.tags = tags;
        comments.extend(publication.comments.iter().cloned());
        for (key, value) in &publication.identifiers {
            record.identifiers.insert(key.clone(), value.clone());
        }
        if !publication.id.is_empty() {
            record.identifiers.insert(ID_PUBLICATION.to_string(), publication.id.clone());
        }
        if let Some(title_id) = &publication.title_id {
            record.identifiers.entry(ID_TITLE.to_string()).or_insert_with(|| title_id.clone());
        }
    }

    if let Some(series) = series {
        record.series = Some(series.name);
        record.series_index = series.index;
        if let Some(note) = series.note {
            comments.push(note);
        }
    }

    record.tags = dedup_tags(record.tags, &config.unwanted_tags);

    if record.authors.is_empty() {
        record.authors.push("Unknown".to_string());
    }

    if let Some(marker) = record_marker(&record) {
        record.title = format!("{}{marker}", record.title);
    }

    if !comments.is_empty() {
        record.comments = Some(comments.join("\n"));
    }

    record
}

/// Disambiguation suffix appended to the display title.
///
/// The publication id is preferred: sibling editions of one work share
/// a title id, and the marker exists so they stay distinct. A
/// title-only candidate falls back to the title id.
fn record_marker(record: &BookRecord) -> Option<String> {
    if let Some(id) = record.publication_id() {
        return Some(format!(" (pub #{id})"));
    }
    record.title_id().map(|id| format!(" (title #{id})"))
}

fn dedup_tags(tags: Vec<String>, unwanted: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for tag in tags {
        let folded = tag.to_lowercase();
        if unwanted.contains(&folded) || seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(tag);
    }
    out
}
