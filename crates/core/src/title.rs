//! Title page parsing.
//!
//! A title page (`title.cgi`) does not wrap its fields in elements; the
//! first content box is a flat sequence of `<b>Label:</b> value` pairs
//! separated by `<br>`, which [`crate::parse::Element::br_runs`] turns
//! into logical fields. The publications table below the box links
//! every printing of the title.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::lang;
use crate::parse::{Document, Run};
use crate::record::{SeriesInfo, TitleRecord, tags_for_type};
use crate::site::id_from_url;
use crate::text::{clean_text, parse_record_date, parse_series_index};

use crate::publication::SeriesResolver;

/// Ratings are shown on a 10-point scale, e.g. "8.66 (based on 12 votes)".
static RATING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap());

fn field<'r>(run: &'r Run, label: &str) -> Option<&'r str> {
    run.text.strip_prefix(label).map(str::trim)
}

/// Parses a title page into a [`TitleRecord`].
///
/// # Errors
///
/// Returns [`Error::MissingId`] when the URL carries no record id and
/// [`Error::InsufficientData`] when the page yields neither a title nor
/// any authors.
pub fn parse_title(
    doc: &Document,
    url: &str,
    resolve_series: &SeriesResolver,
) -> Result<TitleRecord> {
    let mut record = TitleRecord {
        id: id_from_url(url).ok_or_else(|| Error::MissingId(url.to_string()))?,
        ..Default::default()
    };

    let Some(content) = doc.select_first("div#content div.ContentBox")? else {
        return Err(Error::InsufficientData(url.to_string()));
    };

    let mut raw_date = String::new();

    for run in content.br_runs() {
        if let Some(tail) = field(&run, "Title:") {
            record.title = clean_text(tail.split("Title Record #").next().unwrap_or(tail));
        } else if field(&run, "Authors:").is_some()
            || field(&run, "Author:").is_some()
            || field(&run, "Editors:").is_some()
            || field(&run, "Editor:").is_some()
        {
            let editors = run.text.starts_with("Editor");
            for (_, name) in &run.links {
                if name.is_empty() || name.eq_ignore_ascii_case("uncredited") {
                    continue;
                }
                record
                    .authors
                    .push(if editors { format!("{name} (Editor)") } else { name.clone() });
            }
        } else if let Some(tail) = field(&run, "Date:") {
            raw_date = tail.to_string();
            record.date = parse_record_date(tail);
        } else if let Some(tail) = field(&run, "Variant Title of:") {
            record.variant_of = run
                .links
                .iter()
                .find(|(href, _)| href.contains("title.cgi"))
                .and_then(|(href, _)| id_from_url(href));
            let canonical = clean_text(tail.split("[may list more publications").next().unwrap_or(tail));
            if !canonical.is_empty() {
                record.comments.push(format!("Variant Title of: {canonical}"));
            }
        } else if let Some(tail) = field(&run, "Type:") {
            record.tags.extend(tags_for_type(tail));
            record.record_type = Some(tail.to_string());
        } else if let Some(tail) = field(&run, "Length:") {
            record.length = Some(tail.to_string());
            record.tags.push(tail.to_string());
        } else if let Some(tail) = field(&run, "Series Number:") {
            if let Some(series) = record.series.as_mut() {
                let parsed = parse_series_index(tail);
                series.index = Some(parsed.index);
                series.note = parsed.note;
            }
        } else if let Some(tail) = field(&run, "Series:") {
            let name = match run.links.first() {
                Some((href, text)) => resolve_series(href).unwrap_or_else(|| text.clone()),
                None => tail.to_string(),
            };
            if !name.is_empty() {
                record.series = Some(SeriesInfo { name, ..Default::default() });
            }
        } else if field(&run, "Webpages:").is_some() {
            record.webpages.extend(run.links.iter().map(|(href, _)| href.clone()));
        } else if let Some(tail) = field(&run, "Language:") {
            record.language = lang::code_for_name(tail).map(str::to_string);
        } else if let Some(tail) = field(&run, "Synopsis:") {
            if !tail.is_empty() {
                record.comments.push(format!("Synopsis: {tail}"));
            }
        } else if let Some(tail) = field(&run, "Note:").or_else(|| field(&run, "Notes:")) {
            if !tail.is_empty() {
                record.comments.push(format!("Notes: {tail}"));
            }
        } else if let Some(tail) = field(&run, "User Rating:") {
            if !tail.contains("This title has no votes") {
                // 10-point site scale folded to the 5-star scale.
                record.rating = RATING
                    .captures(tail)
                    .and_then(|caps| caps[1].parse::<f64>().ok())
                    .map(|value| value * 0.5);
            }
        } else if let Some(tail) = field(&run, "Current Tags:") {
            if !tail.starts_with("None") {
                record.tags.extend(
                    run.links
                        .iter()
                        .map(|(_, text)| text.clone())
                        .filter(|text| !text.is_empty() && text != "Add Tags"),
                );
            }
        } else {
            debug!(field = %run.text.chars().take(32).collect::<String>(), "unhandled title field");
        }
    }

    for anchor in doc.select("table.publications a[href]")? {
        let Some(href) = anchor.attr("href") else { continue };
        if !href.contains("/pl.cgi?") {
            continue;
        }
        if let Some(id) = id_from_url(href) {
            if !record.publication_ids.contains(&id) {
                record.publication_ids.push(id);
            }
        }
    }

    if let Some(first) = first_publication(doc, &raw_date)? {
        record.comments.push(first);
    }

    if record.title.is_empty() && record.authors.is_empty() {
        return Err(Error::InsufficientData(url.to_string()));
    }

    record.comments.push(format!("Source for title metadata: {url}"));
    Ok(record)
}

/// Finds the publication row whose date matches the title's own date
/// and names it as the first publication.
fn first_publication(doc: &Document, raw_date: &str) -> Result<Option<String>> {
    let Some(title_date) = parse_record_date(raw_date) else { return Ok(None) };
    static ROW_DATE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

    for row in doc.select("table.publications tr")? {
        let cells = row.select("td")?;
        let Some(date_cell) = cells.iter().find(|cell| ROW_DATE.is_match(clean_text(&cell.text()).as_str()))
        else {
            continue;
        };
        if parse_record_date(&clean_text(&date_cell.text())) != Some(title_date) {
            continue;
        }
        if let Some((href, text)) = row
            .links()
            .into_iter()
            .find(|(href, _)| href.contains("/pl.cgi?"))
        {
            return Ok(Some(format!("First published in: {text} ({href}).")));
        }
    }
    Ok(None)
}
