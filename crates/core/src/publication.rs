//! Publication page parsing.
//!
//! A publication page (`pl.cgi`) lists its fields as labelled `<li>`
//! sections inside the header box. Each section is handled
//! independently, so one malformed field never sinks the record.
//! Series links are followed through a caller-supplied resolver, which
//! keeps the parser itself free of network access.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use tracing::debug;

use crate::config::{SearchConfig, SeriesIndexPolicy};
use crate::error::{Error, Result};
use crate::parse::{Document, Element};
use crate::record::{ID_CATALOG, PublicationRecord, SeriesInfo, tags_for_type};
use crate::site::id_from_url;
use crate::text::{
    clean_text, month_to_int, parse_record_date, parse_series_index, season_to_month,
};

/// Resolves a series link to its display name.
///
/// Returning `None` makes the parser fall back to the link text, so a
/// no-op closure is a valid resolver for offline parsing.
pub type SeriesResolver<'a> = dyn Fn(&str) -> Option<String> + 'a;

/// The site prints both ISBN forms as `0-330-02042-0 [978-0-330-02042-9]`.
static ISBN_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9X\-]+) \[([0-9X\-]+)\]").unwrap());

static VOL_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vol\.?\s*(\d+)\s*,?\s*no\.?\s*(\d+)").unwrap());

static ISSUE_NO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:whole\s+number|issue)\s*#?\s*(\d+)").unwrap());

static SERIES_POSITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#\s*(\d+)\b").unwrap());

/// Parses a publication page into a [`PublicationRecord`].
///
/// # Errors
///
/// Returns [`Error::MissingId`] when the URL carries no record id and
/// [`Error::InsufficientData`] when the page yields neither a title nor
/// any authors. Individual malformed sections are skipped.
pub fn parse_publication(
    doc: &Document,
    url: &str,
    config: &SearchConfig,
    resolve_series: &SeriesResolver,
) -> Result<PublicationRecord> {
    let mut record = PublicationRecord {
        id: id_from_url(url).ok_or_else(|| Error::MissingId(url.to_string()))?,
        ..Default::default()
    };

    let mut items = doc.select("div#content td.pubheader ul li")?;
    if items.is_empty() {
        // Older page layouts carry the header sections directly in the
        // first content box.
        if let Some(content) = doc.select_first("div#content div.ContentBox")? {
            items = content.select("ul li")?;
        }
    }

    let mut notes_text: Option<String> = None;
    let mut month_unknown = false;

    for item in &items {
        let Some(label) = item.label() else { continue };
        match label.as_str() {
            "Publication" => {
                let tail = item.tail_text();
                record.title =
                    clean_text(tail.split("Publication Record #").next().unwrap_or(&tail));
            }
            "Author" | "Authors" | "Editor" | "Editors" => {
                let editors = label.starts_with("Editor");
                for (_, name) in item.links() {
                    if name.is_empty() || name.eq_ignore_ascii_case("uncredited") {
                        continue;
                    }
                    if record.author_string.is_none() {
                        record.author_string = Some(name.clone());
                    }
                    record
                        .authors
                        .push(if editors { format!("{name} (Editor)") } else { name });
                }
            }
            "Date" => {
                let raw = item.tail_text();
                month_unknown = raw.split('-').nth(1).is_none_or(|m| m.trim() == "00");
                record.pubdate = parse_record_date(&raw);
            }
            "Type" => {
                let tail = item.tail_text();
                record.tags = tags_for_type(&tail);
                record.record_type = Some(tail);
            }
            "Format" => record.format = Some(item.tail_text()),
            "Publisher" => {
                record.publisher = item
                    .links()
                    .into_iter()
                    .map(|(_, text)| text)
                    .next()
                    .filter(|text| !text.is_empty())
                    .or_else(|| Some(item.tail_text()));
            }
            "Pub. Series" => {
                let name = match item.links().first() {
                    Some((href, text)) => {
                        resolve_series(href).unwrap_or_else(|| text.clone())
                    }
                    None => item.tail_text(),
                };
                if !name.is_empty() {
                    record.series = Some(SeriesInfo { name, ..Default::default() });
                }
            }
            "Pub. Series #" => {
                // Only meaningful once the series itself is known.
                if let Some(series) = record.series.as_mut() {
                    let parsed = parse_series_index(&item.tail_text());
                    series.index = Some(parsed.index);
                    series.note = parsed.note;
                }
            }
            "ISBN" => parse_isbn(&item.tail_text(), &mut record),
            "Catalog ID" => {
                let tail = item.tail_text();
                if !tail.is_empty() {
                    record.identifiers.insert(ID_CATALOG.to_string(), tail);
                }
            }
            "External IDs" => parse_external_ids(item, config, &mut record)?,
            "Cover" => {
                let tail = item.tail_text();
                if !tail.is_empty() {
                    record.comments.push(format!("Cover: {tail}"));
                }
            }
            "Notes" | "Note" => {
                let tail = item.tail_text();
                if !tail.is_empty() {
                    record.comments.push(format!("Notes: {tail}"));
                    notes_text = Some(tail);
                }
            }
            "Container Title" => {
                record.title_id = item
                    .links()
                    .iter()
                    .find(|(href, _)| href.contains("title.cgi"))
                    .and_then(|(href, _)| id_from_url(href));
            }
            other => debug!(section = other, "unhandled publication section"),
        }
    }

    let boxes = doc.select("div#content div.ContentBox")?;
    if let Some(contents) = boxes.get(1) {
        let links = contents.links();
        if record.title_id.is_none() {
            record.title_id = links
                .iter()
                .find(|(href, _)| href.contains("title.cgi"))
                .and_then(|(href, _)| id_from_url(href));
        }
        // Novels in a fiction series carry the series only on their
        // title line, not in the header.
        if record.series.is_none() {
            if let Some((href, text)) = links.iter().find(|(href, _)| href.contains("pe.cgi")) {
                let name = resolve_series(href).unwrap_or_else(|| text.clone());
                if !name.is_empty() {
                    let index = SERIES_POSITION
                        .captures(&contents.text())
                        .and_then(|c| c[1].parse::<f64>().ok());
                    record.series = Some(SeriesInfo { name, index, note: None });
                    record
                        .comments
                        .push("Series details were taken from the first title of this publication.".to_string());
                }
            }
        }
    }

    if let Some(series) = record.series.as_mut() {
        if series.index.is_none() {
            if let Some(notes) = notes_text.as_deref() {
                series.index = series_index_from_notes(notes, config.series_index_policy);
            }
        }
    }

    if month_unknown {
        if let (Some(date), Some(notes)) = (record.pubdate, notes_text.as_deref()) {
            if let Some(month) = refine_month(notes, date.year()) {
                record.pubdate = date.with_month(month);
            }
        }
    }

    if record.cover_url.is_none() {
        record.cover_url = doc
            .select_first("div#content table td a img")?
            .and_then(|img| img.attr("src").map(str::to_string));
    }

    if record.title.is_empty() && record.authors.is_empty() {
        return Err(Error::InsufficientData(url.to_string()));
    }

    record.comments.push(format!("Source for publication metadata: {url}"));
    Ok(record)
}

fn parse_isbn(tail: &str, record: &mut PublicationRecord) {
    if let Some(caps) = ISBN_PAIR.captures(tail) {
        let first = caps[1].replace('-', "");
        let second = caps[2].replace('-', "");
        for isbn in [&first, &second] {
            match isbn.len() {
                10 => record.identifiers.insert("isbn-10".to_string(), isbn.clone()),
                13 => record.identifiers.insert("isbn-13".to_string(), isbn.clone()),
                _ => None,
            };
        }
        let canonical = if second.len() > first.len() { second } else { first };
        record.identifiers.insert("isbn".to_string(), canonical);
    } else if let Some(token) = tail.split_whitespace().next() {
        let bare = token.replace('-', "");
        if bare.len() == 10 || bare.len() == 13 {
            let form = if bare.len() == 10 { "isbn-10" } else { "isbn-13" };
            record.identifiers.insert(form.to_string(), bare.clone());
            record.identifiers.insert("isbn".to_string(), bare);
        }
    }
}

/// Parses the nested per-catalog list of an "External IDs" section.
///
/// Each entry names its catalog in an `<abbr>`; the identifier key is
/// the lowercased catalog name with separators turned into hyphens.
/// ASIN entries may carry one link per Amazon locale, in which case the
/// configured country wins, then "US", then the first link.
fn parse_external_ids(
    item: &Element<'_>,
    config: &SearchConfig,
    record: &mut PublicationRecord,
) -> Result<()> {
    for entry in item.select("ul li")? {
        let Some(abbr) = entry.select_first("abbr")? else { continue };
        let name = clean_text(&abbr.text());
        if name.is_empty() {
            continue;
        }

        let links = entry.links();
        let value = if links.is_empty() {
            entry.text().split_once(':').map(|(_, v)| clean_text(v)).unwrap_or_default()
        } else if name == "ASIN" && links.len() > 1 {
            let country = config.locale_country.to_uppercase();
            let (href, text) = links
                .iter()
                .find(|(_, text)| *text == country)
                .or_else(|| links.iter().find(|(_, text)| text == "US"))
                .unwrap_or(&links[0]);
            // The ASIN is the last 10 characters of the link target.
            href.len()
                .checked_sub(10)
                .and_then(|start| href.get(start..))
                .map(str::to_string)
                .unwrap_or_else(|| text.clone())
        } else {
            links[0].1.clone()
        };

        if !value.is_empty() {
            let key = name.to_lowercase().replace([' ', '/', '.'], "-");
            record.identifiers.insert(key, value);
        }
    }
    Ok(())
}

/// Derives a series index from magazine Vol/No/Issue notes.
///
/// The default policy folds volume and number into `vol + no/100` so
/// issues sort inside their volume; an overall issue number, when the
/// notes carry one, is used on its own.
fn series_index_from_notes(notes: &str, policy: SeriesIndexPolicy) -> Option<f64> {
    let vol_no = VOL_NO.captures(notes).and_then(|caps| {
        let vol: f64 = caps[1].parse().ok()?;
        let no: f64 = caps[2].parse().ok()?;
        Some(vol + if no < 100.0 { no / 100.0 } else { 0.99 })
    });
    let issue = ISSUE_NO
        .captures(notes)
        .or_else(|| SERIES_POSITION.captures(notes))
        .and_then(|caps| caps[1].parse::<f64>().ok());

    match policy {
        SeriesIndexPolicy::VolumeAndNumber => vol_no.or(issue),
        SeriesIndexPolicy::IssueNumberOnly => issue.or(vol_no),
    }
}

/// Looks in the notes for a "{Season} {year}" or "{Month} {year}" pair
/// matching the record's year, to refine a date whose month is unknown.
fn refine_month(notes: &str, year: i32) -> Option<u32> {
    let tokens: Vec<&str> = notes
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    for pair in tokens.windows(2) {
        if pair[1].parse::<i32>() == Ok(year) {
            if let Some(month) = season_to_month(pair[0]).or_else(|| month_to_int(pair[0])) {
                return Some(month);
            }
        }
    }
    None
}
