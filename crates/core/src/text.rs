//! Text and number normalization helpers.
//!
//! Small pure functions shared by the parsers and the orchestrator:
//! roman numerals, season/month lookup, whitespace cleanup and the
//! author/title tokenizers used to build search queries.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

/// Returns true if every character of `s` is a valid roman-numeral symbol.
///
/// An empty string is not a numeral.
pub fn is_roman_numeral(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| "MDCLXVImdclxvi".contains(c))
}

/// Converts a roman numeral to an integer using subtractive notation.
///
/// Walks the symbols right-to-left, summing runs and negating a run when
/// it is followed (to the right) by a larger value, so `"IV"` is 4 and
/// `"MCMXCIX"` is 1999. Any character outside `MDCLXVI` yields the
/// sentinel 0; the function never panics.
pub fn roman_to_int(numeral: &str) -> u32 {
    fn value(symbol: char) -> Option<u32> {
        match symbol {
            'I' => Some(1),
            'V' => Some(5),
            'X' => Some(10),
            'L' => Some(50),
            'C' => Some(100),
            'D' => Some(500),
            'M' => Some(1000),
            _ => None,
        }
    }

    let mut result: i64 = 0;
    let mut last_val: i64 = 0;
    let mut last_count: i64 = 0;
    let mut subtraction = false;

    for symbol in numeral.to_uppercase().chars().rev() {
        let Some(v) = value(symbol) else {
            return 0;
        };
        let v = v as i64;
        if last_val == 0 {
            last_count = 1;
            last_val = v;
        } else if last_val == v {
            last_count += 1;
        } else {
            result += if subtraction { -1 } else { 1 } * last_val * last_count;
            subtraction = last_val > v;
            last_count = 1;
            last_val = v;
        }
    }
    let total = result + if subtraction { -1 } else { 1 } * last_val * last_count;
    total.max(0) as u32
}

/// Maps a season name to the first month of that season, 1-based.
///
/// Used to refine a publication date whose month is unknown when the
/// notes mention "Spring 1953" and the like.
pub fn season_to_month(name: &str) -> Option<u32> {
    match name {
        "Spring" => Some(3),
        "Summer" => Some(6),
        "Fall" | "Autumn" => Some(9),
        "Winter" => Some(12),
        _ => None,
    }
}

/// Maps an abbreviated or full English month name to its number.
pub fn month_to_int(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    let prefix = name.get(..3)?;
    MONTHS
        .iter()
        .position(|m| prefix.eq_ignore_ascii_case(m))
        .map(|i| i as u32 + 1)
}

/// Collapses runs of whitespace (including newlines) into single spaces
/// and trims the ends.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases and keeps only alphabetic characters and spaces.
///
/// This is the normalization used to decide whether a search stub's title
/// is an exact match for the requested title (punctuation and case are
/// not significant on the site).
pub fn stripped(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Unscrambles a "Surname, First" author into "First Surname" and splits
/// it into tokens. Middle initials are kept as-is.
pub fn author_tokens(author: &str) -> Vec<String> {
    let rotated = if let Some((last, first)) = author.split_once(',') {
        format!("{} {}", first.trim(), last.trim())
    } else {
        author.to_string()
    };
    rotated.split_whitespace().map(str::to_string).collect()
}

/// Tokenizes a book title for searching: the subtitle (everything after
/// a colon) is dropped, joining words are preserved.
pub fn title_tokens(title: &str) -> Vec<String> {
    let main = title.split(':').next().unwrap_or(title);
    main.split_whitespace().map(str::to_string).collect()
}

static SERIES_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Outcome of parsing a series-number string into the float-only index
/// field the host understands.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesIndex {
    pub index: f64,
    /// Human-readable note when the conversion was lossy or failed.
    pub note: Option<String>,
}

/// Parses a series-number string into a float index.
///
/// Handles plain integers, slash-separated double numbers ("61/62" keeps
/// the first and records a note), roman numerals (converted, noted) and
/// arbitrary junk (0.0, noted). Idempotent on clean integer input.
pub fn parse_series_index(raw: &str) -> SeriesIndex {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return SeriesIndex { index: 0.0, note: None };
    }
    if let Some((first, _)) = trimmed.split_once('/') {
        let digits: String = first.chars().filter(|c| c.is_ascii_digit()).collect();
        let index = digits.parse::<f64>().unwrap_or(0.0);
        return SeriesIndex {
            index,
            note: Some(format!(
                "Reported number was {trimmed} and was reduced to a single index.<br />"
            )),
        };
    }
    if is_roman_numeral(trimmed) {
        return SeriesIndex {
            index: roman_to_int(trimmed) as f64,
            note: Some(format!(
                "Reported number was the roman numeral {trimmed} and was converted to an arabic index.<br />"
            )),
        };
    }
    match SERIES_DIGITS
        .find_iter(trimmed)
        .map(|m| m.as_str())
        .collect::<String>()
        .parse::<f64>()
    {
        Ok(index) => SeriesIndex { index, note: None },
        Err(_) => SeriesIndex {
            index: 0.0,
            note: Some(format!("Could not convert {trimmed} to a numeric index.<br />")),
        },
    }
}

/// Parses a record date of the form `YYYY-MM-DD` where month and day
/// may be `00` meaning unknown.
///
/// Unknown parts become 1, and the time is pinned to 02:00 rather than
/// midnight so that a timezone shift applied later cannot roll the date
/// back into the previous month.
pub fn parse_record_date(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "unknown" | "date unknown" | "unpublished") {
        return None;
    }
    let mut parts = trimmed.splitn(3, '-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next().unwrap_or("0").trim().parse().ok()?;
    let day: u32 = parts.next().unwrap_or("0").trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month.max(1), day.max(1))?.and_hms_opt(2, 0, 0)
}

/// Strips a trailing `" (pub #N)"` or `" (title #N)"` marker from a
/// display title, returning the bare title.
pub fn strip_record_marker(title: &str) -> String {
    static MARKER: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s*\((?:pub|title) #[0-9]+\)\s*$").unwrap());
    MARKER.replace(title, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("IV", 4)]
    #[case("IX", 9)]
    #[case("XIV", 14)]
    #[case("MCMXCIX", 1999)]
    #[case("iii", 3)]
    #[case("MMXXIV", 2024)]
    fn test_roman_to_int(#[case] numeral: &str, #[case] expected: u32) {
        assert_eq!(roman_to_int(numeral), expected);
    }

    #[test]
    fn test_roman_rejects_invalid_symbols() {
        assert_eq!(roman_to_int("MC3M"), 0);
        assert_eq!(roman_to_int("hello"), 0);
        assert!(!is_roman_numeral("XIVa"));
        assert!(!is_roman_numeral(""));
        assert!(is_roman_numeral("mcmxcix"));
    }

    #[rstest]
    #[case("3", 3.0, false)]
    #[case("61/62", 61.0, true)]
    #[case("IV", 4.0, true)]
    #[case("n/a", 0.0, true)]
    #[case("", 0.0, false)]
    fn test_parse_series_index(#[case] raw: &str, #[case] index: f64, #[case] noted: bool) {
        let parsed = parse_series_index(raw);
        assert_eq!(parsed.index, index);
        assert_eq!(parsed.note.is_some(), noted);
    }

    #[test]
    fn test_series_index_idempotent_on_clean_input() {
        let first = parse_series_index("3");
        let again = parse_series_index(&format!("{}", first.index as i64));
        assert_eq!(first, again);
    }

    #[test]
    fn test_season_and_month() {
        assert_eq!(season_to_month("Winter"), Some(12));
        assert_eq!(season_to_month("Autumn"), Some(9));
        assert_eq!(season_to_month("Monsoon"), None);
        assert_eq!(month_to_int("Nov"), Some(11));
        assert_eq!(month_to_int("november"), Some(11));
        assert_eq!(month_to_int("Smarch"), None);
    }

    #[test]
    fn test_stripped() {
        assert_eq!(stripped("The End of Eternity!"), "the end of eternity");
        assert_eq!(stripped("R. U. R."), "r u r");
    }

    #[test]
    fn test_author_tokens_rotates_surname() {
        assert_eq!(author_tokens("Asimov, Isaac"), vec!["Isaac", "Asimov"]);
        assert_eq!(author_tokens("H. P. Lovecraft"), vec!["H.", "P.", "Lovecraft"]);
    }

    #[test]
    fn test_title_tokens_strip_subtitle() {
        assert_eq!(
            title_tokens("All Flesh Is Grass: A Novel"),
            vec!["All", "Flesh", "Is", "Grass"]
        );
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a\n  b\t c "), "a b c");
    }

    #[test]
    fn test_parse_record_date() {
        let date = parse_record_date("1965-00-00").unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "1965-01-01 02:00");
        let date = parse_record_date("1955-08-00").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "1955-08-01");
        let date = parse_record_date("1975-06-03").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "1975-06-03");
        assert!(parse_record_date("date unknown").is_none());
        assert!(parse_record_date("unpublished").is_none());
    }

    #[test]
    fn test_strip_record_marker() {
        assert_eq!(strip_record_marker("Dune (pub #23)"), "Dune");
        assert_eq!(strip_record_marker("Dune (title #42)"), "Dune");
        assert_eq!(strip_record_marker("Dune"), "Dune");
    }
}
