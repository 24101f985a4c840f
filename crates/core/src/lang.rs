//! Language name and code lookup tables.
//!
//! ISFDB pages display language *names* ("English", "German"), while the
//! rest of the pipeline works with ISO 639-2 bibliographic codes. The
//! tables below are loaded once and never mutated.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Map of language display names (as shown on the site) to ISO 639-2 codes.
static LANGUAGES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("Afrikaans", "afr"),
        ("Albanian", "alb"),
        ("Arabic", "ara"),
        ("Armenian", "arm"),
        ("Basque", "baq"),
        ("Belarusian", "bel"),
        ("Bengali", "ben"),
        ("Bosnian", "bos"),
        ("Bulgarian", "bul"),
        ("Burmese", "bur"),
        ("Catalan", "cat"),
        ("Chinese", "chi"),
        ("Croatian", "hrv"),
        ("Czech", "cze"),
        ("Danish", "dan"),
        ("Dutch", "dut"),
        ("English", "eng"),
        ("Esperanto", "epo"),
        ("Estonian", "est"),
        ("Filipino", "fil"),
        ("Finnish", "fin"),
        ("French", "fre"),
        ("Frisian", "fry"),
        ("Galician", "glg"),
        ("Georgian", "geo"),
        ("German", "ger"),
        ("Greek", "gre"),
        ("Hebrew", "heb"),
        ("Hindi", "hin"),
        ("Hungarian", "hun"),
        ("Icelandic", "ice"),
        ("Indonesian", "ind"),
        ("Irish", "gle"),
        ("Italian", "ita"),
        ("Japanese", "jpn"),
        ("Kazakh", "kaz"),
        ("Korean", "kor"),
        ("Latin", "lat"),
        ("Latvian", "lav"),
        ("Lithuanian", "lit"),
        ("Macedonian", "mac"),
        ("Malay", "may"),
        ("Mongolian", "mon"),
        ("Norwegian", "nor"),
        ("Norwegian (Bokmal)", "nob"),
        ("Norwegian (Nynorsk)", "nno"),
        ("Persian", "per"),
        ("Polish", "pol"),
        ("Portuguese", "por"),
        ("Romanian", "rum"),
        ("Russian", "rus"),
        ("Serbian", "srp"),
        ("Slovak", "slo"),
        ("Slovenian", "slv"),
        ("Spanish", "spa"),
        ("Swedish", "swe"),
        ("Tamil", "tam"),
        ("Thai", "tha"),
        ("Turkish", "tur"),
        ("Ukrainian", "ukr"),
        ("Urdu", "urd"),
        ("Vietnamese", "vie"),
        ("Welsh", "wel"),
        ("Yiddish", "yid"),
    ])
});

/// Reverse map of ISO 639-2 codes to display names.
static CODES: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| LANGUAGES.iter().map(|(name, code)| (*code, *name)).collect());

/// Looks up the ISO 639-2 code for a language display name.
pub fn code_for_name(name: &str) -> Option<&'static str> {
    LANGUAGES.get(name).copied()
}

/// Looks up the display name for an ISO 639-2 code.
pub fn name_for_code(code: &str) -> Option<&'static str> {
    CODES.get(code).copied()
}
