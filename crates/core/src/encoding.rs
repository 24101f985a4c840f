//! ISO-8859-1 handling for the wire.
//!
//! The site serves every page as ISO-8859-1 and expects query strings in
//! the same charset. Responses are decoded with [`encoding_rs`]; outgoing
//! terms are percent-encoded byte-wise after a strict Latin-1 check.

use encoding_rs::Encoding;
use tracing::warn;
use url::form_urlencoded::byte_serialize;

/// Decodes a raw response body as ISO-8859-1.
///
/// The label lookup follows the WHATWG table, so `iso-8859-1` resolves
/// to windows-1252 just like a browser would treat the site.
pub fn decode_page(bytes: &[u8]) -> String {
    let encoding = Encoding::for_label(b"iso-8859-1").unwrap_or(encoding_rs::WINDOWS_1252);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Percent-encodes a search term as Latin-1 bytes.
///
/// Characters outside Latin-1 cannot be transmitted at all; the term is
/// truncated at the first such character and the loss is logged. A
/// truncated prefix still matches under the site's contains operator.
pub fn encode_term(term: &str) -> String {
    let mut bytes = Vec::with_capacity(term.len());
    for (i, c) in term.char_indices() {
        let cp = c as u32;
        if cp > 0xFF {
            warn!(term, dropped = &term[i..], "search term truncated at non-Latin-1 character");
            break;
        }
        bytes.push(cp as u8);
    }
    byte_serialize(&bytes).collect()
}
