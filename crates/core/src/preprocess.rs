//! HTML preprocessing before metadata extraction.
//!
//! Detail pages decorate abbreviations and record numbers with tooltip
//! markup that pollutes naive text extraction ("SFBC" becomes
//! "SFBCScience Fiction Book Club"). The tooltip nodes are stripped with
//! a streaming rewrite before the page is handed to the parser.

/// Strips tooltip markup from a detail page.
///
/// Removes `sup.mouseover` trigger elements and `span.tooltiptext`
/// payload elements, content included. On rewriter failure the input is
/// returned unchanged so a malformed page degrades to noisy text rather
/// than no text.
pub fn strip_tooltips(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("sup.mouseover", |el| {
                    el.remove();
                    Ok(())
                }),
                lol_html::element!("span.tooltiptext", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    match rewriter.write(html.as_bytes()) {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    match rewriter.end() {
        Ok(_) => {}
        Err(_) => return html.to_string(),
    }

    if output.is_empty() { html.to_string() } else { output }
}
