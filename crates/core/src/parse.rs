//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types for
//! parsing ISFDB pages and navigating them with CSS selectors, plus the
//! two access patterns the record pages need: labelled `<li>` sections
//! ("**Publisher:** Gollancz") and content boxes whose fields are
//! separated by `<br>` rather than by elements.
//!
//! # Example
//!
//! ```rust
//! use fabula_core::parse::Document;
//!
//! let html = r#"<ul><li><b>Format:</b> hc</li></ul>"#;
//! let doc = Document::parse(html).unwrap();
//! let li = &doc.select("li").unwrap()[0];
//! assert_eq!(li.label(), Some("Format".to_string()));
//! assert_eq!(li.tail_text(), "hc");
//! ```

use scraper::{ElementRef, Html, Node, Selector};

use crate::encoding::decode_page;
use crate::error::{Error, Result};
use crate::preprocess::strip_tooltips;

/// A parsed page.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string without any cleanup.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html) })
    }

    /// Parses a raw response body.
    ///
    /// Decodes the bytes as ISO-8859-1 and strips tooltip markup before
    /// building the tree. This is the entry point for every fetched
    /// page.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode_page(bytes);
        Self::parse(&strip_tooltips(&text))
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HtmlParse`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| Error::HtmlParse(format!("Invalid selector: {}", e)))?;
        Ok(self.html.select(&sel).map(|element| Element { element }).collect())
    }

    /// Selects the first element matching a CSS selector.
    pub fn select_first(&'_ self, selector: &str) -> Result<Option<Element<'_>>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Gets all text content of the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A single node in the page tree.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

/// One field of a content box whose fields are separated by `<br>`.
///
/// Title pages do not wrap their fields in elements; consecutive text
/// and links between two `<br>` tags form one logical field.
#[derive(Clone, Debug, Default)]
pub struct Run {
    /// Concatenated text of the run, whitespace-collapsed.
    pub text: String,
    /// `(href, anchor text)` pairs in document order.
    pub links: Vec<(String, String)>,
}

impl<'a> Element<'a> {
    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// The returned elements borrow from the document, not from this
    /// element, so they may outlive it.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = Selector::parse(selector)
            .map_err(|e| Error::HtmlParse(format!("Invalid selector: {}", e)))?;
        Ok(self.element.select(&sel).map(|element| Element { element }).collect())
    }

    /// Selects the first matching descendant element.
    pub fn select_first(&self, selector: &str) -> Result<Option<Element<'a>>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Gets the label of a `<li><b>Label:</b> ...` section.
    ///
    /// Returns the text of the first bold child with the trailing colon
    /// removed, or `None` when the item carries no label.
    pub fn label(&self) -> Option<String> {
        let sel = Selector::parse("b").ok()?;
        let bold = self.element.select(&sel).next()?;
        let text: String = bold.text().collect();
        let label = text.trim().trim_end_matches(':').trim();
        if label.is_empty() { None } else { Some(label.to_string()) }
    }

    /// Gets the text that follows the label of a labelled section.
    ///
    /// Everything after the first bold child is collected, so link text
    /// is included but the label itself is not.
    pub fn tail_text(&self) -> String {
        let mut out = String::new();
        let mut past_label = false;
        for child in self.element.children() {
            match child.value() {
                Node::Element(el) if !past_label && el.name() == "b" => past_label = true,
                Node::Text(text) if past_label => out.push_str(text),
                Node::Element(_) if past_label => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        out.extend(child_ref.text());
                    }
                }
                _ => {}
            }
        }
        crate::text::clean_text(&out)
    }

    /// Gets the `(href, text)` pairs of all descendant anchors.
    pub fn links(&self) -> Vec<(String, String)> {
        let Ok(anchors) = self.select("a[href]") else { return Vec::new() };
        anchors
            .iter()
            .filter_map(|a| {
                a.attr("href")
                    .map(|href| (href.to_string(), crate::text::clean_text(&a.text())))
            })
            .collect()
    }

    /// Partitions the direct children of this element into fields
    /// separated by `<br>` tags.
    ///
    /// Runs with neither text nor links are dropped, so consecutive
    /// `<br><br>` separators do not produce empty fields.
    pub fn br_runs(&self) -> Vec<Run> {
        let mut runs = Vec::new();
        let mut current = Run::default();

        for child in self.element.children() {
            match child.value() {
                Node::Element(el) if el.name() == "br" => {
                    if !current.text.is_empty() || !current.links.is_empty() {
                        runs.push(std::mem::take(&mut current));
                    }
                }
                Node::Text(text) => current.text.push_str(text),
                Node::Element(_) => {
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        let wrapped = Element { element: child_ref };
                        current.text.extend(child_ref.text());
                        if child_ref.value().name() == "a" {
                            if let Some(href) = wrapped.attr("href") {
                                current
                                    .links
                                    .push((href.to_string(), crate::text::clean_text(&wrapped.text())));
                            }
                        } else {
                            current.links.extend(wrapped.links());
                        }
                    }
                }
                _ => {}
            }
        }
        if !current.text.is_empty() || !current.links.is_empty() {
            runs.push(current);
        }

        for run in &mut runs {
            run.text = crate::text::clean_text(&run.text);
        }
        runs.retain(|run| !run.text.is_empty() || !run.links.is_empty());
        runs
    }
}
