//! Field extraction from a loaded ECB article page.
//!
//! Works on the page source the browser reports once the article rendered.
//! Only `title`, `published` and `text` are required; every other field is
//! read independently so a page without footnotes or a category still yields
//! a document.

use crate::dates;
use crate::error::ExtractError;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static MAIN: Lazy<Selector> = Lazy::new(|| selector("main"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("div[class='title'] h1"));
static CATEGORY: Lazy<Selector> = Lazy::new(|| selector("div[class='title'] ul li"));
static PUBLICATION_DATE: Lazy<Selector> = Lazy::new(|| selector(".ecb-publicationDate"));
static SECTION: Lazy<Selector> = Lazy::new(|| selector(".section"));
static BULLETS: Lazy<Selector> = Lazy::new(|| selector("ul"));
static FOOTNOTES: Lazy<Selector> = Lazy::new(|| selector(".footnotes"));

/// Fields read from an article page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFields {
    pub title: String,
    pub category: Option<String>,
    pub published: NaiveDateTime,
    /// Body text, with footnotes appended after a blank line.
    pub text: String,
    pub abstract_: Option<String>,
}

/// Extract publication fields from an article page's HTML.
pub fn extract_fields(html: &str) -> Result<PageFields, ExtractError> {
    let document = Html::parse_document(html);
    let main = document
        .select(&MAIN)
        .next()
        .ok_or(ExtractError::NotAnArticle)?;

    let title = first_text(main, &TITLE).ok_or(ExtractError::MissingField("title"))?;
    let category = first_text(main, &CATEGORY);

    let date_label =
        first_text(main, &PUBLICATION_DATE).ok_or(ExtractError::MissingField("published"))?;
    let published = dates::normalize(&date_label)?;

    let section = main
        .select(&SECTION)
        .next()
        .ok_or(ExtractError::MissingField("text"))?;
    let mut text = element_text(section);
    if text.is_empty() {
        return Err(ExtractError::MissingField("text"));
    }
    let abstract_ = first_text(section, &BULLETS);

    // Footnotes may sit outside <main>.
    if let Some(footnotes) = document
        .select(&FOOTNOTES)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
    {
        text.push_str("\n\n");
        text.push_str(&footnotes);
    }

    Ok(PageFields {
        title,
        category,
        published,
        text,
        abstract_,
    })
}

/// Text of the first element under `scope` matching `sel`, if non-empty.
fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "pre", "section", "table", "tr", "ul",
];

/// Rendered text of an element, close to what a browser's `innerText` gives.
///
/// Block elements and `<br>` break lines, whitespace inside a line collapses
/// to single spaces and blank lines are dropped.
pub fn element_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(el, &mut raw);
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            // Source newlines are layout, not line breaks.
            Node::Text(text) => out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(e) => {
                let name = e.name();
                if matches!(name, "script" | "style" | "noscript" | "template") {
                    continue;
                }
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}
