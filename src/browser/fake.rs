//! In-memory browser for driving the scrapers against HTML fixtures.
//!
//! Pages are served by exact URL. CSS locators run against the current page
//! through `scraper`; XPath support is limited to the
//! `//tag[contains(text(),'needle')]` shape the consent dialog uses.
//! Container heights are scripted so lazy-load pagination can be replayed.

use super::{Browser, Element, Locator};
use crate::error::BrowserError;
use crate::scrapers::extract::element_text;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone)]
struct Registered {
    css: String,
    contains: Option<String>,
    index: usize,
}

#[derive(Debug, Default)]
pub struct ScriptedBrowser {
    pages: HashMap<String, String>,
    broken: HashSet<String>,
    session_lost: bool,
    current: Option<String>,
    registry: Vec<Registered>,
    heights: VecDeque<Option<f64>>,
    last_height: f64,
    /// URLs passed to `navigate`, in call order.
    pub navigations: Vec<String>,
    /// Number of `scrollIntoView` scripts executed.
    pub scrolls: usize,
    pub height_reads: usize,
    /// Text of every clicked element.
    pub clicked: Vec<String>,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigating to `url` fails with a per-command error.
    pub fn with_broken_page(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    /// Every navigation fails as if the browser crashed.
    pub fn with_lost_session(mut self) -> Self {
        self.session_lost = true;
        self
    }

    /// Successive container heights; `None` makes that read fail.
    pub fn with_heights(mut self, heights: &[Option<f64>]) -> Self {
        self.heights = heights.iter().copied().collect();
        self
    }

    fn document(&self) -> Html {
        let html = self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .map(String::as_str)
            .unwrap_or("<html></html>");
        Html::parse_document(html)
    }

    fn matches(&self, locator: &Locator) -> Result<Vec<Registered>, BrowserError> {
        let (css, contains) = match locator {
            Locator::Css(css) => (css.clone(), None),
            Locator::XPath(expr) => {
                let re = Regex::new(r"^//(\w+)\[contains\(text\(\),\s*'([^']*)'\)\]$")
                    .map_err(|e| invalid(e.to_string()))?;
                let caps = re
                    .captures(expr)
                    .ok_or_else(|| invalid(format!("unsupported xpath {expr}")))?;
                (caps[1].to_string(), Some(caps[2].to_string()))
            }
        };
        let selector = Selector::parse(&css).map_err(|e| invalid(e.to_string()))?;
        let document = self.document();
        let count = document
            .select(&selector)
            .filter(|el| text_matches(el, contains.as_deref()))
            .count();
        Ok((0..count)
            .map(|index| Registered {
                css: css.clone(),
                contains: contains.clone(),
                index,
            })
            .collect())
    }

    fn register(&mut self, found: Registered) -> Element {
        self.registry.push(found);
        Element((self.registry.len() - 1).to_string())
    }

    fn with_element<T>(
        &self,
        element: &Element,
        f: impl FnOnce(ElementRef<'_>) -> T,
    ) -> Result<T, BrowserError> {
        let reg = element
            .0
            .parse::<usize>()
            .ok()
            .and_then(|i| self.registry.get(i))
            .ok_or_else(|| stale(&element.0))?;
        let selector = Selector::parse(&reg.css).map_err(|e| invalid(e.to_string()))?;
        let document = self.document();
        let el = document
            .select(&selector)
            .filter(|el| text_matches(el, reg.contains.as_deref()))
            .nth(reg.index)
            .ok_or_else(|| stale(&element.0))?;
        Ok(f(el))
    }
}

fn text_matches(el: &ElementRef<'_>, needle: Option<&str>) -> bool {
    needle.is_none_or(|n| el.text().any(|t| t.contains(n)))
}

fn invalid(message: String) -> BrowserError {
    BrowserError::Command {
        error: "invalid selector".to_string(),
        message,
    }
}

fn stale(id: &str) -> BrowserError {
    BrowserError::Command {
        error: "stale element reference".to_string(),
        message: format!("element {id} is gone"),
    }
}

impl Browser for ScriptedBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.navigations.push(url.to_string());
        if self.session_lost {
            return Err(BrowserError::SessionLost("browser closed".to_string()));
        }
        if self.broken.contains(url) {
            return Err(BrowserError::Command {
                error: "unknown error".to_string(),
                message: format!("net::ERR_CONNECTION_RESET at {url}"),
            });
        }
        self.current = Some(url.to_string());
        self.registry.clear();
        Ok(())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<Element>, BrowserError> {
        let first = self.matches(locator)?.into_iter().next();
        Ok(first.map(|found| self.register(found)))
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        let all = self.matches(locator)?;
        Ok(all.into_iter().map(|found| self.register(found)).collect())
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, BrowserError> {
        self.with_element(element, element_text)
    }

    async fn read_attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        self.with_element(element, |el| el.value().attr(name).map(str::to_string))
    }

    async fn click(&mut self, element: &Element) -> Result<(), BrowserError> {
        let text = self.with_element(element, element_text)?;
        self.clicked.push(text);
        Ok(())
    }

    async fn element_height(&mut self, element: &Element) -> Result<f64, BrowserError> {
        self.with_element(element, |_| ())?;
        self.height_reads += 1;
        match self.heights.pop_front() {
            Some(Some(h)) => {
                self.last_height = h;
                Ok(h)
            }
            Some(None) => Err(stale(&element.0)),
            None => Ok(self.last_height),
        }
    }

    async fn execute_script(
        &mut self,
        script: &str,
        _args: &[Element],
    ) -> Result<serde_json::Value, BrowserError> {
        if script.contains("scrollIntoView") {
            self.scrolls += 1;
        }
        Ok(serde_json::Value::Null)
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        Ok(self
            .current
            .as_ref()
            .and_then(|url| self.pages.get(url))
            .cloned()
            .unwrap_or_else(|| "<html></html>".to_string()))
    }
}
