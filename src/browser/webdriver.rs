//! Minimal W3C WebDriver client.
//!
//! Speaks the JSON wire format of the [WebDriver spec](https://www.w3.org/TR/webdriver2/)
//! to a running `chromedriver` or `geckodriver`. Only the commands the scraper
//! uses are implemented.
//!
//! # Error mapping
//!
//! | Driver answer | [`BrowserError`] | Fatal |
//! |---------------|------------------|-------|
//! | HTTP / connection failure | `Transport` | yes |
//! | `invalid session id` | `SessionLost` | yes |
//! | `no such element` on find | `Ok(None)` | - |
//! | any other `error` | `Command` | no |

use super::{Browser, Element, Locator};
use crate::error::BrowserError;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

/// Key under which the protocol serializes element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug)]
pub struct WebDriver {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriver {
    /// Start a new browser session on the driver at `base_url`.
    #[instrument(level = "info")]
    pub async fn new_session(base_url: &str, headless: bool) -> Result<Self, BrowserError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = Client::new();

        let mut args = vec!["--window-size=1280,1024", "--disable-gpu"];
        if headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let resp = client
            .post(format!("{base_url}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let status = resp.status();
        let body: Value = resp.json().await?;
        let value = unwrap_value(status.is_success(), body)?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| BrowserError::Protocol(format!("no sessionId in {value}")))?
            .to_string();

        info!(%session_id, "WebDriver session started");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    /// End the session and close the browser.
    #[instrument(level = "info", skip_all, fields(session_id = %self.session_id))]
    pub async fn quit(self) -> Result<(), BrowserError> {
        self.command(Method::DELETE, "", None).await?;
        info!("WebDriver session closed");
        Ok(())
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        let body: Value = resp.json().await?;
        unwrap_value(status.is_success(), body)
    }

    fn element_path(element: &Element, rest: &str) -> String {
        format!("/element/{}{}", element.0, rest)
    }
}

/// Pull `value` out of a response body, turning protocol errors into [`BrowserError`].
fn unwrap_value(success: bool, mut body: Value) -> Result<Value, BrowserError> {
    let Some(value) = body.get_mut("value").map(Value::take) else {
        return Err(BrowserError::Protocol(format!("response without value: {body}")));
    };
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string);
    match error {
        None if success => Ok(value),
        None => Err(BrowserError::Protocol(format!("error status without error code: {value}"))),
        Some(code) => {
            let message = value["message"].as_str().unwrap_or_default().to_string();
            if code == "invalid session id" {
                Err(BrowserError::SessionLost(message))
            } else {
                Err(BrowserError::Command {
                    error: code,
                    message,
                })
            }
        }
    }
}

fn locator_body(locator: &Locator) -> Value {
    match locator {
        Locator::Css(s) => json!({ "using": "css selector", "value": s }),
        Locator::XPath(s) => json!({ "using": "xpath", "value": s }),
    }
}

fn parse_element(value: &Value) -> Result<Element, BrowserError> {
    value[ELEMENT_KEY]
        .as_str()
        .map(|id| Element(id.to_string()))
        .ok_or_else(|| BrowserError::Protocol(format!("not an element reference: {value}")))
}

impl Browser for WebDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        debug!(%url, "Navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<Element>, BrowserError> {
        match self
            .command(Method::POST, "/element", Some(locator_body(locator)))
            .await
        {
            Ok(value) => parse_element(&value).map(Some),
            Err(BrowserError::Command { error, .. }) if error == "no such element" => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&mut self, locator: &Locator) -> Result<Vec<Element>, BrowserError> {
        let value = self
            .command(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol(format!("expected element list, got {value}")))?
            .iter()
            .map(parse_element)
            .collect()
    }

    async fn read_text(&mut self, element: &Element) -> Result<String, BrowserError> {
        let value = self
            .command(Method::GET, &Self::element_path(element, "/text"), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn read_attribute(
        &mut self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let path = Self::element_path(element, &format!("/attribute/{name}"));
        let value = self.command(Method::GET, &path, None).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&mut self, element: &Element) -> Result<(), BrowserError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/click"),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn element_height(&mut self, element: &Element) -> Result<f64, BrowserError> {
        let rect = self
            .command(Method::GET, &Self::element_path(element, "/rect"), None)
            .await?;
        rect["height"]
            .as_f64()
            .ok_or_else(|| BrowserError::Protocol(format!("rect without height: {rect}")))
    }

    async fn execute_script(
        &mut self,
        script: &str,
        args: &[Element],
    ) -> Result<Value, BrowserError> {
        let args: Vec<Value> = args.iter().map(|e| json!({ ELEMENT_KEY: e.0 })).collect();
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        let value = self.command(Method::GET, "/source", None).await?;
        match value {
            Value::String(s) => Ok(s),
            other => {
                warn!(%other, "Page source was not a string");
                Err(BrowserError::Protocol("page source was not a string".to_string()))
            }
        }
    }
}
