//! Page fetching and HTML-to-text rendering.
//!
//! [`PageFetcher`] performs one GET per attempt, throttled so that at least
//! the configured delay separates consecutive requests. Any failure ends in
//! [`FetchOutcome::Failed`]; the pipeline then falls back to the search
//! title and snippet.
//!
//! [`parse_page`] strips markup to visible text and collects publish-date
//! hints from structured metadata in the same pass.

use crate::backoff::RetryPolicy;
use crate::error::ScoutError;
use crate::models::{FetchOutcome, FetchedPage};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

/// Metadata carrying the publish date, in priority order.
static DATE_META_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="pubdate"]"#,
        r#"[itemprop="datePublished"]"#,
        r#"meta[property="og:published_time"]"#,
        r#"meta[name="parsely-pub-date"]"#,
        r#"meta[name="publish-date"]"#,
        r#"meta[name="dc.date"]"#,
        "time[datetime]",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector"))
    .collect()
});

static LD_JSON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector"));

static LD_DATE_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""datePublished"\s*:\s*"([^"]+)""#).expect("static regex"));

/// Source of page contents for search hits.
pub trait PageSource {
    async fn fetch(&mut self, url: &str) -> FetchOutcome;
}

impl<T: PageSource> PageSource for &mut T {
    async fn fetch(&mut self, url: &str) -> FetchOutcome {
        (**self).fetch(url).await
    }
}

/// HTTP page fetcher with timeout, courtesy delay and bounded retry.
#[derive(Debug)]
pub struct PageFetcher {
    client: Client,
    delay: Duration,
    retry: RetryPolicy,
    last_request: Option<Instant>,
}

impl PageFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        delay: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ScoutError> {
        let mut headers = HeaderMap::new();
        let agent = HeaderValue::from_str(user_agent)
            .map_err(|e| ScoutError::Config(format!("invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ScoutError::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            delay,
            retry,
            last_request: None,
        })
    }

    /// Sleep until `delay` has passed since the previous request.
    async fn throttle(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    async fn fetch_once(&mut self, url: &str) -> Result<String, ScoutError> {
        self.throttle().await;
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                ScoutError::Transient(format!("HTTP {}", status.as_u16()))
            } else {
                ScoutError::Api {
                    status: status.as_u16(),
                    message: "page request rejected".to_string(),
                }
            });
        }

        if let Some(ct) = resp.headers().get(CONTENT_TYPE) {
            let ct = ct.to_str().unwrap_or_default().to_ascii_lowercase();
            if !is_html_content_type(&ct) {
                return Err(ScoutError::Parse(format!("not an HTML page ({})", ct)));
            }
        }

        Ok(resp.text().await?)
    }
}

impl PageSource for PageFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&mut self, url: &str) -> FetchOutcome {
        let mut attempt = 0usize;
        loop {
            match self.fetch_once(url).await {
                Ok(html) => {
                    let page = parse_page(&html);
                    info!(bytes = html.len(), chars = page.text.len(), "Fetched page");
                    return FetchOutcome::Fetched(page);
                }
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    debug!(attempt, ?delay, error = %e, "page fetch failed; backing off");
                    sleep(delay).await;
                }
                Err(e) => {
                    warn!(error = %e, "page fetch failed; falling back to search snippet");
                    return FetchOutcome::Failed {
                        reason: e.to_string(),
                    };
                }
            }
        }
    }
}

fn is_html_content_type(ct: &str) -> bool {
    ct.contains("text/html") || ct.contains("application/xhtml+xml")
}

/// Render an HTML document to plain text and collect publish-date hints.
pub fn parse_page(html: &str) -> FetchedPage {
    let document = Html::parse_document(html);
    FetchedPage {
        text: visible_text(&document),
        published_hints: published_hints(&document),
    }
}

fn visible_text(document: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| HIDDEN_ELEMENTS.contains(&e.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

fn published_hints(document: &Html) -> Vec<String> {
    let mut hints = Vec::new();
    for selector in DATE_META_SELECTORS.iter() {
        for el in document.select(selector) {
            let value = el
                .value()
                .attr("content")
                .or_else(|| el.value().attr("datetime"))
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(v) = value {
                hints.push(v.to_string());
            }
        }
    }
    for script in document.select(&LD_JSON_SELECTOR) {
        let body = script.text().collect::<String>();
        for cap in LD_DATE_PUBLISHED.captures_iter(&body) {
            hints.push(cap[1].to_string());
        }
    }
    hints
}
