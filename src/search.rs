//! Search API access with pagination and retry.
//!
//! # Architecture
//!
//! - [`SearchApi`]: one page of results for one query
//! - [`GoogleCse`]: the Google Programmable Search implementation
//! - [`RetrySearch`]: decorator adding bounded backoff for transient failures
//! - [`SearchClient`]: turns a query into a lazy, limit-bounded [`Stream`] of
//!   [`SearchResult`]s, requesting further pages only when the consumer asks
//!
//! # Pagination
//!
//! The CSE serves at most 10 items per request and nothing past result index
//! 100. Each page asks for `min(10, remaining)` items, and a short page ends the
//! stream.

use crate::backoff::RetryPolicy;
use crate::config::Credentials;
use crate::error::ScoutError;
use crate::models::SearchResult;
use crate::utils::truncate_for_log;
use futures::stream::{self, Stream};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Items per request the API allows.
pub const PAGE_SIZE: usize = 10;
/// Last result index the API will serve.
pub const MAX_RESULT_INDEX: usize = 100;

const CSE_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Quota-related `reason` values in Google API error bodies.
const QUOTA_REASONS: &[&str] = &[
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "quotaExceeded",
    "userRateLimitExceeded",
];

/// Backend able to serve one page of search results.
pub trait SearchApi {
    /// Fetch up to `num` results starting at 1-based index `start`.
    async fn page(&self, query: &str, start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError>;
}

impl<T: SearchApi> SearchApi for &T {
    async fn page(&self, query: &str, start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError> {
        (**self).page(query, start, num).await
    }
}

#[derive(Debug, Deserialize)]
struct CseResponse {
    #[serde(default)]
    items: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct CseErrorBody {
    #[serde(default)]
    error: CseError,
}

#[derive(Debug, Default, Deserialize)]
struct CseError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Vec<CseErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct CseErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Google Programmable Search client.
pub struct GoogleCse {
    client: Client,
    credentials: Credentials,
    endpoint: String,
}

impl fmt::Debug for GoogleCse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleCse")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl GoogleCse {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self, ScoutError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScoutError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            credentials,
            endpoint: CSE_ENDPOINT.to_string(),
        })
    }

    fn page_url(&self, query: &str, start: usize, num: usize) -> String {
        format!(
            "{}?key={}&cx={}&q={}&num={}&start={}&safe=off",
            self.endpoint,
            urlencoding::encode(&self.credentials.api_key),
            urlencoding::encode(&self.credentials.engine_id),
            urlencoding::encode(query),
            num,
            start
        )
    }
}

impl SearchApi for GoogleCse {
    #[instrument(level = "debug", skip(self))]
    async fn page(&self, query: &str, start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError> {
        let resp = self.client.get(self.page_url(query, start, num)).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let parsed: CseResponse =
            serde_json::from_str(&body).map_err(|e| ScoutError::Parse(e.to_string()))?;
        debug!(count = parsed.items.len(), "CSE page received");
        Ok(parsed.items)
    }
}

/// Map a non-success CSE response onto the error taxonomy.
///
/// Quota exhaustion shows up either as `429` or as a `403` whose error
/// details carry a quota reason; any other `401`/`403`, and a `400` about an
/// invalid key, is an authentication failure. Server errors are transient.
///
/// # Arguments
///
/// * `status` - HTTP status of the response
/// * `body` - Raw response body, usually a Google JSON error document
///
/// # Returns
///
/// The [`ScoutError`] variant that decides whether the query is retried,
/// skipped, or the run stops.
pub fn classify_failure(status: StatusCode, body: &str) -> ScoutError {
    let parsed: CseErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = if parsed.error.message.is_empty() {
        truncate_for_log(body, 200)
    } else {
        parsed.error.message.clone()
    };
    let quota_reason = parsed
        .error
        .errors
        .iter()
        .any(|d| QUOTA_REASONS.contains(&d.reason.as_str()))
        || parsed.error.status == "RESOURCE_EXHAUSTED";

    match status {
        StatusCode::TOO_MANY_REQUESTS => ScoutError::QuotaExceeded(message),
        StatusCode::FORBIDDEN if quota_reason => ScoutError::QuotaExceeded(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ScoutError::Auth(message),
        StatusCode::BAD_REQUEST if message.contains("API key not valid") => ScoutError::Auth(message),
        s if s.is_server_error() => ScoutError::Transient(format!("HTTP {}: {}", s.as_u16(), message)),
        s => ScoutError::Api {
            status: s.as_u16(),
            message,
        },
    }
}

/// Decorator that retries transient failures of any [`SearchApi`].
///
/// Auth, quota, parse and other API errors pass straight through.
pub struct RetrySearch<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: SearchApi> RetrySearch<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl<T> fmt::Debug for RetrySearch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrySearch")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<T: SearchApi> SearchApi for RetrySearch<T> {
    #[instrument(level = "info", skip(self, query))]
    async fn page(&self, query: &str, start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.page(query, start, num).await {
                Ok(items) => return Ok(items),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.policy.max_retries {
                        error!(
                            attempt,
                            max = self.policy.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "search page exhausted retries"
                        );
                        return Err(e);
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.policy.max_retries,
                        ?delay,
                        error = %e,
                        "search page failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

struct Pager {
    buffered: VecDeque<SearchResult>,
    next_start: usize,
    yielded: usize,
    done: bool,
}

/// Paginating front-end over a [`SearchApi`].
#[derive(Debug)]
pub struct SearchClient<A> {
    api: A,
}

impl<A: SearchApi> SearchClient<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Lazy stream of at most `limit` results for `query`.
    ///
    /// Pages are requested only when the buffer runs dry and more results are
    /// still wanted. An error is yielded once and ends the stream.
    pub fn results<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
    ) -> impl Stream<Item = Result<SearchResult, ScoutError>> + 'a {
        let pager = Pager {
            buffered: VecDeque::new(),
            next_start: 1,
            yielded: 0,
            done: limit == 0,
        };

        stream::unfold(pager, move |mut pager| async move {
            if pager.yielded >= limit {
                return None;
            }
            if pager.buffered.is_empty() {
                if pager.done || pager.next_start > MAX_RESULT_INDEX {
                    return None;
                }
                let remaining = limit - pager.yielded;
                let window_left = MAX_RESULT_INDEX + 1 - pager.next_start;
                let num = remaining.min(PAGE_SIZE).min(window_left);

                match self.api.page(query, pager.next_start, num).await {
                    Ok(items) => {
                        if items.len() < num {
                            pager.done = true;
                        }
                        pager.next_start += num;
                        pager.buffered.extend(items.into_iter().take(num));
                    }
                    Err(e) => {
                        pager.done = true;
                        pager.yielded = limit;
                        return Some((Err(e), pager));
                    }
                }
            }

            let item = pager.buffered.pop_front()?;
            pager.yielded += 1;
            Some((Ok(item), pager))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::cell::{Cell, RefCell};

    /// Drain [`SearchClient::results`], stopping at the first error.
    async fn collect<A: SearchApi>(
        client: &SearchClient<A>,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, ScoutError> {
        let results = client.results(query, limit);
        futures::pin_mut!(results);
        let mut out = Vec::new();
        while let Some(item) = results.next().await {
            out.push(item?);
        }
        Ok(out)
    }

    /// Serves `total` synthetic hits and records every page request.
    struct FakeApi {
        total: usize,
        calls: RefCell<Vec<(usize, usize)>>,
    }

    impl FakeApi {
        fn new(total: usize) -> Self {
            Self {
                total,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SearchApi for FakeApi {
        async fn page(&self, _query: &str, start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError> {
            self.calls.borrow_mut().push((start, num));
            let first = start - 1;
            let last = (first + num).min(self.total);
            Ok((first..last)
                .map(|i| SearchResult {
                    title: format!("hit {}", i),
                    link: format!("https://news.example.com/{}", i),
                    snippet: String::new(),
                })
                .collect())
        }
    }

    /// Fails with the given errors first, then succeeds.
    struct FlakyApi {
        failures: RefCell<Vec<ScoutError>>,
        calls: Cell<usize>,
    }

    impl SearchApi for FlakyApi {
        async fn page(&self, _query: &str, _start: usize, num: usize) -> Result<Vec<SearchResult>, ScoutError> {
            self.calls.set(self.calls.get() + 1);
            if let Some(e) = self.failures.borrow_mut().pop() {
                return Err(e);
            }
            Ok(vec![
                SearchResult {
                    title: "ok".into(),
                    link: "https://a.com/ok".into(),
                    snippet: String::new(),
                };
                num.min(1)
            ])
        }
    }

    #[tokio::test]
    async fn test_limit_bounds_results_and_pages() {
        for limit in [0usize, 1, 9, 10, 11, 25, 80] {
            let api = FakeApi::new(1_000);
            let client = SearchClient::new(&api);
            let results = collect(&client, "q", limit).await.unwrap();

            assert_eq!(results.len(), limit);
            let pages = api.calls.borrow().len();
            assert_eq!(pages, limit.div_ceil(PAGE_SIZE), "limit {}", limit);
        }
    }

    #[tokio::test]
    async fn test_page_sizes_shrink_to_remaining() {
        let api = FakeApi::new(1_000);
        let client = SearchClient::new(&api);
        collect(&client, "q", 23).await.unwrap();
        assert_eq!(*api.calls.borrow(), vec![(1, 10), (11, 10), (21, 3)]);
    }

    #[tokio::test]
    async fn test_short_page_ends_pagination() {
        let api = FakeApi::new(14);
        let client = SearchClient::new(&api);
        let results = collect(&client, "q", 50).await.unwrap();
        assert_eq!(results.len(), 14);
        assert_eq!(api.calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_result_window_caps_at_100() {
        let api = FakeApi::new(1_000);
        let client = SearchClient::new(&api);
        let results = collect(&client, "q", 250).await.unwrap();
        assert_eq!(results.len(), MAX_RESULT_INDEX);
        assert_eq!(api.calls.borrow().last(), Some(&(91, 10)));
    }

    #[tokio::test]
    async fn test_stream_is_lazy() {
        let api = FakeApi::new(1_000);
        let client = SearchClient::new(&api);
        let results = client.results("q", 80);
        futures::pin_mut!(results);

        let first = results.next().await.unwrap().unwrap();
        assert_eq!(first.title, "hit 0");
        assert_eq!(api.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_error_is_yielded_once_then_stream_ends() {
        let api = FlakyApi {
            failures: RefCell::new(vec![ScoutError::Auth("bad key".into())]),
            calls: Cell::new(0),
        };
        let client = SearchClient::new(&api);
        let results = client.results("q", 5);
        futures::pin_mut!(results);

        assert!(matches!(results.next().await, Some(Err(ScoutError::Auth(_)))));
        assert!(results.next().await.is_none());
        assert_eq!(api.calls.get(), 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failures() {
        let api = FlakyApi {
            failures: RefCell::new(vec![
                ScoutError::Transient("reset".into()),
                ScoutError::Transient("timeout".into()),
            ]),
            calls: Cell::new(0),
        };
        let retrying = RetrySearch::new(&api, RetryPolicy::new(3, Duration::ZERO));
        let items = retrying.page("q", 1, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(api.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let api = FlakyApi {
            failures: RefCell::new((0..5).map(|_| ScoutError::Transient("down".into())).collect()),
            calls: Cell::new(0),
        };
        let retrying = RetrySearch::new(&api, RetryPolicy::new(2, Duration::ZERO));
        let err = retrying.page("q", 1, 10).await.unwrap_err();
        assert!(matches!(err, ScoutError::Transient(_)));
        assert_eq!(api.calls.get(), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_quota() {
        let api = FlakyApi {
            failures: RefCell::new(vec![ScoutError::QuotaExceeded("daily".into())]),
            calls: Cell::new(0),
        };
        let retrying = RetrySearch::new(&api, RetryPolicy::new(5, Duration::ZERO));
        assert!(matches!(
            retrying.page("q", 1, 10).await,
            Err(ScoutError::QuotaExceeded(_))
        ));
        assert_eq!(api.calls.get(), 1);
    }

    #[test]
    fn test_classify_failure() {
        let quota = r#"{"error":{"code":403,"message":"Daily Limit Exceeded","errors":[{"reason":"dailyLimitExceeded"}]}}"#;
        assert!(matches!(
            classify_failure(StatusCode::FORBIDDEN, quota),
            ScoutError::QuotaExceeded(_)
        ));

        let denied = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert!(matches!(classify_failure(StatusCode::FORBIDDEN, denied), ScoutError::Auth(_)));

        let bad_key = r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#;
        assert!(matches!(classify_failure(StatusCode::BAD_REQUEST, bad_key), ScoutError::Auth(_)));

        assert!(matches!(
            classify_failure(StatusCode::TOO_MANY_REQUESTS, ""),
            ScoutError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::BAD_GATEWAY, "<html>"),
            ScoutError::Transient(_)
        ));
        assert!(matches!(
            classify_failure(StatusCode::NOT_FOUND, "{}"),
            ScoutError::Api { status: 404, .. }
        ));
    }

    #[test]
    fn test_page_url_encodes_query() {
        let cse = GoogleCse::new(
            Credentials {
                api_key: "k".into(),
                engine_id: "cx".into(),
            },
            Duration::from_secs(5),
        )
        .unwrap();
        let url = cse.page_url("(robots) AND (\"raises\") site:a.com", 11, 10);
        assert!(url.starts_with(CSE_ENDPOINT));
        assert!(url.contains("q=%28robots%29%20AND%20%28%22raises%22%29%20site%3Aa.com"));
        assert!(url.contains("&num=10&start=11&safe=off"));
    }
}
