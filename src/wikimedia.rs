use anyhow::{Context, Result};
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.wikimedia.org";

const USER_AGENT: &str = concat!("agecalc/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const NO_DESCRIPTION: &str = "No description available";

/// One person born on the requested day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Celebrity {
    pub title: String,
    pub extract: String,
    pub page_url: String,
}

/// Result of a birthday lookup, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum CelebrityLookup {
    Found(Vec<Celebrity>),
    /// The feed had no births for the day.
    NoneOnDate,
    /// Births were listed but none carried a usable page.
    NoEntries,
    Failed(String),
}

#[derive(Deserialize)]
pub(crate) struct BirthsFeed {
    #[serde(default)]
    births: Vec<Birth>,
}

#[derive(Deserialize)]
struct Birth {
    #[serde(default)]
    pages: Option<Vec<Page>>,
}

#[derive(Deserialize)]
struct Page {
    title: Option<String>,
    titles: Option<Titles>,
    extract: Option<String>,
    content_urls: Option<ContentUrls>,
}

#[derive(Deserialize)]
struct Titles {
    normalized: Option<String>,
    display: Option<String>,
}

#[derive(Deserialize)]
struct ContentUrls {
    desktop: Option<PlatformUrls>,
}

#[derive(Deserialize)]
struct PlatformUrls {
    page: Option<String>,
}

/// Flattens the feed into unique pages, first occurrence wins.
pub(crate) fn collect_celebrities(feed: BirthsFeed) -> CelebrityLookup {
    if feed.births.is_empty() {
        return CelebrityLookup::NoneOnDate;
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for page in feed.births.into_iter().flat_map(|b| b.pages.unwrap_or_default()) {
        let title = page
            .titles
            .as_ref()
            .and_then(|t| {
                non_empty(t.normalized.as_deref()).or_else(|| non_empty(t.display.as_deref()))
            })
            .or_else(|| non_empty(page.title.as_deref()))
            .map(str::to_string);

        let Some(title) = title else { continue };
        if !seen.insert(title.clone()) {
            continue;
        }

        let extract = page
            .extract
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());
        let page_url = page
            .content_urls
            .and_then(|c| c.desktop)
            .and_then(|d| d.page)
            .unwrap_or_default();

        out.push(Celebrity {
            title,
            extract,
            page_url,
        });
    }

    if out.is_empty() {
        CelebrityLookup::NoEntries
    } else {
        CelebrityLookup::Found(out)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[derive(Clone)]
pub struct WikimediaClient {
    base_url: Arc<String>,
    http: Arc<Client>,
}

impl WikimediaClient {
    /// Create a client for the Wikimedia REST API rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: Arc::new(base_url.trim_end_matches('/').to_string()),
            http: Arc::new(http),
        })
    }

    fn births_url(&self, month: u32, day: u32) -> String {
        format!(
            "{}/feed/v1/wikipedia/en/onthisday/births/{month:02}/{day:02}",
            self.base_url
        )
    }

    /// GET with basic retry/backoff.
    async fn get_json(&self, url: &str) -> Result<Value> {
        const MAX_RETRIES: usize = 4;
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            debug!(url, attempt, "requesting feed");

            let resp = self
                .http
                .get(url)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("Network error fetching {url}: {e}"))?;

            let status = resp.status();

            if status.is_success() {
                return resp
                    .json()
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to parse JSON from Wikimedia: {e}"));
            }

            // If rate limited, honor Retry-After header when present
            if status.as_u16() == 429 {
                if attempt >= MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "Wikimedia API returned 429 (rate-limited) and retries exhausted"
                    ));
                }
                let wait_secs = resp
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(2);
                warn!(wait_secs, attempt, "rate limited by Wikimedia, waiting");
                sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            // Retry on 5xx server errors
            if status.is_server_error() && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(250u64.saturating_mul(1 << (attempt - 1)));
                warn!(status = status.as_u16(), ?backoff, "Wikimedia server error, retrying");
                sleep(backoff).await;
                continue;
            }

            return Err(anyhow::anyhow!(
                "HTTP error! status: {}",
                status.as_u16()
            ));
        }
    }

    /// Famous people born on `month`/`day` (any year).
    pub async fn births_on(&self, month: u32, day: u32) -> Result<CelebrityLookup> {
        let url = self.births_url(month, day);
        let json = self.get_json(&url).await?;
        let feed: BirthsFeed =
            serde_json::from_value(json).context("Failed to deserialize births feed")?;
        Ok(collect_celebrities(feed))
    }

    /// Like [`births_on`](Self::births_on), folding errors into
    /// [`CelebrityLookup::Failed`].
    pub async fn lookup(&self, month: u32, day: u32) -> CelebrityLookup {
        match self.births_on(month, day).await {
            Ok(found) => found,
            Err(err) => {
                warn!(month, day, error = %format!("{err:#}"), "celebrity lookup failed");
                CelebrityLookup::Failed(format!("{err:#}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn lookup(value: Value) -> CelebrityLookup {
        collect_celebrities(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn empty_feed_means_nobody_on_date() {
        assert_eq!(lookup(json!({ "births": [] })), CelebrityLookup::NoneOnDate);
        assert_eq!(lookup(json!({})), CelebrityLookup::NoneOnDate);
    }

    #[test]
    fn births_without_pages_mean_no_entries() {
        let feed = json!({
            "births": [
                { "text": "Someone", "year": 1900 },
                { "text": "Blank", "pages": [ { "title": "" } ] }
            ]
        });
        assert_eq!(lookup(feed), CelebrityLookup::NoEntries);
    }

    #[test]
    fn titles_prefer_normalized_then_display_then_title() {
        let feed = json!({
            "births": [{
                "pages": [
                    { "title": "A_raw", "titles": { "normalized": "A", "display": "<i>A</i>" } },
                    { "title": "B_raw", "titles": { "display": "B shown" } },
                    { "title": "C_raw" }
                ]
            }]
        });
        let CelebrityLookup::Found(list) = lookup(feed) else {
            panic!("expected celebrities");
        };
        let titles: Vec<_> = list.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["A", "B shown", "C_raw"]);
    }

    #[test]
    fn duplicates_are_dropped_and_defaults_filled() {
        let feed = json!({
            "births": [
                {
                    "pages": [{
                        "titles": { "normalized": "Ada Lovelace" },
                        "extract": "English mathematician",
                        "content_urls": {
                            "desktop": { "page": "https://en.wikipedia.org/wiki/Ada_Lovelace" }
                        }
                    }]
                },
                {
                    "pages": [
                        { "titles": { "normalized": "Ada Lovelace" }, "extract": "duplicate" },
                        { "titles": { "normalized": "Nobody Known" } }
                    ]
                }
            ]
        });
        let CelebrityLookup::Found(list) = lookup(feed) else {
            panic!("expected celebrities");
        };
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].extract, "English mathematician");
        assert_eq!(list[0].page_url, "https://en.wikipedia.org/wiki/Ada_Lovelace");
        assert_eq!(list[1].extract, NO_DESCRIPTION);
        assert_eq!(list[1].page_url, "");
    }

    #[test]
    fn births_url_is_zero_padded() {
        let client = WikimediaClient::new("https://example.org/").unwrap();
        assert_eq!(
            client.births_url(6, 4),
            "https://example.org/feed/v1/wikipedia/en/onthisday/births/06/04"
        );
    }

    /// Serves `responses` in order, one connection each, recording every
    /// request head it receives.
    async fn scripted_server(responses: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        tokio::spawn(async move {
            for response in responses {
                let (mut stream, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut chunk = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = stream.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    head.extend_from_slice(&chunk[..n]);
                }
                seen.lock().unwrap().push(String::from_utf8_lossy(&head).to_lowercase());
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.unwrap();
            }
        });

        (base_url, requests)
    }

    fn http_response(status: &str, extra_headers: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\n{extra_headers}\
             content-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    fn births_body() -> String {
        json!({ "births": [{ "pages": [{ "titles": { "normalized": "Ada Lovelace" } }] }] })
            .to_string()
    }

    fn request_count(requests: &Arc<Mutex<Vec<String>>>) -> usize {
        requests.lock().unwrap().len()
    }

    #[tokio::test]
    async fn server_error_is_retried_then_succeeds() {
        let (base, requests) = scripted_server(vec![
            http_response("503 Service Unavailable", "", ""),
            http_response("200 OK", "", &births_body()),
        ])
        .await;
        let client = WikimediaClient::new(&base).unwrap();

        let CelebrityLookup::Found(list) = client.births_on(6, 4).await.unwrap() else {
            panic!("expected celebrities");
        };
        assert_eq!(list[0].title, "Ada Lovelace");
        assert_eq!(request_count(&requests), 2);

        let first = requests.lock().unwrap()[0].clone();
        assert!(first.starts_with("get /feed/v1/wikipedia/en/onthisday/births/06/04 "));
        assert!(first.contains("user-agent: agecalc/"));
    }

    #[tokio::test]
    async fn rate_limit_waits_for_retry_after() {
        let (base, requests) = scripted_server(vec![
            http_response("429 Too Many Requests", "retry-after: 0\r\n", ""),
            http_response("200 OK", "", &births_body()),
        ])
        .await;
        let client = WikimediaClient::new(&base).unwrap();

        assert!(matches!(
            client.births_on(1, 1).await.unwrap(),
            CelebrityLookup::Found(_)
        ));
        assert_eq!(request_count(&requests), 2);
    }

    #[tokio::test]
    async fn client_error_fails_without_retry() {
        let (base, requests) =
            scripted_server(vec![http_response("404 Not Found", "", "")]).await;
        let client = WikimediaClient::new(&base).unwrap();

        let err = client.births_on(2, 30).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 404");
        assert_eq!(request_count(&requests), 1);
    }

    #[tokio::test]
    async fn server_errors_give_up_after_four_attempts() {
        let (base, requests) =
            scripted_server(vec![http_response("502 Bad Gateway", "", ""); 4]).await;
        let client = WikimediaClient::new(&base).unwrap();

        let err = client.births_on(3, 3).await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 502");
        assert_eq!(request_count(&requests), 4);
    }

    #[tokio::test]
    async fn rate_limit_gives_up_after_four_attempts() {
        let limited = http_response("429 Too Many Requests", "retry-after: 0\r\n", "");
        let (base, requests) = scripted_server(vec![limited; 4]).await;
        let client = WikimediaClient::new(&base).unwrap();

        let err = client.births_on(3, 3).await.unwrap_err();
        assert!(err.to_string().contains("retries exhausted"), "{err}");
        assert_eq!(request_count(&requests), 4);
    }

    #[tokio::test]
    async fn lookup_folds_errors_into_failed() {
        let (base, _) = scripted_server(vec![http_response("404 Not Found", "", "")]).await;
        let client = WikimediaClient::new(&base).unwrap();

        assert_eq!(
            client.lookup(2, 30).await,
            CelebrityLookup::Failed("HTTP error! status: 404".to_string())
        );
    }

    #[tokio::test]
    async fn undecodable_feed_is_an_error() {
        let (base, _) = scripted_server(vec![http_response("200 OK", "", "not json")]).await;
        let client = WikimediaClient::new(&base).unwrap();

        let CelebrityLookup::Failed(msg) = client.lookup(7, 7).await else {
            panic!("expected a failure");
        };
        assert!(msg.starts_with("Failed to parse JSON from Wikimedia"), "{msg}");
    }

    #[test]
    fn lookup_serializes_with_status_tag() {
        let json = serde_json::to_value(CelebrityLookup::Failed("boom".into())).unwrap();
        assert_eq!(json, json!({ "status": "failed", "detail": "boom" }));
        let json = serde_json::to_value(CelebrityLookup::NoneOnDate).unwrap();
        assert_eq!(json, json!({ "status": "none_on_date" }));
    }
}
