use std::collections::HashSet;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client as HttpClient, StatusCode};
use tracing::{debug, warn};

use super::models::{ApiError, BarsRequest, BarsResponse, ErrorResponse};
use crate::api::BarsProvider;
use crate::config::{Credentials, ProviderSettings};
use crate::models::Bar;

const API_KEY_HEADER: &str = "apca-api-key-id";
const SECRET_KEY_HEADER: &str = "apca-api-secret-key";

/// Alpaca market data client for historical stock bars
pub struct AlpacaClient {
    http_client: HttpClient,
    credentials: Credentials,
    base_url: String,
    feed: Option<String>,
}

impl AlpacaClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://data.alpaca.markets/v2";

    /// Create a new client against the public data endpoint
    pub fn new(credentials: Credentials) -> Self {
        Self::with_base_url(credentials, Self::DEFAULT_BASE_URL.to_string())
    }

    /// Create a new client with custom base URL (for testing)
    pub fn with_base_url(credentials: Credentials, base_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            credentials,
            base_url,
            feed: None,
        }
    }

    /// Restrict queries to one data feed, e.g. `iex`
    pub fn with_feed(mut self, feed: Option<String>) -> Self {
        self.feed = feed;
        self
    }

    /// Build a client from `ALPACA_*` environment variables
    pub fn from_env() -> Result<Self, ApiError> {
        let credentials = Credentials::from_env()?;
        let settings = ProviderSettings::from_env();
        debug!(
            "Alpaca client using {} (feed: {})",
            settings.base_url,
            settings.feed.as_deref().unwrap_or("default")
        );
        Ok(Self::with_base_url(credentials, settings.base_url).with_feed(settings.feed))
    }

    /// Create default headers carrying the key pair
    fn create_headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let key = HeaderValue::from_str(&self.credentials.api_key)
            .map_err(|e| ApiError::RequestError(format!("Invalid API key header: {}", e)))?;
        let secret = HeaderValue::from_str(&self.credentials.secret_key)
            .map_err(|e| ApiError::RequestError(format!("Invalid secret key header: {}", e)))?;
        headers.insert(API_KEY_HEADER, key);
        headers.insert(SECRET_KEY_HEADER, secret);

        Ok(headers)
    }

    fn bars_url(&self, symbol: &str) -> String {
        format!("{}/stocks/{}/bars", self.base_url, symbol)
    }

    /// Query string for one page of a bars request
    fn bars_query(&self, request: &BarsRequest, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("timeframe", request.granularity.alpaca_timeframe().to_string()),
            ("start", request.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end", request.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("limit", request.limit.to_string()),
            ("adjustment", "raw".to_string()),
        ];
        if let Some(feed) = &self.feed {
            query.push(("feed", feed.clone()));
        }
        if let Some(token) = page_token {
            query.push(("page_token", token.to_string()));
        }
        query
    }

    /// Map a non-success status and its body to an [`ApiError`]
    fn classify_error(status: StatusCode, body_text: String) -> ApiError {
        let message = serde_json::from_str::<ErrorResponse>(&body_text)
            .ok()
            .and_then(|e| e.message)
            .unwrap_or(body_text);

        match status.as_u16() {
            400 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized(message),
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            422 => ApiError::Unprocessable(message),
            429 => {
                warn!("Rate limited by market data API: {}", message);
                ApiError::RateLimited(message)
            }
            code @ 500..=599 => {
                warn!("Server error {}: {}", code, message);
                ApiError::ServerError(code, message)
            }
            code => ApiError::HttpError(code, message),
        }
    }

    async fn handle_error_response(status: StatusCode, response: reqwest::Response) -> ApiError {
        let body_text = response.text().await.unwrap_or_default();
        Self::classify_error(status, body_text)
    }

    /// GET /stocks/{symbol}/bars
    ///
    /// Fetches one page of bars.
    async fn get_bars_page(
        &self,
        request: &BarsRequest,
        page_token: Option<&str>,
    ) -> Result<BarsResponse, ApiError> {
        let url = self.bars_url(&request.symbol);
        let headers = self.create_headers()?;

        let response = self
            .http_client
            .get(&url)
            .headers(headers)
            .query(&self.bars_query(request, page_token))
            .send()
            .await
            .map_err(|e| ApiError::RequestError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Self::handle_error_response(status, response).await);
        }

        response
            .json::<BarsResponse>()
            .await
            .map_err(|e| ApiError::DeserializationError(format!("Failed to parse response: {}", e)))
    }

    /// Fetch every bar in the request window, following `next_page_token`
    ///
    /// # Returns
    /// * `Ok(Vec<Bar>)` - Bars in the order the API returned them
    /// * `Err(ApiError)` - First failing page, unchanged
    pub async fn get_stock_bars(&self, request: &BarsRequest) -> Result<Vec<Bar>, ApiError> {
        let mut bars: Vec<Bar> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self.get_bars_page(request, page_token.as_deref()).await?;
            pages += 1;
            bars.extend(page.bars.unwrap_or_default().into_iter().map(Bar::from));

            match page.next_page_token {
                Some(next) if !seen_tokens.insert(next.clone()) => {
                    warn!("API repeated page token for {}, stopping pagination", request.symbol);
                    break;
                }
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(
            "Fetched {} bar(s) for {} in {} page(s)",
            bars.len(),
            request.symbol,
            pages
        );
        Ok(bars)
    }
}

#[async_trait]
impl BarsProvider for AlpacaClient {
    async fn get_bars(&self, request: &BarsRequest) -> Result<Vec<Bar>, ApiError> {
        self.get_stock_bars(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Granularity;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned JSON body per connection and record each request line
    async fn serve_pages(pages: Vec<String>) -> (String, Arc<Mutex<Vec<String>>>, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v2", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        let handle = tokio::spawn(async move {
            for body in pages {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut raw = Vec::new();
                let mut buf = [0u8; 1024];
                while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    raw.extend_from_slice(&buf[..n]);
                }
                let text = String::from_utf8_lossy(&raw).to_string();
                let request_line = text.lines().next().unwrap_or_default().to_string();
                recorded.lock().unwrap().push(request_line);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (base_url, requests, handle)
    }

    fn page(day: u32, close: f64, next: Option<&str>) -> String {
        let token = match next {
            Some(t) => format!("\"{}\"", t),
            None => "null".to_string(),
        };
        format!(
            r#"{{"bars":[{{"t":"2024-01-{:02}T05:00:00Z","o":1.0,"h":2.0,"l":0.5,"c":{},"v":100}}],"symbol":"AAPL","next_page_token":{}}}"#,
            day, close, token
        )
    }

    fn client() -> AlpacaClient {
        AlpacaClient::with_base_url(
            Credentials::new("PKTEST", "secret"),
            "http://localhost:1/v2".to_string(),
        )
    }

    fn request() -> BarsRequest {
        BarsRequest::new(
            "AAPL",
            Granularity::FiveMinute,
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 21, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_bars_url() {
        assert_eq!(client().bars_url("AAPL"), "http://localhost:1/v2/stocks/AAPL/bars");
    }

    #[test]
    fn test_bars_query_first_page() {
        let query = client().bars_query(&request(), None);
        assert!(query.contains(&("timeframe", "5Min".to_string())));
        assert!(query.contains(&("start", "2024-01-02T14:30:00Z".to_string())));
        assert!(query.contains(&("end", "2024-01-03T21:00:00Z".to_string())));
        assert!(query.contains(&("limit", "10000".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "page_token" || *k == "feed"));
    }

    #[test]
    fn test_bars_query_with_feed_and_token() {
        let client = client().with_feed(Some("iex".to_string()));
        let query = client.bars_query(&request(), Some("abc"));
        assert!(query.contains(&("feed", "iex".to_string())));
        assert!(query.contains(&("page_token", "abc".to_string())));
    }

    #[test]
    fn test_headers_carry_key_pair() {
        let headers = client().create_headers().expect("valid headers");
        assert_eq!(headers.get(API_KEY_HEADER).unwrap(), "PKTEST");
        assert_eq!(headers.get(SECRET_KEY_HEADER).unwrap(), "secret");
    }

    #[test]
    fn test_classify_error_extracts_message() {
        let err = AlpacaClient::classify_error(
            StatusCode::FORBIDDEN,
            r#"{"code": 40310000, "message": "subscription does not permit querying recent SIP data"}"#.to_string(),
        );
        match err {
            ApiError::Forbidden(msg) => assert!(msg.starts_with("subscription")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_statuses() {
        assert!(matches!(
            AlpacaClient::classify_error(StatusCode::UNAUTHORIZED, "unauthorized.".to_string()),
            ApiError::Unauthorized(ref m) if m == "unauthorized."
        ));
        assert!(matches!(
            AlpacaClient::classify_error(StatusCode::UNPROCESSABLE_ENTITY, "{}".to_string()),
            ApiError::Unprocessable(_)
        ));
        assert!(matches!(
            AlpacaClient::classify_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ApiError::RateLimited(_)
        ));
        assert!(matches!(
            AlpacaClient::classify_error(StatusCode::BAD_GATEWAY, String::new()),
            ApiError::ServerError(502, _)
        ));
        assert!(matches!(
            AlpacaClient::classify_error(StatusCode::IM_A_TEAPOT, String::new()),
            ApiError::HttpError(418, _)
        ));
    }

    #[tokio::test]
    async fn test_pages_are_concatenated_in_order() {
        let (base_url, requests, server) =
            serve_pages(vec![page(2, 10.0, Some("page-2")), page(3, 11.0, None)]).await;
        let client = AlpacaClient::with_base_url(Credentials::new("PKTEST", "secret"), base_url);

        let bars = client.get_stock_bars(&request()).await.expect("bars");
        server.await.unwrap();

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![10.0, 11.0]);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /v2/stocks/AAPL/bars?"));
        assert!(!requests[0].contains("page_token"));
        assert!(requests[1].contains("page_token=page-2"));
    }

    #[tokio::test]
    async fn test_cycling_page_tokens_stop() {
        let (base_url, requests, server) = serve_pages(vec![
            page(2, 10.0, Some("A")),
            page(3, 11.0, Some("B")),
            page(4, 12.0, Some("A")),
        ])
        .await;
        let client = AlpacaClient::with_base_url(Credentials::new("PKTEST", "secret"), base_url);

        let bars = client.get_stock_bars(&request()).await.expect("bars");
        server.await.unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_request_error() {
        let err = client().get_stock_bars(&request()).await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
    }
}
