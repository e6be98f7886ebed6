use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Bar, Granularity};

/// Page size requested from the bars endpoint (the API maximum)
pub const MAX_PAGE_LIMIT: u32 = 10_000;

/// A single bar as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlpacaBar {
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v", default)]
    pub volume: f64,
}

impl From<AlpacaBar> for Bar {
    fn from(bar: AlpacaBar) -> Self {
        Bar {
            timestamp: bar.timestamp,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Response from GET /stocks/{symbol}/bars
///
/// `bars` is `null` when the window holds no data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsResponse {
    #[serde(default)]
    pub bars: Option<Vec<AlpacaBar>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Error body returned by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: Option<i64>,
    pub message: Option<String>,
}

/// Parameters of a historical bars query for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct BarsRequest {
    pub symbol: String,
    pub granularity: Granularity,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
}

impl BarsRequest {
    pub fn new(
        symbol: &str,
        granularity: Granularity,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            granularity,
            start,
            end,
            limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Errors raised while talking to the market data API
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Required credential variable is unset or empty
    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),
    /// 400 Bad Request
    #[error("Bad Request: {0}")]
    BadRequest(String),
    /// 401 Unauthorized
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// 403 Forbidden
    #[error("Forbidden: {0}")]
    Forbidden(String),
    /// 404 Not Found
    #[error("Not Found: {0}")]
    NotFound(String),
    /// 422 Unprocessable Entity, usually an invalid query parameter
    #[error("Invalid Request: {0}")]
    Unprocessable(String),
    /// 429 Too Many Requests
    #[error("Rate Limited: {0}")]
    RateLimited(String),
    /// 5xx Server Error
    #[error("Server Error ({0}): {1}")]
    ServerError(u16, String),
    /// Other HTTP errors
    #[error("HTTP Error ({0}): {1}")]
    HttpError(u16, String),
    /// Network/request error
    #[error("Request Error: {0}")]
    RequestError(String),
    /// Deserialization error
    #[error("Deserialization Error: {0}")]
    DeserializationError(String),
}
