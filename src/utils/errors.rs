use thiserror::Error;

use crate::api::alpaca::ApiError;
use crate::models::Granularity;

/// Errors surfaced by chart generation and export
#[derive(Debug, Error)]
pub enum ChartError {
    /// Authentication, network or API failure, passed through unchanged
    #[error("Provider error: {0}")]
    Provider(#[from] ApiError),
    #[error("No bars returned for {symbol} ({granularity}) in the last {days} day(s)")]
    EmptyData {
        symbol: String,
        granularity: Granularity,
        days: i64,
    },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Failed to write chart image: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render chart: {0}")]
    Render(String),
}
