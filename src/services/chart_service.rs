use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::api::alpaca::{AlpacaClient, BarsRequest};
use crate::api::BarsProvider;
use crate::models::request::MAX_LOOKBACK_DAYS;
use crate::models::{Bar, Chart, ChartRequest, RangeBreak, Series, Theme};
use crate::services::export_service;
use crate::utils::ChartError;

/// Builds charts from bars fetched through a [`BarsProvider`]
pub struct ChartGenerator<P> {
    provider: P,
}

impl ChartGenerator<AlpacaClient> {
    /// Generator backed by Alpaca, credentials read from the environment now
    pub fn from_env() -> Result<Self, ChartError> {
        Ok(Self::new(AlpacaClient::from_env()?))
    }
}

impl<P: BarsProvider> ChartGenerator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Fetch bars for the request window and build the chart
    pub async fn generate(&self, request: &ChartRequest) -> Result<Chart, ChartError> {
        validate_request(request)?;

        let (start, end) = query_window(request.lookback_days, Utc::now()).ok_or_else(|| {
            ChartError::InvalidRequest(format!(
                "lookback of {} days is out of range",
                request.lookback_days
            ))
        })?;
        let bars_request = BarsRequest::new(&request.symbol, request.granularity, start, end);
        info!(
            "📈 Fetching {} bars for {} from {} to {}",
            request.granularity, request.symbol, start, end
        );

        let bars = self.provider.get_bars(&bars_request).await.map_err(|e| {
            warn!("Bars request for {} failed: {}", request.symbol, e);
            e
        })?;
        debug!("Received {} bar(s) for {}", bars.len(), request.symbol);

        build_chart(request, bars)
    }

    /// Generate a chart and write it as PNG.
    ///
    /// Without a `path` the file lands in the working directory under
    /// [`Chart::default_filename`].
    pub async fn generate_png(
        &self,
        request: &ChartRequest,
        path: Option<&Path>,
    ) -> Result<PathBuf, ChartError> {
        let chart = self.generate(request).await?;
        let target = match path {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(chart.default_filename()),
        };
        export_service::export(&chart, &target)
    }
}

/// Chart for `request` using Alpaca credentials from the environment
pub async fn generate_stock_chart(request: &ChartRequest) -> Result<Chart, ChartError> {
    ChartGenerator::from_env()?.generate(request).await
}

/// PNG for `request` using Alpaca credentials from the environment
pub async fn generate_stock_chart_png(
    request: &ChartRequest,
    path: Option<&Path>,
) -> Result<PathBuf, ChartError> {
    ChartGenerator::from_env()?.generate_png(request, path).await
}

/// `[now - lookback_days, now]`, `None` when the start is not representable
pub fn query_window(
    lookback_days: i64,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let lookback = Duration::try_days(lookback_days)?;
    let start = now.checked_sub_signed(lookback)?;
    Some((start, now))
}

/// Reject requests that would build a bad URL, path or time window
pub fn validate_request(request: &ChartRequest) -> Result<(), ChartError> {
    if !is_valid_symbol(&request.symbol) {
        return Err(ChartError::InvalidRequest(format!(
            "'{}' is not a ticker symbol (letters, digits, '.' and '-' only)",
            request.symbol
        )));
    }
    if !(1..=MAX_LOOKBACK_DAYS).contains(&request.lookback_days) {
        return Err(ChartError::InvalidRequest(format!(
            "lookback must be between 1 and {} days, got {}",
            MAX_LOOKBACK_DAYS, request.lookback_days
        )));
    }
    Ok(())
}

/// Upper-case letters, digits, `.` and `-`, at most 16 characters
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= 16
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

/// Axis exclusions for a request; empty when after-hours display is on
pub fn range_breaks(request: &ChartRequest) -> Vec<RangeBreak> {
    if request.show_after_hours {
        return Vec::new();
    }
    let mut breaks = vec![RangeBreak::Weekends];
    if request.granularity.is_intraday() {
        breaks.push(RangeBreak::OffHours);
    }
    breaks
}

/// Turn fetched bars into a chart description
pub fn build_chart(request: &ChartRequest, mut bars: Vec<Bar>) -> Result<Chart, ChartError> {
    validate_request(request)?;
    bars.sort_by_key(|b| b.timestamp);

    let last_close = match bars.last() {
        Some(bar) => bar.close,
        None => {
            return Err(ChartError::EmptyData {
                symbol: request.symbol.clone(),
                granularity: request.granularity,
                days: request.lookback_days,
            })
        }
    };

    let series = if request.candlestick {
        Series::candlestick(&request.symbol, &bars)
    } else {
        Series::line(&request.symbol, &bars)
    };

    let theme = if request.dark_mode { Theme::Dark } else { Theme::Light };

    Ok(Chart {
        symbol: request.symbol.clone(),
        granularity: request.granularity,
        lookback_days: request.lookback_days,
        title: format!(
            "{} Stock Price ({}) - Last Close: ${:.2}",
            request.symbol, request.granularity, last_close
        ),
        x_title: "Date".to_string(),
        y_title: "Price (USD)".to_string(),
        series,
        theme,
        range_breaks: range_breaks(request),
        last_close,
        width: request.width,
        height: request.height,
    })
}
