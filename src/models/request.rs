//! Chart request models

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

lazy_static! {
    /// Accepted spellings for each granularity, keyed in lower case
    static ref GRANULARITY_ALIASES: HashMap<&'static str, Granularity> = {
        let mut m = HashMap::new();
        m.insert("1min", Granularity::Minute);
        m.insert("minute", Granularity::Minute);
        m.insert("5min", Granularity::FiveMinute);
        m.insert("5minute", Granularity::FiveMinute);
        m.insert("15min", Granularity::FifteenMinute);
        m.insert("15minute", Granularity::FifteenMinute);
        m.insert("1d", Granularity::Day);
        m.insert("day", Granularity::Day);
        m.insert("daily", Granularity::Day);
        m.insert("1w", Granularity::Week);
        m.insert("week", Granularity::Week);
        m.insert("weekly", Granularity::Week);
        m
    };
}

pub const DEFAULT_LOOKBACK_DAYS: i64 = 90;
/// Longest accepted window, one century
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;
pub const DEFAULT_WIDTH: u32 = 1200;
pub const DEFAULT_HEIGHT: u32 = 700;

/// Sampling resolution of the requested bars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    Minute,
    FiveMinute,
    FifteenMinute,
    #[default]
    Day,
    Week,
}

impl Granularity {
    /// Parse a user supplied timeframe string.
    ///
    /// Unknown strings fall back to `Day` instead of failing.
    pub fn parse(timeframe: &str) -> Self {
        GRANULARITY_ALIASES
            .get(timeframe.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or_default()
    }

    /// Short label used in titles and export filenames, e.g. `1D`
    pub fn label(&self) -> &'static str {
        match self {
            Granularity::Minute => "1Min",
            Granularity::FiveMinute => "5Min",
            Granularity::FifteenMinute => "15Min",
            Granularity::Day => "1D",
            Granularity::Week => "1W",
        }
    }

    /// Timeframe value understood by the Alpaca bars endpoint
    pub fn alpaca_timeframe(&self) -> &'static str {
        match self {
            Granularity::Minute => "1Min",
            Granularity::FiveMinute => "5Min",
            Granularity::FifteenMinute => "15Min",
            Granularity::Day => "1Day",
            Granularity::Week => "1Week",
        }
    }

    pub fn is_intraday(&self) -> bool {
        matches!(
            self,
            Granularity::Minute | Granularity::FiveMinute | Granularity::FifteenMinute
        )
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything needed to build one chart
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub symbol: String,
    pub lookback_days: i64,
    pub granularity: Granularity,
    pub dark_mode: bool,
    pub candlestick: bool,
    pub show_after_hours: bool,
    pub width: u32,
    pub height: u32,
}

impl ChartRequest {
    /// New request with the default window, daily bars and a light line chart
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.trim().to_uppercase(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            granularity: Granularity::default(),
            dark_mode: false,
            candlestick: false,
            show_after_hours: false,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    pub fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Same as [`ChartRequest::granularity`] but from a raw timeframe string
    pub fn timeframe(self, timeframe: &str) -> Self {
        self.granularity(Granularity::parse(timeframe))
    }

    pub fn dark_mode(mut self, enabled: bool) -> Self {
        self.dark_mode = enabled;
        self
    }

    pub fn candlestick(mut self, enabled: bool) -> Self {
        self.candlestick = enabled;
        self
    }

    pub fn show_after_hours(mut self, enabled: bool) -> Self {
        self.show_after_hours = enabled;
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(Granularity::parse("1Min"), Granularity::Minute);
        assert_eq!(Granularity::parse("5Min"), Granularity::FiveMinute);
        assert_eq!(Granularity::parse("15Min"), Granularity::FifteenMinute);
        assert_eq!(Granularity::parse("1D"), Granularity::Day);
        assert_eq!(Granularity::parse("1W"), Granularity::Week);
        assert_eq!(Granularity::parse(" weekly "), Granularity::Week);
    }

    #[test]
    fn test_unknown_timeframe_falls_back_to_daily() {
        assert_eq!(Granularity::parse("3H"), Granularity::Day);
        assert_eq!(Granularity::parse(""), Granularity::Day);
        assert_eq!(ChartRequest::new("aapl").timeframe("bogus").granularity, Granularity::Day);
    }

    #[test]
    fn test_labels_survive_parsing() {
        for g in [
            Granularity::Minute,
            Granularity::FiveMinute,
            Granularity::FifteenMinute,
            Granularity::Day,
            Granularity::Week,
        ] {
            assert_eq!(Granularity::parse(g.label()), g);
        }
    }

    #[test]
    fn test_request_defaults() {
        let req = ChartRequest::new(" msft ");
        assert_eq!(req.symbol, "MSFT");
        assert_eq!(req.lookback_days, 90);
        assert_eq!(req.granularity, Granularity::Day);
        assert!(!req.dark_mode && !req.candlestick && !req.show_after_hours);
    }

    #[test]
    fn test_intraday() {
        assert!(Granularity::FiveMinute.is_intraday());
        assert!(!Granularity::Day.is_intraday());
        assert_eq!(Granularity::Week.alpaca_timeframe(), "1Week");
    }
}
