//! Chart models
//!
//! A [`Chart`] is a renderer-independent description of a figure. The export
//! service turns it into pixels; nothing here knows about plotters.

use chrono::{DateTime, Utc};

use super::bar::Bar;
use super::request::Granularity;

/// Visual theme of the figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// A time range hidden from the x axis so no gap is drawn for it.
/// Times are US/Eastern wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBreak {
    /// Saturday 00:00 through Monday 00:00
    Weekends,
    /// 16:00 through 09:30 of the following day
    OffHours,
}

/// The plotted data of a chart
#[derive(Debug, Clone, PartialEq)]
pub enum Series {
    /// Closing prices joined by a line
    Line {
        name: String,
        x: Vec<DateTime<Utc>>,
        close: Vec<f64>,
    },
    /// Open/high/low/close per bar
    Candlestick {
        name: String,
        x: Vec<DateTime<Utc>>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
    },
}

impl Series {
    pub fn line(name: &str, bars: &[Bar]) -> Self {
        Series::Line {
            name: name.to_string(),
            x: bars.iter().map(|b| b.timestamp).collect(),
            close: bars.iter().map(|b| b.close).collect(),
        }
    }

    pub fn candlestick(name: &str, bars: &[Bar]) -> Self {
        Series::Candlestick {
            name: name.to_string(),
            x: bars.iter().map(|b| b.timestamp).collect(),
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Series::Line { name, .. } | Series::Candlestick { name, .. } => name,
        }
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        match self {
            Series::Line { x, .. } | Series::Candlestick { x, .. } => x,
        }
    }

    pub fn closes(&self) -> &[f64] {
        match self {
            Series::Line { close, .. } | Series::Candlestick { close, .. } => close,
        }
    }

    /// Number of values plotted per bar: 1 for a line, 4 for candlesticks
    pub fn value_columns(&self) -> usize {
        match self {
            Series::Line { .. } => 1,
            Series::Candlestick { .. } => 4,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lowest and highest plotted price
    pub fn price_bounds(&self) -> Option<(f64, f64)> {
        let (lows, highs): (&[f64], &[f64]) = match self {
            Series::Line { close, .. } => (close.as_slice(), close.as_slice()),
            Series::Candlestick { low, high, .. } => (low.as_slice(), high.as_slice()),
        };
        if lows.is_empty() {
            return None;
        }
        let min = lows.iter().copied().fold(f64::INFINITY, f64::min);
        let max = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

/// A renderable price chart for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub symbol: String,
    pub granularity: Granularity,
    pub lookback_days: i64,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    pub series: Series,
    pub theme: Theme,
    pub range_breaks: Vec<RangeBreak>,
    pub last_close: f64,
    pub width: u32,
    pub height: u32,
}

impl Chart {
    /// `{symbol}_chart_{granularity}_{days}.png`, e.g. `AAPL_chart_1D_90.png`
    pub fn default_filename(&self) -> String {
        format!(
            "{}_chart_{}_{}.png",
            self.symbol,
            self.granularity.label(),
            self.lookback_days
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bars() -> Vec<Bar> {
        vec![
            Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 5, 0, 0).unwrap(),
                open: 10.0,
                high: 12.0,
                low: 9.5,
                close: 11.0,
                volume: 1000.0,
            },
            Bar {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 5, 0, 0).unwrap(),
                open: 11.0,
                high: 13.5,
                low: 10.5,
                close: 13.0,
                volume: 1500.0,
            },
        ]
    }

    #[test]
    fn test_line_series_holds_closes_only() {
        let series = Series::line("Close", &bars());
        assert_eq!(series.value_columns(), 1);
        assert_eq!(series.closes(), &[11.0, 13.0]);
        assert_eq!(series.price_bounds(), Some((11.0, 13.0)));
    }

    #[test]
    fn test_candlestick_bounds_use_wicks() {
        let series = Series::candlestick("OHLC", &bars());
        assert_eq!(series.value_columns(), 4);
        assert_eq!(series.len(), 2);
        assert_eq!(series.price_bounds(), Some((9.5, 13.5)));
    }

    #[test]
    fn test_empty_series_has_no_bounds() {
        assert_eq!(Series::line("Close", &[]).price_bounds(), None);
    }
}
