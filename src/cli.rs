use std::path::PathBuf;

use clap::Parser;
use hedge_charts::models::request::{DEFAULT_HEIGHT, DEFAULT_LOOKBACK_DAYS, DEFAULT_WIDTH, MAX_LOOKBACK_DAYS};
use hedge_charts::ChartRequest;

#[derive(Parser, Debug)]
#[command(name = "hedge-charts")]
#[command(about = "Render historical stock prices from Alpaca as a PNG chart")]
#[command(version)]
pub struct Cli {
    /// Ticker symbol, e.g. AAPL
    pub symbol: String,

    /// Lookback window in days
    #[arg(short, long, default_value_t = DEFAULT_LOOKBACK_DAYS, value_parser = clap::value_parser!(i64).range(1..=MAX_LOOKBACK_DAYS))]
    pub days: i64,

    /// Bar size: 1Min, 5Min, 15Min, 1D or 1W (anything else means 1D)
    #[arg(short, long, default_value = "1D")]
    pub timeframe: String,

    /// Use the dark theme
    #[arg(long)]
    pub dark: bool,

    /// Draw OHLC candlesticks instead of a close line
    #[arg(long)]
    pub candlestick: bool,

    /// Keep weekends and off-hours on the time axis
    #[arg(long)]
    pub after_hours: bool,

    /// Output file, defaults to {SYMBOL}_chart_{TIMEFRAME}_{DAYS}.png
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,
}

impl Cli {
    pub fn to_request(&self) -> ChartRequest {
        ChartRequest::new(&self.symbol)
            .lookback_days(self.days)
            .timeframe(&self.timeframe)
            .dark_mode(self.dark)
            .candlestick(self.candlestick)
            .show_after_hours(self.after_hours)
            .size(self.width, self.height)
    }
}
