//! Historical stock charts from Alpaca market data.
//!
//! ```no_run
//! # async fn demo() -> Result<(), hedge_charts::ChartError> {
//! use hedge_charts::{ChartGenerator, ChartRequest};
//!
//! let generator = ChartGenerator::from_env()?;
//! let request = ChartRequest::new("AAPL").timeframe("1D").candlestick(true);
//! let path = generator.generate_png(&request, None).await?;
//! println!("{}", path.display());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use models::{Bar, Chart, ChartRequest, Granularity};
pub use services::{export, generate_stock_chart, generate_stock_chart_png, ChartGenerator};
pub use utils::ChartError;
