pub mod chart_service;
pub mod export_service;

pub use chart_service::{generate_stock_chart, generate_stock_chart_png, ChartGenerator};
pub use export_service::export;
