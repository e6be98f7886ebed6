//! Data models for hedge-charts
//!
//! Requests, provider bars and the renderer-independent chart description.
//! Everything here is request scoped and carries no I/O.

pub mod bar;
pub mod chart;
pub mod request;

// Re-export commonly used types for convenience
pub use bar::Bar;
pub use chart::{Chart, RangeBreak, Series, Theme};
pub use request::{ChartRequest, Granularity};
