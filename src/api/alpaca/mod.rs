pub mod client;
pub mod models;

pub use client::AlpacaClient;
pub use models::{ApiError, BarsRequest};
