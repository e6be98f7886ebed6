use async_trait::async_trait;

use crate::models::Bar;

pub mod alpaca;

use alpaca::{ApiError, BarsRequest};

/// Source of historical bars
#[async_trait]
pub trait BarsProvider: Send + Sync {
    /// Every bar inside the request window, oldest first
    async fn get_bars(&self, request: &BarsRequest) -> Result<Vec<Bar>, ApiError>;
}
