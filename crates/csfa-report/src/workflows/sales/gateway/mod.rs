pub mod solutech;

use super::domain::{OrderDetails, OrderId, RawRecord};
use crate::config::credentials::TokenError;

pub use solutech::SolutechClient;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid {name}: {source}")]
    Token {
        name: &'static str,
        #[source]
        source: TokenError,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} responded with status {status}")]
    Status { status: u16, url: String },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response field `{0}` is not a list")]
    MissingData(&'static str),
}

/// Source of the raw visit and order records a report is built from.
pub trait SalesDataGateway: Send + Sync {
    /// Orders placed on `order_date` (upstream `Mon+Jan+05+2026` form).
    fn fetch_orders(&self, order_date: &str) -> Result<Vec<RawRecord>, GatewayError>;

    /// Timesheet visits inside `date_range` (`YYYY-MM-DD - YYYY-MM-DD`).
    fn fetch_visits(&self, date_range: &str) -> Result<Vec<RawRecord>, GatewayError>;

    fn fetch_order_details(&self, order_id: &OrderId) -> Result<OrderDetails, GatewayError>;
}
