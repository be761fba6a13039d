pub mod auth;
pub mod deposits;
pub mod extras;
pub mod health;
pub mod maintenance;
pub mod properties;
pub mod rent;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Default page size of the payment history endpoints
pub const HISTORY_PAGE_SIZE: usize = 10;

/// Raw `page`/`limit` query values
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Payments without an explicit date are stamped on receipt
pub(crate) fn payment_date(requested: Option<DateTime<Utc>>) -> DateTime<Utc> {
    requested.unwrap_or_else(Utc::now)
}
