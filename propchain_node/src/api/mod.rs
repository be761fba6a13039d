//! REST API served under `/api`

pub mod errors;
pub mod extract;
pub mod handlers;
pub mod response;
pub mod server;
pub mod validation;

pub use errors::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiQuery, AuthUser};
pub use response::{ApiResponse, TokenResponse};
pub use server::{create_router, serve, AppState};
