use crate::api::validation::Pagination;
use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            count: None,
            total: None,
            page: None,
            pages: None,
            data: Some(data),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    /// `{ "success": true }` with no payload
    pub fn done() -> Self {
        Self {
            data: None,
            ..Self::ok(())
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// List with its length reported as `count`
    pub fn counted(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::ok(data)
        }
    }

    /// One page of a larger result set of `total` items
    pub fn paged(data: Vec<T>, total: usize, pagination: Pagination) -> Self {
        Self {
            total: Some(total),
            page: Some(pagination.page),
            pages: Some(pagination.pages(total)),
            ..Self::counted(data)
        }
    }
}

pub type Created<T> = (StatusCode, Json<ApiResponse<T>>);

pub fn created<T>(data: T) -> Created<T> {
    (StatusCode::CREATED, Json(ApiResponse::ok(data)))
}

/// Body returned by register and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
}
