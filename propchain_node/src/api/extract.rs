//! Request extractors that report failures through [`ApiError`]

use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::models::User;
use crate::storage::StorageError;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use chrono::Utc;
use log::{error, warn};
use serde::de::DeserializeOwned;

/// JSON body; malformed input becomes a 400 in the API's error shape
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string counterpart of [`ApiJson`]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// The account behind a `Bearer` token. Extracting it marks the account active.
pub struct AuthUser(pub User);

impl AuthUser {
    /// Lowercase addresses of every wallet on the account
    pub fn wallets(&self) -> Vec<String> {
        self.0.wallet_addresses()
    }

    pub fn active_wallet(&self) -> Option<&str> {
        self.0.active_wallet.as_deref()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    if !header.starts_with("Bearer") {
        return None;
    }
    header.split(' ').nth(1).filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            warn!("[AUTH] No token provided");
            return Err(ApiError::unauthorized("Not authorized, no token"));
        };

        let claims = state.tokens.verify(token).map_err(|e| {
            warn!("[AUTH] Token rejected: {}", e);
            ApiError::with_details(401, "Not authorized", e.to_string())
        })?;

        // Only the activity stamp is written; the rest of the stored account is kept
        let touched = state
            .db
            .users
            .modify::<_, StorageError>(&claims.id, |user| {
                user.last_active_at = Utc::now();
                Ok(())
            })
            .await;
        let user = match touched {
            Ok(user) => user,
            Err(e) => {
                warn!("[AUTH] Could not record activity for {}: {}", claims.id, e);
                state.db.users.get(&claims.id).await?
            }
        };
        match user {
            Some(user) => Ok(Self(user)),
            None => {
                error!("[AUTH] User not found for ID {}", claims.id);
                Err(ApiError::unauthorized("Not authorized, user not found"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts_with(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts_with(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts_with(Some("Bearer"))), None);
        assert_eq!(bearer_token(&parts_with(None)), None);
    }
}
