//! Account and wallet endpoints under `/api/auth`

use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, AuthUser};
use crate::api::response::{ApiResponse, Created, TokenResponse};
use crate::api::server::AppState;
use crate::api::validation::{present, validate_address};
use crate::auth::{generate_wallet, hash_password, verify_password};
use crate::models::{normalize_wallet, User, UserView, Wallet, WalletType};
use crate::storage::StorageError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;

const MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub login_identifier: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddWalletRequest {
    pub wallet_type: Option<String>,
    pub address: Option<String>,
    pub alias: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WalletAddressRequest {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WalletAliasRequest {
    pub address: Option<String>,
    pub alias: Option<String>,
}

/// Argon2 hashing blocks, so it runs on the blocking pool
async fn hash_blocking(password: String) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?
        .map_err(ApiError::from)
}

async fn verify_blocking(password: String, stored: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| ApiError::internal_server_error(e.to_string()))
}

/// The account was deleted between authentication and the write
fn user_or_gone(user: Option<User>) -> ApiResult<User> {
    user.ok_or_else(|| ApiError::unauthorized("Not authorized, user not found"))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    info!("[AUTH] Register attempt received.");
    let (Some(username), Some(password)) = (present(&req.username), req.password.as_deref().filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Please provide username and password"));
    };

    if state.db.users.find_one(|u| u.username == username).await?.is_some() {
        return Err(ApiError::bad_request("Username already exists"));
    }

    let user = User::new(username, hash_blocking(password.to_string()).await?);
    let user = match state.db.users.insert(user).await {
        Ok(user) => user,
        Err(StorageError::Duplicate(field)) if field == "username" => {
            return Err(ApiError::bad_request("Username already exists"));
        }
        Err(e) => return Err(e.into()),
    };

    info!("[AUTH] User '{}' registered.", user.username);
    let token = state.tokens.issue(&user.id)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { success: true, token })))
}

/// Log in with a username or email
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    info!("[AUTH] Login attempt received.");
    let (Some(identifier), Some(password)) = (present(&req.login_identifier), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(ApiError::bad_request("Please provide credentials"));
    };

    let email = identifier.to_lowercase();
    let Some(user) = state
        .db
        .users
        .find_one(|u| u.username == identifier || u.email.as_deref() == Some(email.as_str()))
        .await?
    else {
        info!("[AUTH] Login failed: user '{}' not found.", identifier);
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    if !verify_blocking(password, user.password.clone()).await? {
        info!("[AUTH] Login failed: wrong password for '{}'.", user.username);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let user_id = user.id.clone();
    let user = state
        .db
        .users
        .modify::<_, ApiError>(&user_id, |u| {
            u.last_login_at = Utc::now();
            Ok(())
        })
        .await?
        .unwrap_or(user);
    info!("[AUTH] Login successful for '{}'.", user.username);
    let token = state.tokens.issue(&user.id)?;
    Ok(Json(TokenResponse { success: true, token }))
}

/// Current account, including demo wallet keys
pub async fn get_me(AuthUser(user): AuthUser) -> Json<ApiResponse<UserView>> {
    Json(ApiResponse::ok(user.view(true)))
}

pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let (Some(current), Some(new)) = (
        req.current_password.filter(|p| !p.is_empty()),
        req.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Please provide current and new password"));
    };
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "New password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !verify_blocking(current, user.password.clone()).await? {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password = hash_blocking(new).await?;
    user_or_gone(
        state
            .db
            .users
            .modify::<_, ApiError>(&user.id, |u| {
                u.password = password;
                Ok(())
            })
            .await?,
    )?;
    Ok(Json(ApiResponse::done().with_message("Password updated successfully.")))
}

/// Funding waits for a mined receipt, so it runs before the account is
/// locked and the wallet is appended to the stored copy afterwards
pub async fn add_wallet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<AddWalletRequest>,
) -> ApiResult<Created<UserView>> {
    let alias = present(&req.alias).map(str::to_string);
    let (address, wallet_type, private_key) = match req.wallet_type.as_deref() {
        Some("demo") => {
            let generated = generate_wallet();
            // Funding is best effort; the wallet is usable once the chain is back
            if let Err(e) = state.ledger.fund_wallet(&generated.address).await {
                warn!("[FUND] Funding {} failed: {}", generated.address, e);
            }
            (generated.address, WalletType::Demo, Some(generated.private_key))
        }
        Some("metamask") => {
            let address = present(&req.address).unwrap_or_default();
            validate_address(address)?;
            (address.to_string(), WalletType::Metamask, None)
        }
        _ => return Err(ApiError::bad_request("Invalid wallet type.")),
    };

    info!("[AUTH] Adding {:?} wallet {} for '{}'", wallet_type, address, user.username);
    let user = state
        .db
        .users
        .modify(&user.id, |u| {
            if u.owns_wallet(&address) {
                return Err(ApiError::bad_request("This wallet is already added."));
            }
            let alias = alias.unwrap_or_else(|| match wallet_type {
                WalletType::Demo => format!("Demo Wallet #{}", u.wallets.len() + 1),
                WalletType::Metamask => "MetaMask Wallet".to_string(),
            });
            u.add_wallet(Wallet {
                address: normalize_wallet(&address),
                alias,
                wallet_type,
                private_key,
            });
            Ok(())
        })
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user_or_gone(user)?.view(true)))))
}

pub async fn set_active_wallet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<WalletAddressRequest>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let address = present(&req.address).map(normalize_wallet).unwrap_or_default();
    let user = state
        .db
        .users
        .modify(&user.id, |u| {
            if !u.owns_wallet(&address) {
                return Err(ApiError::bad_request("Wallet not found on your account."));
            }
            u.active_wallet = Some(address);
            Ok(())
        })
        .await?;
    Ok(Json(ApiResponse::ok(user_or_gone(user)?.view(false))))
}

pub async fn update_wallet_alias(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<WalletAliasRequest>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let Some(alias) = present(&req.alias).map(str::to_string) else {
        return Err(ApiError::bad_request("Alias cannot be empty."));
    };
    let address = present(&req.address).map(normalize_wallet).unwrap_or_default();
    let user = state
        .db
        .users
        .modify(&user.id, |u| {
            let Some(wallet) = u.wallets.iter_mut().find(|w| w.address == address) else {
                return Err(ApiError::not_found("Wallet not found."));
            };
            wallet.alias = alias;
            Ok(())
        })
        .await?;
    Ok(Json(ApiResponse::ok(user_or_gone(user)?.view(false))))
}

pub async fn delete_wallet(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(address): Path<String>,
) -> ApiResult<Json<ApiResponse<UserView>>> {
    let user = state
        .db
        .users
        .modify(&user.id, |u| {
            if !u.remove_wallet(&address) {
                return Err(ApiError::not_found("Wallet not found."));
            }
            Ok(())
        })
        .await?;
    Ok(Json(
        ApiResponse::ok(user_or_gone(user)?.view(false)).with_message("Wallet removed successfully."),
    ))
}
