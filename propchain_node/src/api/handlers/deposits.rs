//! Anonymous deposit queue under `/api/deposits`
//!
//! A wallet holds at most one active (pending or accepted) deposit per
//! property. The public queue exposes only the anonymous id, position, amount
//! and status of each entry.

use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, AuthUser};
use crate::api::response::{created, ApiResponse, Created};
use crate::api::server::AppState;
use crate::api::validation::{parse_field, present};
use crate::models::deposit::{next_queue_position, sort_queue};
use crate::models::{normalize_wallet, Deposit, DepositStatus, Notification, NotificationType};
use crate::storage::{new_object_id, Timestamps};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitDepositRequest {
    pub property_id: Option<String>,
    pub depositor_wallet: Option<String>,
    pub anonymous_id: Option<String>,
    pub amount: Option<f64>,
    /// Clients without queue knowledge send 0
    pub queue_position: Option<i64>,
    pub blockchain_tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<String>,
    pub tx_hash: Option<String>,
}

/// Public view of a queue entry
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub anonymous_id: String,
    pub queue_position: Option<u32>,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub status: DepositStatus,
    pub depositor_wallet: String,
}

impl From<Deposit> for QueueEntry {
    fn from(deposit: Deposit) -> Self {
        Self {
            id: deposit.id,
            anonymous_id: deposit.anonymous_id,
            queue_position: deposit.queue_position,
            amount: deposit.amount,
            timestamp: deposit.timestamps.created_at,
            status: deposit.status,
            depositor_wallet: deposit.depositor_wallet,
        }
    }
}

const ALREADY_ACTIVE: &str = "You already have an active deposit for this property.";

/// True when `others` holds an active deposit by `wallet` on `property_id`
fn has_active_deposit(others: &[Deposit], property_id: &str, wallet: &str) -> bool {
    others.iter().any(|d| {
        d.property_id == property_id && d.depositor_wallet == wallet && d.status.is_active()
    })
}

pub async fn submit_deposit(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SubmitDepositRequest>,
) -> ApiResult<Created<Deposit>> {
    let (Some(property_id), Some(depositor), Some(anonymous_id), Some(amount)) = (
        present(&req.property_id).map(str::to_string),
        present(&req.depositor_wallet).map(normalize_wallet),
        present(&req.anonymous_id).map(str::to_string),
        req.amount,
    ) else {
        return Err(ApiError::missing_fields(&[
            "propertyId",
            "depositorWallet",
            "anonymousId",
            "amount",
        ]));
    };
    if !user.wallets().contains(&depositor) {
        return Err(ApiError::forbidden(
            "Depositor wallet is not on your account.",
        ));
    }
    let tx_hash = present(&req.blockchain_tx_hash).map(str::to_string);
    let requested_position = req
        .queue_position
        .filter(|p| *p > 0)
        .and_then(|p| u32::try_from(p).ok());

    // The duplicate check and the insert share the collection lock
    let deposit = state
        .db
        .deposits
        .insert_with(|existing| {
            if has_active_deposit(&existing, &property_id, &depositor) {
                return Err(ApiError::bad_request(ALREADY_ACTIVE));
            }
            let Some(queue_position) = requested_position
                .or_else(|| next_queue_position(&existing, &property_id))
            else {
                return Err(ApiError::bad_request(
                    "The deposit queue for this property is full.",
                ));
            };
            Ok(Deposit {
                id: new_object_id(),
                deposit_id: tx_hash.clone(),
                property_id: property_id.clone(),
                depositor_wallet: depositor.clone(),
                anonymous_id,
                amount,
                queue_position: Some(queue_position),
                status: DepositStatus::Pending,
                blockchain_tx_hash: tx_hash.clone(),
                timestamps: Timestamps::now(),
            })
        })
        .await?;

    info!(
        "[DB] Deposit {} queued at position {:?} for property {}",
        deposit.id, deposit.queue_position, deposit.property_id
    );
    Ok(created(deposit))
}

/// Active deposits of a property in queue order
pub async fn get_queue(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<QueueEntry>>>> {
    let mut queue = state
        .db
        .deposits
        .find(|d| d.property_id == property_id && d.status.is_active())
        .await?;
    sort_queue(&mut queue);
    Ok(Json(ApiResponse::ok(
        queue.into_iter().map(QueueEntry::from).collect(),
    )))
}

/// Deposits made from any wallet on the account
pub async fn get_my_deposits(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Deposit>>>> {
    let wallets: HashSet<String> = user.wallets().into_iter().collect();
    let deposits = state
        .db
        .deposits
        .find(|d| wallets.contains(&d.depositor_wallet))
        .await?;
    Ok(Json(ApiResponse::ok(deposits)))
}

/// Deposits placed on listings the account owns, newest first
pub async fn get_received_deposits(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Deposit>>>> {
    let wallets: HashSet<String> = user.wallets().into_iter().collect();
    let owned: HashSet<String> = state
        .db
        .properties
        .find(|p| wallets.contains(&p.owner_wallet))
        .await?
        .into_iter()
        .map(|p| p.property_id)
        .collect();

    let mut deposits = state
        .db
        .deposits
        .find(|d| owned.contains(&d.property_id))
        .await?;
    deposits.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    Ok(Json(ApiResponse::ok(deposits)))
}

/// Accept, reject or withdraw a deposit
pub async fn update_deposit_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<Deposit>>> {
    let status: DepositStatus = match present(&req.status) {
        Some(value) => parse_field("status", value)?,
        None => return Err(ApiError::bad_request("Path `status` is required.")),
    };
    let deposit = state
        .db
        .deposits
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Deposit not found"))?;

    let wallets: HashSet<String> = user.wallets().into_iter().collect();
    let is_depositor = wallets.contains(&deposit.depositor_wallet);
    let is_owner = state
        .db
        .properties
        .find_one(|p| p.property_id == deposit.property_id)
        .await?
        .is_some_and(|p| wallets.contains(&p.owner_wallet));

    let allowed = match status {
        DepositStatus::Accepted | DepositStatus::Rejected => is_owner,
        DepositStatus::Withdrawn => is_depositor,
        DepositStatus::Pending => is_owner || is_depositor,
    };
    if !allowed {
        return Err(ApiError::forbidden("Not authorized"));
    }

    // Reactivation is checked against the queue under the collection lock
    let tx_hash = present(&req.tx_hash).map(str::to_string);
    let deposit = state
        .db
        .deposits
        .update_with(&id, |deposit, others| {
            if status.is_active()
                && !deposit.status.is_active()
                && has_active_deposit(others, &deposit.property_id, &deposit.depositor_wallet)
            {
                return Err(ApiError::bad_request(ALREADY_ACTIVE));
            }
            deposit.status = status;
            if let Some(tx_hash) = tx_hash {
                deposit.blockchain_tx_hash = Some(tx_hash);
            }
            Ok(())
        })
        .await?
        .ok_or_else(|| ApiError::not_found("Deposit not found"))?;
    info!("[DB] Deposit {} is now {:?}", deposit.id, deposit.status);

    if status == DepositStatus::Accepted {
        let notification = Notification::new(
            &deposit.depositor_wallet,
            "Deposit Accepted!",
            format!(
                "Your deposit for property {} has been accepted. You can now proceed to purchase or rent the property.",
                deposit.property_id
            ),
            NotificationType::Success,
        );
        state.db.notifications.insert(notification).await?;
    }

    Ok(Json(ApiResponse::ok(deposit)))
}
