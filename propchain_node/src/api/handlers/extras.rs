//! Reviews, support tickets, the audit log, messaging with offers,
//! notifications and signed contracts under `/api/extras`
//!
//! Everything here acts on the caller's active wallet.

use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::response::ApiResponse;
use crate::api::server::AppState;
use crate::api::validation::{parse_field, present};
use crate::auth::keccak_id;
use crate::models::{
    normalize_wallet, Contract, ContractStatus, ContractType, LogType, Message, Notification,
    NotificationType, OfferStatus, Review, SystemLog, Ticket, TicketPriority, TicketStatus,
};
use crate::storage::{new_object_id, Timestamps};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use log::info;
use serde::Deserialize;

const LOG_PAGE_SIZE: usize = 50;
const ANONYMOUS_ACTOR: &str = "Anonymous";

fn require_wallet(user: &AuthUser) -> ApiResult<String> {
    user.active_wallet()
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request("No active wallet set."))
}

/// First characters of a wallet, as shown in notification texts
fn short_wallet(wallet: &str) -> &str {
    wallet.get(..6).unwrap_or(wallet)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// --- Reviews ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub property_id: Option<String>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateReviewRequest>,
) -> ApiResult<Json<ApiResponse<Review>>> {
    let wallet = require_wallet(&user)?;
    let (Some(property_id), Some(rating)) = (present(&req.property_id), req.rating) else {
        return Err(ApiError::missing_fields(&["propertyId", "rating"]));
    };
    let rating = u8::try_from(rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| ApiError::bad_request("Rating must be between 1 and 5."))?;

    let review = Review {
        id: new_object_id(),
        property_id: property_id.to_string(),
        user_wallet: wallet,
        rating,
        comment: req.comment.unwrap_or_default(),
        timestamps: Timestamps::now(),
    };
    Ok(Json(ApiResponse::ok(state.db.reviews.insert(review).await?)))
}

pub async fn get_reviews(
    State(state): State<AppState>,
    Path(property_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<Review>>>> {
    let mut reviews = state
        .db
        .reviews
        .find(|r| r.property_id == property_id)
        .await?;
    reviews.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    Ok(Json(ApiResponse::ok(reviews)))
}

// --- Tickets ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub property_id: Option<String>,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateTicketRequest>,
) -> ApiResult<Json<ApiResponse<Ticket>>> {
    let wallet = require_wallet(&user)?;
    let priority: TicketPriority = match present(&req.priority) {
        Some(value) => parse_field("priority", value)?,
        None => TicketPriority::default(),
    };

    let ticket = Ticket {
        id: new_object_id(),
        ticket_id: keccak_id(&format!("{}{}", wallet, Utc::now().timestamp_millis())),
        user_wallet: wallet,
        property_id: present(&req.property_id).map(str::to_string),
        subject: req.subject.unwrap_or_default(),
        description: req.description.unwrap_or_default(),
        priority,
        status: TicketStatus::Open,
        responses: Vec::new(),
        timestamps: Timestamps::now(),
    };
    let ticket = state.db.tickets.insert(ticket).await?;
    info!("[DB] Ticket {} opened by {}", ticket.ticket_id, ticket.user_wallet);
    Ok(Json(ApiResponse::ok(ticket)))
}

pub async fn get_my_tickets(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Ticket>>>> {
    let Some(wallet) = user.active_wallet() else {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    };
    let mut tickets = state.db.tickets.find(|t| t.user_wallet == wallet).await?;
    tickets.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    Ok(Json(ApiResponse::ok(tickets)))
}

// --- Logs ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub action: Option<String>,
    pub details: Option<String>,
    pub tx_hash: Option<String>,
}

/// Latest audit entries, newest first
pub async fn get_system_logs(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<SystemLog>>>> {
    let mut logs = state.db.system_logs.all().await?;
    logs.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    logs.truncate(LOG_PAGE_SIZE);
    Ok(Json(ApiResponse::ok(logs)))
}

pub async fn create_log_entry(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateLogRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let kind: LogType = match present(&req.kind) {
        Some(value) => parse_field("type", value)?,
        None => return Err(ApiError::bad_request("Path `type` is required.")),
    };
    let actor = user
        .active_wallet()
        .map(str::to_string)
        .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string());

    let action = present(&req.action).unwrap_or_default();
    let entry = SystemLog::new(kind, action, req.details.unwrap_or_default())
        .actor(Some(actor))
        .tx_hash(present(&req.tx_hash).map(str::to_string));
    state.db.system_logs.insert(entry).await?;
    Ok(Json(ApiResponse::done()))
}

// --- Messages ---

#[derive(Debug, Default, Deserialize)]
pub struct MessageParams {
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub is_offer: bool,
    pub offer_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOfferRequest {
    pub message_id: Option<String>,
    pub status: Option<String>,
}

/// The caller's inbox and outbox, or one conversation when `contact` is given
pub async fn get_messages(
    State(state): State<AppState>,
    user: AuthUser,
    ApiQuery(params): ApiQuery<MessageParams>,
) -> ApiResult<Json<ApiResponse<Vec<Message>>>> {
    let Some(wallet) = user.active_wallet() else {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    };
    let contact = present(&params.contact).map(normalize_wallet);

    let mut messages = state
        .db
        .messages
        .find(|m| match &contact {
            Some(contact) => m.between(wallet, contact),
            None => m.involves(wallet),
        })
        .await?;
    messages.sort_by(|a, b| a.timestamps.created_at.cmp(&b.timestamps.created_at));
    Ok(Json(ApiResponse::ok(messages)))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<Json<ApiResponse<Message>>> {
    let sender = require_wallet(&user)?;
    let (Some(receiver), Some(content)) = (present(&req.receiver), present(&req.content)) else {
        return Err(ApiError::missing_fields(&["receiver", "content"]));
    };
    let offer_amount = match (req.is_offer, req.offer_amount) {
        (true, None) => return Err(ApiError::bad_request("An offer needs an offerAmount.")),
        (true, amount) => amount,
        (false, _) => None,
    };

    let message = Message {
        id: new_object_id(),
        sender: sender.clone(),
        receiver: normalize_wallet(receiver),
        content: content.to_string(),
        read: false,
        is_offer: req.is_offer,
        offer_amount,
        offer_status: req.is_offer.then_some(OfferStatus::Pending),
        timestamps: Timestamps::now(),
    };
    let message = state.db.messages.insert(message).await?;

    let notification = match message.offer_amount {
        Some(amount) => Notification::new(
            &message.receiver,
            "New Offer Received!",
            format!(
                "You received an offer of {} TL from {}...",
                amount,
                short_wallet(&sender)
            ),
            NotificationType::Info,
        ),
        None => Notification::new(
            &message.receiver,
            "New Message",
            format!("You have a new message from {}...", short_wallet(&sender)),
            NotificationType::Info,
        ),
    };
    state.db.notifications.insert(notification).await?;

    Ok(Json(ApiResponse::ok(message)))
}

/// Accept or reject an offer addressed to the caller
pub async fn respond_to_offer(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<RespondOfferRequest>,
) -> ApiResult<Json<ApiResponse<Message>>> {
    let message_id = present(&req.message_id).unwrap_or_default();
    let mut message = state
        .db
        .messages
        .get(message_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    if user.active_wallet() != Some(message.receiver.as_str()) {
        return Err(ApiError::forbidden("Not authorized"));
    }
    if !message.is_offer {
        return Err(ApiError::bad_request("Message is not an offer."));
    }

    let raw_status = present(&req.status).unwrap_or_default();
    let status = match parse_field::<OfferStatus>("offerStatus", raw_status)? {
        OfferStatus::Pending => {
            return Err(ApiError::bad_request(
                "An offer can only be accepted or rejected.",
            ))
        }
        decided => decided,
    };

    message.offer_status = Some(status);
    let message = state.db.messages.update(message).await?;

    let kind = if status == OfferStatus::Accepted {
        NotificationType::Success
    } else {
        NotificationType::Error
    };
    let amount = message
        .offer_amount
        .map(|a| a.to_string())
        .unwrap_or_default();
    let notification = Notification::new(
        &message.sender,
        format!("Offer {}", capitalize(raw_status)),
        format!("Your offer of {} TL was {}.", amount, raw_status),
        kind,
    );
    state.db.notifications.insert(notification).await?;

    Ok(Json(ApiResponse::ok(message)))
}

// --- Notifications ---

pub async fn get_notifications(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Notification>>>> {
    let Some(wallet) = user.active_wallet() else {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    };
    let mut notifications = state
        .db
        .notifications
        .find(|n| n.recipient == wallet)
        .await?;
    notifications.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    Ok(Json(ApiResponse::ok(notifications)))
}

/// Mark all of the caller's notifications read; `count` is the number changed
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Some(wallet) = user.active_wallet() else {
        return Ok(Json(ApiResponse {
            count: Some(0),
            ..ApiResponse::done()
        }));
    };
    let unread = state
        .db
        .notifications
        .find(|n| n.recipient == wallet && !n.read)
        .await?;
    let count = unread.len();
    for mut notification in unread {
        notification.read = true;
        state.db.notifications.update(notification).await?;
    }
    Ok(Json(ApiResponse {
        count: Some(count),
        ..ApiResponse::done()
    }))
}

// --- Contracts ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveContractRequest {
    pub contract_id: Option<String>,
    pub property_id: Option<String>,
    pub owner_wallet: Option<String>,
    pub pdf_hash: Option<String>,
    pub blockchain_tx_hash: Option<String>,
    pub content_data: Option<String>,
    #[serde(rename = "type")]
    pub contract_type: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractStatusRequest {
    pub contract_id: Option<String>,
    pub status: Option<String>,
}

/// Store a contract both parties signed; the caller is the tenant or buyer
pub async fn save_contract(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<SaveContractRequest>,
) -> ApiResult<Json<ApiResponse<Contract>>> {
    let tenant = require_wallet(&user)?;
    let (Some(contract_id), Some(property_id), Some(owner)) = (
        present(&req.contract_id),
        present(&req.property_id),
        present(&req.owner_wallet),
    ) else {
        return Err(ApiError::missing_fields(&["contractId", "propertyId", "ownerWallet"]));
    };
    let contract_type: ContractType = match present(&req.contract_type) {
        Some(value) => parse_field("type", value)?,
        None => ContractType::default(),
    };
    let tx_hash = present(&req.blockchain_tx_hash).map(str::to_string);

    let contract = Contract {
        id: new_object_id(),
        contract_id: contract_id.to_string(),
        property_id: property_id.to_string(),
        tenant_wallet: tenant.clone(),
        owner_wallet: normalize_wallet(owner),
        contract_type,
        price: req.price.unwrap_or(0.0),
        status: ContractStatus::Active,
        tenant_signed: true,
        owner_signed: true,
        pdf_hash: present(&req.pdf_hash).map(str::to_string),
        blockchain_tx_hash: tx_hash.clone(),
        payment_tx_hash: None,
        content_data: req.content_data,
        signed_date: Some(Utc::now()),
        timestamps: Timestamps::now(),
    };
    let contract = state.db.contracts.insert(contract).await?;

    state
        .db
        .record_log(
            SystemLog::new(
                LogType::Contract,
                "CONTRACT_SIGNED",
                format!("Contract signed for Property {}", contract.property_id),
            )
            .actor(Some(tenant))
            .tx_hash(tx_hash),
        )
        .await;

    Ok(Json(ApiResponse::ok(contract)))
}

/// Contracts where the caller is either party, newest first
pub async fn get_my_contracts(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Contract>>>> {
    let Some(wallet) = user.active_wallet() else {
        return Ok(Json(ApiResponse::ok(Vec::new())));
    };
    let mut contracts = state.db.contracts.find(|c| c.is_party(wallet)).await?;
    contracts.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
    Ok(Json(ApiResponse::ok(contracts)))
}

pub async fn update_contract_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ContractStatusRequest>,
) -> ApiResult<Json<ApiResponse<Contract>>> {
    let contract_id = present(&req.contract_id).unwrap_or_default();
    let mut contract = state
        .db
        .contracts
        .find_one(|c| c.contract_id == contract_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Contract not found"))?;

    let Some(wallet) = user.active_wallet().filter(|w| contract.is_party(w)) else {
        return Err(ApiError::unauthorized("Not authorized"));
    };
    let wallet = wallet.to_string();

    let raw_status = present(&req.status).unwrap_or_default();
    contract.status = parse_field("status", raw_status)?;
    let contract = state.db.contracts.update(contract).await?;

    state
        .db
        .record_log(
            SystemLog::new(
                LogType::Contract,
                "CONTRACT_UPDATED",
                format!("Contract {} by {}", raw_status, wallet),
            )
            .actor(Some(wallet)),
        )
        .await;

    Ok(Json(ApiResponse::ok(contract)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_wallet() {
        assert_eq!(short_wallet("0xabcdef123456"), "0xabcd");
        assert_eq!(short_wallet("0xab"), "0xab");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("accepted"), "Accepted");
        assert_eq!(capitalize(""), "");
    }
}
