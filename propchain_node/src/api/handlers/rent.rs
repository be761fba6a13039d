//! Rent payment records under `/api/rent`

use super::{payment_date, PageParams, HISTORY_PAGE_SIZE};
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::response::{created, ApiResponse, Created};
use crate::api::server::AppState;
use crate::api::validation::{parse_field, present, validate_month, Pagination};
use crate::models::{normalize_wallet, PaymentStatus, RentPayment};
use crate::storage::{new_object_id, Timestamps};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayRentRequest {
    pub rent_id: Option<String>,
    pub property_id: Option<String>,
    pub tenant_wallet: Option<String>,
    pub owner_wallet: Option<String>,
    pub month: Option<String>,
    pub amount: Option<f64>,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub late_fee: Option<f64>,
    pub receipt: Option<String>,
    pub blockchain_tx_hash: Option<String>,
}

/// Record a rent payment the tenant made on chain
pub async fn pay_rent(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<PayRentRequest>,
) -> ApiResult<Created<RentPayment>> {
    let (Some(tenant), Some(month), Some(amount)) =
        (present(&req.tenant_wallet), present(&req.month), req.amount)
    else {
        return Err(ApiError::missing_fields(&["tenantWallet", "month", "amount"]));
    };
    validate_month(month)?;
    let status: PaymentStatus = match present(&req.status) {
        Some(value) => parse_field("status", value)?,
        None => PaymentStatus::default(),
    };
    let tx_hash = present(&req.blockchain_tx_hash).map(str::to_string);
    let rent_id = present(&req.rent_id)
        .map(str::to_string)
        .or_else(|| tx_hash.clone())
        .unwrap_or_else(|| format!("rent-{}", uuid::Uuid::new_v4()));

    let payment = RentPayment {
        id: new_object_id(),
        rent_id,
        property_id: present(&req.property_id).map(str::to_string),
        tenant_wallet: normalize_wallet(tenant),
        owner_wallet: present(&req.owner_wallet).map(normalize_wallet),
        month: month.to_string(),
        amount,
        payment_date: payment_date(req.payment_date),
        status,
        late_fee: req.late_fee.unwrap_or(0.0),
        receipt: present(&req.receipt).map(str::to_string),
        blockchain_tx_hash: tx_hash,
        timestamps: Timestamps::now(),
    };
    let payment = state.db.rent_payments.insert(payment).await?;
    info!(
        "[DB] Rent {} for {} paid by {}",
        payment.rent_id, payment.month, payment.tenant_wallet
    );
    Ok(created(payment))
}

/// A tenant's rent payments, most recent first
pub async fn get_tenant_history(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<ApiResponse<Vec<RentPayment>>>> {
    let wallet = normalize_wallet(&wallet);
    let pagination = Pagination::from_query(
        params.page.as_deref(),
        params.limit.as_deref(),
        HISTORY_PAGE_SIZE,
    );

    let mut history = state
        .db
        .rent_payments
        .find(|p| p.tenant_wallet == wallet)
        .await?;
    history.sort_by(|a, b| b.payment_date.cmp(&a.payment_date));

    let total = history.len();
    Ok(Json(ApiResponse::paged(
        pagination.slice(history),
        total,
        pagination,
    )))
}
