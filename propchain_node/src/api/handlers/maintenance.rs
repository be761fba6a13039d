//! Building maintenance fees under `/api/maintenance`

use super::{payment_date, PageParams, HISTORY_PAGE_SIZE};
use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::response::{created, ApiResponse, Created};
use crate::api::server::AppState;
use crate::api::validation::{
    contains_ignore_case, parse_field, present, validate_month, Pagination,
};
use crate::models::{normalize_wallet, MaintenancePayment, PaymentStatus};
use crate::storage::{new_object_id, Timestamps};
use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayMaintenanceRequest {
    pub payment_id: Option<String>,
    pub building_id: Option<String>,
    pub apartment_no: Option<String>,
    pub tenant_wallet: Option<String>,
    pub month: Option<String>,
    pub amount: Option<f64>,
    pub payment_date: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub receipt: Option<String>,
    pub blockchain_tx_hash: Option<String>,
}

/// Monthly totals for a building manager
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingReport {
    pub success: bool,
    pub building_id: String,
    pub month: String,
    pub count: usize,
    pub total_amount: f64,
    pub payments: Vec<MaintenancePayment>,
}

pub async fn pay_maintenance(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<PayMaintenanceRequest>,
) -> ApiResult<Created<MaintenancePayment>> {
    let (Some(building_id), Some(tenant), Some(month), Some(amount)) = (
        present(&req.building_id),
        present(&req.tenant_wallet),
        present(&req.month),
        req.amount,
    ) else {
        return Err(ApiError::missing_fields(&[
            "buildingId",
            "tenantWallet",
            "month",
            "amount",
        ]));
    };
    validate_month(month)?;
    let status: PaymentStatus = match present(&req.status) {
        Some(value) => parse_field("status", value)?,
        None => PaymentStatus::default(),
    };
    let tx_hash = present(&req.blockchain_tx_hash).map(str::to_string);
    let payment_id = present(&req.payment_id)
        .map(str::to_string)
        .or_else(|| tx_hash.clone())
        .unwrap_or_else(|| format!("maint-{}", uuid::Uuid::new_v4()));

    let payment = MaintenancePayment {
        id: new_object_id(),
        payment_id,
        building_id: building_id.to_string(),
        apartment_no: present(&req.apartment_no).map(str::to_string),
        tenant_wallet: normalize_wallet(tenant),
        month: month.to_string(),
        amount,
        payment_date: payment_date(req.payment_date),
        status,
        receipt: present(&req.receipt).map(str::to_string),
        blockchain_tx_hash: tx_hash,
        timestamps: Timestamps::now(),
    };
    let payment = state.db.maintenance_payments.insert(payment).await?;
    info!(
        "[DB] Maintenance {} for building {} ({}) recorded",
        payment.payment_id, payment.building_id, payment.month
    );
    Ok(created(payment))
}

/// Every payment recorded for a building
pub async fn get_history(
    State(state): State<AppState>,
    Path(building_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<MaintenancePayment>>>> {
    let history = state
        .db
        .maintenance_payments
        .find(|p| p.building_id == building_id)
        .await?;
    Ok(Json(ApiResponse::ok(history)))
}

pub async fn get_tenant_history(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<ApiResponse<Vec<MaintenancePayment>>>> {
    let wallet = normalize_wallet(&wallet);
    let pagination = Pagination::from_query(
        params.page.as_deref(),
        params.limit.as_deref(),
        HISTORY_PAGE_SIZE,
    );

    let mut history = state
        .db
        .maintenance_payments
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

/// Paid fees for one month. The building id matches as a case-insensitive
/// substring, so "blok-a" finds "Blok-A1".
pub async fn get_building_report(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((building_id, month)): Path<(String, String)>,
) -> ApiResult<Json<BuildingReport>> {
    let building = contains_ignore_case(&building_id)?;
    let payments = state
        .db
        .maintenance_payments
        .find(|p| {
            p.status == PaymentStatus::Paid && p.month == month && building.is_match(&p.building_id)
        })
        .await?;
    let total_amount = payments.iter().map(|p| p.amount).sum();

    Ok(Json(BuildingReport {
        success: true,
        building_id,
        month,
        count: payments.len(),
        total_amount,
        payments,
    }))
}
