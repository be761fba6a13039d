//! Listing endpoints under `/api/properties`

use crate::api::errors::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiQuery, AuthUser};
use crate::api::response::{created, ApiResponse, Created};
use crate::api::server::AppState;
use crate::api::validation::{contains_ignore_case, parse_field, present, Pagination};
use crate::models::{
    normalize_wallet, DepositStatus, ListingType, Property, PropertyAddress, PropertyDetails,
    PropertyStatus,
};
use crate::storage::{new_object_id, Timestamps};
use axum::{
    extract::{Path, State},
    Json,
};
use log::info;
use serde::Deserialize;
use std::collections::HashSet;

const DEFAULT_PAGE_SIZE: usize = 9;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPropertyRequest {
    pub property_id: Option<String>,
    pub owner_wallet: Option<String>,
    pub price: Option<f64>,
    pub property_type: Option<String>,
    #[serde(default)]
    pub address: PropertyAddress,
    #[serde(default)]
    pub details: PropertyDetails,
    pub listing_type: Option<String>,
    pub maintenance_fee: Option<f64>,
    pub tenant_requirements: Option<String>,
    pub blockchain_tx_hash: Option<String>,
}

/// Query string values arrive as text and are parsed leniently
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub listing_type: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub new_owner_wallet: Option<String>,
    pub status: Option<String>,
    pub tx_hash: Option<String>,
}

fn newest_first(properties: &mut [Property]) {
    properties.sort_by(|a, b| b.timestamps.created_at.cmp(&a.timestamps.created_at));
}

/// Record a listing after the client registered it on chain
pub async fn register_property(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(req): ApiJson<RegisterPropertyRequest>,
) -> ApiResult<Created<Property>> {
    let (Some(property_id), Some(owner_wallet), Some(price)) =
        (present(&req.property_id), present(&req.owner_wallet), req.price)
    else {
        return Err(ApiError::missing_fields(&["propertyId", "ownerWallet", "price"]));
    };

    let Some(property_type) = present(&req.property_type) else {
        return Err(ApiError::bad_request("Path `propertyType` is required."));
    };
    let listing_type: ListingType = match present(&req.listing_type) {
        Some(value) => parse_field("listingType", value)?,
        None => return Err(ApiError::bad_request("Path `listingType` is required.")),
    };

    let property = Property {
        id: new_object_id(),
        property_id: property_id.to_string(),
        owner_wallet: normalize_wallet(owner_wallet),
        property_type: property_type.to_string(),
        address: req.address,
        details: req.details,
        listing_type,
        price,
        maintenance_fee: req.maintenance_fee,
        tenant_requirements: req.tenant_requirements.unwrap_or_default(),
        status: PropertyStatus::Available,
        blockchain_tx_hash: req.blockchain_tx_hash,
        timestamps: Timestamps::now(),
    };
    let property = state.db.properties.insert(property).await?;
    info!(
        "[DB] Property {} registered for {}",
        property.property_id, property.owner_wallet
    );
    Ok(created(property))
}

/// Public catalogue search with pagination
pub async fn search_properties(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<Json<ApiResponse<Vec<Property>>>> {
    let city = match present(&params.city) {
        Some(city) => Some(contains_ignore_case(city)?),
        None => None,
    };
    let property_type = present(&params.property_type).map(str::to_string);
    let listing_type: Option<ListingType> = match present(&params.listing_type) {
        Some(value) => Some(parse_field("listingType", value)?),
        None => None,
    };
    let min_price = present(&params.min_price).and_then(|v| v.parse::<f64>().ok());
    let max_price = present(&params.max_price).and_then(|v| v.parse::<f64>().ok());
    let pagination = Pagination::from_query(
        params.page.as_deref(),
        params.limit.as_deref(),
        DEFAULT_PAGE_SIZE,
    );

    let mut matches = state
        .db
        .properties
        .find(|p| {
            city.as_ref().map_or(true, |re| {
                p.address.city.as_deref().is_some_and(|c| re.is_match(c))
            }) && property_type.as_ref().map_or(true, |t| &p.property_type == t)
                && listing_type.map_or(true, |l| p.listing_type == l)
                && min_price.map_or(true, |min| p.price >= min)
                && max_price.map_or(true, |max| p.price <= max)
        })
        .await?;
    newest_first(&mut matches);

    let total = matches.len();
    Ok(Json(ApiResponse::paged(
        pagination.slice(matches),
        total,
        pagination,
    )))
}

pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<Property>>> {
    let property = state
        .db
        .properties
        .find_one(|p| p.property_id == id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;
    Ok(Json(ApiResponse::ok(property)))
}

/// Apply the outcome of an on-chain purchase or rental
pub async fn transfer_ownership(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<Json<ApiResponse<Property>>> {
    let mut property = state
        .db
        .properties
        .find_one(|p| p.property_id == id)
        .await?
        .ok_or_else(|| ApiError::not_found("Property not found"))?;

    if let Some(owner) = present(&req.new_owner_wallet) {
        property.owner_wallet = normalize_wallet(owner);
    }
    if let Some(status) = present(&req.status) {
        property.status = parse_field::<PropertyStatus>("status", status)?;
    }
    if let Some(tx_hash) = present(&req.tx_hash) {
        property.blockchain_tx_hash = Some(tx_hash.to_string());
    }

    let property = state.db.properties.update(property).await?;
    info!(
        "[DB] Property {} now {:?}, owned by {}",
        property.property_id, property.status, property.owner_wallet
    );
    Ok(Json(ApiResponse::ok(property)))
}

/// Listings owned by any wallet on the account
pub async fn get_my_properties(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Property>>>> {
    let wallets: HashSet<String> = user.wallets().into_iter().collect();
    let properties = state
        .db
        .properties
        .find(|p| wallets.contains(&p.owner_wallet))
        .await?;
    Ok(Json(ApiResponse::counted(properties)))
}

/// Listings where one of the account's deposits was accepted
pub async fn get_my_rentals(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Property>>>> {
    let wallets: HashSet<String> = user.wallets().into_iter().collect();
    let property_ids: HashSet<String> = state
        .db
        .deposits
        .find(|d| d.status == DepositStatus::Accepted && wallets.contains(&d.depositor_wallet))
        .await?
        .into_iter()
        .map(|d| d.property_id)
        .collect();

    let properties = state
        .db
        .properties
        .find(|p| property_ids.contains(&p.property_id))
        .await?;
    Ok(Json(ApiResponse::ok(properties)))
}
