use crate::api::server::AppState;
use axum::{extract::State, Json};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub chain: ChainHealth,
    /// Deployed address per loaded contract artifact
    pub contracts: BTreeMap<String, String>,
}

/// Liveness plus chain reachability. Always 200; a down chain is reported,
/// not treated as a failure.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let chain = match state.ledger.status().await {
        Ok(status) => ChainHealth {
            connected: true,
            chain_id: Some(status.chain_id),
            block_number: Some(status.block_number),
        },
        Err(e) => {
            debug!("[CHAIN] Health check failed: {}", e);
            ChainHealth {
                connected: false,
                chain_id: None,
                block_number: None,
            }
        }
    };

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        chain,
        contracts: state.artifacts.addresses(),
    })
}
