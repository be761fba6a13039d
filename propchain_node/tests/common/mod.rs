//! In-process harness: the real router over in-memory storage and a stub
//! ledger that records funding requests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use parking_lot::Mutex;
use propchain_node::{
    api::{create_router, AppState},
    auth::{keccak_id, TokenIssuer},
    chain::{ArtifactRegistry, ChainError, ChainStatus, Ledger, PropertyListing, Registration},
    db::Database,
};
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

#[derive(Default)]
pub struct StubLedger {
    pub funded: Mutex<Vec<String>>,
    /// Simulated latency of a funding transfer
    pub funding_delay: Option<Duration>,
}

#[async_trait]
impl Ledger for StubLedger {
    async fn status(&self) -> Result<ChainStatus, ChainError> {
        Ok(ChainStatus {
            chain_id: 1337,
            network_id: "5777".to_string(),
            block_number: 42,
        })
    }

    async fn fund_wallet(&self, address: &str) -> Result<String, ChainError> {
        if let Some(delay) = self.funding_delay {
            tokio::time::sleep(delay).await;
        }
        self.funded.lock().push(address.to_string());
        Ok(keccak_id(&format!("fund:{}", address)))
    }

    async fn register_property(
        &self,
        _owner_key: &str,
        listing: &PropertyListing,
    ) -> Result<Registration, ChainError> {
        Ok(Registration {
            property_id: keccak_id(&listing.location),
            tx_hash: keccak_id(&format!("tx:{}", listing.location)),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: Arc<Database>,
    pub ledger: Arc<StubLedger>,
    pub tokens: Arc<TokenIssuer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_ledger(StubLedger::default())
    }

    pub fn with_ledger(ledger: StubLedger) -> Self {
        let db = Arc::new(Database::in_memory());
        let ledger = Arc::new(ledger);
        let tokens = Arc::new(TokenIssuer::new(TEST_SECRET, 24));
        let state = AppState {
            db: db.clone(),
            ledger: ledger.clone(),
            artifacts: Arc::new(ArtifactRegistry::new("5777")),
            tokens: tokens.clone(),
        };
        Self {
            router: create_router(state),
            db,
            ledger,
            tokens,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    /// Register an account and return its token
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({ "username": username, "password": "secret" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Register an account with one demo wallet; returns (token, wallet)
    pub async fn user_with_wallet(&self, username: &str) -> (String, String) {
        let token = self.register(username).await;
        let (status, body) = self
            .post(
                "/api/auth/add-wallet",
                Some(&token),
                serde_json::json!({ "walletType": "demo" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let wallet = body["data"]["activeWallet"].as_str().unwrap().to_string();
        (token, wallet)
    }

    /// List a property owned by `owner_wallet`
    pub async fn list_property(
        &self,
        token: &str,
        property_id: &str,
        owner_wallet: &str,
        city: &str,
        price: f64,
    ) -> Value {
        let (status, body) = self
            .post(
                "/api/properties/register",
                Some(token),
                serde_json::json!({
                    "propertyId": property_id,
                    "ownerWallet": owner_wallet,
                    "propertyType": "Apartment",
                    "listingType": "rent",
                    "price": price,
                    "address": { "city": city, "district": "Center", "street": "Main St. 1" },
                    "details": { "rooms": 2, "squareMeters": 80, "floor": 1, "furnished": false }
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}
