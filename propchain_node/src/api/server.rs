use crate::api::errors::ApiError;
use crate::api::handlers::{auth, deposits, extras, health, maintenance, properties, rent};
use crate::auth::TokenIssuer;
use crate::chain::{ArtifactRegistry, Ledger};
use crate::db::Database;
use anyhow::Result;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use log::info;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub ledger: Arc<dyn Ledger>,
    pub artifacts: Arc<ArtifactRegistry>,
    pub tokens: Arc<TokenIssuer>,
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::get_me))
        .route("/change-password", put(auth::change_password))
        .route("/add-wallet", post(auth::add_wallet))
        .route("/set-active-wallet", put(auth::set_active_wallet))
        .route("/wallet-alias", put(auth::update_wallet_alias))
        .route("/wallet/:address", delete(auth::delete_wallet))
}

fn property_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(properties::register_property))
        .route("/search", get(properties::search_properties))
        .route("/my/all", get(properties::get_my_properties))
        .route("/my/rentals", get(properties::get_my_rentals))
        .route("/:id/transfer", put(properties::transfer_ownership))
        .route("/:id", get(properties::get_property))
}

fn deposit_routes() -> Router<AppState> {
    Router::new()
        .route("/submit", post(deposits::submit_deposit))
        .route("/queue/:property_id", get(deposits::get_queue))
        .route("/my", get(deposits::get_my_deposits))
        .route("/received", get(deposits::get_received_deposits))
        .route("/:id/status", put(deposits::update_deposit_status))
}

fn rent_routes() -> Router<AppState> {
    Router::new()
        .route("/pay", post(rent::pay_rent))
        .route("/tenant-history/:wallet", get(rent::get_tenant_history))
}

fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/pay", post(maintenance::pay_maintenance))
        .route("/history/:building_id", get(maintenance::get_history))
        .route("/tenant-history/:wallet", get(maintenance::get_tenant_history))
        .route(
            "/building-report/:building_id/:month",
            get(maintenance::get_building_report),
        )
}

fn extra_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(extras::create_review))
        .route("/reviews/:property_id", get(extras::get_reviews))
        .route("/tickets", post(extras::create_ticket).get(extras::get_my_tickets))
        .route("/logs", get(extras::get_system_logs).post(extras::create_log_entry))
        .route("/messages", get(extras::get_messages).post(extras::send_message))
        .route("/messages/offer", put(extras::respond_to_offer))
        .route("/notifications", get(extras::get_notifications))
        .route("/notifications/read", put(extras::mark_notifications_read))
        .route("/contracts", post(extras::save_contract).get(extras::get_my_contracts))
        .route("/contracts/status", put(extras::update_contract_status))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

/// Helmet-style hardening headers added to every response
fn security_headers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let headers: [(HeaderName, &'static str); 5] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
        (header::REFERRER_POLICY, "no-referrer"),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (HeaderName::from_static("cross-origin-opener-policy"), "same-origin"),
    ];
    headers.into_iter().fold(router, |router, (name, value)| {
        router.layer(SetResponseHeaderLayer::if_not_present(
            name,
            HeaderValue::from_static(value),
        ))
    })
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        .nest("/auth", auth_routes())
        .nest("/properties", property_routes())
        .nest("/deposits", deposit_routes())
        .nest("/rent", rent_routes())
        .nest("/maintenance", maintenance_routes())
        .nest("/extras", extra_routes());

    let router = Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers(Any),
        );

    security_headers(router).with_state(state)
}

/// Bind `0.0.0.0:<port>` and serve until Ctrl-C
pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let app = create_router(state);
    let addr = format!("0.0.0.0:{}", port);
    info!("Server running on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await?;
    Ok(())
}
