/// Account and wallet endpoints driven through the full router
mod common;

use axum::http::{Method, StatusCode};
use common::{StubLedger, TestApp};
use serde_json::json;
use std::time::Duration;

const METAMASK: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

#[tokio::test]
async fn test_register_login_and_me() {
    let app = TestApp::new();
    let token = app.register("alice").await;
    assert!(app.tokens.verify(&token).is_ok());

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "loginIdentifier": "alice", "password": "secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let login_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/auth/me", Some(&login_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "alice");
    assert_eq!(body["data"]["roles"], json!(["tenant"]));
    assert!(body["data"].get("password").is_none());

    println!("✅ Register/login/me PASSED");
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/api/auth/register", None, json!({ "username": "bob" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide username and password");

    app.register("bob").await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "username": "bob", "password": "other" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_login_failures() {
    let app = TestApp::new();
    app.register("carol").await;

    let (status, body) = app
        .post("/api/auth/login", None, json!({ "loginIdentifier": "carol" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide credentials");

    for (identifier, password) in [("carol", "wrong"), ("nobody", "secret")] {
        let (status, body) = app
            .post(
                "/api/auth/login",
                None,
                json!({ "loginIdentifier": identifier, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new();

    let (status, body) = app.get("/api/auth/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token");

    let (status, body) = app.get("/api/auth/me", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized");

    // Valid signature, but the account no longer exists
    let orphan = app.tokens.issue("no-such-user").unwrap();
    let (status, body) = app.get("/api/auth/me", Some(&orphan)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, user not found");
}

#[tokio::test]
async fn test_change_password() {
    let app = TestApp::new();
    let token = app.register("dave").await;

    let (status, body) = app
        .put(
            "/api/auth/change-password",
            Some(&token),
            json!({ "currentPassword": "wrong", "newPassword": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Current password is incorrect");

    let (status, _) = app
        .put(
            "/api/auth/change-password",
            Some(&token),
            json!({ "currentPassword": "secret", "newPassword": "abc" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .put(
            "/api/auth/change-password",
            Some(&token),
            json!({ "currentPassword": "secret", "newPassword": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Password updated successfully.");

    let (status, _) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "loginIdentifier": "dave", "password": "brand-new" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wallet_lifecycle() {
    let app = TestApp::new();
    let (token, demo) = app.user_with_wallet("erin").await;

    // Demo wallets are funded and become active when first
    assert_eq!(app.ledger.funded.lock().len(), 1);
    assert_eq!(app.ledger.funded.lock()[0].to_lowercase(), demo);

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["wallets"][0]["alias"], "Demo Wallet #1");
    assert_eq!(body["data"]["wallets"][0]["walletType"], "demo");
    assert!(body["data"]["wallets"][0]["privateKey"].is_string());

    let (status, body) = app
        .post(
            "/api/auth/add-wallet",
            Some(&token),
            json!({ "walletType": "metamask", "address": METAMASK }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["wallets"][1]["alias"], "MetaMask Wallet");
    assert_eq!(body["data"]["wallets"][1]["address"], METAMASK.to_lowercase());
    assert_eq!(body["data"]["activeWallet"], demo.as_str());

    let (status, body) = app
        .post(
            "/api/auth/add-wallet",
            Some(&token),
            json!({ "walletType": "metamask", "address": METAMASK }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "This wallet is already added.");

    let (status, body) = app
        .post(
            "/api/auth/add-wallet",
            Some(&token),
            json!({ "walletType": "metamask", "address": "0x1234" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "A valid wallet address is required.");

    let (status, body) = app
        .post("/api/auth/add-wallet", Some(&token), json!({ "walletType": "ledger" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid wallet type.");

    let (status, body) = app
        .put(
            "/api/auth/set-active-wallet",
            Some(&token),
            json!({ "address": METAMASK }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["activeWallet"], METAMASK.to_lowercase());

    let (status, body) = app
        .put(
            "/api/auth/set-active-wallet",
            Some(&token),
            json!({ "address": "0x0000000000000000000000000000000000000001" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Wallet not found on your account.");

    let (status, body) = app
        .put(
            "/api/auth/wallet-alias",
            Some(&token),
            json!({ "address": demo, "alias": "Savings" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["wallets"][0]["alias"], "Savings");

    let (status, body) = app
        .put(
            "/api/auth/wallet-alias",
            Some(&token),
            json!({ "address": demo, "alias": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Alias cannot be empty.");

    // Removing the active wallet falls back to the remaining one
    let uri = format!("/api/auth/wallet/{}", METAMASK.to_lowercase());
    let (status, body) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Wallet removed successfully.");
    assert_eq!(body["data"]["activeWallet"], demo.as_str());
    assert_eq!(body["data"]["wallets"].as_array().unwrap().len(), 1);

    let (status, body) = app.request(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Wallet not found.");

    println!("✅ Wallet lifecycle PASSED");
}

#[tokio::test]
async fn test_concurrent_demo_wallets_are_both_kept() {
    let app = TestApp::with_ledger(StubLedger {
        funding_delay: Some(Duration::from_millis(50)),
        ..Default::default()
    });
    let token = app.register("grace").await;

    let body = json!({ "walletType": "demo" });
    let (first, second) = tokio::join!(
        app.post("/api/auth/add-wallet", Some(&token), body.clone()),
        app.post("/api/auth/add-wallet", Some(&token), body.clone()),
    );
    assert_eq!(first.0, StatusCode::CREATED, "{}", first.1);
    assert_eq!(second.0, StatusCode::CREATED, "{}", second.1);
    assert_eq!(app.ledger.funded.lock().len(), 2);

    let (status, body) = app.get("/api/auth/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let wallets = body["data"]["wallets"].as_array().unwrap();
    assert_eq!(wallets.len(), 2);
    let mut aliases: Vec<&str> = wallets
        .iter()
        .map(|w| w["alias"].as_str().unwrap())
        .collect();
    aliases.sort();
    assert_eq!(aliases, vec!["Demo Wallet #1", "Demo Wallet #2"]);
}
