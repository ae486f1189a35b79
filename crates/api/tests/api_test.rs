//! Router tests against an in-memory SQLite database.

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use tally_api::{AppState, create_router};
use tally_db::migration::{Migrator, MigratorTrait};
use tally_shared::config::{DatabaseConfig, LedgerConfig};
use tower::ServiceExt;

async fn app() -> Router {
    let config = DatabaseConfig {
        max_connections: 1,
        min_connections: 1,
        ..DatabaseConfig::with_url("sqlite::memory:")
    };
    let db = tally_db::connect(&config).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    create_router(AppState::new(db, LedgerConfig::default()))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn money(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn create_user(app: &Router, name: &str) -> String {
    let (status, user) = call(app, Method::POST, "/api/v1/users", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    user["id"].as_str().unwrap().to_string()
}

async fn open_account(app: &Router, user_id: &str, kind: &str) -> String {
    let (status, account) = call(
        app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "user_id": user_id, "type": kind })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(money(&account["balance"]), dec!(5000));
    account["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], true);
}

#[tokio::test]
async fn test_transfer_refund_flow() {
    let app = app().await;
    let alice = create_user(&app, "Alice").await;
    let bob = create_user(&app, "Bob").await;
    let a = open_account(&app, &alice, "checking").await;
    let b = open_account(&app, &bob, "savings").await;

    let (status, posted) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/transactions/transfer/{a}/{b}/100"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(posted["type"], "transfer");
    assert_eq!(posted["refundable"], true);
    assert_eq!(money(&posted["account"]["balance"]), dec!(4900));
    assert_eq!(money(&posted["to_account"]["balance"]), dec!(5100));
    let transfer_id = posted["id"].as_str().unwrap().to_string();

    let (status, outcome) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/refund/{transfer_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["transaction"]["type"], "refund");
    assert_eq!(outcome["original_transaction"]["refunded"], true);
    assert_eq!(money(&outcome["transaction"]["account"]["balance"]), dec!(5000));

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/refund/{transfer_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ALREADY_REFUNDED");

    let (status, page) = call(&app, Method::GET, "/api/v1/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["items"][0]["type"], "refund");
    assert_eq!(page["items"][1]["account"]["user"]["name"], "Alice");

    let (status, page) = call(
        &app,
        Method::GET,
        &format!("/api/v1/transactions/user/{bob}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
}

#[tokio::test]
async fn test_deposit_and_withdraw() {
    let app = app().await;
    let user = create_user(&app, "Carol").await;
    let account = open_account(&app, &user, "checking").await;

    let (status, posted) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/deposit/{account}/250"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&posted["account"]["balance"]), dec!(5250));
    assert_eq!(posted["refundable"], false);

    let (status, posted) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/withdraw/{account}/5250"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(money(&posted["account"]["balance"]), dec!(0));

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/withdraw/{account}/1"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "NOT_ENOUGH_MONEY");
}

#[tokio::test]
async fn test_movement_errors() {
    let app = app().await;
    let user = create_user(&app, "Dave").await;
    let account = open_account(&app, &user, "checking").await;
    let ghost = uuid::Uuid::now_v7();

    let cases = [
        (
            Method::POST,
            format!("/api/v1/transactions/deposit/{account}/0"),
            StatusCode::BAD_REQUEST,
            "AMOUNT_MUST_BE_POSITIVE",
        ),
        (
            Method::POST,
            format!("/api/v1/transactions/deposit/{account}/abc"),
            StatusCode::BAD_REQUEST,
            "INVALID_AMOUNT_FORMAT",
        ),
        (
            Method::PUT,
            format!("/api/v1/transactions/transfer/{account}/{ghost}/1"),
            StatusCode::NOT_FOUND,
            "TO_ACCOUNT_DOES_NOT_EXIST",
        ),
        (
            Method::POST,
            format!("/api/v1/transactions/withdraw/{ghost}/1"),
            StatusCode::NOT_FOUND,
            "FROM_ACCOUNT_DOES_NOT_EXIST",
        ),
        (
            Method::GET,
            format!("/api/v1/transactions/{ghost}"),
            StatusCode::NOT_FOUND,
            "TRANSACTION_NOT_FOUND",
        ),
    ];

    for (method, uri, status, code) in cases {
        let (actual, body) = call(&app, method, &uri, None).await;
        assert_eq!(actual, status, "{uri}");
        assert_eq!(body["error"], code, "{uri}");
    }
}

#[tokio::test]
async fn test_inactive_destination_rejected() {
    let app = app().await;
    let user = create_user(&app, "Erin").await;
    let a = open_account(&app, &user, "checking").await;
    let b = open_account(&app, &user, "savings").await;

    let (status, account) = call(
        &app,
        Method::PATCH,
        &format!("/api/v1/accounts/{b}/active"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(account["active"], false);

    let (status, body) = call(
        &app,
        Method::PUT,
        &format!("/api/v1/transactions/transfer/{a}/{b}/10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TO_ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_account_management() {
    let app = app().await;
    let user = create_user(&app, "Frank").await;
    let account = open_account(&app, &user, "checking").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/accounts",
        Some(json!({ "user_id": user, "type": "checking" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "ACCOUNT_ALREADY_EXISTS");

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &format!("/api/v1/accounts/{account}"),
        Some(json!({ "type": "savings" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["type"], "savings");

    let (status, page) = call(
        &app,
        Method::GET,
        &format!("/api/v1/accounts/user/{user}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/v1/accounts/{account}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/accounts/{account}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_user_management() {
    let app = app().await;
    let user = create_user(&app, "Grace").await;

    let (status, renamed) = call(
        &app,
        Method::PATCH,
        &format!("/api/v1/users/{user}"),
        Some(json!({ "name": "Grace Hopper" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["name"], "Grace Hopper");

    let (status, page) = call(&app, Method::GET, "/api/v1/users?page=1&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);

    let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/users/{user}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &format!("/api/v1/users/{user}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_requests_return_json_errors() {
    let app = app().await;

    let (status, body) = call(&app, Method::GET, "/api/v1/transactions/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_PATH_PARAMETER");
    assert!(body["message"].is_string());

    let (status, body) = call(&app, Method::POST, "/api/v1/transactions/deposit/nope/10", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_PATH_PARAMETER");

    let (status, body) = call(&app, Method::POST, "/api/v1/users", Some(json!({ "name": 5 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "INVALID_BODY");
}

#[tokio::test]
async fn test_invalid_paging_falls_back_to_defaults() {
    let app = app().await;
    let user = create_user(&app, "Heidi").await;
    let account = open_account(&app, &user, "checking").await;
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/transactions/deposit/{account}/10"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, page) = call(&app, Method::GET, "/api/v1/transactions?page=-1&limit=x", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["pages"], 1);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let (status, page) = call(&app, Method::GET, "/api/v1/users?page=abc&limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
}
