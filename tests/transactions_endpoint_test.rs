use axum::http::StatusCode;
use coinfolio::api::{self, AppState};
use coinfolio::config::Config;
use coinfolio::db::init_db;
use coinfolio::orchestration::Valuator;
use coinfolio::{AssetId, Decimal, MockPriceSource, Repository};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

struct TestApp {
    app: axum::Router,
    state: AppState,
    _temp: TempDir,
}

async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let config = Config {
        port: 0,
        database_path: db_path,
        price_api_url: "http://example.invalid".to_string(),
        quote_currency: "usd".to_string(),
        price_cache_ttl_ms: 0,
    };
    let valuator = Arc::new(Valuator::new(repo.clone(), Arc::new(MockPriceSource::new())));
    let state = AppState::new(repo, config, valuator);

    TestApp {
        app: api::create_router(state.clone()),
        state,
        _temp: temp_dir,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = axum::http::Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(axum::body::Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(axum::body::Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_raw(app: &axum::Router, body: &str) -> (StatusCode, Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri("/v1/transactions")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

#[tokio::test]
async fn test_create_transaction_returns_created() {
    let test_app = setup_test_app().await;

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/v1/transactions",
        Some(json!({"assetId": " Bitcoin ", "type": "buy", "quantity": 1.5, "price": 20000, "createdAt": 1000})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["assetId"], "bitcoin");
    assert_eq!(body["type"], "BUY");
    assert_eq!(body["quantity"], "1.5");
    assert_eq!(body["price"], "20000");
    assert_eq!(body["createdAt"], 1000);
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_create_transaction_refreshes_holding() {
    let test_app = setup_test_app().await;

    for (qty, price, at) in [(1, 20000, 1), (1, 30000, 2)] {
        let (status, _) = send(
            &test_app.app,
            "POST",
            "/v1/transactions",
            Some(json!({"assetId": "bitcoin", "type": "BUY", "quantity": qty, "price": price, "createdAt": at})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let holding = test_app
        .state
        .repo
        .get_holding(&AssetId::new("bitcoin"))
        .await
        .unwrap()
        .expect("holding persisted");
    assert_eq!(holding.total_quantity, d("2"));
    assert_eq!(holding.avg_cost, d("25000"));
}

#[tokio::test]
async fn test_create_transaction_rejects_invalid_input() {
    let test_app = setup_test_app().await;

    let cases = [
        (json!({"assetId": "bitcoin", "type": "BUY", "quantity": 0}), "quantity must be positive"),
        (json!({"assetId": "bitcoin", "type": "BUY", "quantity": -1}), "quantity must be positive"),
        (json!({"assetId": "bitcoin", "type": "STAKE", "quantity": 1}), "unknown transaction type: STAKE"),
        (json!({"assetId": "", "type": "BUY", "quantity": 1}), "assetId must not be empty"),
        (json!({"assetId": "bitcoin", "type": "SELL", "quantity": 1, "price": -3}), "price must not be negative"),
    ];

    for (payload, message) in cases {
        let (status, body) = send(&test_app.app, "POST", "/v1/transactions", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], message);
    }

    let stored = test_app
        .state
        .repo
        .query_transactions(None, None, None)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn test_create_transaction_rejects_malformed_json() {
    let test_app = setup_test_app().await;

    let (status, body) = send(
        &test_app.app,
        "POST",
        "/v1/transactions",
        Some(json!({"assetId": "bitcoin", "type": "BUY"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_list_transactions_filters_and_orders() {
    let test_app = setup_test_app().await;

    let payloads = [
        json!({"assetId": "bitcoin", "type": "SELL", "quantity": 0.5, "price": 40000, "createdAt": 3000}),
        json!({"assetId": "ethereum", "type": "BUY", "quantity": 2, "price": 2000, "createdAt": 2000}),
        json!({"assetId": "bitcoin", "type": "BUY", "quantity": 1, "price": 20000, "createdAt": 1000}),
    ];
    for payload in payloads {
        send(&test_app.app, "POST", "/v1/transactions", Some(payload)).await;
    }

    let (status, body) = send(&test_app.app, "GET", "/v1/transactions?assetId=BITCOIN", None).await;
    assert_eq!(status, StatusCode::OK);
    let txs = body["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0]["createdAt"], 1000);
    assert_eq!(txs[1]["createdAt"], 3000);

    let (_, body) = send(&test_app.app, "GET", "/v1/transactions?fromMs=1500&toMs=2500", None).await;
    let txs = body["transactions"].as_array().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0]["assetId"], "ethereum");

    let (_, body) = send(&test_app.app, "GET", "/v1/transactions", None).await;
    assert_eq!(body["transactions"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_list_transactions_rejects_inverted_window() {
    let test_app = setup_test_app().await;

    let (status, body) = send(&test_app.app, "GET", "/v1/transactions?fromMs=10&toMs=5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "fromMs must be <= toMs");
}

#[tokio::test]
async fn test_delete_transaction_recomputes_holding() {
    let test_app = setup_test_app().await;

    send(
        &test_app.app,
        "POST",
        "/v1/transactions",
        Some(json!({"assetId": "bitcoin", "type": "BUY", "quantity": 1, "price": 100, "createdAt": 1})),
    )
    .await;
    let (_, created) = send(
        &test_app.app,
        "POST",
        "/v1/transactions",
        Some(json!({"assetId": "bitcoin", "type": "BUY", "quantity": 1, "price": 300, "createdAt": 2})),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, body) = send(&test_app.app, "DELETE", &format!("/v1/transactions/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());

    let holding = test_app
        .state
        .repo
        .get_holding(&AssetId::new("bitcoin"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.total_quantity, d("1"));
    assert_eq!(holding.avg_cost, d("100"));

    let (status, _) = send(&test_app.app, "DELETE", &format!("/v1/transactions/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_transaction_keeps_full_precision() {
    let test_app = setup_test_app().await;

    let (status, body) = post_raw(
        &test_app.app,
        r#"{"assetId":"bitcoin","type":"BUY","quantity":0.12345678901234567891,"price":"20000.000000000000000001","createdAt":1}"#,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quantity"], "0.12345678901234567891");
    assert_eq!(body["price"], "20000.000000000000000001");

    let stored = test_app
        .state
        .repo
        .query_transactions(None, None, None)
        .await
        .unwrap();
    assert_eq!(stored[0].quantity, d("0.12345678901234567891"));
}

#[tokio::test]
async fn test_extreme_magnitudes_are_rejected_or_skipped() {
    let test_app = setup_test_app().await;

    let (status, body) = post_raw(
        &test_app.app,
        r#"{"assetId":"bitcoin","type":"BUY","quantity":100000000000000000000,"price":10000000000,"createdAt":1}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "quantity * price exceeds the supported range");

    // Each lot validates on its own; the engine skips the one it cannot blend.
    for at in [2, 3] {
        let (status, _) = post_raw(
            &test_app.app,
            &format!(
                r#"{{"assetId":"bitcoin","type":"BUY","quantity":500000000000000,"price":100000000000000,"createdAt":{}}}"#,
                at
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let holding = test_app
        .state
        .repo
        .get_holding(&AssetId::new("bitcoin"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holding.total_quantity, d("500000000000000"));

    let (status, body) = send(&test_app.app, "GET", "/v1/holdings/bitcoin?price=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalQuantity"], "500000000000000");
}
