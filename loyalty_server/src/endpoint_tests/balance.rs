use actix_web::http::StatusCode;
use loyalty_engine::test_utils::prepare_env::{new_test_database, tear_down};
use serde_json::json as j;

use super::helpers::{credit, get, json, withdraw};

#[actix_web::test]
async fn new_users_have_an_empty_balance() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let (status, body) = get(&db, "carol", "/api/user/balance").await;
    assert_eq!(status, StatusCode::OK);
    let balance = json(&body);
    assert_eq!(balance["current"].as_f64(), Some(0.0));
    assert_eq!(balance["withdrawn"].as_f64(), Some(0.0));
    let (status, _) = get(&db, "carol", "/api/user/withdrawals").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    tear_down(db).await;
}

#[actix_web::test]
async fn withdrawal_round_trip() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    credit(&db, "alice", "79927398713", "500").await;

    let (status, body) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": 120.5})).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = get(&db, "alice", "/api/user/balance").await;
    let balance = json(&body);
    assert_eq!(balance["current"].as_f64(), Some(379.5));
    assert_eq!(balance["withdrawn"].as_f64(), Some(120.5));

    let (status, body) = get(&db, "alice", "/api/user/withdrawals").await;
    assert_eq!(status, StatusCode::OK);
    let withdrawals = json(&body);
    let withdrawals = withdrawals.as_array().expect("Expected a list of withdrawals");
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0]["order"], "2377225624");
    assert_eq!(withdrawals[0]["sum"].as_f64(), Some(120.5));
    assert!(withdrawals[0]["processed_at"].is_string());

    let (status, _) = get(&db, "bob", "/api/user/withdrawals").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    tear_down(db).await;
}

#[actix_web::test]
async fn withdrawal_status_codes() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    credit(&db, "alice", "79927398713", "100").await;

    let (status, _) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": 150})).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    let (status, _) = withdraw(&db, "alice", j!({"order": "1234567890", "sum": 10})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": 0})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": -5})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = withdraw(&db, "alice", j!({"order": "2377225624"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json(&body)["success"], false);

    let (status, _) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": 60})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = withdraw(&db, "alice", j!({"order": "2377225624", "sum": 10})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = get(&db, "alice", "/api/user/balance").await;
    assert_eq!(json(&body)["current"].as_f64(), Some(40.0));
    tear_down(db).await;
}
