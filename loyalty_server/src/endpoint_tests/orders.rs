use actix_web::{http::StatusCode, test::TestRequest};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points},
    test_utils::prepare_env::{new_test_database, tear_down},
    LedgerDatabase,
    OrderManagement,
};

use super::helpers::{call, credit, get, json, upload};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let (status, body) = call(&db, TestRequest::get().uri("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
    tear_down(db).await;
}

#[actix_web::test]
async fn requests_without_a_user_are_unauthorized() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let req = TestRequest::post().uri("/api/user/orders").set_payload("79927398713");
    let (status, body) = call(&db, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json(&body)["error"].as_str().unwrap().contains("X-User-Id"));
    let (status, _) = call(&db, TestRequest::get().uri("/api/user/orders")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = call(&db, TestRequest::get().uri("/api/user/balance")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    tear_down(db).await;
}

#[actix_web::test]
async fn upload_status_codes() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let (status, body) = upload(&db, "alice", "79927398713").await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(json(&body)["success"], true);

    let (status, _) = upload(&db, "alice", " 7992 7398 713\n").await;
    assert_eq!(status, StatusCode::OK, "Re-uploading, even with whitespace, is not an error");

    let (status, body) = upload(&db, "bob", "79927398713").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json(&body)["error"].as_str().unwrap().contains("another user"));

    let (status, _) = upload(&db, "alice", "79927398710").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = upload(&db, "alice", "not-a-number").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = upload(&db, "alice", "   ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let number: OrderNumber = "79927398713".parse().unwrap();
    let order = db.fetch_order_by_number(&number).await.unwrap().unwrap();
    assert_eq!(order.user_id.as_str(), "alice");
    assert_eq!(order.status, OrderStatusType::New);
    tear_down(db).await;
}

#[actix_web::test]
async fn order_listing() {
    let _ = env_logger::try_init().ok();
    let db = new_test_database().await;
    let (status, body) = get(&db, "alice", "/api/user/orders").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    upload(&db, "alice", "79927398713").await;
    credit(&db, "alice", "4532015112830366", "500").await;
    let rejected: OrderNumber = "5555555555554444".parse().unwrap();
    upload(&db, "alice", rejected.as_str()).await;
    db.update_order_terminal(&rejected, OrderStatusType::Invalid, Points::ZERO).await.unwrap();
    upload(&db, "bob", "2377225624").await;

    let (status, body) = get(&db, "alice", "/api/user/orders").await;
    assert_eq!(status, StatusCode::OK);
    let orders = json(&body);
    let orders = orders.as_array().expect("Expected a list of orders");
    assert_eq!(orders.len(), 3);
    // Newest first
    assert_eq!(orders[0]["number"], "5555555555554444");
    assert_eq!(orders[0]["status"], "invalid");
    assert!(orders[0].get("accrual").is_none());
    assert_eq!(orders[1]["number"], "4532015112830366");
    assert_eq!(orders[1]["status"], "processed");
    assert_eq!(orders[1]["accrual"].as_f64(), Some(500.0));
    assert_eq!(orders[2]["number"], "79927398713");
    assert_eq!(orders[2]["status"], "new");
    assert!(orders[2].get("accrual").is_none());
    assert!(orders[2]["uploaded_at"].is_string());
    tear_down(db).await;
}
