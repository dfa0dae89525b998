use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use log::debug;
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points, UserId},
    events::EventProducers,
    LedgerApi,
    LedgerDatabase,
    SqliteDatabase,
};
use serde_json::Value;

use crate::{
    routes::health,
    server::{api_scope, json_config},
};

/// Sends `req` through a fresh app wired to `db` and returns the status and body.
pub async fn call(db: &SqliteDatabase, req: TestRequest) -> (StatusCode, String) {
    let app = App::new()
        .app_data(web::Data::new(LedgerApi::new(db.clone(), EventProducers::default())))
        .app_data(json_config())
        .service(health)
        .service(api_scope::<SqliteDatabase>());
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = test::call_service(&service, req.to_request()).await;
    let status = res.status();
    let body = test::read_body(res).await;
    (status, String::from_utf8_lossy(&body).into_owned())
}

pub fn as_user(req: TestRequest, user: &str) -> TestRequest {
    req.insert_header(("X-User-Id", user))
}

pub async fn upload(db: &SqliteDatabase, user: &str, body: &str) -> (StatusCode, String) {
    let req = as_user(TestRequest::post().uri("/api/user/orders"), user)
        .insert_header(("Content-Type", "text/plain"))
        .set_payload(body.to_string());
    call(db, req).await
}

pub async fn get(db: &SqliteDatabase, user: &str, path: &str) -> (StatusCode, String) {
    call(db, as_user(TestRequest::get().uri(path), user)).await
}

pub async fn withdraw(db: &SqliteDatabase, user: &str, body: Value) -> (StatusCode, String) {
    let req = as_user(TestRequest::post().uri("/api/user/balance/withdraw"), user).set_json(body);
    call(db, req).await
}

/// Uploads `number` for `user` and marks it processed with `amount` points.
pub async fn credit(db: &SqliteDatabase, user: &str, number: &str, amount: &str) {
    let number: OrderNumber = number.parse().expect("Invalid order number");
    let amount: Points = amount.parse().expect("Invalid amount");
    db.create_order_if_absent(&UserId::from(user), &number).await.expect("Error creating order");
    db.update_order_terminal(&number, OrderStatusType::Processed, amount)
        .await
        .expect("Error updating order")
        .expect("Order was not pending");
}

pub fn json(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
