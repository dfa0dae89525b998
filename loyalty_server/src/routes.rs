//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use bytes::Bytes;
use log::*;
use loyalty_engine::{
    ledger_objects::NewOrderOutcome,
    BalanceManagement,
    LedgerApi,
    LedgerDatabase,
    OrderManagement,
};

use crate::{
    auth::AuthenticatedUser,
    data_objects::{JsonResponse, WithdrawRequest},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(upload_order => Post "/user/orders" impl LedgerDatabase, OrderManagement, BalanceManagement);
/// Uploads an order number for the authenticated user. The body is the bare order number as plain text.
///
/// * `202 Accepted`: the order is new and will be reconciled with the accrual system.
/// * `200 OK`: the user had already uploaded this order.
/// * `409 Conflict`: another user owns this order number.
/// * `422 Unprocessable Entity`: the number fails the Luhn check.
pub async fn upload_order<B>(
    user: AuthenticatedUser,
    body: Bytes,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + OrderManagement + BalanceManagement,
{
    let raw_number = std::str::from_utf8(&body)
        .map_err(|e| ServerError::InvalidRequestBody(format!("The order number is not valid text. {e}")))?
        .trim();
    if raw_number.is_empty() {
        return Err(ServerError::InvalidRequestBody("The order number is missing".to_string()));
    }
    trace!("💻️ User {} is uploading order {raw_number}", user.user_id());
    let outcome = api.create_order(user.user_id(), raw_number).await?;
    let response = match outcome {
        NewOrderOutcome::Created(order) => {
            HttpResponse::Accepted().json(JsonResponse::success(format!("Order {} accepted", order.number)))
        },
        NewOrderOutcome::AlreadyUploaded(order) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Order {} was already uploaded", order.number)))
        },
    };
    Ok(response)
}

route!(my_orders => Get "/user/orders" impl LedgerDatabase, OrderManagement, BalanceManagement);
pub async fn my_orders<B>(user: AuthenticatedUser, api: web::Data<LedgerApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerDatabase + OrderManagement + BalanceManagement {
    trace!("💻️ Fetching orders for user {}", user.user_id());
    let orders = api.user_orders(user.user_id()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/user/balance" impl LedgerDatabase, OrderManagement, BalanceManagement);
pub async fn my_balance<B>(user: AuthenticatedUser, api: web::Data<LedgerApi<B>>) -> Result<HttpResponse, ServerError>
where B: LedgerDatabase + OrderManagement + BalanceManagement {
    trace!("💻️ Fetching balance for user {}", user.user_id());
    let balance = api.balance(user.user_id()).await?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(withdraw => Post "/user/balance/withdraw" impl LedgerDatabase, OrderManagement, BalanceManagement);
/// Spends points from the user's balance against a new order number.
///
/// * `200 OK`: the withdrawal was recorded.
/// * `402 Payment Required`: the balance does not cover the sum.
/// * `409 Conflict`: a withdrawal against this order number already exists.
/// * `422 Unprocessable Entity`: the order number fails the Luhn check.
/// * `400 Bad Request`: the sum is not positive, or the body is malformed.
pub async fn withdraw<B>(
    user: AuthenticatedUser,
    body: web::Json<WithdrawRequest>,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + OrderManagement + BalanceManagement,
{
    let WithdrawRequest { order, sum } = body.into_inner();
    trace!("💻️ User {} is withdrawing {sum} against order {order}", user.user_id());
    let withdrawal = api.withdraw(user.user_id(), &order, sum).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!(
        "Withdrew {} against order {}",
        withdrawal.amount, withdrawal.number
    ))))
}

route!(my_withdrawals => Get "/user/withdrawals" impl LedgerDatabase, OrderManagement, BalanceManagement);
pub async fn my_withdrawals<B>(
    user: AuthenticatedUser,
    api: web::Data<LedgerApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerDatabase + OrderManagement + BalanceManagement,
{
    trace!("💻️ Fetching withdrawals for user {}", user.user_id());
    let withdrawals = api.withdrawals(user.user_id()).await?;
    if withdrawals.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    Ok(HttpResponse::Ok().json(withdrawals))
}
