//! # Loyalty server
//! This crate hosts the HTTP front-end of the loyalty accrual service. It is responsible for:
//! * Accepting order uploads and withdrawal requests from authenticated users.
//! * Serving users their orders, balance and withdrawal history.
//! * Running the reconciliation worker, which asks the external accrual system for a verdict on every pending order
//!   and credits the points it awards.
//!
//! ## Configuration
//! The server is configured via environment variables, optionally overridden on the command line. See
//! [config](config/index.html) and [cli](cli/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `POST /api/user/orders`: Upload an order number (plain text body).
//! * `GET /api/user/orders`: The user's orders, newest first.
//! * `GET /api/user/balance`: The user's current balance and total withdrawn.
//! * `POST /api/user/balance/withdraw`: Spend points against a new order number.
//! * `GET /api/user/withdrawals`: The user's withdrawals, newest first.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
