//! # Loyalty ledger public API
//!
//! The `ledger_api` module exposes the programmatic API for users' orders and point balances. The HTTP server is a thin
//! layer over [`LedgerApi`].
//!
//! An API instance is created by supplying a database backend that implements the ledger store traits, along with
//! the event producers that should be notified about ledger changes:
//!
//! ```rust,ignore
//! use loyalty_engine::{events::EventProducers, LedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/loyalty.db", 25).await?;
//! let api = LedgerApi::new(db, EventProducers::default());
//! let balance = api.balance(&user_id).await?;
//! ```
mod errors;
mod ledger_flow_api;
pub mod ledger_objects;

pub use errors::LedgerApiError;
pub use ledger_flow_api::LedgerApi;
