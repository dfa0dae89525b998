use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::{BalanceManagement, InsertOrderResult, InsertWithdrawalResult, LedgerDatabase, OrderManagement},
    db_types::{Balance, Order, OrderNumber, Points, UserId, Withdrawal},
    events::{EventProducers, WithdrawalProcessedEvent},
    ledger_api::{
        ledger_objects::{BalanceAudit, NewOrderOutcome, OrderResponse, WithdrawalResponse},
        LedgerApiError,
    },
};

/// `LedgerApi` is the primary API for users' orders, balances and withdrawals.
///
/// Every consistency guarantee (one owner per order number, at most one withdrawal per number, no overdrafts) is
/// enforced by the store inside a single statement or transaction, so `LedgerApi` needs no locking of its own and can
/// be shared freely between request handlers.
pub struct LedgerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase + OrderManagement + BalanceManagement
{
    /// Uploads an order for `user_id`.
    ///
    /// The number is validated before the store is touched. If the order already exists, the outcome depends on who
    /// owns it: the same user gets [`NewOrderOutcome::AlreadyUploaded`], anyone else gets
    /// [`LedgerApiError::OrderUploadedByAnotherUser`]. An existing order is never modified.
    pub async fn create_order(&self, user_id: &UserId, raw_number: &str) -> Result<NewOrderOutcome, LedgerApiError> {
        let number = raw_number.parse::<OrderNumber>()?;
        let result = self.db.create_order_if_absent(user_id, &number).await.map_err(LedgerApiError::database)?;
        match result {
            InsertOrderResult::Inserted(order) => {
                info!("📦️ User {user_id} uploaded order {number}");
                Ok(NewOrderOutcome::Created(order))
            },
            InsertOrderResult::AlreadyExists(order) if &order.user_id == user_id => {
                debug!("📦️ User {user_id} uploaded order {number} again");
                Ok(NewOrderOutcome::AlreadyUploaded(order))
            },
            InsertOrderResult::AlreadyExists(order) => {
                warn!("📦️ User {user_id} tried to upload order {number}, which belongs to {}", order.user_id);
                Err(LedgerApiError::OrderUploadedByAnotherUser(number))
            },
        }
    }

    /// All the user's orders, newest first, in their external representation.
    pub async fn user_orders(&self, user_id: &UserId) -> Result<Vec<OrderResponse>, LedgerApiError> {
        let orders = self.db.fetch_orders_for_user(user_id).await.map_err(LedgerApiError::database)?;
        Ok(orders.into_iter().map(OrderResponse::from).collect())
    }

    pub async fn order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, LedgerApiError> {
        self.db.fetch_order_by_number(number).await.map_err(LedgerApiError::database)
    }

    pub async fn balance(&self, user_id: &UserId) -> Result<Balance, LedgerApiError> {
        self.db.fetch_balance(user_id).await.map_err(LedgerApiError::database)
    }

    /// Spends `amount` points from the user's balance against the order number `raw_number`.
    ///
    /// The debit and the withdrawal record are written in one transaction, and the debit only happens if the current
    /// balance covers it. Concurrent withdrawals can therefore never push the balance below zero.
    pub async fn withdraw(
        &self,
        user_id: &UserId,
        raw_number: &str,
        amount: Points,
    ) -> Result<Withdrawal, LedgerApiError> {
        let number = raw_number.parse::<OrderNumber>()?;
        if !amount.is_positive() {
            return Err(LedgerApiError::NonPositiveAmount);
        }
        let result = self.db.insert_withdrawal(user_id, &number, amount).await.map_err(LedgerApiError::database)?;
        match result {
            InsertWithdrawalResult::Inserted(withdrawal) => {
                info!("💸️ User {user_id} withdrew {amount} against order {number}");
                self.call_withdrawal_hook(&withdrawal).await;
                Ok(withdrawal)
            },
            InsertWithdrawalResult::InsufficientFunds => {
                debug!("💸️ User {user_id} has insufficient funds to withdraw {amount}");
                Err(LedgerApiError::InsufficientFunds)
            },
            InsertWithdrawalResult::AlreadyExists => Err(LedgerApiError::WithdrawalAlreadyExists(number)),
        }
    }

    async fn call_withdrawal_hook(&self, withdrawal: &Withdrawal) {
        for emitter in &self.producers.withdrawal_processed_producer {
            trace!("💸️ Notifying withdrawal hook subscribers");
            emitter.publish_event(WithdrawalProcessedEvent::new(withdrawal.clone())).await;
        }
    }

    /// All the user's withdrawals, newest first, in their external representation.
    pub async fn withdrawals(&self, user_id: &UserId) -> Result<Vec<WithdrawalResponse>, LedgerApiError> {
        let withdrawals = self.db.fetch_withdrawals_for_user(user_id).await.map_err(LedgerApiError::database)?;
        Ok(withdrawals.into_iter().map(WithdrawalResponse::from).collect())
    }

    /// Recomputes the user's balance from the order and withdrawal rows and compares it with the materialised
    /// balance. An inconsistency is logged as an error and reported in the result. It is not treated as a failure.
    pub async fn audit_balance(&self, user_id: &UserId) -> Result<BalanceAudit, LedgerApiError> {
        let balance = self.db.fetch_balance(user_id).await.map_err(LedgerApiError::database)?;
        let credited = self.db.credited_sum_by_user(user_id).await.map_err(LedgerApiError::database)?;
        let withdrawn = self.db.withdrawn_sum_by_user(user_id).await.map_err(LedgerApiError::database)?;
        let audit = BalanceAudit {
            materialised_current: balance.current,
            materialised_withdrawn: balance.withdrawn,
            credited,
            withdrawn,
        };
        if !audit.is_consistent() {
            error!("🧾️ Balance for user {user_id} does not match its ledger rows: {audit:?}");
        }
        Ok(audit)
    }
}
