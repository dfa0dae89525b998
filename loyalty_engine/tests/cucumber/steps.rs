use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points, UserId},
    ledger_objects::NewOrderOutcome,
    oracle::OracleStatus,
    reconciliation::PollOutcome,
    test_utils::scripted_oracle::ScriptedReply,
    BalanceManagement,
    LedgerApiError,
    OrderManagement,
};

use crate::cucumber::LedgerWorld;

fn points(s: &str) -> Points {
    Points::from_str(s).expect("Not a valid points amount")
}

fn number(s: &str) -> OrderNumber {
    OrderNumber::from_str(s).expect("Not a valid order number")
}

#[when(expr = "user '{word}' uploads order {word}")]
async fn upload_order(world: &mut LedgerWorld, user: String, raw_number: String) {
    let result = world.api().create_order(&UserId::from(user), &raw_number).await;
    world.last_upload = Some(result);
}

#[then("the upload is accepted as new")]
async fn upload_accepted(world: &mut LedgerWorld) {
    let result = world.last_upload.as_ref().expect("Nothing was uploaded");
    assert!(matches!(result, Ok(NewOrderOutcome::Created(_))), "Unexpected upload result: {result:?}");
}

#[then("the upload is reported as already uploaded")]
async fn upload_repeated(world: &mut LedgerWorld) {
    let result = world.last_upload.as_ref().expect("Nothing was uploaded");
    assert!(matches!(result, Ok(NewOrderOutcome::AlreadyUploaded(_))), "Unexpected upload result: {result:?}");
}

#[then("the upload is rejected because the order belongs to another user")]
async fn upload_conflict(world: &mut LedgerWorld) {
    let result = world.last_upload.as_ref().expect("Nothing was uploaded");
    assert!(
        matches!(result, Err(LedgerApiError::OrderUploadedByAnotherUser(_))),
        "Unexpected upload result: {result:?}"
    );
}

#[then("the upload is rejected as an invalid order number")]
async fn upload_invalid(world: &mut LedgerWorld) {
    let result = world.last_upload.as_ref().expect("Nothing was uploaded");
    assert!(matches!(result, Err(LedgerApiError::InvalidOrderNumber(_))), "Unexpected upload result: {result:?}");
}

#[when(expr = "the accrual system awards {word} points for order {word}")]
async fn oracle_awards(world: &mut LedgerWorld, amount: String, raw_number: String) {
    world.system().oracle.script(&number(&raw_number), vec![ScriptedReply::Processed(points(&amount))]);
}

#[when(expr = "the accrual system is still processing order {word}")]
async fn oracle_processing(world: &mut LedgerWorld, raw_number: String) {
    world.system().oracle.script(&number(&raw_number), vec![ScriptedReply::Status(OracleStatus::Processing)]);
}

#[when(expr = "the accrual system rejects order {word}")]
async fn oracle_rejects(world: &mut LedgerWorld, raw_number: String) {
    world.system().oracle.script(&number(&raw_number), vec![ScriptedReply::Status(OracleStatus::Invalid)]);
}

#[when(expr = "the accrual system cannot be reached for order {word}")]
async fn oracle_unreachable(world: &mut LedgerWorld, raw_number: String) {
    world.system().oracle.script(&number(&raw_number), vec![ScriptedReply::Unreachable]);
}

#[when(expr = "order {word} is reconciled")]
async fn reconcile(world: &mut LedgerWorld, raw_number: String) {
    let result = world.system().poller.poll_order(&number(&raw_number)).await;
    world.last_poll = Some(result);
}

#[then("reconciliation fails")]
async fn reconciliation_failed(world: &mut LedgerWorld) {
    let result = world.last_poll.as_ref().expect("Nothing was reconciled");
    assert!(result.is_err(), "Expected reconciliation to fail, got {result:?}");
}

#[then("reconciliation gives up without a verdict")]
async fn reconciliation_exhausted(world: &mut LedgerWorld) {
    let result = world.last_poll.as_ref().expect("Nothing was reconciled");
    assert!(matches!(result, Ok(PollOutcome::Exhausted { .. })), "Unexpected poll result: {result:?}");
}

#[then(expr = "order {word} has status {word}")]
async fn check_order_status(world: &mut LedgerWorld, raw_number: String, status: String) {
    let expected = OrderStatusType::from_str(&status).expect("Not a valid order status");
    let order = world
        .db()
        .fetch_order_by_number(&number(&raw_number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.status, expected, "Order status is incorrect");
}

#[then(expr = "order {word} has an accrual of {word} points")]
async fn check_order_accrual(world: &mut LedgerWorld, raw_number: String, amount: String) {
    let order = world
        .db()
        .fetch_order_by_number(&number(&raw_number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.accrual, points(&amount), "Order accrual is incorrect");
}

#[then(expr = "order {word} is owned by '{word}'")]
async fn check_order_owner(world: &mut LedgerWorld, raw_number: String, user: String) {
    let order = world
        .db()
        .fetch_order_by_number(&number(&raw_number))
        .await
        .expect("Error fetching order")
        .expect("Order does not exist");
    assert_eq!(order.user_id, UserId::from(user), "Order owner is incorrect");
}

#[then(expr = "user '{word}' has {int} order(s)")]
async fn check_order_count(world: &mut LedgerWorld, user: String, count: usize) {
    let orders = world.api().user_orders(&UserId::from(user)).await.expect("Error fetching orders");
    assert_eq!(orders.len(), count, "Order count is incorrect");
}

#[when(expr = "user '{word}' withdraws {word} points against order {word}")]
async fn withdraw(world: &mut LedgerWorld, user: String, amount: String, raw_number: String) {
    let result = world.api().withdraw(&UserId::from(user), &raw_number, points(&amount)).await;
    world.last_withdrawal = Some(result);
}

#[then("the withdrawal succeeds")]
async fn withdrawal_succeeds(world: &mut LedgerWorld) {
    let result = world.last_withdrawal.as_ref().expect("No withdrawal was attempted");
    assert!(result.is_ok(), "Unexpected withdrawal result: {result:?}");
}

#[then("the withdrawal fails with insufficient funds")]
async fn withdrawal_insufficient(world: &mut LedgerWorld) {
    let result = world.last_withdrawal.as_ref().expect("No withdrawal was attempted");
    assert_eq!(result, &Err(LedgerApiError::InsufficientFunds));
}

#[then("the withdrawal is rejected as a duplicate")]
async fn withdrawal_duplicate(world: &mut LedgerWorld) {
    let result = world.last_withdrawal.as_ref().expect("No withdrawal was attempted");
    assert!(matches!(result, Err(LedgerApiError::WithdrawalAlreadyExists(_))), "Unexpected result: {result:?}");
}

#[then("the withdrawal is rejected as an invalid order number")]
async fn withdrawal_invalid(world: &mut LedgerWorld) {
    let result = world.last_withdrawal.as_ref().expect("No withdrawal was attempted");
    assert!(matches!(result, Err(LedgerApiError::InvalidOrderNumber(_))), "Unexpected result: {result:?}");
}

#[then(expr = "user '{word}' has {int} withdrawal(s)")]
async fn check_withdrawal_count(world: &mut LedgerWorld, user: String, count: usize) {
    let withdrawals = world.api().withdrawals(&UserId::from(user)).await.expect("Error fetching withdrawals");
    assert_eq!(withdrawals.len(), count, "Withdrawal count is incorrect");
}

#[then(expr = "user '{word}' has a current balance of {word} points")]
async fn check_current_balance(world: &mut LedgerWorld, user: String, amount: String) {
    let balance = world.db().fetch_balance(&UserId::from(user)).await.expect("Error fetching balance");
    assert_eq!(balance.current, points(&amount), "Current balance is incorrect");
}

#[then(expr = "user '{word}' has withdrawn {word} points")]
async fn check_withdrawn(world: &mut LedgerWorld, user: String, amount: String) {
    let balance = world.db().fetch_balance(&UserId::from(user)).await.expect("Error fetching balance");
    assert_eq!(balance.withdrawn, points(&amount), "Withdrawn total is incorrect");
}

#[then(expr = "the ledger for user '{word}' is consistent")]
async fn check_ledger(world: &mut LedgerWorld, user: String) {
    let audit = world.api().audit_balance(&UserId::from(user)).await.expect("Error auditing balance");
    assert!(audit.is_consistent(), "Balance does not match the ledger: {audit:?}");
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut LedgerWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}
