#![allow(dead_code)]

use loyalty_engine::{
    db_types::{OrderNumber, OrderStatusType, Points, UserId},
    LedgerDatabase,
    SqliteDatabase,
};

/// Builds a Luhn-valid order number by appending the check digit to `payload`.
pub fn order_number(payload: u64) -> OrderNumber {
    let digits = payload.to_string();
    let sum: u32 = digits
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| {
            // The check digit will occupy position 0, so the payload's last digit is doubled.
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    format!("{digits}{check}").parse().expect("generated order number must be valid")
}

/// Uploads `number` for `user` and immediately marks it processed with `amount`, crediting the balance.
pub async fn credit(db: &SqliteDatabase, user: &UserId, number: &OrderNumber, amount: Points) {
    db.create_order_if_absent(user, number).await.expect("Error creating order");
    db.update_order_terminal(number, OrderStatusType::Processed, amount)
        .await
        .expect("Error updating order")
        .expect("Order was not pending");
}

pub fn points(s: &str) -> Points {
    s.parse().expect("Invalid points amount")
}
