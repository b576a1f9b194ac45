//! Folding the trip ledger into balances and settlement suggestions.

use std::collections::HashMap;

use payloads::{ExpenseId, TripId, UserId, responses};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::{StoreError, ValidatedMember, get_user_identities, identity_for};
use crate::money::{Cents, from_cents, to_cents};
use crate::settle::{self, ExpenseEntry, PaymentEntry};

#[derive(Debug, FromRow)]
struct ExpenseRow {
    id: ExpenseId,
    paid_by: UserId,
    total: Decimal,
}

#[derive(Debug, FromRow)]
struct SplitRow {
    expense_id: ExpenseId,
    user_id: UserId,
    share: Decimal,
}

#[derive(Debug, FromRow)]
struct ConfirmedPaymentRow {
    from_user_id: UserId,
    to_user_id: UserId,
    amount: Decimal,
}

/// Load the trip's ledger and fold it into per-member balances in cents,
/// in member join order. Only confirmed payments participate.
async fn fold_balances(
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<Vec<(UserId, Cents)>, StoreError> {
    let members: Vec<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM trip_members
        WHERE trip_id = $1 ORDER BY seq ASC;",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    let expense_rows = sqlx::query_as::<_, ExpenseRow>(
        "SELECT id, paid_by, total FROM expenses WHERE trip_id = $1;",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;
    let split_rows = sqlx::query_as::<_, SplitRow>(
        "SELECT s.expense_id, s.user_id, s.share
        FROM expense_splits s
        JOIN expenses e ON e.id = s.expense_id
        WHERE e.trip_id = $1;",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    let mut splits_by_expense: HashMap<ExpenseId, Vec<(UserId, Cents)>> =
        HashMap::new();
    for split in split_rows {
        splits_by_expense
            .entry(split.expense_id)
            .or_default()
            .push((split.user_id, to_cents(split.share)));
    }
    let expenses: Vec<ExpenseEntry> = expense_rows
        .into_iter()
        .map(|row| ExpenseEntry {
            paid_by: row.paid_by,
            total: to_cents(row.total),
            splits: splits_by_expense.remove(&row.id).unwrap_or_default(),
        })
        .collect();

    let payments: Vec<PaymentEntry> = sqlx::query_as::<_, ConfirmedPaymentRow>(
        "SELECT from_user_id, to_user_id, amount
        FROM payments WHERE trip_id = $1 AND status = 'confirmed';",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| PaymentEntry {
        from: row.from_user_id,
        to: row.to_user_id,
        amount: to_cents(row.amount),
    })
    .collect();

    Ok(settle::net_balances(&members, &expenses, &payments))
}

/// A single member's balance, for the trip list aggregates.
pub async fn user_balance(
    trip_id: &TripId,
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Decimal, StoreError> {
    let balances = fold_balances(trip_id, pool).await?;
    Ok(balances
        .iter()
        .find(|(member, _)| member == user_id)
        .map(|(_, cents)| from_cents(*cents))
        .unwrap_or(Decimal::ZERO))
}

/// Per-member balances with identities, for the trip detail view.
pub async fn balances_for_trip(
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<Vec<responses::UserBalance>, StoreError> {
    let balances = fold_balances(trip_id, pool).await?;
    let user_ids: Vec<UserId> =
        balances.iter().map(|(user_id, _)| *user_id).collect();
    let identities = get_user_identities(&user_ids, pool).await?;

    balances
        .into_iter()
        .map(|(user_id, cents)| {
            Ok(responses::UserBalance {
                user: identity_for(&identities, &user_id)?,
                balance: from_cents(cents),
            })
        })
        .collect()
}

/// Balances plus the planner's transfer suggestions and the confirmed
/// payment aggregates.
pub async fn trip_balances(
    actor: &ValidatedMember,
    pool: &PgPool,
) -> Result<responses::TripBalances, StoreError> {
    let balances = fold_balances(&actor.trip_id(), pool).await?;
    let transfers = settle::plan_transfers(&balances);

    let user_ids: Vec<UserId> =
        balances.iter().map(|(user_id, _)| *user_id).collect();
    let identities = get_user_identities(&user_ids, pool).await?;

    let user_balance = balances
        .iter()
        .find(|(user_id, _)| *user_id == actor.user_id())
        .map(|(_, cents)| from_cents(*cents))
        .unwrap_or(Decimal::ZERO);

    let (total_settled, payment_count): (Decimal, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0), COUNT(*)
        FROM payments WHERE trip_id = $1 AND status = 'confirmed';",
    )
    .bind(actor.trip_id())
    .fetch_one(pool)
    .await?;

    Ok(responses::TripBalances {
        user_balance,
        balances: balances
            .into_iter()
            .map(|(user_id, cents)| {
                Ok(responses::UserBalance {
                    user: identity_for(&identities, &user_id)?,
                    balance: from_cents(cents),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?,
        settlements: transfers
            .into_iter()
            .map(|transfer| {
                Ok(responses::Settlement {
                    from: identity_for(&identities, &transfer.from)?,
                    to: identity_for(&identities, &transfer.to)?,
                    amount: from_cents(transfer.amount),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?,
        total_settled,
        payment_count,
    })
}
