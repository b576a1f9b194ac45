//! The merged activity feed across a user's trips.

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTs;
use payloads::{
    ExpenseId, PaymentId, PaymentStatus, TripId, UserId, responses,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::StoreError;

const FEED_LIMIT: usize = 30;

#[derive(Debug, FromRow)]
struct ExpenseEventRow {
    id: ExpenseId,
    trip_id: TripId,
    trip_name: String,
    title: String,
    total: Decimal,
    paid_by: UserId,
    paid_by_username: String,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
}

#[derive(Debug, FromRow)]
struct PaymentEventRow {
    id: PaymentId,
    trip_id: TripId,
    trip_name: String,
    from_user_id: UserId,
    from_username: String,
    to_user_id: UserId,
    to_username: String,
    amount: Decimal,
    method: Option<String>,
    status: PaymentStatus,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
}

/// The most recent events across all trips the user is a member of:
/// expenses, and payments of any status. Declined payments stay visible;
/// the client decides styling.
pub async fn activity_feed(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::ActivityEvent>, StoreError> {
    let expense_rows = sqlx::query_as::<_, ExpenseEventRow>(
        "SELECT
            e.id,
            e.trip_id,
            t.name AS trip_name,
            e.title,
            e.total,
            e.paid_by,
            u.username AS paid_by_username,
            e.created_at
        FROM expenses e
        JOIN trips t ON t.id = e.trip_id
        JOIN users u ON u.id = e.paid_by
        WHERE e.trip_id IN (
            SELECT trip_id FROM trip_members WHERE user_id = $1
        )
        ORDER BY e.created_at DESC
        LIMIT $2;",
    )
    .bind(user_id)
    .bind(FEED_LIMIT as i64)
    .fetch_all(pool)
    .await?;

    let payment_rows = sqlx::query_as::<_, PaymentEventRow>(
        "SELECT
            p.id,
            p.trip_id,
            t.name AS trip_name,
            p.from_user_id,
            fu.username AS from_username,
            p.to_user_id,
            tu.username AS to_username,
            p.amount,
            p.method,
            p.status,
            p.created_at
        FROM payments p
        JOIN trips t ON t.id = p.trip_id
        JOIN users fu ON fu.id = p.from_user_id
        JOIN users tu ON tu.id = p.to_user_id
        WHERE p.trip_id IN (
            SELECT trip_id FROM trip_members WHERE user_id = $1
        )
        ORDER BY p.created_at DESC
        LIMIT $2;",
    )
    .bind(user_id)
    .bind(FEED_LIMIT as i64)
    .fetch_all(pool)
    .await?;

    let mut events: Vec<responses::ActivityEvent> = Vec::with_capacity(
        expense_rows.len() + payment_rows.len(),
    );
    events.extend(expense_rows.into_iter().map(|row| {
        responses::ActivityEvent::Expense {
            id: row.id,
            trip_id: row.trip_id,
            trip_name: row.trip_name,
            title: row.title,
            amount: row.total,
            paid_by: responses::UserIdentity {
                id: row.paid_by,
                username: row.paid_by_username,
            },
            created_at: row.created_at,
        }
    }));
    events.extend(payment_rows.into_iter().map(|row| {
        responses::ActivityEvent::Payment {
            id: row.id,
            trip_id: row.trip_id,
            trip_name: row.trip_name,
            from: responses::UserIdentity {
                id: row.from_user_id,
                username: row.from_username,
            },
            to: responses::UserIdentity {
                id: row.to_user_id,
                username: row.to_username,
            },
            amount: row.amount,
            method: row.method,
            status: row.status,
            created_at: row.created_at,
        }
    }));

    events.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    events.truncate(FEED_LIMIT);

    Ok(events)
}
