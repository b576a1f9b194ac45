//! The payment state machine: pending → confirmed | declined.
//!
//! Transitions are conditional updates with `status = 'pending'` in the
//! WHERE clause; the loser of a concurrent confirm/decline sees zero rows
//! affected and gets a conflict, never a second transition.

use jiff_sqlx::ToSqlx;
use payloads::{PaymentId, UserId, requests, responses};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{
    Payment, StoreError, ValidatedMember, get_user_by_username,
    get_user_identities, identity_for,
};
use crate::money;
use crate::time::TimeSource;

async fn payment_response(
    payment: Payment,
    pool: &PgPool,
) -> Result<responses::Payment, StoreError> {
    let identities = get_user_identities(
        &[payment.from_user_id, payment.to_user_id],
        pool,
    )
    .await?;
    Ok(responses::Payment {
        id: payment.id,
        trip_id: payment.trip_id,
        from: identity_for(&identities, &payment.from_user_id)?,
        to: identity_for(&identities, &payment.to_user_id)?,
        amount: payment.amount,
        method: payment.method,
        status: payment.status,
        decline_note: payment.decline_note,
        created_at: payment.created_at,
        updated_at: payment.updated_at,
    })
}

/// Record a pending payment from the caller to another trip member,
/// resolved by id or username.
pub async fn create_payment(
    actor: &ValidatedMember,
    details: &requests::CreatePayment,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Payment, StoreError> {
    let to_user_id = match (details.to_user_id, &details.to_username) {
        (Some(id), _) => id,
        (None, Some(username)) => {
            get_user_by_username(username, pool).await?.id
        }
        (None, None) => return Err(StoreError::RecipientMissing),
    };

    if to_user_id == actor.user_id() {
        return Err(StoreError::SelfPayment);
    }
    if details.amount <= Decimal::ZERO {
        return Err(StoreError::NonPositiveAmount);
    }
    if details.amount > money::max_amount() {
        return Err(StoreError::AmountTooLarge);
    }

    let is_member = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM trip_members WHERE trip_id = $1 AND user_id = $2
        );",
    )
    .bind(actor.trip_id())
    .bind(to_user_id)
    .fetch_one(pool)
    .await?;
    if !is_member {
        return Err(StoreError::RecipientNotMember);
    }

    let payment = sqlx::query_as::<_, Payment>(
        "INSERT INTO payments
            (trip_id, from_user_id, to_user_id, amount, method, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING *;",
    )
    .bind(actor.trip_id())
    .bind(actor.user_id())
    .bind(to_user_id)
    .bind(details.amount)
    .bind(&details.method)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await?;

    payment_response(payment, pool).await
}

async fn get_payment(
    payment_id: &PaymentId,
    pool: &PgPool,
) -> Result<Payment, StoreError> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1;")
        .bind(payment_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::PaymentNotFound)
}

/// Only the recipient may confirm, and only while the payment is pending.
pub async fn confirm_payment(
    user_id: &UserId,
    payment_id: &PaymentId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Payment, StoreError> {
    let payment = get_payment(payment_id, pool).await?;
    if payment.to_user_id != *user_id {
        return Err(StoreError::NotPaymentRecipient);
    }

    let updated = sqlx::query_as::<_, Payment>(
        "UPDATE payments
        SET status = 'confirmed', updated_at = $1
        WHERE id = $2 AND status = 'pending'
        RETURNING *;",
    )
    .bind(time_source.now().to_sqlx())
    .bind(payment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::PaymentNotPending)?;

    payment_response(updated, pool).await
}

/// Only the recipient may decline; the optional note is capped at 200
/// characters.
pub async fn decline_payment(
    user_id: &UserId,
    payment_id: &PaymentId,
    note: &Option<String>,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Payment, StoreError> {
    if let Some(note) = note
        && note.len() > requests::DECLINE_NOTE_MAX_LEN
    {
        return Err(StoreError::DeclineNoteTooLong);
    }

    let payment = get_payment(payment_id, pool).await?;
    if payment.to_user_id != *user_id {
        return Err(StoreError::NotPaymentRecipient);
    }

    let updated = sqlx::query_as::<_, Payment>(
        "UPDATE payments
        SET status = 'declined', decline_note = $1, updated_at = $2
        WHERE id = $3 AND status = 'pending'
        RETURNING *;",
    )
    .bind(note)
    .bind(time_source.now().to_sqlx())
    .bind(payment_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::PaymentNotPending)?;

    payment_response(updated, pool).await
}

/// Only the sender may delete, and only while pending; terminal payments
/// are immutable.
pub async fn delete_payment(
    user_id: &UserId,
    payment_id: &PaymentId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let payment = get_payment(payment_id, pool).await?;
    if payment.from_user_id != *user_id {
        return Err(StoreError::NotPaymentSender);
    }

    let rows_deleted = sqlx::query(
        "DELETE FROM payments WHERE id = $1 AND status = 'pending';",
    )
    .bind(payment_id)
    .execute(pool)
    .await?
    .rows_affected();
    if rows_deleted == 0 {
        return Err(StoreError::PaymentNotPending);
    }

    Ok(())
}

/// Pending payments awaiting the user's confirmation.
pub async fn pending_payments(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::Payment>, StoreError> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments
        WHERE to_user_id = $1 AND status = 'pending'
        ORDER BY created_at DESC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    collect_payment_responses(payments, pool).await
}

/// All payments of the trip (any status), newest first.
pub async fn trip_payments(
    actor: &ValidatedMember,
    pool: &PgPool,
) -> Result<Vec<responses::Payment>, StoreError> {
    let payments = sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE trip_id = $1 ORDER BY created_at DESC;",
    )
    .bind(actor.trip_id())
    .fetch_all(pool)
    .await?;

    collect_payment_responses(payments, pool).await
}

async fn collect_payment_responses(
    payments: Vec<Payment>,
    pool: &PgPool,
) -> Result<Vec<responses::Payment>, StoreError> {
    let mut user_ids: Vec<UserId> = Vec::with_capacity(payments.len() * 2);
    for payment in &payments {
        user_ids.push(payment.from_user_id);
        user_ids.push(payment.to_user_id);
    }
    let identities = get_user_identities(&user_ids, pool).await?;

    payments
        .into_iter()
        .map(|payment| {
            Ok(responses::Payment {
                id: payment.id,
                trip_id: payment.trip_id,
                from: identity_for(&identities, &payment.from_user_id)?,
                to: identity_for(&identities, &payment.to_user_id)?,
                amount: payment.amount,
                method: payment.method,
                status: payment.status,
                decline_note: payment.decline_note,
                created_at: payment.created_at,
                updated_at: payment.updated_at,
            })
        })
        .collect()
}
