//! Trips, membership, and the trip-invite state machine.

use jiff::civil::Date;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{
    InviteStatus, TripId, TripInviteId, TripRole, TripStatus, UserId,
    requests, responses,
};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use super::{
    StoreError, Trip, TripInvite, ValidatedMember, balance,
    get_user_by_username, read_user,
};
use crate::time::TimeSource;

fn validate_trip_name(name: &str) -> Result<(), StoreError> {
    if name.trim().len() < requests::TRIP_NAME_MIN_LEN {
        return Err(StoreError::TripNameTooShort);
    }
    if name.len() > requests::TRIP_NAME_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    Ok(())
}

fn validate_trip_dates(
    start_date: Option<Date>,
    end_date: Option<Date>,
) -> Result<(), StoreError> {
    if let (Some(start), Some(end)) = (start_date, end_date)
        && end < start
    {
        return Err(StoreError::TripDatesOutOfOrder);
    }
    Ok(())
}

/// Create a trip and add the creating user as its owner.
pub async fn create_trip(
    details: &requests::CreateTrip,
    user_id: UserId,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Trip, StoreError> {
    validate_trip_name(&details.name)?;
    validate_trip_dates(details.start_date, details.end_date)?;

    let mut tx = pool.begin().await?;

    let trip = sqlx::query_as::<_, Trip>(
        "INSERT INTO trips (name, start_date, end_date, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5) RETURNING *;",
    )
    .bind(&details.name)
    .bind(details.start_date.map(|d| d.to_sqlx()))
    .bind(details.end_date.map(|d| d.to_sqlx()))
    .bind(details.status.unwrap_or(TripStatus::Planning))
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO trip_members (trip_id, user_id, role, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4);",
    )
    .bind(trip.id)
    .bind(user_id)
    .bind(TripRole::Owner)
    .bind(time_source.now().to_sqlx())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(trip)
}

pub async fn get_trip(
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<Trip, StoreError> {
    sqlx::query_as::<_, Trip>("SELECT * FROM trips WHERE id = $1;")
        .bind(trip_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::TripNotFound)
}

/// Apply a partial update; absent fields keep their stored values. The
/// four-value status set is accepted here end-to-end.
pub async fn update_trip(
    actor: &ValidatedMember,
    details: &requests::UpdateTrip,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<Trip, StoreError> {
    let current = get_trip(&actor.trip_id(), pool).await?;

    let name = match &details.name {
        Some(name) => {
            validate_trip_name(name)?;
            name.clone()
        }
        None => current.name,
    };
    let start_date = details.start_date.or(current.start_date);
    let end_date = details.end_date.or(current.end_date);
    validate_trip_dates(start_date, end_date)?;
    let status = details.status.unwrap_or(current.status);

    Ok(sqlx::query_as::<_, Trip>(
        "UPDATE trips
        SET name = $1, start_date = $2, end_date = $3, status = $4, updated_at = $5
        WHERE id = $6 RETURNING *;",
    )
    .bind(&name)
    .bind(start_date.map(|d| d.to_sqlx()))
    .bind(end_date.map(|d| d.to_sqlx()))
    .bind(status)
    .bind(time_source.now().to_sqlx())
    .bind(actor.trip_id())
    .fetch_one(pool)
    .await?)
}

/// The caller's trips, newest first, with the aggregates the list view
/// shows: total spent, expense count, and the caller's own balance.
pub async fn list_trips(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::TripSummary>, StoreError> {
    let trips = sqlx::query_as::<_, Trip>(
        "SELECT t.* FROM trips t
        JOIN trip_members m ON m.trip_id = t.id
        WHERE m.user_id = $1
        ORDER BY t.created_at DESC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut summaries = Vec::with_capacity(trips.len());
    for trip in trips {
        let (total_amount, expense_count): (Decimal, i64) =
            sqlx::query_as(
                "SELECT COALESCE(SUM(total), 0), COUNT(*)
                FROM expenses WHERE trip_id = $1;",
            )
            .bind(trip.id)
            .fetch_one(pool)
            .await?;
        let user_balance =
            balance::user_balance(&trip.id, user_id, pool).await?;
        summaries.push(responses::TripSummary {
            id: trip.id,
            name: trip.name,
            start_date: trip.start_date,
            end_date: trip.end_date,
            status: trip.status,
            created_at: trip.created_at,
            total_amount,
            expense_count,
            user_balance,
        });
    }

    Ok(summaries)
}

#[derive(Debug, FromRow)]
struct MemberRow {
    user_id: UserId,
    username: String,
    role: TripRole,
}

/// Members in join order, which is also the deterministic order the
/// balance fold and planner rely on.
pub async fn trip_member_infos(
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<Vec<responses::TripMemberInfo>, StoreError> {
    let rows = sqlx::query_as::<_, MemberRow>(
        "SELECT m.user_id, u.username, m.role
        FROM trip_members m
        JOIN users u ON u.id = m.user_id
        WHERE m.trip_id = $1
        ORDER BY m.seq ASC;",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| responses::TripMemberInfo {
            user: responses::UserIdentity {
                id: row.user_id,
                username: row.username,
            },
            role: row.role,
        })
        .collect())
}

/// Full trip view: members, expenses, payments, and computed balances.
pub async fn trip_detail(
    actor: &ValidatedMember,
    pool: &PgPool,
) -> Result<responses::TripDetail, StoreError> {
    let trip = get_trip(&actor.trip_id(), pool).await?;
    let members = trip_member_infos(&trip.id, pool).await?;
    let expenses = super::expense::list_expenses(actor, pool).await?;
    let payments = super::payment::trip_payments(actor, pool).await?;
    let balances = balance::balances_for_trip(&trip.id, pool).await?;

    Ok(responses::TripDetail {
        id: trip.id,
        name: trip.name,
        start_date: trip.start_date,
        end_date: trip.end_date,
        status: trip.status,
        created_at: trip.created_at,
        members,
        expenses,
        payments,
        balances,
    })
}

/// Invite a user by username. The inviter must be a member, the invitee
/// must exist and not already be a member, and at most one invite per
/// (trip, invitee) may be pending.
pub async fn invite_member(
    actor: &ValidatedMember,
    username: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::TripInvite, StoreError> {
    let invitee = get_user_by_username(username, pool).await?;

    let already_member = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM trip_members WHERE trip_id = $1 AND user_id = $2
        );",
    )
    .bind(actor.trip_id())
    .bind(invitee.id)
    .fetch_one(pool)
    .await?;
    if already_member {
        return Err(StoreError::AlreadyMember);
    }

    let invite = sqlx::query_as::<_, TripInvite>(
        "INSERT INTO trip_invites (trip_id, inviter_id, invitee_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $4) RETURNING *;",
    )
    .bind(actor.trip_id())
    .bind(actor.user_id())
    .bind(invitee.id)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await
    .map_err(|e| match StoreError::from(e) {
        StoreError::NotUnique(_) => StoreError::DuplicateInvite,
        other => other,
    })?;

    let trip = get_trip(&actor.trip_id(), pool).await?;
    let inviter = read_user(pool, &actor.user_id()).await?;

    Ok(responses::TripInvite {
        id: invite.id,
        trip_id: invite.trip_id,
        trip_name: trip.name,
        inviter: inviter.identity(),
        status: invite.status,
        created_at: invite.created_at,
    })
}

#[derive(Debug, FromRow)]
struct ReceivedInviteRow {
    id: TripInviteId,
    trip_id: TripId,
    trip_name: String,
    inviter_id: UserId,
    inviter_username: String,
    status: InviteStatus,
    #[sqlx(try_from = "SqlxTs")]
    created_at: jiff::Timestamp,
}

/// Pending invites addressed to the user.
pub async fn received_trip_invites(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::TripInvite>, StoreError> {
    let rows = sqlx::query_as::<_, ReceivedInviteRow>(
        "SELECT
            i.id,
            i.trip_id,
            t.name AS trip_name,
            i.inviter_id,
            u.username AS inviter_username,
            i.status,
            i.created_at
        FROM trip_invites i
        JOIN trips t ON t.id = i.trip_id
        JOIN users u ON u.id = i.inviter_id
        WHERE i.invitee_id = $1 AND i.status = 'pending'
        ORDER BY i.created_at DESC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| responses::TripInvite {
            id: row.id,
            trip_id: row.trip_id,
            trip_name: row.trip_name,
            inviter: responses::UserIdentity {
                id: row.inviter_id,
                username: row.inviter_username,
            },
            status: row.status,
            created_at: row.created_at,
        })
        .collect())
}

/// Accept or decline an invite. Acceptance inserts the membership row in
/// the same transaction that flips the invite status; the pending guard in
/// the WHERE clause resolves concurrent responses to a single winner.
pub async fn respond_trip_invite(
    user_id: &UserId,
    invite_id: &TripInviteId,
    accept: bool,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let invite = sqlx::query_as::<_, TripInvite>(
        "SELECT * FROM trip_invites WHERE id = $1;",
    )
    .bind(invite_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::InviteNotFound)?;

    // invites are only visible to their invitee
    if invite.invitee_id != *user_id {
        return Err(StoreError::InviteNotFound);
    }

    let new_status = if accept {
        InviteStatus::Accepted
    } else {
        InviteStatus::Declined
    };

    let mut tx = pool.begin().await?;

    let rows_updated = sqlx::query(
        "UPDATE trip_invites
        SET status = $1, updated_at = $2
        WHERE id = $3 AND status = 'pending';",
    )
    .bind(new_status)
    .bind(time_source.now().to_sqlx())
    .bind(invite_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if rows_updated == 0 {
        return Err(StoreError::InviteNotPending);
    }

    if accept {
        let result = sqlx::query(
            "INSERT INTO trip_members (trip_id, user_id, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4);",
        )
        .bind(invite.trip_id)
        .bind(user_id)
        .bind(TripRole::Member)
        .bind(time_source.now().to_sqlx())
        .execute(&mut *tx)
        .await;
        if let Err(e) = result.map_err(StoreError::from) {
            return Err(match e {
                StoreError::NotUnique(_) => StoreError::AlreadyMember,
                other => other,
            });
        }
    }

    tx.commit().await?;

    Ok(())
}
