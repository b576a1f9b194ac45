//! Friendships and directed friend requests.
//!
//! A friendship is two mirror rows written in one transaction; every
//! per-user query stays on the leading column of the primary key.

use jiff::Timestamp;
use jiff_sqlx::{Timestamp as SqlxTs, ToSqlx};
use payloads::{FriendInviteId, InviteStatus, UserId, responses};
use sqlx::{FromRow, PgPool};

use super::{
    FriendInvite, StoreError, get_user_by_username, get_user_identities,
    identity_for,
};
use crate::time::TimeSource;

#[derive(Debug, FromRow)]
struct FriendRow {
    friend_id: UserId,
    username: String,
    #[sqlx(try_from = "SqlxTs")]
    created_at: Timestamp,
}

pub async fn list_friends(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::Friend>, StoreError> {
    let rows = sqlx::query_as::<_, FriendRow>(
        "SELECT f.friend_id, u.username, f.created_at
        FROM friends f
        JOIN users u ON u.id = f.friend_id
        WHERE f.user_id = $1
        ORDER BY u.username ASC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| responses::Friend {
            user: responses::UserIdentity {
                id: row.friend_id,
                username: row.username,
            },
            since: row.created_at,
        })
        .collect())
}

async fn are_friends(
    a: &UserId,
    b: &UserId,
    pool: &PgPool,
) -> Result<bool, StoreError> {
    Ok(sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM friends WHERE user_id = $1 AND friend_id = $2
        );",
    )
    .bind(a)
    .bind(b)
    .fetch_one(pool)
    .await?)
}

/// Send a friend request by username. Rejected if the pair is already
/// friends or a request is pending in either direction.
pub async fn send_friend_invite(
    user_id: &UserId,
    username: &str,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::FriendInvite, StoreError> {
    let receiver = get_user_by_username(username, pool).await?;
    if receiver.id == *user_id {
        return Err(StoreError::SelfFriendRequest);
    }
    if are_friends(user_id, &receiver.id, pool).await? {
        return Err(StoreError::AlreadyFriends);
    }

    let pending_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM friend_invites
            WHERE status = 'pending'
              AND ((sender_id = $1 AND receiver_id = $2)
                OR (sender_id = $2 AND receiver_id = $1))
        );",
    )
    .bind(user_id)
    .bind(receiver.id)
    .fetch_one(pool)
    .await?;
    if pending_exists {
        return Err(StoreError::DuplicateFriendInvite);
    }

    let invite = sqlx::query_as::<_, FriendInvite>(
        "INSERT INTO friend_invites (sender_id, receiver_id, created_at, updated_at)
        VALUES ($1, $2, $3, $3) RETURNING *;",
    )
    .bind(user_id)
    .bind(receiver.id)
    .bind(time_source.now().to_sqlx())
    .fetch_one(pool)
    .await
    .map_err(|e| match StoreError::from(e) {
        // lost a race against an identical request
        StoreError::NotUnique(_) => StoreError::DuplicateFriendInvite,
        other => other,
    })?;

    friend_invite_response(invite, pool).await
}

async fn friend_invite_response(
    invite: FriendInvite,
    pool: &PgPool,
) -> Result<responses::FriendInvite, StoreError> {
    let identities =
        get_user_identities(&[invite.sender_id, invite.receiver_id], pool)
            .await?;
    Ok(responses::FriendInvite {
        id: invite.id,
        sender: identity_for(&identities, &invite.sender_id)?,
        receiver: identity_for(&identities, &invite.receiver_id)?,
        status: invite.status,
        created_at: invite.created_at,
    })
}

/// Pending requests addressed to the user.
pub async fn received_friend_invites(
    user_id: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::FriendInvite>, StoreError> {
    let invites = sqlx::query_as::<_, FriendInvite>(
        "SELECT * FROM friend_invites
        WHERE receiver_id = $1 AND status = 'pending'
        ORDER BY created_at DESC;",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut user_ids: Vec<UserId> = Vec::with_capacity(invites.len() * 2);
    for invite in &invites {
        user_ids.push(invite.sender_id);
        user_ids.push(invite.receiver_id);
    }
    let identities = get_user_identities(&user_ids, pool).await?;

    invites
        .into_iter()
        .map(|invite| {
            Ok(responses::FriendInvite {
                id: invite.id,
                sender: identity_for(&identities, &invite.sender_id)?,
                receiver: identity_for(&identities, &invite.receiver_id)?,
                status: invite.status,
                created_at: invite.created_at,
            })
        })
        .collect()
}

/// Accept or decline a friend request. Acceptance writes both symmetric
/// friendship rows in the transaction that flips the invite status.
pub async fn respond_friend_invite(
    user_id: &UserId,
    invite_id: &FriendInviteId,
    accept: bool,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<(), StoreError> {
    let invite = sqlx::query_as::<_, FriendInvite>(
        "SELECT * FROM friend_invites WHERE id = $1;",
    )
    .bind(invite_id)
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::InviteNotFound)?;

    // requests are only visible to their receiver
    if invite.receiver_id != *user_id {
        return Err(StoreError::InviteNotFound);
    }

    let new_status = if accept {
        InviteStatus::Accepted
    } else {
        InviteStatus::Declined
    };

    let mut tx = pool.begin().await?;

    let rows_updated = sqlx::query(
        "UPDATE friend_invites
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
            "INSERT INTO friends (user_id, friend_id, created_at)
            VALUES ($1, $2, $3), ($2, $1, $3);",
        )
        .bind(invite.sender_id)
        .bind(invite.receiver_id)
        .bind(time_source.now().to_sqlx())
        .execute(&mut *tx)
        .await;
        if let Err(e) = result.map_err(StoreError::from) {
            return Err(match e {
                StoreError::NotUnique(_) => StoreError::AlreadyFriends,
                other => other,
            });
        }
    }

    tx.commit().await?;

    Ok(())
}

/// Remove a friendship; both mirror rows go in one transaction.
pub async fn remove_friend(
    user_id: &UserId,
    friend_id: &UserId,
    pool: &PgPool,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;

    let rows_deleted = sqlx::query(
        "DELETE FROM friends
        WHERE (user_id = $1 AND friend_id = $2)
           OR (user_id = $2 AND friend_id = $1);",
    )
    .bind(user_id)
    .bind(friend_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if rows_deleted == 0 {
        return Err(StoreError::FriendshipNotFound);
    }

    tx.commit().await?;

    Ok(())
}
