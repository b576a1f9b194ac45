use actix_web::{HttpResponse, delete, get, post, web};
use payloads::{FriendInviteId, UserId, requests};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;
use crate::time::TimeSource;

use super::APIError;

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/friends")]
pub async fn list_friends(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let friends = store::list_friends(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(friends))
}

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/friends")]
pub async fn add_friend(
    user: AuthedUser,
    details: web::Json<requests::AddFriend>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let invite = store::send_friend_invite(
        &user.user_id,
        &details.username,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(invite))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[delete("/friends/{friend_id}")]
pub async fn remove_friend(
    user: AuthedUser,
    path: web::Path<UserId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    store::remove_friend(&user.user_id, &path, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Pending friend requests the caller has received.
#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/friends/invites")]
pub async fn list_friend_invites(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let invites =
        store::received_friend_invites(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(invites))
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/friends/invites/{invite_id}/accept")]
pub async fn accept_friend_invite(
    user: AuthedUser,
    path: web::Path<FriendInviteId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    store::respond_friend_invite(
        &user.user_id,
        &path,
        true,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/friends/invites/{invite_id}/decline")]
pub async fn decline_friend_invite(
    user: AuthedUser,
    path: web::Path<FriendInviteId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    store::respond_friend_invite(
        &user.user_id,
        &path,
        false,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}
