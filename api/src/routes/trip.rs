use actix_web::{HttpResponse, get, patch, post, web};
use payloads::{TripId, TripInviteId, requests};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_validated_member};

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/trips")]
pub async fn create_trip(
    user: AuthedUser,
    details: web::Json<requests::CreateTrip>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let trip =
        store::create_trip(&details, user.user_id, &pool, &time_source)
            .await?;
    let member =
        get_validated_member(&user.user_id, &trip.id, &pool).await?;
    let detail = store::trip_detail(&member, &pool).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/trips")]
pub async fn list_trips(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let trips = store::list_trips(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(trips))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/trips/{trip_id}")]
pub async fn get_trip(
    user: AuthedUser,
    path: web::Path<TripId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let detail = store::trip_detail(&member, &pool).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[patch("/trips/{trip_id}")]
pub async fn update_trip(
    user: AuthedUser,
    path: web::Path<TripId>,
    details: web::Json<requests::UpdateTrip>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    store::update_trip(&member, &details, &pool, &time_source).await?;
    let detail = store::trip_detail(&member, &pool).await?;
    Ok(HttpResponse::Ok().json(detail))
}

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/trips/{trip_id}/members")]
pub async fn invite_member(
    user: AuthedUser,
    path: web::Path<TripId>,
    details: web::Json<requests::InviteTripMember>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let invite =
        store::invite_member(&member, &details.username, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(invite))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/trips/{trip_id}/balances")]
pub async fn get_balances(
    user: AuthedUser,
    path: web::Path<TripId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let balances = store::trip_balances(&member, &pool).await?;
    Ok(HttpResponse::Ok().json(balances))
}

/// Pending trip invites the caller has received.
#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/invites")]
pub async fn list_invites(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let invites =
        store::received_trip_invites(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(invites))
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/invites/{invite_id}/accept")]
pub async fn accept_invite(
    user: AuthedUser,
    path: web::Path<TripInviteId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    store::respond_trip_invite(&user.user_id, &path, true, &pool, &time_source)
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/invites/{invite_id}/decline")]
pub async fn decline_invite(
    user: AuthedUser,
    path: web::Path<TripInviteId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    store::respond_trip_invite(
        &user.user_id,
        &path,
        false,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().finish())
}
