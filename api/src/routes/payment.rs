use actix_web::{HttpResponse, delete, get, post, web};
use payloads::{PaymentId, TripId, requests};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_validated_member};

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/trips/{trip_id}/payments")]
pub async fn create_payment(
    user: AuthedUser,
    path: web::Path<TripId>,
    details: web::Json<requests::CreatePayment>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let payment =
        store::create_payment(&member, &details, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[tracing::instrument(
    skip(user, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/payments/{payment_id}/confirm")]
pub async fn confirm_payment(
    user: AuthedUser,
    path: web::Path<PaymentId>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let payment =
        store::confirm_payment(&user.user_id, &path, &pool, &time_source)
            .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/payments/{payment_id}/decline")]
pub async fn decline_payment(
    user: AuthedUser,
    path: web::Path<PaymentId>,
    details: web::Json<requests::DeclinePayment>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let payment = store::decline_payment(
        &user.user_id,
        &path,
        &details.note,
        &pool,
        &time_source,
    )
    .await?;
    Ok(HttpResponse::Ok().json(payment))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[delete("/payments/{payment_id}")]
pub async fn delete_payment(
    user: AuthedUser,
    path: web::Path<PaymentId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    store::delete_payment(&user.user_id, &path, &pool).await?;
    Ok(HttpResponse::Ok().finish())
}

/// Pending payments where the caller is the receiver.
#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/payments/pending")]
pub async fn pending_payments(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let payments = store::pending_payments(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(payments))
}
