use actix_web::{HttpResponse, get, post, web};
use payloads::{TripId, requests};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;
use crate::time::TimeSource;

use super::{APIError, get_validated_member};

/// Create a simple or itemized expense; the payload shape is discriminated
/// by the presence of `items`.
#[tracing::instrument(
    skip(user, details, pool, time_source),
    fields(user_id = tracing::field::Empty)
)]
#[post("/trips/{trip_id}/expenses")]
pub async fn create_expense(
    user: AuthedUser,
    path: web::Path<TripId>,
    details: web::Json<requests::CreateExpense>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let expense =
        store::create_expense(&member, &details, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(expense))
}

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/trips/{trip_id}/expenses")]
pub async fn list_expenses(
    user: AuthedUser,
    path: web::Path<TripId>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let member = get_validated_member(&user.user_id, &path, &pool).await?;
    let expenses = store::list_expenses(&member, &pool).await?;
    Ok(HttpResponse::Ok().json(expenses))
}
