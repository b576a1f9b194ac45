use actix_web::{HttpResponse, get, web};
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;

use super::APIError;

/// Merged, time-ordered feed of expense and payment events across the
/// caller's trips.
#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/activity")]
pub async fn activity_feed(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let events = store::activity_feed(&user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(events))
}
