use actix_web::{HttpResponse, get, web};
use payloads::requests;
use sqlx::PgPool;

use crate::auth::AuthedUser;
use crate::store;

use super::APIError;

#[tracing::instrument(skip(user, pool), fields(user_id = tracing::field::Empty))]
#[get("/users/me")]
pub async fn me(
    user: AuthedUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let user = store::read_user(&pool, &user.user_id).await?;
    Ok(HttpResponse::Ok().json(user.into_response()))
}

#[tracing::instrument(
    skip(user, pool),
    fields(user_id = tracing::field::Empty)
)]
#[get("/users/search")]
pub async fn search_users(
    user: AuthedUser,
    query: web::Query<requests::UserSearch>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, APIError> {
    let results =
        store::search_users(&query.q, &user.user_id, &pool).await?;
    Ok(HttpResponse::Ok().json(results))
}
