use actix_web::{HttpResponse, post, web};
use payloads::responses;
use sqlx::PgPool;

use crate::password::{
    AuthError, Credentials, NewUserDetails, create_user, validate_credentials,
};
use crate::store;
use crate::time::TimeSource;

use super::APIError;

#[tracing::instrument(
    skip(new_user_details, pool, time_source),
    fields(username = tracing::field::Empty, user_id = tracing::field::Empty)
)]
#[post("/auth/register")]
pub async fn register(
    new_user_details: web::Json<NewUserDetails>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    let user = create_user(new_user_details.0, &pool, &time_source).await?;
    Ok(HttpResponse::Ok().json(user.into_response()))
}

#[tracing::instrument(
    skip(credentials, pool, time_source),
    fields(email = tracing::field::Empty, user_id = tracing::field::Empty)
)]
#[post("/auth/login")]
pub async fn login(
    credentials: web::Json<Credentials>,
    pool: web::Data<PgPool>,
    time_source: web::Data<TimeSource>,
) -> Result<HttpResponse, APIError> {
    tracing::Span::current()
        .record("email", tracing::field::display(&credentials.email));
    match validate_credentials(credentials.0, &pool).await {
        Ok(user_id) => {
            tracing::Span::current()
                .record("user_id", tracing::field::display(&user_id));
            let session =
                store::create_session(&user_id, &pool, &time_source).await?;
            let user = store::read_user(&pool, &user_id).await?;
            Ok(HttpResponse::Ok().json(responses::LoginResponse {
                token: session.token,
                user: user.into_response(),
            }))
        }
        Err(e) => {
            let e = match e {
                AuthError::InvalidCredentials(_) => {
                    APIError::AuthError(e.into())
                }
                AuthError::UnexpectedError(_) => {
                    APIError::UnexpectedError(e.into())
                }
            };
            Err(e)
        }
    }
}
