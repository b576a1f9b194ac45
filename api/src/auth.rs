//! The bearer-token authorization gate.
//!
//! Every authenticated endpoint takes an [`AuthedUser`] extractor, which
//! resolves `Authorization: Bearer <token>` against the sessions table and
//! yields the caller's id. Missing, malformed, unknown, and expired tokens
//! are all a 401.

use std::future::Future;
use std::pin::Pin;

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use payloads::{SessionToken, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::routes::APIError;
use crate::store::{self, StoreError};
use crate::time::TimeSource;

pub struct AuthedUser {
    pub user_id: UserId,
}

impl FromRequest for AuthedUser {
    type Error = APIError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, APIError>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let token = bearer_token(&req)?;
            let pool =
                req.app_data::<web::Data<PgPool>>().ok_or_else(|| {
                    APIError::UnexpectedError(anyhow::anyhow!(
                        "database pool missing from app data"
                    ))
                })?;
            let time_source = req
                .app_data::<web::Data<TimeSource>>()
                .ok_or_else(|| {
                    APIError::UnexpectedError(anyhow::anyhow!(
                        "time source missing from app data"
                    ))
                })?;

            let user = store::session_user(&token, pool, time_source)
                .await
                .map_err(|e| match e {
                    StoreError::SessionNotFound => APIError::AuthError(
                        anyhow::anyhow!("Invalid or expired token"),
                    ),
                    other => APIError::from(other),
                })?;

            // the user_id is recorded here but attaches to the span for
            // the api route itself
            tracing::Span::current()
                .record("user_id", tracing::field::display(&user.id));

            Ok(AuthedUser { user_id: user.id })
        })
    }
}

fn bearer_token(req: &HttpRequest) -> Result<SessionToken, APIError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| {
            APIError::AuthError(anyhow::anyhow!(
                "Missing Authorization header"
            ))
        })?
        .to_str()
        .map_err(|_| {
            APIError::AuthError(anyhow::anyhow!(
                "Malformed Authorization header"
            ))
        })?;
    let token = header.strip_prefix("Bearer ").ok_or_else(|| {
        APIError::AuthError(anyhow::anyhow!(
            "Authorization header must use the Bearer scheme"
        ))
    })?;
    Uuid::parse_str(token.trim())
        .map(SessionToken)
        .map_err(|_| APIError::AuthError(anyhow::anyhow!("Malformed token")))
}
