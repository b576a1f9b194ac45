pub mod activity;
pub mod auth;
pub mod expense;
pub mod friend;
pub mod payment;
pub mod receipt;
pub mod trip;
pub mod user;

use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get,
    http::StatusCode,
    http::header::{CACHE_CONTROL, EXPIRES, PRAGMA},
    middleware::DefaultHeaders,
    web,
};
use payloads::responses::ErrorBody;
use sqlx::PgPool;

use crate::store::{self, StoreError};

/// Every API response carries per-user financial data; mark it all
/// uncacheable. The health check lives outside this scope.
fn no_store_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add((CACHE_CONTROL, "no-store, no-cache, must-revalidate, private"))
        .add((PRAGMA, "no-cache"))
        .add((EXPIRES, "0"))
}

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("")
        .wrap(no_store_headers())
        .service(auth::register)
        .service(auth::login)
        .service(user::me)
        .service(user::search_users)
        .service(trip::create_trip)
        .service(trip::list_trips)
        .service(trip::get_trip)
        .service(trip::update_trip)
        .service(trip::invite_member)
        .service(trip::get_balances)
        .service(trip::list_invites)
        .service(trip::accept_invite)
        .service(trip::decline_invite)
        .service(expense::create_expense)
        .service(expense::list_expenses)
        .service(payment::create_payment)
        .service(payment::confirm_payment)
        .service(payment::decline_payment)
        .service(payment::delete_payment)
        .service(payment::pending_payments)
        .service(friend::list_friends)
        .service(friend::add_friend)
        .service(friend::remove_friend)
        .service(friend::list_friend_invites)
        .service(friend::accept_friend_invite)
        .service(friend::decline_friend_invite)
        .service(activity::activity_feed)
        .service(receipt::parse_receipt)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Forbidden")]
    Forbidden(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthError(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        let error = match self {
            // internal detail is never exposed
            Self::UnexpectedError(_) => self.to_string(),
            Self::AuthError(e)
            | Self::BadRequest(e)
            | Self::Forbidden(e)
            | Self::NotFound(e)
            | Self::Conflict(e) => e.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error,
            details: None,
        })
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(_) | StoreError::UnexpectedError(_) => {
                APIError::UnexpectedError(e.into())
            }
            StoreError::SessionNotFound => APIError::AuthError(e.into()),
            StoreError::MemberNotFound
            | StoreError::NotPaymentRecipient
            | StoreError::NotPaymentSender => APIError::Forbidden(e.into()),
            StoreError::UserNotFound
            | StoreError::TripNotFound
            | StoreError::PaymentNotFound
            | StoreError::InviteNotFound
            | StoreError::FriendshipNotFound => APIError::NotFound(e.into()),
            StoreError::AlreadyMember
            | StoreError::DuplicateInvite
            | StoreError::InviteNotPending
            | StoreError::PaymentNotPending
            | StoreError::AlreadyFriends
            | StoreError::DuplicateFriendInvite
            | StoreError::EmailTaken
            | StoreError::UsernameTaken
            | StoreError::NotUnique(_) => APIError::Conflict(e.into()),
            _ => APIError::BadRequest(e.into()),
        }
    }
}

async fn get_validated_member(
    user_id: &payloads::UserId,
    trip_id: &payloads::TripId,
    pool: &PgPool,
) -> Result<store::ValidatedMember, APIError> {
    let result = store::get_validated_member(user_id, trip_id, pool).await;
    match result {
        Ok(validated_member) => Ok(validated_member),
        Err(e) => Err(match e {
            // any failure to resolve the membership row means the caller
            // may not act on this trip
            StoreError::MemberNotFound => APIError::Forbidden(
                anyhow::Error::from(e)
                    .context("Couldn't validate trip membership"),
            ),
            _ => APIError::UnexpectedError(e.into()),
        }),
    }
}
