//! Database store for the trip expense-sharing API.
//!
//! ## Design Decisions
//!
//! ### Type Safety
//! - **Id newtypes with sqlx::Type**: every id type implements sqlx::Type,
//!   so it can be bound and decoded directly without touching the inner
//!   UUID value (`.0`).
//! - **ValidatedMember**: trip-scoped operations take a `ValidatedMember`,
//!   a value that can only be obtained by looking the membership row up.
//!   Handlers therefore cannot reach trip state for a non-member caller.
//!
//! ### Time Source Dependency
//! - Functions that stamp rows accept a `TimeSource` instead of reading the
//!   clock themselves, so time can be mocked during tests.
//!
//! ### Money
//! - Money columns are NUMERIC(10,2) and decode as `rust_decimal::Decimal`;
//!   share computation and balance folding convert to integer cents at the
//!   boundary (see `crate::money`) so totals are preserved exactly.
//!
//! ### State transitions
//! - Payment and invite transitions are conditional updates with the state
//!   precondition in the WHERE clause. Losing a race means zero rows
//!   affected and surfaces as a conflict, never a silent overwrite.

use std::collections::HashMap;

use jiff::Timestamp;
use jiff::civil::Date;
use jiff_sqlx::Timestamp as SqlxTs;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use payloads::{
    ExpenseId, ExpenseItemId, FriendInviteId, InviteStatus, OptionalDate,
    PaymentId, PaymentStatus, SessionToken, TripId, TripInviteId, TripRole,
    TripStatus, UserId, responses,
};

pub mod activity;
pub mod balance;
pub mod expense;
pub mod friend;
pub mod payment;
pub mod session;
pub mod trip;

pub use activity::*;
pub use balance::*;
pub use expense::*;
pub use friend::*;
pub use payment::*;
pub use session::*;
pub use trip::*;

/// A complete user row that stays in the backend.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

impl User {
    pub fn into_response(self) -> responses::User {
        responses::User {
            id: self.id,
            email: self.email,
            username: self.username,
            created_at: self.created_at,
        }
    }

    pub fn identity(&self) -> responses::UserIdentity {
        responses::UserIdentity {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: SessionToken,
    pub user_id: UserId,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub expires_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Trip {
    pub id: TripId,
    pub name: String,
    #[sqlx(try_from = "OptionalDate")]
    pub start_date: Option<Date>,
    #[sqlx(try_from = "OptionalDate")]
    pub end_date: Option<Date>,
    pub status: TripStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct TripMember {
    pub trip_id: TripId,
    pub user_id: UserId,
    pub role: TripRole,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

/// A type that can only exist if the interior TripMember has been validated
/// to exist.
pub struct ValidatedMember(TripMember);

impl ValidatedMember {
    pub fn trip_id(&self) -> TripId {
        self.0.trip_id
    }

    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }

    pub fn role(&self) -> TripRole {
        self.0.role
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TripInvite {
    pub id: TripInviteId,
    pub trip_id: TripId,
    pub inviter_id: UserId,
    pub invitee_id: UserId,
    pub status: InviteStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub paid_by: UserId,
    pub title: String,
    pub amount: Decimal,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseItem {
    pub id: ExpenseItemId,
    pub expense_id: ExpenseId,
    pub name: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseItemAssignment {
    pub item_id: ExpenseItemId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseSplit {
    pub expense_id: ExpenseId,
    pub user_id: UserId,
    pub share: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: PaymentId,
    pub trip_id: TripId,
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub amount: Decimal,
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub decline_note: Option<String>,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, FromRow)]
pub struct FriendInvite {
    pub id: FriendInviteId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: InviteStatus,
    #[sqlx(try_from = "SqlxTs")]
    pub created_at: Timestamp,
    #[sqlx(try_from = "SqlxTs")]
    pub updated_at: Timestamp,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Field too long")]
    FieldTooLong,
    #[error("Trip name must be at least 2 characters")]
    TripNameTooShort,
    #[error("Trip end date is before its start date")]
    TripDatesOutOfOrder,
    #[error("Expense title must not be empty")]
    EmptyTitle,
    #[error("Amount must be positive")]
    NonPositiveAmount,
    #[error("Amount exceeds the supported range")]
    AmountTooLarge,
    #[error("Expense must include at least one split")]
    EmptySplits,
    #[error("Each split share must be positive")]
    NonPositiveShare,
    #[error("A user appears more than once in the splits")]
    DuplicateSplitUser,
    #[error("Split shares do not sum to the amount")]
    SplitMismatch,
    #[error("Split user is not a member of this trip")]
    SplitUserNotMember,
    #[error("Itemized expense must include at least one item")]
    EmptyItems,
    #[error("Item name must not be empty")]
    EmptyItemName,
    #[error("Item price must be positive")]
    NonPositivePrice,
    #[error("Item must have at least one assigned user")]
    EmptyAssignees,
    #[error("A user is assigned to the same item twice")]
    DuplicateAssignee,
    #[error("Assignee is not a member of this trip")]
    AssigneeNotMember,
    #[error("Tax must not be negative")]
    NegativeTax,
    #[error("Tip must not be negative")]
    NegativeTip,
    #[error("Payment recipient is missing")]
    RecipientMissing,
    #[error("Recipient is not a member of this trip")]
    RecipientNotMember,
    #[error("Cannot create a payment to yourself")]
    SelfPayment,
    #[error("Decline note is too long")]
    DeclineNoteTooLong,
    #[error("Payment is no longer pending")]
    PaymentNotPending,
    #[error("Only the recipient may respond to a payment")]
    NotPaymentRecipient,
    #[error("Only the sender may delete a payment")]
    NotPaymentSender,
    #[error("Not a member of this trip")]
    MemberNotFound,
    #[error("Already a member of this trip")]
    AlreadyMember,
    #[error("An invite for this user is already pending")]
    DuplicateInvite,
    #[error("Invite is no longer pending")]
    InviteNotPending,
    #[error("Cannot send a friend request to yourself")]
    SelfFriendRequest,
    #[error("Already friends with this user")]
    AlreadyFriends,
    #[error("A friend request between you is already pending")]
    DuplicateFriendInvite,
    #[error("Friendship not found")]
    FriendshipNotFound,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Username is already taken")]
    UsernameTaken,
    #[error("User not found")]
    UserNotFound,
    #[error("Trip not found")]
    TripNotFound,
    #[error("Payment not found")]
    PaymentNotFound,
    #[error("Invite not found")]
    InviteNotFound,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Unique constraint violation")]
    NotUnique(#[source] sqlx::Error),
    #[error("Database error")]
    Database(#[source] sqlx::Error),
    #[error("Unexpected error")]
    UnexpectedError(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::NotUnique(e)
            }
            _ => StoreError::Database(e),
        }
    }
}

pub async fn read_user(
    pool: &PgPool,
    id: &UserId,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1;")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::UserNotFound)
}

pub async fn get_user_by_email(
    email: &str,
    pool: &PgPool,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1;")
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::UserNotFound)
}

pub async fn get_user_by_username(
    username: &str,
    pool: &PgPool,
) -> Result<User, StoreError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1;")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or(StoreError::UserNotFound)
}

/// Prefix search over usernames and emails for the invite/friend pickers.
/// The caller is excluded from the results.
pub async fn search_users(
    query: &str,
    exclude: &UserId,
    pool: &PgPool,
) -> Result<Vec<responses::UserIdentity>, StoreError> {
    let pattern = format!("{}%", query.replace('%', "\\%").replace('_', "\\_"));
    Ok(sqlx::query_as::<_, responses::UserIdentity>(
        "SELECT id, username FROM users
        WHERE (username ILIKE $1 OR email ILIKE $1) AND id != $2
        ORDER BY username
        LIMIT 20;",
    )
    .bind(pattern)
    .bind(exclude)
    .fetch_all(pool)
    .await?)
}

pub async fn get_validated_member(
    user_id: &UserId,
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<ValidatedMember, StoreError> {
    let Some(member) = sqlx::query_as::<_, TripMember>(
        "SELECT * FROM trip_members WHERE trip_id = $1 AND user_id = $2;",
    )
    .bind(trip_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    else {
        return Err(StoreError::MemberNotFound);
    };
    Ok(ValidatedMember(member))
}

/// Batch fetch user identities for a list of user IDs.
///
/// Returns a HashMap of user_id -> UserIdentity, useful for efficiently
/// attaching display information to multiple rows at once.
pub(crate) async fn get_user_identities(
    user_ids: &[UserId],
    pool: &PgPool,
) -> Result<HashMap<UserId, responses::UserIdentity>, StoreError> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let identities: Vec<responses::UserIdentity> = sqlx::query_as(
        "SELECT id, username FROM users WHERE id = ANY($1);",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;

    Ok(identities
        .into_iter()
        .map(|identity| (identity.id, identity))
        .collect())
}

pub(crate) fn identity_for(
    identities: &HashMap<UserId, responses::UserIdentity>,
    user_id: &UserId,
) -> Result<responses::UserIdentity, StoreError> {
    identities
        .get(user_id)
        .cloned()
        .ok_or(StoreError::UserNotFound)
}
