pub mod api_client;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decode helper for nullable DATE columns; `sqlx(try_from)` needs a named
/// type on the wire side.
#[cfg(feature = "use-sqlx")]
#[derive(Debug, Clone, Copy, sqlx::Type)]
#[sqlx(transparent)]
pub struct OptionalDate(pub Option<jiff_sqlx::Date>);

#[cfg(feature = "use-sqlx")]
impl TryFrom<OptionalDate> for Option<jiff::civil::Date> {
    type Error = std::convert::Infallible;

    fn try_from(value: OptionalDate) -> Result<Self, Self::Error> {
        Ok(value.0.map(|date| date.to_jiff()))
    }
}

/// Id type wrappers help ensure we don't mix up ids for different tables.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display,
    Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct UserId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct TripId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct TripInviteId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct ExpenseId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct ExpenseItemId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct PaymentId(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct FriendInviteId(pub Uuid);

/// Bearer token handed out at login; the wire representation is the bare
/// UUID string.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::Type), sqlx(transparent))]
pub struct SessionToken(pub Uuid);

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "trip_status", rename_all = "lowercase")
)]
pub enum TripStatus {
    Planning,
    Active,
    Completed,
    Cancelled,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "trip_role", rename_all = "lowercase")
)]
pub enum TripRole {
    Owner,
    Member,
}

impl TripRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner)
    }
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "payment_status", rename_all = "lowercase")
)]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Declined,
}

impl PaymentStatus {
    /// Terminal states are absorbing; only pending payments may transition.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Shared by trip invites and friend invites; `pending` is the only
/// non-terminal state.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(
    feature = "use-sqlx",
    derive(sqlx::Type),
    sqlx(type_name = "invite_status", rename_all = "lowercase")
)]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}
