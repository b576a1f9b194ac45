use jiff::Timestamp;
use jiff::civil::Date;
#[cfg(feature = "use-sqlx")]
use jiff_sqlx::Timestamp as SqlxTs;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    ExpenseId, ExpenseItemId, FriendInviteId, InviteStatus, PaymentId,
    PaymentStatus, SessionToken, TripId, TripInviteId, TripRole, TripStatus,
    UserId,
};

/// Public projection of a user; never carries credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[cfg_attr(feature = "use-sqlx", sqlx(try_from = "SqlxTs"))]
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: SessionToken,
    pub user: User,
}

/// Display information for referring to another user in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "use-sqlx", derive(sqlx::FromRow))]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub id: TripId,
    pub name: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: TripStatus,
    pub created_at: Timestamp,
    /// Sum of all expense totals in the trip.
    pub total_amount: Decimal,
    pub expense_count: i64,
    /// The caller's signed balance; positive means others owe them.
    pub user_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripMemberInfo {
    pub user: UserIdentity,
    pub role: TripRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDetail {
    pub id: TripId,
    pub name: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub status: TripStatus,
    pub created_at: Timestamp,
    pub members: Vec<TripMemberInfo>,
    pub expenses: Vec<Expense>,
    pub payments: Vec<Payment>,
    pub balances: Vec<UserBalance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseItem {
    pub id: ExpenseItemId,
    pub name: String,
    pub price: Decimal,
    pub assigned_user_ids: Vec<UserId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseSplit {
    pub user: UserIdentity,
    pub share: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub trip_id: TripId,
    pub paid_by: UserIdentity,
    pub title: String,
    /// Mirrors `total`; kept for older clients.
    pub amount: Decimal,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub created_at: Timestamp,
    /// Empty for simple splits.
    pub items: Vec<ExpenseItem>,
    pub splits: Vec<ExpenseSplit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub trip_id: TripId,
    pub from: UserIdentity,
    pub to: UserIdentity,
    pub amount: Decimal,
    pub method: Option<String>,
    pub status: PaymentStatus,
    pub decline_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBalance {
    pub user: UserIdentity,
    pub balance: Decimal,
}

/// One suggested transfer from the settlement planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub from: UserIdentity,
    pub to: UserIdentity,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripBalances {
    /// The caller's own balance, also present in `balances`.
    pub user_balance: Decimal,
    pub balances: Vec<UserBalance>,
    pub settlements: Vec<Settlement>,
    /// Sum of confirmed payment amounts in the trip.
    pub total_settled: Decimal,
    /// Number of confirmed payments in the trip.
    pub payment_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripInvite {
    pub id: TripInviteId,
    pub trip_id: TripId,
    pub trip_name: String,
    pub inviter: UserIdentity,
    pub status: InviteStatus,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub user: UserIdentity,
    pub since: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendInvite {
    pub id: FriendInviteId,
    pub sender: UserIdentity,
    pub receiver: UserIdentity,
    pub status: InviteStatus,
    pub created_at: Timestamp,
}

/// Feed entry; the caller personalizes rendering from the embedded ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActivityEvent {
    #[serde(rename_all = "camelCase")]
    Expense {
        id: ExpenseId,
        trip_id: TripId,
        trip_name: String,
        title: String,
        amount: Decimal,
        paid_by: UserIdentity,
        created_at: Timestamp,
    },
    #[serde(rename_all = "camelCase")]
    Payment {
        id: PaymentId,
        trip_id: TripId,
        trip_name: String,
        from: UserIdentity,
        to: UserIdentity,
        amount: Decimal,
        method: Option<String>,
        status: PaymentStatus,
        created_at: Timestamp,
    },
}

impl ActivityEvent {
    pub fn created_at(&self) -> Timestamp {
        match self {
            Self::Expense { created_at, .. }
            | Self::Payment { created_at, .. } => *created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItem {
    pub name: String,
    pub price: Decimal,
}

/// Best-effort structured view of an OCR'd receipt; never an error, issues
/// surface through `warnings` and `confidence`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReceipt {
    pub merchant_name: String,
    pub transaction_date: Option<String>,
    pub items: Vec<ReceiptItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub warnings: Vec<String>,
    pub confidence: f64,
    pub source: String,
}

/// Error body shape shared by all endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
