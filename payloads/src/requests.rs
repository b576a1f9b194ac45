use jiff::civil::Date;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{TripStatus, UserId};

pub const EMAIL_MAX_LEN: usize = 255;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const TRIP_NAME_MIN_LEN: usize = 2;
pub const TRIP_NAME_MAX_LEN: usize = 255;
pub const EXPENSE_TITLE_MAX_LEN: usize = 255;
pub const DECLINE_NOTE_MAX_LEN: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Register {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTrip {
    pub name: String,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub status: Option<TripStatus>,
}

/// Absent fields leave the stored value unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTrip {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_date: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub status: Option<TripStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteTripMember {
    pub username: String,
}

/// One entry of a simple split; `share` is the final amount the user owes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitInput {
    pub user_id: UserId,
    pub share: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateSimpleExpense {
    pub title: String,
    pub amount: Decimal,
    pub splits: Vec<SplitInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInput {
    pub name: String,
    pub price: Decimal,
    pub assigned_user_ids: Vec<UserId>,
}

/// Tip as either a percentage of the item subtotal or an absolute amount.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TipInput {
    Percent { value: Decimal },
    Amount { value: Decimal },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateItemizedExpense {
    pub title: String,
    pub items: Vec<ItemInput>,
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub tip: Option<TipInput>,
}

/// The expense payload is discriminated by the presence of `items`; the
/// `deny_unknown_fields` on both variants rejects ambiguous payloads that mix
/// the two shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreateExpense {
    Itemized(CreateItemizedExpense),
    Simple(CreateSimpleExpense),
}

/// The recipient is resolved from `to_user_id` when present, else from
/// `to_username`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayment {
    #[serde(default)]
    pub to_user_id: Option<UserId>,
    #[serde(default)]
    pub to_username: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinePayment {
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFriend {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReceipt {
    pub raw_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSearch {
    pub q: String,
}
