//! Integer-cent money arithmetic.
//!
//! Amounts cross the wire and the database as two-decimal
//! [`rust_decimal::Decimal`] values, but every computation that must
//! preserve a total (allocation, balance folding, settlement planning)
//! happens on signed integer cents.

use rust_decimal::{Decimal, RoundingStrategy};

pub type Cents = i64;

/// Round to the nearest cent, half away from zero, and return integer cents.
///
/// Callers validate amounts against the NUMERIC(10,2) column range before
/// converting, so the i64 cast cannot truncate.
pub fn to_cents(amount: Decimal) -> Cents {
    let mut rounded = amount
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded.mantissa() as Cents
}

pub fn from_cents(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Whether two amounts agree within the ±0.01 tolerance used for summed
/// shares and user-facing "settled" checks.
pub fn within_cent(a: Decimal, b: Decimal) -> bool {
    (to_cents(a) - to_cents(b)).abs() <= 1
}

/// The largest amount a money column can hold; requests beyond it are
/// rejected up front.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_99, 2)
}
