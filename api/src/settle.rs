//! Balance folding and the greedy settlement planner.
//!
//! Balances follow the sign convention positive = owed to the user,
//! negative = the user owes. Every expense and confirmed payment is
//! zero-sum, so the folded balances always sum to zero in cents.

use std::collections::HashMap;

use payloads::UserId;

use crate::money::Cents;

/// One expense as the balance fold sees it.
pub struct ExpenseEntry {
    pub paid_by: UserId,
    pub total: Cents,
    pub splits: Vec<(UserId, Cents)>,
}

/// One confirmed payment as the balance fold sees it.
pub struct PaymentEntry {
    pub from: UserId,
    pub to: UserId,
    pub amount: Cents,
}

/// Fold expenses and confirmed payments into per-member balances.
///
/// The output preserves `members` order (join order), which keeps the
/// planner deterministic when magnitudes tie. Members with no activity
/// appear with a zero balance.
pub fn net_balances(
    members: &[UserId],
    expenses: &[ExpenseEntry],
    confirmed_payments: &[PaymentEntry],
) -> Vec<(UserId, Cents)> {
    let mut balances: HashMap<UserId, Cents> =
        members.iter().map(|user_id| (*user_id, 0)).collect();

    for expense in expenses {
        *balances.entry(expense.paid_by).or_insert(0) += expense.total;
        for (user_id, share) in &expense.splits {
            *balances.entry(*user_id).or_insert(0) -= share;
        }
    }
    for payment in confirmed_payments {
        *balances.entry(payment.from).or_insert(0) += payment.amount;
        *balances.entry(payment.to).or_insert(0) -= payment.amount;
    }

    members
        .iter()
        .map(|user_id| (*user_id, balances[user_id]))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: UserId,
    pub to: UserId,
    pub amount: Cents,
}

/// Produce transfers that clear the given balances.
///
/// Creditors and debtors are sorted by magnitude descending (stable, so
/// equal magnitudes keep their input order) and matched head to head over
/// two index cursors; sub-cent slack is dropped. At most one transfer per
/// participant beyond the first, and deterministic for a given input.
pub fn plan_transfers(balances: &[(UserId, Cents)]) -> Vec<Transfer> {
    let mut creditors: Vec<(UserId, Cents)> = balances
        .iter()
        .filter(|(_, balance)| *balance >= 1)
        .copied()
        .collect();
    let mut debtors: Vec<(UserId, Cents)> = balances
        .iter()
        .filter(|(_, balance)| *balance <= -1)
        .map(|(user_id, balance)| (*user_id, -balance))
        .collect();
    creditors.sort_by(|a, b| b.1.cmp(&a.1));
    debtors.sort_by(|a, b| b.1.cmp(&a.1));

    let mut transfers = Vec::new();
    let mut ci = 0;
    let mut di = 0;
    while ci < creditors.len() && di < debtors.len() {
        let amount = creditors[ci].1.min(debtors[di].1);
        if amount >= 1 {
            transfers.push(Transfer {
                from: debtors[di].0,
                to: creditors[ci].0,
                amount,
            });
            creditors[ci].1 -= amount;
            debtors[di].1 -= amount;
        }
        if creditors[ci].1 < 1 {
            ci += 1;
        }
        if di < debtors.len() && debtors[di].1 < 1 {
            di += 1;
        }
    }

    transfers
}
