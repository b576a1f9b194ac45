//! The expense engine: simple splits and itemized receipts with tax/tip
//! allocation, persisted atomically with their splits.

use std::collections::{HashMap, HashSet};

use jiff_sqlx::ToSqlx;
use payloads::{
    ExpenseId, TripId, UserId,
    requests::{
        self, CreateExpense, CreateItemizedExpense, CreateSimpleExpense,
        TipInput,
    },
    responses,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::{
    Expense, ExpenseItem, ExpenseItemAssignment, ExpenseSplit, StoreError,
    ValidatedMember, get_user_identities, identity_for,
};
use crate::allocate::allocate_proportionally;
use crate::money::{self, Cents};
use crate::time::TimeSource;

pub async fn create_expense(
    actor: &ValidatedMember,
    payload: &CreateExpense,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Expense, StoreError> {
    match payload {
        CreateExpense::Simple(details) => {
            create_simple(actor, details, pool, time_source).await
        }
        CreateExpense::Itemized(details) => {
            create_itemized(actor, details, pool, time_source).await
        }
    }
}

async fn trip_member_ids(
    trip_id: &TripId,
    pool: &PgPool,
) -> Result<HashSet<UserId>, StoreError> {
    let ids: Vec<UserId> = sqlx::query_scalar(
        "SELECT user_id FROM trip_members WHERE trip_id = $1;",
    )
    .bind(trip_id)
    .fetch_all(pool)
    .await?;
    Ok(ids.into_iter().collect())
}

fn validate_title(title: &str) -> Result<(), StoreError> {
    if title.trim().is_empty() {
        return Err(StoreError::EmptyTitle);
    }
    if title.len() > requests::EXPENSE_TITLE_MAX_LEN {
        return Err(StoreError::FieldTooLong);
    }
    Ok(())
}

fn positive_cents(amount: Decimal) -> Result<Cents, StoreError> {
    if amount <= Decimal::ZERO {
        return Err(StoreError::NonPositiveAmount);
    }
    if amount > money::max_amount() {
        return Err(StoreError::AmountTooLarge);
    }
    Ok(money::to_cents(amount))
}

async fn create_simple(
    actor: &ValidatedMember,
    details: &CreateSimpleExpense,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Expense, StoreError> {
    validate_title(&details.title)?;
    let amount = positive_cents(details.amount)?;
    if details.splits.is_empty() {
        return Err(StoreError::EmptySplits);
    }

    let members = trip_member_ids(&actor.trip_id(), pool).await?;
    let mut seen = HashSet::new();
    let mut splits: Vec<(UserId, Cents)> =
        Vec::with_capacity(details.splits.len());
    for split in &details.splits {
        if split.share <= Decimal::ZERO {
            return Err(StoreError::NonPositiveShare);
        }
        if split.share > money::max_amount() {
            return Err(StoreError::AmountTooLarge);
        }
        if !members.contains(&split.user_id) {
            return Err(StoreError::SplitUserNotMember);
        }
        if !seen.insert(split.user_id) {
            return Err(StoreError::DuplicateSplitUser);
        }
        splits.push((split.user_id, money::to_cents(split.share)));
    }

    let share_sum: Cents = splits.iter().map(|(_, c)| c).sum();
    if (share_sum - amount).abs() > 1 {
        return Err(StoreError::SplitMismatch);
    }
    // fold the accepted ≤1¢ residue into the largest share so the splits
    // sum to the total exactly
    let delta = amount - share_sum;
    if delta != 0 {
        let largest = largest_share_index(&splits);
        splits[largest].1 += delta;
    }

    persist_expense(
        actor,
        &details.title,
        ExpenseAmounts {
            subtotal: amount,
            tax: 0,
            tip: 0,
            total: amount,
        },
        Vec::new(),
        splits,
        pool,
        time_source,
    )
    .await
}

struct ItemPlan {
    name: String,
    price: Cents,
    assignees: Vec<UserId>,
}

struct ExpenseAmounts {
    subtotal: Cents,
    tax: Cents,
    tip: Cents,
    total: Cents,
}

fn largest_share_index(shares: &[(UserId, Cents)]) -> usize {
    let mut largest = 0;
    for (i, (_, share)) in shares.iter().enumerate() {
        if *share > shares[largest].1 {
            largest = i;
        }
    }
    largest
}

async fn create_itemized(
    actor: &ValidatedMember,
    details: &CreateItemizedExpense,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Expense, StoreError> {
    validate_title(&details.title)?;
    if details.items.is_empty() {
        return Err(StoreError::EmptyItems);
    }
    if details.tax < Decimal::ZERO {
        return Err(StoreError::NegativeTax);
    }
    if details.tax > money::max_amount() {
        return Err(StoreError::AmountTooLarge);
    }

    let members = trip_member_ids(&actor.trip_id(), pool).await?;

    // per-user item subtotals, keyed in first-appearance order so penny
    // distribution is deterministic
    let mut order: Vec<UserId> = Vec::new();
    let mut item_subtotals: HashMap<UserId, Cents> = HashMap::new();
    let mut plans: Vec<ItemPlan> = Vec::with_capacity(details.items.len());

    for item in &details.items {
        if item.name.trim().is_empty() {
            return Err(StoreError::EmptyItemName);
        }
        if item.name.len() > requests::EXPENSE_TITLE_MAX_LEN {
            return Err(StoreError::FieldTooLong);
        }
        if item.price <= Decimal::ZERO {
            return Err(StoreError::NonPositivePrice);
        }
        if item.price > money::max_amount() {
            return Err(StoreError::AmountTooLarge);
        }
        if item.assigned_user_ids.is_empty() {
            return Err(StoreError::EmptyAssignees);
        }

        let mut item_seen = HashSet::new();
        for user_id in &item.assigned_user_ids {
            if !members.contains(user_id) {
                return Err(StoreError::AssigneeNotMember);
            }
            if !item_seen.insert(*user_id) {
                return Err(StoreError::DuplicateAssignee);
            }
        }

        // divide the item price evenly; the first (price mod n) assignees
        // absorb the leftover cents, in input order
        let price = money::to_cents(item.price);
        let assignee_count = item.assigned_user_ids.len() as Cents;
        let base = price / assignee_count;
        let leftover = price - base * assignee_count;
        for (k, user_id) in item.assigned_user_ids.iter().enumerate() {
            let share = base + if (k as Cents) < leftover { 1 } else { 0 };
            if !item_subtotals.contains_key(user_id) {
                order.push(*user_id);
            }
            *item_subtotals.entry(*user_id).or_insert(0) += share;
        }

        plans.push(ItemPlan {
            name: item.name.clone(),
            price,
            assignees: item.assigned_user_ids.clone(),
        });
    }

    let subtotal: Cents = item_subtotals.values().sum();
    let tax = money::to_cents(details.tax);
    let tip = match details.tip {
        None => 0,
        Some(TipInput::Amount { value }) => {
            if value < Decimal::ZERO {
                return Err(StoreError::NegativeTip);
            }
            if value > money::max_amount() {
                return Err(StoreError::AmountTooLarge);
            }
            money::to_cents(value)
        }
        Some(TipInput::Percent { value }) => {
            if value < Decimal::ZERO {
                return Err(StoreError::NegativeTip);
            }
            let tip_amount =
                value / Decimal::ONE_HUNDRED * money::from_cents(subtotal);
            if tip_amount > money::max_amount() {
                return Err(StoreError::AmountTooLarge);
            }
            money::to_cents(tip_amount)
        }
    };

    let weights: Vec<(UserId, Cents)> = order
        .iter()
        .map(|user_id| (*user_id, item_subtotals[user_id]))
        .collect();
    let tax_alloc = allocate_proportionally(&weights, tax);
    let tip_alloc = allocate_proportionally(&weights, tip);

    let mut shares: Vec<(UserId, Cents)> = weights
        .iter()
        .zip(&tax_alloc)
        .zip(&tip_alloc)
        .map(|(((user_id, item_share), (_, tax_share)), (_, tip_share))| {
            (*user_id, item_share + tax_share + tip_share)
        })
        .collect();

    let total = subtotal + tax + tip;
    let share_sum: Cents = shares.iter().map(|(_, c)| c).sum();
    let delta = total - share_sum;
    if delta != 0 {
        // any residual lands on the largest item subtotal
        let largest = largest_share_index(&weights);
        shares[largest].1 += delta;
    }

    persist_expense(
        actor,
        &details.title,
        ExpenseAmounts {
            subtotal,
            tax,
            tip,
            total,
        },
        plans,
        shares,
        pool,
        time_source,
    )
    .await
}

/// Write the expense with its items, assignments, and splits in a single
/// transaction; no partial row set can ever be observed.
async fn persist_expense(
    actor: &ValidatedMember,
    title: &str,
    amounts: ExpenseAmounts,
    items: Vec<ItemPlan>,
    splits: Vec<(UserId, Cents)>,
    pool: &PgPool,
    time_source: &TimeSource,
) -> Result<responses::Expense, StoreError> {
    let share_sum: Cents = splits.iter().map(|(_, c)| c).sum();
    if share_sum != amounts.total || amounts.total <= 0 {
        // an allocation bug, not a client error
        return Err(StoreError::UnexpectedError(anyhow::anyhow!(
            "expense shares sum to {share_sum} cents against a total of {} cents",
            amounts.total
        )));
    }

    let mut tx = pool.begin().await?;

    let expense = sqlx::query_as::<_, Expense>(
        "INSERT INTO expenses
            (trip_id, paid_by, title, amount, subtotal, tax, tip, total, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $4, $8) RETURNING *;",
    )
    .bind(actor.trip_id())
    .bind(actor.user_id())
    .bind(title)
    .bind(money::from_cents(amounts.total))
    .bind(money::from_cents(amounts.subtotal))
    .bind(money::from_cents(amounts.tax))
    .bind(money::from_cents(amounts.tip))
    .bind(time_source.now().to_sqlx())
    .fetch_one(&mut *tx)
    .await?;

    let mut item_responses = Vec::with_capacity(items.len());
    for plan in &items {
        let item = sqlx::query_as::<_, ExpenseItem>(
            "INSERT INTO expense_items (expense_id, name, price)
            VALUES ($1, $2, $3) RETURNING *;",
        )
        .bind(expense.id)
        .bind(&plan.name)
        .bind(money::from_cents(plan.price))
        .fetch_one(&mut *tx)
        .await?;
        for user_id in &plan.assignees {
            sqlx::query(
                "INSERT INTO expense_item_assignments (item_id, user_id)
                VALUES ($1, $2);",
            )
            .bind(item.id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        item_responses.push(responses::ExpenseItem {
            id: item.id,
            name: item.name,
            price: item.price,
            assigned_user_ids: plan.assignees.clone(),
        });
    }

    for (user_id, share) in &splits {
        sqlx::query(
            "INSERT INTO expense_splits (expense_id, user_id, share)
            VALUES ($1, $2, $3);",
        )
        .bind(expense.id)
        .bind(user_id)
        .bind(money::from_cents(*share))
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let mut user_ids: Vec<UserId> =
        splits.iter().map(|(user_id, _)| *user_id).collect();
    user_ids.push(expense.paid_by);
    let identities = get_user_identities(&user_ids, pool).await?;

    Ok(responses::Expense {
        id: expense.id,
        trip_id: expense.trip_id,
        paid_by: identity_for(&identities, &expense.paid_by)?,
        title: expense.title,
        amount: expense.amount,
        subtotal: expense.subtotal,
        tax: expense.tax,
        tip: expense.tip,
        total: expense.total,
        created_at: expense.created_at,
        items: item_responses,
        splits: splits
            .iter()
            .map(|(user_id, share)| {
                Ok(responses::ExpenseSplit {
                    user: identity_for(&identities, user_id)?,
                    share: money::from_cents(*share),
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?,
    })
}

/// All expenses of the trip, newest first, with items and splits attached.
pub async fn list_expenses(
    actor: &ValidatedMember,
    pool: &PgPool,
) -> Result<Vec<responses::Expense>, StoreError> {
    let expenses = sqlx::query_as::<_, Expense>(
        "SELECT * FROM expenses WHERE trip_id = $1 ORDER BY created_at DESC;",
    )
    .bind(actor.trip_id())
    .fetch_all(pool)
    .await?;
    if expenses.is_empty() {
        return Ok(Vec::new());
    }

    let expense_ids: Vec<ExpenseId> = expenses.iter().map(|e| e.id).collect();
    let items = sqlx::query_as::<_, ExpenseItem>(
        "SELECT * FROM expense_items
        WHERE expense_id = ANY($1) ORDER BY name;",
    )
    .bind(&expense_ids)
    .fetch_all(pool)
    .await?;
    let item_ids: Vec<_> = items.iter().map(|i| i.id).collect();
    let assignments = sqlx::query_as::<_, ExpenseItemAssignment>(
        "SELECT * FROM expense_item_assignments WHERE item_id = ANY($1);",
    )
    .bind(&item_ids)
    .fetch_all(pool)
    .await?;
    let splits = sqlx::query_as::<_, ExpenseSplit>(
        "SELECT * FROM expense_splits
        WHERE expense_id = ANY($1) ORDER BY share DESC;",
    )
    .bind(&expense_ids)
    .fetch_all(pool)
    .await?;

    let mut user_ids: Vec<UserId> =
        expenses.iter().map(|e| e.paid_by).collect();
    user_ids.extend(splits.iter().map(|s| s.user_id));
    let identities = get_user_identities(&user_ids, pool).await?;

    let mut assignments_by_item: HashMap<_, Vec<UserId>> = HashMap::new();
    for assignment in assignments {
        assignments_by_item
            .entry(assignment.item_id)
            .or_default()
            .push(assignment.user_id);
    }
    let mut items_by_expense: HashMap<ExpenseId, Vec<responses::ExpenseItem>> =
        HashMap::new();
    for item in items {
        items_by_expense.entry(item.expense_id).or_default().push(
            responses::ExpenseItem {
                id: item.id,
                name: item.name,
                price: item.price,
                assigned_user_ids: assignments_by_item
                    .remove(&item.id)
                    .unwrap_or_default(),
            },
        );
    }
    let mut splits_by_expense: HashMap<
        ExpenseId,
        Vec<responses::ExpenseSplit>,
    > = HashMap::new();
    for split in splits {
        splits_by_expense.entry(split.expense_id).or_default().push(
            responses::ExpenseSplit {
                user: identity_for(&identities, &split.user_id)?,
                share: split.share,
            },
        );
    }

    expenses
        .into_iter()
        .map(|expense| {
            Ok(responses::Expense {
                id: expense.id,
                trip_id: expense.trip_id,
                paid_by: identity_for(&identities, &expense.paid_by)?,
                title: expense.title,
                amount: expense.amount,
                subtotal: expense.subtotal,
                tax: expense.tax,
                tip: expense.tip,
                total: expense.total,
                created_at: expense.created_at,
                items: items_by_expense.remove(&expense.id).unwrap_or_default(),
                splits: splits_by_expense
                    .remove(&expense.id)
                    .unwrap_or_default(),
            })
        })
        .collect()
}
