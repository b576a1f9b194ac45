use payloads::requests::{
    CreateExpense, CreateItemizedExpense, CreateSimpleExpense, ItemInput,
    SplitInput, TipInput,
};
use reqwest::StatusCode;
use rust_decimal::{Decimal, dec};

use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn simple_split_persists_shares() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;

    let expense = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Simple(CreateSimpleExpense {
                title: "Taxi".into(),
                amount: dec!(45.00),
                splits: vec![
                    SplitInput { user_id: alice_id, share: dec!(22.50) },
                    SplitInput { user_id: bob_id, share: dec!(22.50) },
                ],
            }),
        )
        .await?;

    assert_eq!(expense.total, dec!(45.00));
    assert_eq!(expense.amount, expense.total);
    assert_eq!(expense.subtotal, dec!(45.00));
    assert_eq!(expense.tax, dec!(0.00));
    assert_eq!(expense.tip, dec!(0.00));
    assert!(expense.items.is_empty());
    assert_eq!(expense.splits.len(), 2);
    let share_sum: Decimal =
        expense.splits.iter().map(|s| s.share).sum();
    assert_eq!(share_sum, expense.total);

    Ok(())
}

#[tokio::test]
async fn simple_split_tolerates_one_cent_and_rebalances() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;

    // shares sum to 44.99 against a 45.00 amount; accepted, and the cent
    // lands on the largest share so the persisted rows still sum exactly
    let expense = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Simple(CreateSimpleExpense {
                title: "Taxi".into(),
                amount: dec!(45.00),
                splits: vec![
                    SplitInput { user_id: alice_id, share: dec!(30.00) },
                    SplitInput { user_id: bob_id, share: dec!(14.99) },
                ],
            }),
        )
        .await?;

    let share_sum: Decimal =
        expense.splits.iter().map(|s| s.share).sum();
    assert_eq!(share_sum, dec!(45.00));
    let alice_share = expense
        .splits
        .iter()
        .find(|s| s.user.username == "alice")
        .unwrap()
        .share;
    assert_eq!(alice_share, dec!(30.01));

    Ok(())
}

#[tokio::test]
async fn simple_split_mismatch_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Simple(CreateSimpleExpense {
                title: "Taxi".into(),
                amount: dec!(45.00),
                splits: vec![
                    SplitInput { user_id: alice_id, share: dec!(20.00) },
                    SplitInput { user_id: bob_id, share: dec!(20.00) },
                ],
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn empty_splits_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Simple(CreateSimpleExpense {
                title: "Taxi".into(),
                amount: dec!(45.00),
                splits: vec![],
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn non_member_split_user_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let outsider = app.create_carol_user().await?;
    app.login_alice().await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Simple(CreateSimpleExpense {
                title: "Taxi".into(),
                amount: dec!(10.00),
                splits: vec![SplitInput {
                    user_id: outsider.id,
                    share: dec!(10.00),
                }],
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

/// Even 3-way dinner: one 30.00 item shared by all, 20% tip.
#[tokio::test]
async fn itemized_even_three_way() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    let expense = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Dinner".into(),
                items: vec![ItemInput {
                    name: "Pizza".into(),
                    price: dec!(30.00),
                    assigned_user_ids: vec![alice_id, bob_id, carol_id],
                }],
                tax: dec!(0),
                tip: Some(TipInput::Percent { value: dec!(20) }),
            }),
        )
        .await?;

    assert_eq!(expense.subtotal, dec!(30.00));
    assert_eq!(expense.tax, dec!(0.00));
    assert_eq!(expense.tip, dec!(6.00));
    assert_eq!(expense.total, dec!(36.00));
    assert_eq!(expense.amount, dec!(36.00));
    assert_eq!(expense.splits.len(), 3);
    for split in &expense.splits {
        assert_eq!(split.share, dec!(12.00));
    }

    Ok(())
}

/// Penny distribution: 10.00 over three users with 0.05 tax.
#[tokio::test]
async fn itemized_penny_distribution() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    let expense = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Groceries".into(),
                items: vec![ItemInput {
                    name: "Bread".into(),
                    price: dec!(10.00),
                    assigned_user_ids: vec![alice_id, bob_id, carol_id],
                }],
                tax: dec!(0.05),
                tip: None,
            }),
        )
        .await?;

    assert_eq!(expense.total, dec!(10.05));
    let share_of = |id: payloads::UserId| {
        expense
            .splits
            .iter()
            .find(|s| s.user.id == id)
            .unwrap()
            .share
    };
    // item cents 334/333/333, tax cents 2/2/1 by largest remainder
    assert_eq!(share_of(alice_id), dec!(3.36));
    assert_eq!(share_of(bob_id), dec!(3.35));
    assert_eq!(share_of(carol_id), dec!(3.34));

    let share_sum: Decimal =
        expense.splits.iter().map(|s| s.share).sum();
    assert_eq!(share_sum, dec!(10.05));

    Ok(())
}

#[tokio::test]
async fn single_assignee_gets_full_price() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;

    let expense = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Minibar".into(),
                items: vec![ItemInput {
                    name: "Soda".into(),
                    price: dec!(4.50),
                    assigned_user_ids: vec![bob_id],
                }],
                tax: dec!(0),
                tip: None,
            }),
        )
        .await?;

    assert_eq!(expense.splits.len(), 1);
    assert_eq!(expense.splits[0].user.id, bob_id);
    assert_eq!(expense.splits[0].share, dec!(4.50));

    Ok(())
}

#[tokio::test]
async fn empty_items_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Nothing".into(),
                items: vec![],
                tax: dec!(0),
                tip: None,
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn non_member_assignee_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let outsider = app.create_carol_user().await?;
    app.login_alice().await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Dinner".into(),
                items: vec![ItemInput {
                    name: "Pizza".into(),
                    price: dec!(30.00),
                    assigned_user_ids: vec![outsider.id],
                }],
                tax: dec!(0),
                tip: None,
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn non_positive_price_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    let result = app
        .client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Dinner".into(),
                items: vec![ItemInput {
                    name: "Pizza".into(),
                    price: dec!(0.00),
                    assigned_user_ids: vec![alice_id],
                }],
                tax: dec!(0),
                tip: None,
            }),
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

/// The splits persisted for any expense sum to its total exactly, in the
/// database and not just the response.
#[tokio::test]
async fn split_rows_sum_to_total_exactly() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    app.client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Odd dinner".into(),
                items: vec![
                    ItemInput {
                        name: "Sharing platter".into(),
                        price: dec!(17.77),
                        assigned_user_ids: vec![alice_id, bob_id, carol_id],
                    },
                    ItemInput {
                        name: "Lemonade".into(),
                        price: dec!(3.33),
                        assigned_user_ids: vec![bob_id, carol_id],
                    },
                ],
                tax: dec!(1.97),
                tip: Some(TipInput::Percent { value: dec!(18) }),
            }),
        )
        .await?;

    let rows: Vec<(Decimal, Decimal)> = sqlx::query_as(
        "SELECT e.total, SUM(s.share)
        FROM expenses e
        JOIN expense_splits s ON s.expense_id = e.id
        GROUP BY e.id, e.total",
    )
    .fetch_all(&app.db_pool)
    .await?;
    assert!(!rows.is_empty());
    for (total, share_sum) in rows {
        assert_eq!(total, share_sum);
    }

    Ok(())
}

#[tokio::test]
async fn expenses_list_returns_items_and_splits() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;

    app.client
        .create_expense(
            &trip_id,
            &CreateExpense::Itemized(CreateItemizedExpense {
                title: "Lunch".into(),
                items: vec![ItemInput {
                    name: "Sandwiches".into(),
                    price: dec!(21.00),
                    assigned_user_ids: vec![alice_id, bob_id],
                }],
                tax: dec!(0),
                tip: None,
            }),
        )
        .await?;

    let expenses = app.client.get_expenses(&trip_id).await?;
    assert_eq!(expenses.len(), 1);
    let expense = &expenses[0];
    assert_eq!(expense.items.len(), 1);
    assert_eq!(expense.items[0].name, "Sandwiches");
    assert_eq!(expense.items[0].assigned_user_ids.len(), 2);
    assert_eq!(expense.splits.len(), 2);

    Ok(())
}
