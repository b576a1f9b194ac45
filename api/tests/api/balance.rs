use payloads::requests::{
    self, CreateExpense, CreateItemizedExpense, ItemInput, TipInput,
};
use rust_decimal::{Decimal, dec};

use test_helpers::{TestApp, spawn_app};

/// Alice pays an itemized 36.00 dinner split three ways.
async fn dinner_trip(app: &TestApp) -> anyhow::Result<payloads::TripId> {
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    app.client
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
    Ok(trip_id)
}

#[tokio::test]
async fn dinner_balances_and_settlements() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = dinner_trip(&app).await?;

    let balances = app.client.get_balances(&trip_id).await?;
    assert_eq!(balances.user_balance, dec!(24.00));
    assert_eq!(TestApp::balance_of(&balances, "alice"), dec!(24.00));
    assert_eq!(TestApp::balance_of(&balances, "bob"), dec!(-12.00));
    assert_eq!(TestApp::balance_of(&balances, "carol"), dec!(-12.00));

    // equal debts settle in member join order
    assert_eq!(balances.settlements.len(), 2);
    assert_eq!(balances.settlements[0].from.username, "bob");
    assert_eq!(balances.settlements[0].to.username, "alice");
    assert_eq!(balances.settlements[0].amount, dec!(12.00));
    assert_eq!(balances.settlements[1].from.username, "carol");
    assert_eq!(balances.settlements[1].amount, dec!(12.00));

    assert_eq!(balances.total_settled, dec!(0.00));
    assert_eq!(balances.payment_count, 0);

    Ok(())
}

#[tokio::test]
async fn balances_sum_to_zero() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = dinner_trip(&app).await?;

    let balances = app.client.get_balances(&trip_id).await?;
    let sum: Decimal = balances.balances.iter().map(|b| b.balance).sum();
    assert_eq!(sum, Decimal::ZERO);

    Ok(())
}

/// A pending payment changes nothing; confirmation moves the balances.
#[tokio::test]
async fn confirmed_payment_updates_balances() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = dinner_trip(&app).await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(
            &trip_id,
            &requests::CreatePayment {
                to_user_id: Some(alice_id),
                to_username: None,
                amount: dec!(12.00),
                method: Some("venmo".into()),
            },
        )
        .await?;

    // balances unchanged while pending
    let balances = app.client.get_balances(&trip_id).await?;
    assert_eq!(TestApp::balance_of(&balances, "alice"), dec!(24.00));
    assert_eq!(TestApp::balance_of(&balances, "bob"), dec!(-12.00));

    app.login_alice().await?;
    app.client.confirm_payment(&payment.id).await?;

    let balances = app.client.get_balances(&trip_id).await?;
    assert_eq!(TestApp::balance_of(&balances, "alice"), dec!(12.00));
    assert_eq!(TestApp::balance_of(&balances, "bob"), dec!(0.00));
    assert_eq!(TestApp::balance_of(&balances, "carol"), dec!(-12.00));

    // only carol still owes
    assert_eq!(balances.settlements.len(), 1);
    assert_eq!(balances.settlements[0].from.username, "carol");
    assert_eq!(balances.settlements[0].to.username, "alice");
    assert_eq!(balances.settlements[0].amount, dec!(12.00));

    assert_eq!(balances.total_settled, dec!(12.00));
    assert_eq!(balances.payment_count, 1);

    Ok(())
}

/// Declining a pending payment leaves every balance untouched.
#[tokio::test]
async fn declined_payment_preserves_balances() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = dinner_trip(&app).await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(
            &trip_id,
            &requests::CreatePayment {
                to_user_id: Some(alice_id),
                to_username: None,
                amount: dec!(12.00),
                method: None,
            },
        )
        .await?;

    app.login_alice().await?;
    app.client
        .decline_payment(&payment.id, &requests::DeclinePayment::default())
        .await?;

    let balances = app.client.get_balances(&trip_id).await?;
    assert_eq!(TestApp::balance_of(&balances, "alice"), dec!(24.00));
    assert_eq!(TestApp::balance_of(&balances, "bob"), dec!(-12.00));
    assert_eq!(TestApp::balance_of(&balances, "carol"), dec!(-12.00));

    Ok(())
}

/// Applying the planner's transfers as confirmed payments drives every
/// balance to zero and empties the settlement list.
#[tokio::test]
async fn settlements_clear_the_trip() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = dinner_trip(&app).await?;

    let balances = app.client.get_balances(&trip_id).await?;
    for settlement in &balances.settlements {
        // each debtor creates the suggested payment...
        app.client
            .login(&test_helpers::to_login_credentials(&credentials_for(
                &settlement.from.username,
            )))
            .await?;
        let payment = app
            .client
            .create_payment(
                &trip_id,
                &requests::CreatePayment {
                    to_user_id: Some(settlement.to.id),
                    to_username: None,
                    amount: settlement.amount,
                    method: Some("cash".into()),
                },
            )
            .await?;
        // ...and the creditor confirms it
        app.client
            .login(&test_helpers::to_login_credentials(&credentials_for(
                &settlement.to.username,
            )))
            .await?;
        app.client.confirm_payment(&payment.id).await?;
    }

    let balances = app.client.get_balances(&trip_id).await?;
    for entry in &balances.balances {
        assert_eq!(entry.balance, Decimal::ZERO, "{}", entry.user.username);
    }
    assert!(balances.settlements.is_empty());

    Ok(())
}

fn credentials_for(username: &str) -> requests::Register {
    match username {
        "alice" => test_helpers::alice_credentials(),
        "bob" => test_helpers::bob_credentials(),
        "carol" => test_helpers::carol_credentials(),
        other => panic!("unknown test user {other}"),
    }
}
