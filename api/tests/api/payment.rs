use payloads::{PaymentStatus, requests};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{assert_status_code, spawn_app};

fn payment_to(
    to_user_id: payloads::UserId,
    amount: rust_decimal::Decimal,
) -> requests::CreatePayment {
    requests::CreatePayment {
        to_user_id: Some(to_user_id),
        to_username: None,
        amount,
        method: None,
    }
}

#[tokio::test]
async fn create_and_confirm_payment() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.from.username, "bob");
    assert_eq!(payment.to.username, "alice");

    app.login_alice().await?;
    let confirmed = app.client.confirm_payment(&payment.id).await?;
    assert_eq!(confirmed.status, PaymentStatus::Confirmed);

    Ok(())
}

#[tokio::test]
async fn recipient_resolution_by_username() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(
            &trip_id,
            &requests::CreatePayment {
                to_user_id: None,
                to_username: Some("alice".into()),
                amount: dec!(5.00),
                method: Some("zelle".into()),
            },
        )
        .await?;
    assert_eq!(payment.to.username, "alice");
    assert_eq!(payment.method.as_deref(), Some("zelle"));

    Ok(())
}

#[tokio::test]
async fn missing_recipient_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let result = app
        .client
        .create_payment(
            &trip_id,
            &requests::CreatePayment {
                to_user_id: None,
                to_username: None,
                amount: dec!(5.00),
                method: None,
            },
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn self_payment_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    let result = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(5.00)))
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn non_member_recipient_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let outsider = app.create_carol_user().await?;
    app.login_alice().await?;

    let result = app
        .client
        .create_payment(&trip_id, &payment_to(outsider.id, dec!(5.00)))
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn only_recipient_may_confirm() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;

    // carol is a member but not the counterparty
    app.login_carol().await?;
    let result = app.client.confirm_payment(&payment.id).await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    // the sender cannot confirm either
    app.login_bob().await?;
    let result = app.client.confirm_payment(&payment.id).await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn confirm_after_decline_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;

    app.login_alice().await?;
    let declined = app
        .client
        .decline_payment(
            &payment.id,
            &requests::DeclinePayment {
                note: Some("wrong amount".into()),
            },
        )
        .await?;
    assert_eq!(declined.status, PaymentStatus::Declined);
    assert_eq!(declined.decline_note.as_deref(), Some("wrong amount"));

    // terminal states are absorbing
    let result = app.client.confirm_payment(&payment.id).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn delete_after_decline_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;

    app.login_alice().await?;
    app.client
        .decline_payment(&payment.id, &requests::DeclinePayment::default())
        .await?;

    // the sender can only delete while pending
    app.login_bob().await?;
    let result = app.client.delete_payment(&payment.id).await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn sender_deletes_pending_payment() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;

    // the recipient may not delete
    app.login_alice().await?;
    let result = app.client.delete_payment(&payment.id).await;
    assert_status_code(result, StatusCode::FORBIDDEN);

    app.login_bob().await?;
    app.client.delete_payment(&payment.id).await?;

    app.login_alice().await?;
    assert!(app.client.pending_payments().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn pending_payments_lists_only_received_pending() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    app.login_bob().await?;
    let to_alice = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;
    app.client
        .create_payment(&trip_id, &payment_to(carol_id, dec!(3.00)))
        .await?;

    app.login_alice().await?;
    let pending = app.client.pending_payments().await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, to_alice.id);

    // confirmed payments leave the pending list
    app.client.confirm_payment(&to_alice.id).await?;
    assert!(app.client.pending_payments().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn long_decline_note_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let payment = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(12.00)))
        .await?;

    app.login_alice().await?;
    let note: String = (0..201).map(|_| 'x').collect();
    let result = app
        .client
        .decline_payment(
            &payment.id,
            &requests::DeclinePayment { note: Some(note) },
        )
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn zero_amount_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;

    app.login_bob().await?;
    let result = app
        .client
        .create_payment(&trip_id, &payment_to(alice_id, dec!(0.00)))
        .await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}
