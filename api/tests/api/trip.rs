use payloads::{TripRole, TripStatus, requests};
use reqwest::StatusCode;
use rust_decimal::dec;

use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn create_trip_makes_creator_the_owner() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;

    let detail = app.client.get_trip(&trip_id).await?;
    assert_eq!(detail.name, "Test trip");
    assert_eq!(detail.status, TripStatus::Planning);
    assert_eq!(detail.members.len(), 1);
    assert_eq!(detail.members[0].user.username, "alice");
    assert_eq!(detail.members[0].role, TripRole::Owner);

    Ok(())
}

#[tokio::test]
async fn short_trip_name_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let body = requests::CreateTrip {
        name: "X".into(),
        start_date: None,
        end_date: None,
        status: None,
    };
    let result = app.client.create_trip(&body).await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn out_of_order_dates_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let body = requests::CreateTrip {
        name: "Backwards trip".into(),
        start_date: Some("2025-06-08".parse()?),
        end_date: Some("2025-06-01".parse()?),
        status: None,
    };
    let result = app.client.create_trip(&body).await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn invite_flow_adds_member() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_two_person_trip().await?;

    let trips = app.client.get_trips().await?;
    let trip_id = trips.first().unwrap().id;
    let detail = app.client.get_trip(&trip_id).await?;
    assert_eq!(detail.members.len(), 2);
    let bob = detail
        .members
        .iter()
        .find(|m| m.user.username == "bob")
        .unwrap();
    assert_eq!(bob.role, TripRole::Member);

    Ok(())
}

#[tokio::test]
async fn non_member_cannot_view_trip() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;

    app.create_carol_user().await?;
    app.login_carol().await?;
    let result = app.client.get_trip(&trip_id).await;

    assert_status_code(result, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn duplicate_pending_invite_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;
    app.create_bob_user().await?;

    app.invite_user(&trip_id, "bob").await?;
    let result = app
        .client
        .invite_member(
            &trip_id,
            &requests::InviteTripMember {
                username: "bob".into(),
            },
        )
        .await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn inviting_unknown_user_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;

    let result = app
        .client
        .invite_member(
            &trip_id,
            &requests::InviteTripMember {
                username: "nobody".into(),
            },
        )
        .await;

    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn inviting_existing_member_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_two_person_trip().await?;

    let result = app
        .client
        .invite_member(
            &trip_id,
            &requests::InviteTripMember {
                username: "bob".into(),
            },
        )
        .await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn declined_invite_allows_reinvite() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;
    app.create_bob_user().await?;
    app.invite_user(&trip_id, "bob").await?;

    app.login_bob().await?;
    let invites = app.client.get_trip_invites().await?;
    assert_eq!(invites.len(), 1);
    app.client.decline_trip_invite(&invites[0].id).await?;

    // declined invites disappear from the pending list
    assert!(app.client.get_trip_invites().await?.is_empty());
    // and Bob is not a member
    assert!(app.client.get_trips().await?.is_empty());

    // the partial unique index only covers pending invites, so a fresh
    // invite can be issued
    app.login_alice().await?;
    app.invite_user(&trip_id, "bob").await?;

    Ok(())
}

#[tokio::test]
async fn accepting_twice_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;
    app.create_bob_user().await?;
    let invite_id = app.invite_user(&trip_id, "bob").await?;

    app.login_bob().await?;
    app.client.accept_trip_invite(&invite_id).await?;
    let result = app.client.accept_trip_invite(&invite_id).await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn patch_updates_name_and_status() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let trip_id = app.create_test_trip().await?;

    let detail = app
        .client
        .update_trip(
            &trip_id,
            &requests::UpdateTrip {
                name: Some("Renamed trip".into()),
                status: Some(TripStatus::Active),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(detail.name, "Renamed trip");
    assert_eq!(detail.status, TripStatus::Active);

    // the full four-value status set is accepted, cancelled included
    let detail = app
        .client
        .update_trip(
            &trip_id,
            &requests::UpdateTrip {
                status: Some(TripStatus::Cancelled),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(detail.status, TripStatus::Cancelled);

    Ok(())
}

#[tokio::test]
async fn trip_list_aggregates() -> anyhow::Result<()> {
    let app = spawn_app().await;
    let trip_id = app.create_three_person_trip().await?;
    let alice_id = app.member_id(&trip_id, "alice").await?;
    let bob_id = app.member_id(&trip_id, "bob").await?;
    let carol_id = app.member_id(&trip_id, "carol").await?;

    app.client
        .create_expense(
            &trip_id,
            &requests::CreateExpense::Itemized(
                requests::CreateItemizedExpense {
                    title: "Dinner".into(),
                    items: vec![requests::ItemInput {
                        name: "Pizza".into(),
                        price: dec!(30.00),
                        assigned_user_ids: vec![alice_id, bob_id, carol_id],
                    }],
                    tax: dec!(0),
                    tip: Some(requests::TipInput::Percent {
                        value: dec!(20),
                    }),
                },
            ),
        )
        .await?;

    let trips = app.client.get_trips().await?;
    assert_eq!(trips.len(), 1);
    let summary = &trips[0];
    assert_eq!(summary.expense_count, 1);
    assert_eq!(summary.total_amount, dec!(36.00));
    assert_eq!(summary.user_balance, dec!(24.00));

    app.login_bob().await?;
    let trips = app.client.get_trips().await?;
    assert_eq!(trips[0].user_balance, dec!(-12.00));

    Ok(())
}
