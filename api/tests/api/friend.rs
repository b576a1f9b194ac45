use payloads::requests::AddFriend;
use reqwest::StatusCode;

use test_helpers::{assert_status_code, spawn_app};

#[tokio::test]
async fn request_and_accept_creates_symmetric_friendship() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    let invite = app
        .client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;
    assert_eq!(invite.sender.username, "alice");
    assert_eq!(invite.receiver.username, "bob");

    app.login_bob().await?;
    let invites = app.client.get_friend_invites().await?;
    assert_eq!(invites.len(), 1);
    app.client.accept_friend_invite(&invites[0].id).await?;

    // both sides see the friendship
    let bobs_friends = app.client.get_friends().await?;
    assert_eq!(bobs_friends.len(), 1);
    assert_eq!(bobs_friends[0].user.username, "alice");

    app.login_alice().await?;
    let alices_friends = app.client.get_friends().await?;
    assert_eq!(alices_friends.len(), 1);
    assert_eq!(alices_friends[0].user.username, "bob");

    // two mirror rows exist
    let row_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM friends")
            .fetch_one(&app.db_pool)
            .await?;
    assert_eq!(row_count, 2);

    Ok(())
}

#[tokio::test]
async fn duplicate_request_conflicts_in_both_directions() -> anyhow::Result<()>
{
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    app.client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;

    // same direction
    let result = app
        .client
        .add_friend(&AddFriend { username: "bob".into() })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    // reverse direction while the first is still pending
    app.login_bob().await?;
    let result = app
        .client
        .add_friend(&AddFriend { username: "alice".into() })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn request_to_existing_friend_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    app.client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;
    app.login_bob().await?;
    let invites = app.client.get_friend_invites().await?;
    app.client.accept_friend_invite(&invites[0].id).await?;

    let result = app
        .client
        .add_friend(&AddFriend { username: "alice".into() })
        .await;
    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn self_request_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app
        .client
        .add_friend(&AddFriend { username: "alice".into() })
        .await;
    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn unknown_username_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    let result = app
        .client
        .add_friend(&AddFriend { username: "nobody".into() })
        .await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn declined_request_allows_retry() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;

    app.client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;

    app.login_bob().await?;
    let invites = app.client.get_friend_invites().await?;
    app.client.decline_friend_invite(&invites[0].id).await?;
    assert!(app.client.get_friends().await?.is_empty());

    // the decline is terminal, so a new request can be sent
    app.login_alice().await?;
    app.client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;

    Ok(())
}

#[tokio::test]
async fn unfriending_removes_both_rows() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    let bob = app.create_bob_user().await?;

    app.client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;
    app.login_bob().await?;
    let invites = app.client.get_friend_invites().await?;
    app.client.accept_friend_invite(&invites[0].id).await?;

    app.login_alice().await?;
    app.client.remove_friend(&bob.id).await?;

    assert!(app.client.get_friends().await?.is_empty());
    app.login_bob().await?;
    assert!(app.client.get_friends().await?.is_empty());

    let row_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM friends")
            .fetch_one(&app.db_pool)
            .await?;
    assert_eq!(row_count, 0);

    // removing again is a 404
    app.login_alice().await?;
    let result = app.client.remove_friend(&bob.id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn responding_to_someone_elses_invite_not_found() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.create_bob_user().await?;
    app.create_carol_user().await?;

    let invite = app
        .client
        .add_friend(&AddFriend { username: "bob".into() })
        .await?;

    // carol is neither sender nor receiver
    app.login_carol().await?;
    let result = app.client.accept_friend_invite(&invite.id).await;
    assert_status_code(result, StatusCode::NOT_FOUND);

    Ok(())
}
