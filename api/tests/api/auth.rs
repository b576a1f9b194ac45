use payloads::SessionToken;
use reqwest::StatusCode;
use uuid::Uuid;

use test_helpers::{
    alice_credentials, alice_login_credentials, assert_status_code, spawn_app,
};

#[tokio::test]
async fn register_login_and_me() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let registered = app.client.register(&alice_credentials()).await?;
    assert_eq!(registered.username, "alice");
    assert_eq!(registered.email, "alice@example.com");

    let login = app.client.login(&alice_login_credentials()).await?;
    assert_eq!(login.user.id, registered.id);

    let me = app.client.me().await?;
    assert_eq!(me.id, registered.id);
    assert_eq!(me.username, "alice");

    Ok(())
}

#[tokio::test]
async fn login_with_wrong_password_fails() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.client.register(&alice_credentials()).await?;

    let mut credentials = alice_login_credentials();
    credentials.password = "not-the-password".into();
    let result = app.client.login(&credentials).await;

    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn unauthenticated_request_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let result = app.client.get_trips().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn unknown_token_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;

    app.client.set_token(SessionToken(Uuid::new_v4()));
    let result = app.client.get_trips().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn expired_token_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.create_alice_user().await?;
    app.client.get_trips().await?;

    app.time_source.advance(jiff::Span::new().days(31));
    let result = app.client.get_trips().await;
    assert_status_code(result, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.client.register(&alice_credentials()).await?;

    let mut second = alice_credentials();
    second.username = "alice2".into();
    let result = app.client.register(&second).await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn duplicate_username_conflicts() -> anyhow::Result<()> {
    let app = spawn_app().await;
    app.client.register(&alice_credentials()).await?;

    let mut second = alice_credentials();
    second.email = "alice2@example.com".into();
    let result = app.client.register(&second).await;

    assert_status_code(result, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn short_password_is_rejected() -> anyhow::Result<()> {
    let app = spawn_app().await;

    let mut credentials = alice_credentials();
    credentials.password = "tiny".into();
    let result = app.client.register(&credentials).await;

    assert_status_code(result, StatusCode::BAD_REQUEST);

    Ok(())
}
