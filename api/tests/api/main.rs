mod auth;
mod balance;
mod expense;
mod friend;
mod payment;
mod receipt;
mod security_headers;
mod trip;

use test_helpers::spawn_app;

#[tokio::test]
async fn health_check() -> anyhow::Result<()> {
    let app = spawn_app().await;

    app.client.health_check().await?;

    Ok(())
}
