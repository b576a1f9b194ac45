use anyhow::Result;
use payloads::responses;

use test_helpers::{alice_credentials, alice_login_credentials, spawn_app};

#[tokio::test]
async fn security_headers_on_api_endpoints() -> Result<()> {
    let app = spawn_app().await;
    app.client.register(&alice_credentials()).await?;

    // drive the raw client so the headers of the exact wire response are
    // visible
    let login: responses::LoginResponse = app
        .client
        .inner_client
        .post(format!("{}/auth/login", app.client.address))
        .json(&alice_login_credentials())
        .send()
        .await?
        .json()
        .await?;
    let response = app
        .client
        .inner_client
        .get(format!("{}/trips", app.client.address))
        .bearer_auth(login.token)
        .send()
        .await?;
    assert!(response.status().is_success());

    let headers = response.headers();
    let cache_control = headers
        .get("cache-control")
        .expect("Cache-Control header should be present")
        .to_str()?;
    assert!(cache_control.contains("no-store"));
    assert!(cache_control.contains("no-cache"));
    assert!(cache_control.contains("must-revalidate"));
    assert!(cache_control.contains("private"));

    let pragma = headers
        .get("pragma")
        .expect("Pragma header should be present")
        .to_str()?;
    assert_eq!(pragma, "no-cache");

    let expires = headers
        .get("expires")
        .expect("Expires header should be present")
        .to_str()?;
    assert_eq!(expires, "0");

    Ok(())
}

#[tokio::test]
async fn health_check_does_not_have_security_headers() -> Result<()> {
    let app = spawn_app().await;

    let url = format!("{}/health_check", app.client.address);
    let response = app.client.inner_client.get(&url).send().await?;
    assert!(response.status().is_success());

    let headers = response.headers();
    assert!(headers.get("cache-control").is_none());
    assert!(headers.get("pragma").is_none());
    assert!(headers.get("expires").is_none());

    Ok(())
}
