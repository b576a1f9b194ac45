pub mod allocate;
pub mod auth;
pub mod money;
pub mod password;
pub mod receipt;
pub mod routes;
pub mod settle;
pub mod store;
pub mod telemetry;
pub mod time;

use std::net::TcpListener;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::{App, HttpServer, web};
use secrecy::SecretBox;
use sqlx::PgPool;

use crate::receipt::{ReceiptConfig, ReceiptVerifier};
use crate::time::TimeSource;

/// Build the server, but not await it.
///
/// Returns the port that the server has bound to by modifying the config.
pub async fn build(
    config: &mut Config,
    time_source: TimeSource,
) -> std::io::Result<Server> {
    let db_pool =
        web::Data::new(PgPool::connect(&config.database_url).await.unwrap());
    let time_source = web::Data::new(time_source);

    let verifier = match &config.receipt_verifier_url {
        Some(url) => Some(
            ReceiptVerifier::new(
                url.clone(),
                config.receipt_verifier_api_key.take(),
                Duration::from_secs(config.receipt_verifier_timeout_secs),
            )
            .map_err(std::io::Error::other)?,
        ),
        None => {
            tracing::info!(
                "No RECEIPT_VERIFIER_URL configured; receipt parsing runs \
                rules-only"
            );
            None
        }
    };
    let receipt_config = web::Data::new(ReceiptConfig { verifier });

    // Clone config for use in closure
    let allowed_origins = config.allowed_origins.clone();

    // OS assigns the port if binding to 0
    let listener = TcpListener::bind(format!("{}:{}", config.ip, config.port))?;
    config.port = listener.local_addr()?.port();
    let server = HttpServer::new(move || {
        // Configure CORS based on allowed origins
        let cors = if allowed_origins.contains(&"*".to_string()) {
            // Allow any origin (for development)
            Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
        } else {
            // Production: Only allow specified origins
            let mut cors = Cors::default()
                .allow_any_method()
                .allow_any_header();

            for origin in &allowed_origins {
                cors = cors.allowed_origin(origin);
            }
            cors
        };

        App::new()
            .wrap(cors)
            // health check stays outside the no-store scope
            .service(routes::health_check)
            .service(routes::api_services())
            .app_data(db_pool.clone())
            .app_data(time_source.clone())
            .app_data(receipt_config.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

/// Configuration loaded from environment variables at startup.
/// Used only during server initialization, not shared as app_data.
pub struct Config {
    pub database_url: String,
    /// set to "0.0.0.0" for public access, "127.0.0.1" for local dev
    pub ip: String,
    /// set to 0 to get an os-assigned port
    pub port: u16,
    /// List of allowed CORS origins. Use "*" to allow any origin (development only)
    pub allowed_origins: Vec<String>,
    /// Endpoint of the optional receipt verifier; rules-only parsing when
    /// unset
    pub receipt_verifier_url: Option<String>,
    pub receipt_verifier_api_key: Option<SecretBox<String>>,
    pub receipt_verifier_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        use std::env::var;

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string()) // Default to allow any origin for development
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Config {
            database_url: var("DATABASE_URL").unwrap(),
            ip: var("IP_ADDRESS").unwrap(),
            port: var("PORT").unwrap().parse().unwrap(),
            allowed_origins,
            receipt_verifier_url: var("RECEIPT_VERIFIER_URL").ok(),
            receipt_verifier_api_key: var("RECEIPT_VERIFIER_API_KEY")
                .ok()
                .map(|k| SecretBox::new(Box::new(k))),
            receipt_verifier_timeout_secs: var("RECEIPT_VERIFIER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
        }
    }
}
