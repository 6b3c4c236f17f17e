use std::fmt::Display;
use std::net::TcpListener;
use std::sync::Arc;

use mektep::assistant::AssistantClient;
use mektep::auth::{
    spawn_pruning, AuthService, InMemoryRevocationStore, PgRevocationStore, RevocationStore,
    TokenLifetimes,
};
use mektep::configuration::{get_configuration, RevocationBackend};
use mektep::email_client::EmailClient;
use mektep::startup::run;
use mektep::telemetry::init_telemetry;
use mektep::users::PgUserDirectory;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, context: &str, e: impl Display) -> std::io::Error {
    tracing::error!("{}: {}", context, e);
    std::io::Error::new(kind, format!("{}: {}", context, e))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    use std::io::ErrorKind::{ConnectionRefused, InvalidInput, Other};

    let configuration = get_configuration().map_err(|e| {
        init_telemetry(false);
        startup_error(InvalidInput, "Failed to read configuration", e)
    })?;
    init_telemetry(configuration.application.debug);
    tracing::info!("Configuration loaded successfully");

    let pool = PgPoolOptions::new()
        .max_connections(configuration.database.max_connections)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| startup_error(ConnectionRefused, "Failed to create connection pool", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error(Other, "Failed to run migrations", e))?;
    tracing::info!("Database ready");

    let revoked: Arc<dyn RevocationStore> = match configuration.revocation.backend {
        RevocationBackend::Postgres => Arc::new(PgRevocationStore::new(pool.clone())),
        RevocationBackend::Memory => Arc::new(InMemoryRevocationStore::new()),
    };
    let _pruning = spawn_pruning(revoked.clone(), configuration.revocation.prune_interval());
    tracing::info!(backend = ?configuration.revocation.backend, "Revocation store ready");

    let codec = configuration
        .jwt
        .codec()
        .map_err(|e| startup_error(InvalidInput, "Invalid jwt settings", e))?;
    let passwords = configuration
        .password
        .hasher()
        .map_err(|e| startup_error(InvalidInput, "Invalid password settings", e))?;

    let auth = AuthService::new(
        Arc::new(PgUserDirectory::new(pool)),
        revoked,
        passwords,
        codec,
        TokenLifetimes::from(&configuration.jwt),
    );

    let email_client = EmailClient::from_settings(&configuration.email_client)
        .map_err(|e| startup_error(InvalidInput, "Invalid email client settings", e))?;
    let assistant = AssistantClient::new(&configuration.assistant, reqwest::Client::new());

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, auth, email_client, assistant)?.await
}
