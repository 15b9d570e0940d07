use shelfswap_api::{
    config::{self, ConfigError, Env},
    email::{EmailSender, HttpEmailSender, LogEmailSender},
    server::{self, ServerState},
};
use shelfswap_common::snowflake::{ProcessId, SnowflakePartOutOfRangeError, WorkerId};
use shelfswap_db::{DbClient, DbError, ListingStore, MemoryStore};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EMAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid snowflake configuration: {0}")]
    Snowflake(#[from] SnowflakePartOutOfRangeError),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error building the email client: {0}")]
    EmailClient(#[from] reqwest::Error),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shelfswap_api=debug,\
                shelfswap_common=debug,\
                shelfswap_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_store(env: &Env) -> Result<Arc<dyn ListingStore>, InitError> {
    let worker_id = WorkerId::new(env.worker_id)?;
    let process_id = ProcessId::new(env.process_id)?;

    match &env.database_url {
        Some(database_url) => {
            let client = DbClient::connect(database_url, worker_id, process_id).await?;
            info!("Connected to database");
            Ok(Arc::new(client))
        }
        None => {
            warn!("DATABASE_URL is not set, keeping everything in memory");
            Ok(Arc::new(MemoryStore::new(worker_id, process_id)))
        }
    }
}

fn build_email_sender(env: &Env) -> Result<Arc<dyn EmailSender>, InitError> {
    match &env.email_relay_url {
        Some(relay_url) => {
            let client = reqwest::Client::builder().timeout(EMAIL_TIMEOUT).build()?;
            Ok(Arc::new(HttpEmailSender::new(
                client,
                relay_url.clone(),
                env.email_from.clone(),
            )))
        }
        None => Ok(Arc::new(LogEmailSender::new(env.email_from.clone()))),
    }
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();

    let token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(%err, "Listening for shutdown signal failed");
        }
        info!("Shutting down");
        token.cancel();
    });

    shutdown
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = config::get_env()?;

    let store = build_store(&env).await?;
    let email = build_email_sender(&env)?;
    let state = ServerState::new(store, email, env.token_lifetime());
    let app = server::app(state);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    let shutdown = shutdown_on_ctrl_c();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
