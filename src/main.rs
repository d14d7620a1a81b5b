//! Entry point: load config, wire dependencies, and run the server.

use roomcast::auth::{ConnectionAuthenticator, JwtSecret};
use roomcast::config::Config;
use roomcast::db::{self, PgStore};
use roomcast::repositories::{InMemoryRevocationList, RedisRevocationList, RevocationList};
use roomcast::{create_app, AppState, Realtime};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("config: {}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let db_pool = db::create_pool(&config.database_url, config.database_max_connections).await?;
    let store = Arc::new(PgStore::new(db_pool));

    let revocations: Arc<dyn RevocationList> = match &config.redis_url {
        Some(url) => {
            tracing::info!("revocation list: redis");
            Arc::new(RedisRevocationList::new(url)?)
        }
        None => {
            tracing::warn!("REDIS_URL unset; revoked tokens are tracked in-process only");
            Arc::new(InMemoryRevocationList::new())
        }
    };
    let authenticator = ConnectionAuthenticator::new(
        JwtSecret::new(config.jwt_secret.clone(), config.token_ttl_secs),
        revocations,
    );
    let realtime = Realtime::new(store.clone(), store, config.max_message_len);

    let app = create_app(AppState::new(authenticator, realtime));

    tracing::info!(addr = %config.server_addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
