use std::net::SocketAddr;
use std::sync::Arc;

use edu_agent::api::{create_router, queue, AppState};
use edu_agent::infrastructure::{AppConfig, SqliteChatStore, SubjectRegistry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,edu_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let redis_pool = queue::create_pool(&config.config.redis_url)?;
    info!("Redis pool initialized");

    let chat_store = Arc::new(
        SqliteChatStore::new(
            config.config.database_url.as_str(),
            config.config.chat.max_message_chars,
        )
        .await?,
    );
    info!(path = %config.config.database_url, "Chat store ready");

    let agents = Arc::new(SubjectRegistry::from_config(&config).await?);
    info!(subjects = agents.subject_names().len(), "Subject agents ready");

    let addr = SocketAddr::new(
        config.config.server.host.parse()?,
        config.config.server.port,
    );

    let state = AppState::new(redis_pool, chat_store, agents, config);
    let app = create_router(state);

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
