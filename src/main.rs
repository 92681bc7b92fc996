use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deenara_api::config::Config;
use deenara_api::services::google::GoogleVerifier;
use deenara_api::services::users::{PgUserStore, UserStore};
use deenara_api::{build_router, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    let store = PgUserStore::new(pool);
    store.init_schema().await?;
    info!("Database connected and users table ensured");

    let state = AppState {
        store: Arc::new(store),
        verifier: Arc::new(GoogleVerifier::new(config.google_client_id.clone())),
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("deenara API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
