//! Jeepney transit backend
//!
//! Serves the Auth0 sync endpoint, the admin CRUD API and fare lookups.

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transit_api::{
    routes, AppState, Config, DatabaseTarget, InMemoryTransitStore, InMemoryUserStore,
    SqliteStore, TransitStore, UserStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transit_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(?config, "Loaded configuration");

    match &config.database {
        DatabaseTarget::Memory => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            serve(&config, InMemoryUserStore::new(), InMemoryTransitStore::new()).await
        }
        DatabaseTarget::Sqlite(path) => {
            let store = Arc::new(SqliteStore::open(path)?);
            tracing::info!(path = %path, "Opened SQLite database");
            serve(&config, store.clone(), store).await
        }
    }
}

async fn serve<U, T>(config: &Config, user_store: U, transit_store: T) -> Result<()>
where
    U: UserStore + 'static,
    T: TransitStore + 'static,
{
    let state = Arc::new(AppState::new(
        config.api_token.clone(),
        user_store,
        transit_store,
    ));

    let app = routes::create_router_with_cors(state, &config.cors_origin);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Transit API listening on http://{}", addr);
    tracing::info!("Auth0 sync endpoint at {}/api/auth0/sync-user", config.app_url);

    axum::serve(listener, app).await?;

    Ok(())
}
