//! Jeepney transit backend
//!
//! Mirrors Auth0 users into local storage, serves the admin panel's CRUD
//! endpoints and answers fare lookups over each route's fare matrix.

pub mod auth0;
pub mod config;
pub mod crypto;
pub mod error;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync_client;

pub use auth0::Auth0User;
pub use config::{Config, ConfigError, CorsOrigin, DatabaseTarget};
pub use error::ApiError;
pub use state::AppState;
pub use store::{
    InMemoryTransitStore, InMemoryUserStore, SqliteStore, TransitStore, UserStore,
};
pub use sync_client::{on_post_user_registration, SyncClient, SyncOutcome};
