//! Shared application state

use crate::store::{TransitStore, UserStore};

/// State handed to every request handler
pub struct AppState<U, T>
where
    U: UserStore,
    T: TransitStore,
{
    /// Bearer token the Auth0 action must present
    pub api_token: String,
    pub user_store: U,
    pub transit_store: T,
}

impl<U, T> AppState<U, T>
where
    U: UserStore,
    T: TransitStore,
{
    pub fn new(api_token: impl Into<String>, user_store: U, transit_store: T) -> Self {
        Self {
            api_token: api_token.into(),
            user_store,
            transit_store,
        }
    }
}
