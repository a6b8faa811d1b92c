//! Auth0 post-registration sync client
//!
//! Runs on the Auth0 side of the bridge: after a user registers, the user is
//! posted to the backend's sync endpoint. A failed sync is reported as a
//! [`SyncOutcome::SyncFailed`] value and never blocks the registration.

use std::time::Duration;

use serde::Deserialize;

use crate::auth0::{Auth0User, ACTION_HEADER, POST_REGISTRATION_ACTION};

/// Path of the sync endpoint relative to the backend base URL
pub const SYNC_PATH: &str = "/api/auth0/sync-user";

/// Request timeout for a sync call
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of one sync attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The backend stored the user
    Synced { message: String },
    /// The backend could not be reached or refused the user
    SyncFailed { reason: String },
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced { .. })
    }
}

#[derive(Deserialize)]
struct SyncResponse {
    #[serde(default)]
    message: String,
}

/// HTTP client for the backend sync endpoint
pub struct SyncClient {
    endpoint: String,
    token: String,
    client: reqwest::Client,
}

impl SyncClient {
    /// Create a client for the backend at `app_url`
    pub fn new(app_url: &str, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(SYNC_TIMEOUT).build()?;
        Ok(Self {
            endpoint: format!("{}{}", app_url.trim_end_matches('/'), SYNC_PATH),
            token: token.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one user to the backend
    pub async fn sync_user(&self, user: &Auth0User) -> SyncOutcome {
        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .header(ACTION_HEADER, POST_REGISTRATION_ACTION)
            .json(user)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return SyncOutcome::SyncFailed {
                    reason: format!("HTTP request failed: {}", e),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return SyncOutcome::SyncFailed {
                reason: format!("Backend responded with {}: {}", status, body),
            };
        }

        match response.json::<SyncResponse>().await {
            Ok(body) => SyncOutcome::Synced {
                message: body.message,
            },
            Err(e) => SyncOutcome::SyncFailed {
                reason: format!("Failed to parse response: {}", e),
            },
        }
    }
}

/// Post-registration hook: sync the user, log a failure and carry on
pub async fn on_post_user_registration(client: &SyncClient, user: &Auth0User) -> SyncOutcome {
    let outcome = client.sync_user(user).await;
    match &outcome {
        SyncOutcome::Synced { message } => {
            tracing::info!(auth0_id = %user.user_id, %message, "User synced to backend");
        }
        SyncOutcome::SyncFailed { reason } => {
            tracing::warn!(
                auth0_id = %user.user_id,
                %reason,
                "User sync failed; registration continues"
            );
        }
    }
    outcome
}
