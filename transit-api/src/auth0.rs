//! Auth0 user payloads
//!
//! The post-registration action sends the newly created Auth0 user to the
//! backend. The same shape is used by [`crate::sync_client`] on the sending
//! side and by the sync endpoint on the receiving side.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use transit_core::validation::{required, validate_email};
use transit_core::{Role, ValidationErrors};

use crate::store::SyncedProfile;

/// Header the Auth0 action sets on every sync call
pub const ACTION_HEADER: &str = "x-auth0-action";

/// Value of [`ACTION_HEADER`] for the post-registration trigger
pub const POST_REGISTRATION_ACTION: &str = "post-user-registration";

/// The user object an Auth0 action posts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Auth0User {
    /// Auth0 subject id, e.g. `google-oauth2|1234`
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub app_metadata: Value,
    #[serde(default)]
    pub user_metadata: Value,
}

impl Auth0User {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.check("user_id", required(&self.user_id));
        errors.check("email", validate_email(&self.email));
        errors.into_result()
    }

    /// Profile to upsert for this user
    pub fn to_profile(&self) -> SyncedProfile {
        SyncedProfile {
            auth0_id: self.user_id.trim().to_string(),
            email: self.email.trim().to_string(),
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(String::from),
            email_verified: self.email_verified,
            provider: self.provider.clone(),
            role: role_from_metadata(&self.app_metadata, &self.user_metadata),
            app_metadata: self.app_metadata.clone(),
            user_metadata: self.user_metadata.clone(),
        }
    }
}

/// Initial role for a newly synced user
///
/// `app_metadata` is only writable by Auth0 admins and may grant any role.
/// `user_metadata` is user-editable, so it can pick driver or passenger but
/// never admin.
pub fn role_from_metadata(app_metadata: &Value, user_metadata: &Value) -> Role {
    let role_of = |metadata: &Value| {
        metadata
            .get("role")
            .and_then(Value::as_str)
            .and_then(Role::parse)
    };

    if let Some(role) = role_of(app_metadata) {
        return role;
    }
    match role_of(user_metadata) {
        Some(Role::Admin) | None => Role::Passenger,
        Some(role) => role,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_prefers_app_metadata() {
        let role = role_from_metadata(&json!({ "role": "admin" }), &json!({ "role": "driver" }));
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_user_metadata_cannot_grant_admin() {
        assert_eq!(
            role_from_metadata(&Value::Null, &json!({ "role": "admin" })),
            Role::Passenger
        );
        assert_eq!(
            role_from_metadata(&json!({}), &json!({ "role": "Driver" })),
            Role::Driver
        );
    }

    #[test]
    fn test_missing_fields_fail_validation() {
        let user: Auth0User = serde_json::from_value(json!({ "name": "Juan" })).unwrap();
        let errors = user.validate().unwrap_err();

        assert!(errors.get("user_id").is_some());
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn test_profile_trims_and_drops_blank_name() {
        let user = Auth0User {
            user_id: " auth0|abc ".into(),
            email: "juan@example.ph".into(),
            name: Some("   ".into()),
            ..Default::default()
        };
        let profile = user.to_profile();

        assert_eq!(profile.auth0_id, "auth0|abc");
        assert_eq!(profile.name, None);
        assert_eq!(profile.role, Role::Passenger);
    }
}
