//! User administration endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;
use transit_core::validation::{
    required, validate_birthdate, validate_email, validate_password, validate_phone,
    validate_postal_code,
};
use transit_core::{ApplicationStatus, DiscountCategory, Role, ValidationErrors, VerificationStatus};

use super::extract::{Json, Path, Query};
use super::{present, Paginated};
use crate::crypto::{generate_local_auth0_id, hash_password};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{
    DiscountApplication, NewUser, PageRequest, ProfileUpdate, TransitStore, User, UserFilter,
    UserId, UserStore,
};

/// Minimum age of a user created from the admin panel
pub const MIN_ADMIN_CREATED_AGE: u32 = 18;

#[derive(Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub role: Option<String>,
}

/// GET /api/users
pub async fn list_users<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Paginated<User>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();
    let status = present(&query.status).and_then(|s| {
        errors.check(
            "status",
            VerificationStatus::parse(s).ok_or_else(|| format!("Unknown status {}", s)),
        )
    });
    let role = present(&query.role).and_then(|r| {
        errors.check("role", Role::parse(r).ok_or_else(|| format!("Unknown role {}", r)))
    });
    errors.into_result()?;

    let filter = UserFilter {
        search: present(&query.search).map(String::from),
        status,
        role,
    };
    let request = PageRequest::new(query.page, query.limit);
    let page = state.user_store.list_users(&filter, request)?;

    Ok(Json(Paginated::new(page, request)))
}

fn load_user<U: UserStore>(store: &U, id: u64) -> Result<User, ApiError> {
    store
        .get_user(UserId(id))?
        .ok_or_else(|| ApiError::NotFound("User".into()))
}

/// GET /api/users/:id
pub async fn get_user<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
) -> Result<Json<User>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    Ok(Json(load_user(&state.user_store, id)?))
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub role: Option<String>,
}

/// POST /api/users
/// Create a local user from the admin panel
pub async fn create_user<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let today = Utc::now().date_naive();
    let mut errors = ValidationErrors::new();

    errors.check("email", validate_email(&req.email));
    let name = errors.check("name", required(&req.name)).map(String::from);
    errors.check("password", validate_password(&req.password));
    if let Some(phone) = present(&req.phone) {
        errors.check("phone", validate_phone(phone));
    }
    let birthdate = present(&req.birthdate).and_then(|b| {
        errors.check("birthdate", validate_birthdate(b, today, MIN_ADMIN_CREATED_AGE))
    });
    if let Some(postal_code) = present(&req.postal_code) {
        errors.check("postal_code", validate_postal_code(postal_code));
    }
    let role = match present(&req.role) {
        Some(r) => errors.check(
            "role",
            Role::parse(r).ok_or_else(|| format!("Unknown role {}", r)),
        ),
        None => Some(Role::default()),
    };
    errors.into_result()?;

    let email = req.email.trim().to_lowercase();
    let password_hash =
        hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user_id = state.user_store.create_user(NewUser {
        auth0_id: generate_local_auth0_id(),
        email,
        name: name.unwrap_or_default(),
        password_hash: Some(password_hash),
        role: role.unwrap_or_default(),
        phone: present(&req.phone).map(String::from),
        birthdate,
        address: present(&req.address).map(String::from),
        postal_code: present(&req.postal_code).map(String::from),
    })?;

    tracing::info!(user_id = user_id.0, "Admin created user");

    let user = load_user(&state.user_store, user_id.0)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub birthdate: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub role: Option<String>,
}

/// PUT /api/users/:id
pub async fn update_user<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let today = Utc::now().date_naive();
    let mut errors = ValidationErrors::new();

    let name = req
        .name
        .as_deref()
        .and_then(|n| errors.check("name", required(n)).map(String::from));
    let phone = req.phone.as_deref().and_then(|p| {
        errors
            .check("phone", validate_phone(p))
            .map(|_| p.trim().to_string())
    });
    let birthdate = req
        .birthdate
        .as_deref()
        .and_then(|b| errors.check("birthdate", validate_birthdate(b, today, 0)));
    let postal_code = req.postal_code.as_deref().and_then(|p| {
        errors
            .check("postal_code", validate_postal_code(p))
            .map(|_| p.trim().to_string())
    });
    let role = req.role.as_deref().and_then(|r| {
        errors.check("role", Role::parse(r).ok_or_else(|| format!("Unknown role {}", r)))
    });
    errors.into_result()?;

    let user_id = load_user(&state.user_store, id)?.id;
    let update = ProfileUpdate {
        name,
        role,
        phone,
        birthdate,
        address: present(&req.address).map(String::from),
        postal_code,
    };
    state.user_store.update_profile(user_id, &update)?;

    Ok(Json(load_user(&state.user_store, id)?))
}

#[derive(Deserialize)]
pub struct VerificationRequest {
    #[serde(default)]
    pub status: String,
}

/// POST /api/users/:id/verification
/// Admin approval or rejection of a user's account
pub async fn set_verification<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<VerificationRequest>,
) -> Result<Json<User>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let status = match VerificationStatus::parse(req.status.trim()) {
        Some(status @ (VerificationStatus::Verified | VerificationStatus::Rejected)) => status,
        _ => {
            return Err(ApiError::invalid_field(
                "status",
                "Status must be verified or rejected",
            ))
        }
    };

    let user_id = load_user(&state.user_store, id)?.id;
    state.user_store.set_verification(user_id, status)?;
    tracing::info!(user_id = id, status = status.as_str(), "User verification updated");

    Ok(Json(load_user(&state.user_store, id)?))
}

#[derive(Deserialize)]
pub struct DiscountRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub document: String,
}

/// POST /api/users/:id/discount
/// Submit a discount application for review
pub async fn submit_discount<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<DiscountRequest>,
) -> Result<(StatusCode, Json<DiscountApplication>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();
    let category = errors.check(
        "category",
        DiscountCategory::parse(req.category.trim())
            .ok_or_else(|| "Category must be pwd, senior, student or pregnant".to_string()),
    );
    let document = errors.check("document", required(&req.document)).map(String::from);
    errors.into_result()?;

    let (Some(category), Some(document)) = (category, document) else {
        return Err(ApiError::Internal("validated discount fields missing".into()));
    };

    let user_id = load_user(&state.user_store, id)?.id;
    let application = DiscountApplication::new(category, document);
    state.user_store.submit_discount(user_id, application.clone())?;
    tracing::info!(user_id = id, category = category.as_str(), "Discount application submitted");

    Ok((StatusCode::CREATED, Json(application)))
}

#[derive(Deserialize)]
pub struct ReviewRequest {
    pub approve: bool,
}

/// POST /api/users/:id/discount/review
pub async fn review_discount<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<DiscountApplication>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let status = if req.approve {
        ApplicationStatus::Approved
    } else {
        ApplicationStatus::Rejected
    };

    let user_id = load_user(&state.user_store, id)?.id;
    let application = state.user_store.review_discount(user_id, status)?;
    tracing::info!(user_id = id, status = status.as_str(), "Discount application reviewed");

    Ok(Json(application))
}
