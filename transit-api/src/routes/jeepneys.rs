//! Jeepney fleet endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use transit_core::validation::validate_plate_number;
use transit_core::{Role, ValidationErrors};

use super::extract::{Json, Path, Query};
use super::{present, Paginated};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{
    Jeepney, JeepneyFields, JeepneyFilter, JeepneyId, PageRequest, RouteId, TransitStore, UserId,
    UserStore,
};

/// Seats a jeepney may be registered with
pub const CAPACITY_RANGE: std::ops::RangeInclusive<i64> = 1..=40;

#[derive(Deserialize)]
pub struct ListJeepneysQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
    /// `active` or `inactive`
    pub status: Option<String>,
}

/// GET /api/jeepneys
pub async fn list_jeepneys<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Query(query): Query<ListJeepneysQuery>,
) -> Result<Json<Paginated<Jeepney>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let active = match present(&query.status).map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        Some(_) => {
            return Err(ApiError::invalid_field(
                "status",
                "Status must be active or inactive",
            ))
        }
    };

    let filter = JeepneyFilter {
        search: present(&query.search).map(String::from),
        active,
    };
    let request = PageRequest::new(query.page, query.limit);
    let page = state.transit_store.list_jeepneys(&filter, request)?;

    Ok(Json(Paginated::new(page, request)))
}

/// GET /api/jeepneys/:id
pub async fn get_jeepney<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
) -> Result<Json<Jeepney>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    state
        .transit_store
        .get_jeepney(JeepneyId(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Jeepney".into()))
}

#[derive(Deserialize)]
pub struct JeepneyRequest {
    #[serde(default)]
    pub plate_number: String,
    pub route_id: Option<u64>,
    pub driver_id: Option<u64>,
    pub capacity: Option<i64>,
    pub active: Option<bool>,
}

/// Validate a create or update request against the stores
fn validate<U, T>(state: &AppState<U, T>, req: &JeepneyRequest) -> Result<JeepneyFields, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();

    let plate_number = errors.check("plate_number", validate_plate_number(&req.plate_number));

    let capacity = match req.capacity {
        Some(c) if CAPACITY_RANGE.contains(&c) => Some(c as u32),
        Some(_) => {
            errors.add("capacity", "Capacity must be between 1 and 40");
            None
        }
        None => {
            errors.add("capacity", "This field is required");
            None
        }
    };

    let route_id = req.route_id.map(RouteId);
    if let Some(route_id) = route_id {
        if state.transit_store.get_route(route_id)?.is_none() {
            errors.add("route_id", "Route does not exist");
        }
    }

    let driver_id = req.driver_id.map(UserId);
    if let Some(driver_id) = driver_id {
        match state.user_store.get_user(driver_id)? {
            Some(user) if user.role == Role::Driver => {}
            Some(_) => errors.add("driver_id", "User is not a driver"),
            None => errors.add("driver_id", "Driver does not exist"),
        }
    }

    errors.into_result()?;

    match (plate_number, capacity) {
        (Some(plate_number), Some(capacity)) => Ok(JeepneyFields {
            plate_number,
            route_id,
            driver_id,
            capacity,
            active: req.active.unwrap_or(true),
        }),
        _ => Err(ApiError::Internal("validated jeepney fields missing".into())),
    }
}

/// POST /api/jeepneys
pub async fn create_jeepney<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Json(req): Json<JeepneyRequest>,
) -> Result<(StatusCode, Json<Jeepney>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let fields = validate(&state, &req)?;
    let jeepney = state.transit_store.create_jeepney(fields)?;
    tracing::info!(jeepney_id = jeepney.id.0, plate = %jeepney.plate_number, "Jeepney registered");

    Ok((StatusCode::CREATED, Json(jeepney)))
}

/// PUT /api/jeepneys/:id
pub async fn update_jeepney<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<JeepneyRequest>,
) -> Result<Json<Jeepney>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let fields = validate(&state, &req)?;
    let jeepney = state.transit_store.update_jeepney(JeepneyId(id), fields)?;

    Ok(Json(jeepney))
}
