//! Transit route and checkpoint endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use transit_core::validation::required;
use transit_core::ValidationErrors;

use super::extract::{Json, Path};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{
    CheckpointId, CheckpointRecord, CheckpointUpdate, NewCheckpoint, RouteId, RouteRecord,
    TransitStore, UserStore,
};

/// GET /api/routes
pub async fn list_routes<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
) -> Result<Json<Vec<RouteRecord>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    Ok(Json(state.transit_store.list_routes()?))
}

#[derive(Deserialize)]
pub struct CreateRouteRequest {
    #[serde(default)]
    pub name: String,
}

/// POST /api/routes
pub async fn create_route<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteRecord>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let name = required(&req.name).map_err(|msg| ApiError::invalid_field("name", msg))?;
    let route = state.transit_store.create_route(name)?;
    tracing::info!(route_id = route.id.0, name = %route.name, "Route created");

    Ok((StatusCode::CREATED, Json(route)))
}

/// GET /api/routes/:id/checkpoints
/// Checkpoints in travel order
pub async fn list_checkpoints<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<CheckpointRecord>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let route_id = RouteId(id);
    if state.transit_store.get_route(route_id)?.is_none() {
        return Err(ApiError::NotFound("Transit route".into()));
    }
    Ok(Json(state.transit_store.list_checkpoints(route_id)?))
}

fn check_coordinates(errors: &mut ValidationErrors, latitude: Option<f64>, longitude: Option<f64>) {
    if let Some(lat) = latitude {
        if !(-90.0..=90.0).contains(&lat) {
            errors.add("latitude", "Latitude must be between -90 and 90");
        }
    }
    if let Some(long) = longitude {
        if !(-180.0..=180.0).contains(&long) {
            errors.add("longitude", "Longitude must be between -180 and 180");
        }
    }
}

#[derive(Deserialize)]
pub struct CheckpointRequest {
    #[serde(default)]
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// POST /api/routes/:id/checkpoints
/// Append a checkpoint to the end of a route
pub async fn add_checkpoint<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<CheckpointRequest>,
) -> Result<(StatusCode, Json<CheckpointRecord>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();
    let name = errors.check("name", required(&req.name)).map(String::from);
    check_coordinates(&mut errors, req.latitude, req.longitude);
    errors.into_result()?;

    let checkpoint = state.transit_store.add_checkpoint(
        RouteId(id),
        NewCheckpoint {
            name: name.unwrap_or_default(),
            latitude: req.latitude,
            longitude: req.longitude,
        },
    )?;
    tracing::info!(
        route_id = id,
        sequence = checkpoint.sequence,
        name = %checkpoint.name,
        "Checkpoint added"
    );

    Ok((StatusCode::CREATED, Json(checkpoint)))
}

#[derive(Deserialize)]
pub struct UpdateCheckpointRequest {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// PUT /api/checkpoints/:id
pub async fn update_checkpoint<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateCheckpointRequest>,
) -> Result<Json<CheckpointRecord>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();
    let name = req
        .name
        .as_deref()
        .and_then(|n| errors.check("name", required(n)).map(String::from));
    check_coordinates(&mut errors, req.latitude, req.longitude);
    errors.into_result()?;

    let update = CheckpointUpdate {
        name,
        latitude: req.latitude,
        longitude: req.longitude,
    };
    Ok(Json(
        state
            .transit_store
            .update_checkpoint(CheckpointId(id), &update)?,
    ))
}
