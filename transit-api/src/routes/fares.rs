//! Fare matrix endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use transit_core::validation::required;
use transit_core::{
    discounted_fare, DiscountCategory, FareSegment, FareTable, Route, ValidationErrors,
};

use super::extract::{Json, Path, Query};
use super::{present, Paginated};
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{
    FareFilter, FareId, FareRecord, NewFare, PageRequest, RouteId, RouteRecord, TransitStore,
    UserId, UserStore,
};

fn load_route<T: TransitStore>(store: &T, route_id: RouteId) -> Result<RouteRecord, ApiError> {
    store
        .get_route(route_id)?
        .ok_or_else(|| ApiError::NotFound("Transit route".into()))
}

/// The stored fare entries of a route as a lookup table
fn route_table<T: TransitStore>(store: &T, route_id: RouteId) -> Result<FareTable, ApiError> {
    let fares = store.route_fares(route_id)?;
    Ok(FareTable::from_segments(fares.iter().map(FareRecord::segment))?)
}

fn check_fare(errors: &mut ValidationErrors, fare: Option<f64>) -> Option<f64> {
    match fare {
        Some(f) if f.is_finite() && f >= 0.0 => Some(f),
        Some(_) => {
            errors.add("fare", "Fare must be a non-negative amount");
            None
        }
        None => {
            errors.add("fare", "This field is required");
            None
        }
    }
}

#[derive(Deserialize)]
pub struct ListFaresQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub route_id: Option<u64>,
    pub search: Option<String>,
}

/// GET /api/fares
pub async fn list_fares<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Query(query): Query<ListFaresQuery>,
) -> Result<Json<Paginated<FareRecord>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let filter = FareFilter {
        route_id: query.route_id.map(RouteId),
        search: present(&query.search).map(String::from),
    };
    let request = PageRequest::new(query.page, query.limit);
    let page = state.transit_store.list_fares(&filter, request)?;

    Ok(Json(Paginated::new(page, request)))
}

#[derive(Deserialize)]
pub struct CreateFareRequest {
    pub route_id: u64,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    pub fare: Option<f64>,
}

/// POST /api/fares
/// Add a fare matrix entry between two checkpoints of a route
pub async fn create_fare<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Json(req): Json<CreateFareRequest>,
) -> Result<(StatusCode, Json<FareRecord>), ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let route_id = RouteId(req.route_id);
    let record = load_route(&state.transit_store, route_id)?;
    let checkpoints = state.transit_store.list_checkpoints(route_id)?;
    let route = Route::new(record.name, checkpoints.into_iter().map(|c| c.name))?;

    let mut errors = ValidationErrors::new();
    let mut endpoint = |field: &str, value: &str| {
        let name = errors.check(field, required(value))?;
        if route.contains(name) {
            Some(name.to_string())
        } else {
            errors.add(field, format!("{} is not a checkpoint of this route", name));
            None
        }
    };
    let from = endpoint("from", &req.from);
    let to = endpoint("to", &req.to);
    if from.is_some() && from == to {
        errors.add("to", "Destination must differ from origin");
    }
    let fare = check_fare(&mut errors, req.fare);
    errors.into_result()?;

    let (Some(from), Some(to), Some(fare)) = (from, to, fare) else {
        return Err(ApiError::Internal("validated fare fields missing".into()));
    };
    // Same rules the lookup table enforces
    FareTable::for_route(&route, [FareSegment::new(from.as_str(), to.as_str(), fare)?])?;

    let record = state.transit_store.create_fare(NewFare {
        route_id,
        from,
        to,
        fare,
    })?;
    tracing::info!(
        fare_id = record.id.0,
        route_id = route_id.0,
        from = %record.from,
        to = %record.to,
        fare = record.fare,
        "Fare entry added"
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/fares/:id
pub async fn get_fare<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
) -> Result<Json<FareRecord>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    state
        .transit_store
        .get_fare(FareId(id))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Fare".into()))
}

#[derive(Deserialize)]
pub struct UpdateFareRequest {
    pub fare: Option<f64>,
}

/// PUT /api/fares/:id
pub async fn update_fare<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Path(id): Path<u64>,
    Json(req): Json<UpdateFareRequest>,
) -> Result<Json<FareRecord>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let mut errors = ValidationErrors::new();
    let fare = check_fare(&mut errors, req.fare);
    errors.into_result()?;

    let record = state
        .transit_store
        .update_fare(FareId(id), fare.unwrap_or_default())?;
    Ok(Json(record))
}

#[derive(Deserialize)]
pub struct LookupQuery {
    pub route_id: u64,
    pub from: String,
    pub to: String,
    /// Passenger whose approved discount should be applied
    pub user_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub route_id: RouteId,
    pub from: String,
    pub to: String,
    pub fare: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_category: Option<DiscountCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discounted_fare: Option<f64>,
}

/// GET /api/fares/lookup
/// Exact-match fare for a directed checkpoint pair
pub async fn lookup_fare<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let route_id = RouteId(query.route_id);
    load_route(&state.transit_store, route_id)?;

    let from = query.from.trim();
    let to = query.to.trim();
    let fare = route_table(&state.transit_store, route_id)?
        .lookup(from, to)
        .ok_or_else(|| ApiError::NotFound("Fare".into()))?;

    let discount_category = match query.user_id {
        Some(id) => state
            .user_store
            .get_user(UserId(id))?
            .ok_or_else(|| ApiError::NotFound("User".into()))?
            .discount
            .and_then(|application| application.approved_category()),
        None => None,
    };

    Ok(Json(LookupResponse {
        route_id,
        from: from.to_string(),
        to: to.to_string(),
        fare,
        discount_category,
        discounted_fare: discount_category.map(|category| discounted_fare(fare, category)),
    }))
}

#[derive(Deserialize)]
pub struct DestinationsQuery {
    pub route_id: u64,
    pub from: String,
}

/// GET /api/fares/destinations
/// Fare entries leaving a checkpoint, for destination pickers
pub async fn list_destinations<U, T>(
    State(state): State<Arc<AppState<U, T>>>,
    Query(query): Query<DestinationsQuery>,
) -> Result<Json<Vec<FareSegment>>, ApiError>
where
    U: UserStore,
    T: TransitStore,
{
    let route_id = RouteId(query.route_id);
    load_route(&state.transit_store, route_id)?;

    let table = route_table(&state.transit_store, route_id)?;
    let from = query.from.trim();
    let mut destinations: Vec<FareSegment> = Vec::new();
    for segment in table.segments_from(from) {
        // Later duplicates never win a lookup, so they are not offered
        if !destinations.iter().any(|d| d.to == segment.to) {
            destinations.push(segment.clone());
        }
    }

    Ok(Json(destinations))
}
