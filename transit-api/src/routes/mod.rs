//! HTTP routes for the backend

mod checkpoints;
mod extract;
mod fares;
mod jeepneys;
mod sync;
mod users;

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post, put, MethodRouter};
use axum::Router;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth0::ACTION_HEADER;
use crate::config::CorsOrigin;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{Page, PageRequest, TransitStore, UserStore};

/// Create the router with all routes, allowing any origin
pub fn create_router<U, T>(state: Arc<AppState<U, T>>) -> Router
where
    U: UserStore + 'static,
    T: TransitStore + 'static,
{
    create_router_with_cors(state, &CorsOrigin::Any)
}

/// Create the router with a configured CORS origin policy
pub fn create_router_with_cors<U, T>(state: Arc<AppState<U, T>>, origin: &CorsOrigin) -> Router
where
    U: UserStore + 'static,
    T: TransitStore + 'static,
{
    Router::new()
        .route(
            "/api/auth0/sync-user",
            strict(post(sync::sync_user).options(sync::preflight)),
        )
        .route("/api/users", strict(get(users::list_users).post(users::create_user)))
        .route("/api/users/:id", strict(get(users::get_user).put(users::update_user)))
        .route("/api/users/:id/verification", strict(post(users::set_verification)))
        .route("/api/users/:id/discount", strict(post(users::submit_discount)))
        .route("/api/users/:id/discount/review", strict(post(users::review_discount)))
        .route(
            "/api/jeepneys",
            strict(get(jeepneys::list_jeepneys).post(jeepneys::create_jeepney)),
        )
        .route(
            "/api/jeepneys/:id",
            strict(get(jeepneys::get_jeepney).put(jeepneys::update_jeepney)),
        )
        .route(
            "/api/routes",
            strict(get(checkpoints::list_routes).post(checkpoints::create_route)),
        )
        .route(
            "/api/routes/:id/checkpoints",
            strict(get(checkpoints::list_checkpoints).post(checkpoints::add_checkpoint)),
        )
        .route("/api/checkpoints/:id", strict(put(checkpoints::update_checkpoint)))
        .route("/api/fares", strict(get(fares::list_fares).post(fares::create_fare)))
        .route("/api/fares/lookup", strict(get(fares::lookup_fare)))
        .route("/api/fares/destinations", strict(get(fares::list_destinations)))
        .route("/api/fares/:id", strict(get(fares::get_fare).put(fares::update_fare)))
        .fallback(not_found)
        .layer(cors_layer(origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Answer unsupported methods on a known path like an unknown path
fn strict<S>(route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.fallback(not_found)
}

async fn not_found() -> ApiError {
    ApiError::RouteNotFound
}

fn cors_layer(origin: &CorsOrigin) -> CorsLayer {
    let allow_origin = match origin {
        CorsOrigin::Any => AllowOrigin::any(),
        CorsOrigin::List(origins) => AllowOrigin::list(
            origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        ),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(ACTION_HEADER),
        ])
}

/// Pagination block of a list response
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

/// Body of every list endpoint
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    pub fn new(page: Page<T>, request: PageRequest) -> Self {
        let limit = u64::from(request.limit);
        Self {
            pagination: Pagination {
                page: request.page,
                limit: request.limit,
                total: page.total,
                total_pages: page.total.div_ceil(limit),
            },
            data: page.items,
        }
    }
}

/// Trimmed value of an optional text field, `None` when blank
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = Page {
            items: vec![1, 2, 3],
            total: 23,
        };
        let body = Paginated::new(page, PageRequest::new(Some(3), Some(10)));

        assert_eq!(body.pagination.total_pages, 3);
        assert_eq!(body.pagination.page, 3);
        assert_eq!(body.data.len(), 3);
    }

    #[test]
    fn test_empty_list_has_no_pages() {
        let page: Page<u32> = Page {
            items: vec![],
            total: 0,
        };
        let body = Paginated::new(page, PageRequest::default());
        assert_eq!(body.pagination.total_pages, 0);
    }
}
