//! Storage abstractions for the backend

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{InMemoryTransitStore, InMemoryUserStore};
pub use models::*;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use transit_core::{ApplicationStatus, VerificationStatus};

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for user storage
pub trait UserStore: Send + Sync {
    /// Insert or refresh a user keyed by Auth0 subject id
    ///
    /// On update the Auth0 id, role and verification status are kept.
    fn upsert_synced(&self, profile: &SyncedProfile) -> StoreResult<UpsertOutcome>;

    /// Create an admin-entered user; a taken email or Auth0 id is a conflict
    fn create_user(&self, user: NewUser) -> StoreResult<UserId>;

    /// Get a user by ID
    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// List users matching a filter, ordered by ID
    fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>>;

    /// Apply a profile edit
    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()>;

    /// Record an admin verification decision
    fn set_verification(&self, user_id: UserId, status: VerificationStatus) -> StoreResult<()>;

    /// Store a discount application, replacing any earlier one
    fn submit_discount(&self, user_id: UserId, application: DiscountApplication)
        -> StoreResult<()>;

    /// Record an admin decision on the user's discount application
    fn review_discount(
        &self,
        user_id: UserId,
        status: ApplicationStatus,
    ) -> StoreResult<DiscountApplication>;
}

/// Trait for routes, checkpoints, fares and jeepneys
pub trait TransitStore: Send + Sync {
    /// Create a route; names are unique
    fn create_route(&self, name: &str) -> StoreResult<RouteRecord>;

    fn get_route(&self, route_id: RouteId) -> StoreResult<Option<RouteRecord>>;

    fn list_routes(&self) -> StoreResult<Vec<RouteRecord>>;

    /// Append a checkpoint at the end of a route
    fn add_checkpoint(&self, route_id: RouteId, checkpoint: NewCheckpoint)
        -> StoreResult<CheckpointRecord>;

    /// Checkpoints of a route ordered by sequence
    fn list_checkpoints(&self, route_id: RouteId) -> StoreResult<Vec<CheckpointRecord>>;

    /// Edit a checkpoint; a rename is carried into the route's fare entries
    fn update_checkpoint(
        &self,
        checkpoint_id: CheckpointId,
        update: &CheckpointUpdate,
    ) -> StoreResult<CheckpointRecord>;

    fn create_fare(&self, fare: NewFare) -> StoreResult<FareRecord>;

    fn get_fare(&self, fare_id: FareId) -> StoreResult<Option<FareRecord>>;

    fn update_fare(&self, fare_id: FareId, fare: f64) -> StoreResult<FareRecord>;

    /// List fare entries matching a filter, in insertion order
    fn list_fares(&self, filter: &FareFilter, page: PageRequest) -> StoreResult<Page<FareRecord>>;

    /// All fare entries of a route in insertion order
    fn route_fares(&self, route_id: RouteId) -> StoreResult<Vec<FareRecord>>;

    /// Create a jeepney; plate numbers are unique
    fn create_jeepney(&self, fields: JeepneyFields) -> StoreResult<Jeepney>;

    fn get_jeepney(&self, jeepney_id: JeepneyId) -> StoreResult<Option<Jeepney>>;

    fn update_jeepney(&self, jeepney_id: JeepneyId, fields: JeepneyFields) -> StoreResult<Jeepney>;

    fn list_jeepneys(
        &self,
        filter: &JeepneyFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Jeepney>>;
}

impl<T: UserStore + ?Sized> UserStore for Arc<T> {
    fn upsert_synced(&self, profile: &SyncedProfile) -> StoreResult<UpsertOutcome> {
        (**self).upsert_synced(profile)
    }

    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        (**self).create_user(user)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        (**self).get_user(user_id)
    }

    fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>> {
        (**self).list_users(filter, page)
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        (**self).update_profile(user_id, update)
    }

    fn set_verification(&self, user_id: UserId, status: VerificationStatus) -> StoreResult<()> {
        (**self).set_verification(user_id, status)
    }

    fn submit_discount(
        &self,
        user_id: UserId,
        application: DiscountApplication,
    ) -> StoreResult<()> {
        (**self).submit_discount(user_id, application)
    }

    fn review_discount(
        &self,
        user_id: UserId,
        status: ApplicationStatus,
    ) -> StoreResult<DiscountApplication> {
        (**self).review_discount(user_id, status)
    }
}

impl<T: TransitStore + ?Sized> TransitStore for Arc<T> {
    fn create_route(&self, name: &str) -> StoreResult<RouteRecord> {
        (**self).create_route(name)
    }

    fn get_route(&self, route_id: RouteId) -> StoreResult<Option<RouteRecord>> {
        (**self).get_route(route_id)
    }

    fn list_routes(&self) -> StoreResult<Vec<RouteRecord>> {
        (**self).list_routes()
    }

    fn add_checkpoint(
        &self,
        route_id: RouteId,
        checkpoint: NewCheckpoint,
    ) -> StoreResult<CheckpointRecord> {
        (**self).add_checkpoint(route_id, checkpoint)
    }

    fn list_checkpoints(&self, route_id: RouteId) -> StoreResult<Vec<CheckpointRecord>> {
        (**self).list_checkpoints(route_id)
    }

    fn update_checkpoint(
        &self,
        checkpoint_id: CheckpointId,
        update: &CheckpointUpdate,
    ) -> StoreResult<CheckpointRecord> {
        (**self).update_checkpoint(checkpoint_id, update)
    }

    fn create_fare(&self, fare: NewFare) -> StoreResult<FareRecord> {
        (**self).create_fare(fare)
    }

    fn get_fare(&self, fare_id: FareId) -> StoreResult<Option<FareRecord>> {
        (**self).get_fare(fare_id)
    }

    fn update_fare(&self, fare_id: FareId, fare: f64) -> StoreResult<FareRecord> {
        (**self).update_fare(fare_id, fare)
    }

    fn list_fares(&self, filter: &FareFilter, page: PageRequest) -> StoreResult<Page<FareRecord>> {
        (**self).list_fares(filter, page)
    }

    fn route_fares(&self, route_id: RouteId) -> StoreResult<Vec<FareRecord>> {
        (**self).route_fares(route_id)
    }

    fn create_jeepney(&self, fields: JeepneyFields) -> StoreResult<Jeepney> {
        (**self).create_jeepney(fields)
    }

    fn get_jeepney(&self, jeepney_id: JeepneyId) -> StoreResult<Option<Jeepney>> {
        (**self).get_jeepney(jeepney_id)
    }

    fn update_jeepney(&self, jeepney_id: JeepneyId, fields: JeepneyFields) -> StoreResult<Jeepney> {
        (**self).update_jeepney(jeepney_id, fields)
    }

    fn list_jeepneys(
        &self,
        filter: &JeepneyFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Jeepney>> {
        (**self).list_jeepneys(filter, page)
    }
}
