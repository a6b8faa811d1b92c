//! In-memory storage implementations

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use transit_core::{ApplicationStatus, VerificationStatus};

use super::{
    CheckpointId, CheckpointRecord, CheckpointUpdate, DiscountApplication, FareFilter, FareId,
    FareRecord, Jeepney, JeepneyFields, JeepneyFilter, JeepneyId, NewCheckpoint, NewFare,
    NewUser, Page, PageRequest, ProfileUpdate, RouteId, RouteRecord, StoreResult, SyncedProfile,
    TransitStore, UpsertOutcome, User, UserFilter, UserId, UserStore,
};
use crate::error::ApiError;

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory user store
pub struct InMemoryUserStore {
    users: RwLock<BTreeMap<UserId, User>>,
    next_user_id: AtomicU64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            next_user_id: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> UserId {
        UserId(self.next_user_id.fetch_add(1, Ordering::SeqCst))
    }

    fn modify<R>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut User) -> StoreResult<R>,
    ) -> StoreResult<R> {
        let mut users = write(&self.users);
        let user = users
            .get_mut(&user_id)
            .ok_or_else(|| ApiError::NotFound("User".into()))?;
        let result = f(user)?;
        user.updated_at = Utc::now();
        Ok(result)
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryUserStore {
    fn upsert_synced(&self, profile: &SyncedProfile) -> StoreResult<UpsertOutcome> {
        let mut users = write(&self.users);
        let now = Utc::now();

        if let Some(user) = users.values_mut().find(|u| u.auth0_id == profile.auth0_id) {
            user.email = profile.email.to_lowercase();
            user.name = profile.name.clone();
            user.email_verified = profile.email_verified;
            user.provider = profile.provider.clone();
            user.app_metadata = profile.app_metadata.clone();
            user.user_metadata = profile.user_metadata.clone();
            user.updated_at = now;
            return Ok(UpsertOutcome::Updated(user.id));
        }

        let id = self.next_id();
        users.insert(
            id,
            User {
                id,
                auth0_id: profile.auth0_id.clone(),
                email: profile.email.to_lowercase(),
                name: profile.name.clone(),
                email_verified: profile.email_verified,
                provider: profile.provider.clone(),
                role: profile.role,
                verification: VerificationStatus::Pending,
                phone: None,
                birthdate: None,
                address: None,
                postal_code: None,
                discount: None,
                password_hash: None,
                app_metadata: profile.app_metadata.clone(),
                user_metadata: profile.user_metadata.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(UpsertOutcome::Created(id))
    }

    fn create_user(&self, new_user: NewUser) -> StoreResult<UserId> {
        let mut users = write(&self.users);
        if users.values().any(|u| u.auth0_id == new_user.auth0_id) {
            return Err(ApiError::Conflict("User already exists".into()));
        }
        let email = new_user.email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(ApiError::Conflict("Email already registered".into()));
        }

        let id = self.next_id();
        let now = Utc::now();
        users.insert(
            id,
            User {
                id,
                auth0_id: new_user.auth0_id,
                email,
                name: Some(new_user.name),
                email_verified: false,
                provider: None,
                role: new_user.role,
                verification: VerificationStatus::Pending,
                phone: new_user.phone,
                birthdate: new_user.birthdate,
                address: new_user.address,
                postal_code: new_user.postal_code,
                discount: None,
                password_hash: new_user.password_hash,
                app_metadata: serde_json::Value::Null,
                user_metadata: serde_json::Value::Null,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(read(&self.users).get(&user_id).cloned())
    }

    fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>> {
        let users = read(&self.users);
        let matching: Vec<User> = users.values().filter(|u| filter.matches(u)).cloned().collect();
        Ok(page.slice(&matching))
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        self.modify(user_id, |user| {
            if let Some(name) = &update.name {
                user.name = Some(name.clone());
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            if let Some(phone) = &update.phone {
                user.phone = Some(phone.clone());
            }
            if let Some(birthdate) = update.birthdate {
                user.birthdate = Some(birthdate);
            }
            if let Some(address) = &update.address {
                user.address = Some(address.clone());
            }
            if let Some(postal_code) = &update.postal_code {
                user.postal_code = Some(postal_code.clone());
            }
            Ok(())
        })
    }

    fn set_verification(&self, user_id: UserId, status: VerificationStatus) -> StoreResult<()> {
        self.modify(user_id, |user| {
            user.verification = status;
            Ok(())
        })
    }

    fn submit_discount(
        &self,
        user_id: UserId,
        application: DiscountApplication,
    ) -> StoreResult<()> {
        self.modify(user_id, |user| {
            user.discount = Some(application);
            Ok(())
        })
    }

    fn review_discount(
        &self,
        user_id: UserId,
        status: ApplicationStatus,
    ) -> StoreResult<DiscountApplication> {
        self.modify(user_id, |user| {
            let application = user
                .discount
                .as_mut()
                .ok_or_else(|| ApiError::NotFound("Discount application".into()))?;
            application.status = status;
            application.reviewed_at = Some(Utc::now());
            Ok(application.clone())
        })
    }
}

#[derive(Default)]
struct TransitData {
    routes: BTreeMap<RouteId, RouteRecord>,
    checkpoints: BTreeMap<CheckpointId, CheckpointRecord>,
    fares: BTreeMap<FareId, FareRecord>,
    jeepneys: BTreeMap<JeepneyId, Jeepney>,
}

/// Ids count up per table from 1; nothing is ever deleted
fn next_id<K: Copy, V>(table: &BTreeMap<K, V>, raw: impl Fn(K) -> u64) -> u64 {
    table.keys().next_back().map_or(1, |k| raw(*k) + 1)
}

impl TransitData {
    fn plate_taken(&self, plate: &str, except: Option<JeepneyId>) -> bool {
        self.jeepneys
            .values()
            .any(|j| j.plate_number == plate && Some(j.id) != except)
    }
}

/// In-memory route, checkpoint, fare and jeepney store
pub struct InMemoryTransitStore {
    data: RwLock<TransitData>,
}

impl InMemoryTransitStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(TransitData::default()),
        }
    }
}

impl Default for InMemoryTransitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitStore for InMemoryTransitStore {
    fn create_route(&self, name: &str) -> StoreResult<RouteRecord> {
        let mut data = write(&self.data);
        if data.routes.values().any(|r| r.name == name) {
            return Err(ApiError::Conflict(format!("Route {} already exists", name)));
        }
        let route = RouteRecord {
            id: RouteId(next_id(&data.routes, |k| k.0)),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        data.routes.insert(route.id, route.clone());
        Ok(route)
    }

    fn get_route(&self, route_id: RouteId) -> StoreResult<Option<RouteRecord>> {
        Ok(read(&self.data).routes.get(&route_id).cloned())
    }

    fn list_routes(&self) -> StoreResult<Vec<RouteRecord>> {
        Ok(read(&self.data).routes.values().cloned().collect())
    }

    fn add_checkpoint(
        &self,
        route_id: RouteId,
        checkpoint: NewCheckpoint,
    ) -> StoreResult<CheckpointRecord> {
        let mut data = write(&self.data);
        if !data.routes.contains_key(&route_id) {
            return Err(ApiError::NotFound("Transit route".into()));
        }

        let on_route: Vec<&CheckpointRecord> = data
            .checkpoints
            .values()
            .filter(|c| c.route_id == route_id)
            .collect();
        if on_route.iter().any(|c| c.name == checkpoint.name) {
            return Err(ApiError::Conflict(format!(
                "Checkpoint {} already exists on this route",
                checkpoint.name
            )));
        }
        let sequence = on_route.iter().map(|c| c.sequence + 1).max().unwrap_or(0);

        let record = CheckpointRecord {
            id: CheckpointId(next_id(&data.checkpoints, |k| k.0)),
            route_id,
            name: checkpoint.name,
            sequence,
            latitude: checkpoint.latitude,
            longitude: checkpoint.longitude,
        };
        data.checkpoints.insert(record.id, record.clone());
        Ok(record)
    }

    fn list_checkpoints(&self, route_id: RouteId) -> StoreResult<Vec<CheckpointRecord>> {
        let data = read(&self.data);
        let mut checkpoints: Vec<CheckpointRecord> = data
            .checkpoints
            .values()
            .filter(|c| c.route_id == route_id)
            .cloned()
            .collect();
        checkpoints.sort_by_key(|c| c.sequence);
        Ok(checkpoints)
    }

    fn update_checkpoint(
        &self,
        checkpoint_id: CheckpointId,
        update: &CheckpointUpdate,
    ) -> StoreResult<CheckpointRecord> {
        let mut data = write(&self.data);
        let current = data
            .checkpoints
            .get(&checkpoint_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("Checkpoint".into()))?;

        if let Some(name) = &update.name {
            if *name != current.name {
                let taken = data
                    .checkpoints
                    .values()
                    .any(|c| c.route_id == current.route_id && c.name == *name);
                if taken {
                    return Err(ApiError::Conflict(format!(
                        "Checkpoint {} already exists on this route",
                        name
                    )));
                }
                for fare in data
                    .fares
                    .values_mut()
                    .filter(|f| f.route_id == current.route_id)
                {
                    if fare.from == current.name {
                        fare.from = name.clone();
                    }
                    if fare.to == current.name {
                        fare.to = name.clone();
                    }
                }
            }
        }

        let record = data
            .checkpoints
            .get_mut(&checkpoint_id)
            .ok_or_else(|| ApiError::NotFound("Checkpoint".into()))?;
        if let Some(name) = &update.name {
            record.name = name.clone();
        }
        if update.latitude.is_some() {
            record.latitude = update.latitude;
        }
        if update.longitude.is_some() {
            record.longitude = update.longitude;
        }
        Ok(record.clone())
    }

    fn create_fare(&self, fare: NewFare) -> StoreResult<FareRecord> {
        let mut data = write(&self.data);
        if !data.routes.contains_key(&fare.route_id) {
            return Err(ApiError::NotFound("Transit route".into()));
        }
        let record = FareRecord {
            id: FareId(next_id(&data.fares, |k| k.0)),
            route_id: fare.route_id,
            from: fare.from,
            to: fare.to,
            fare: fare.fare,
        };
        data.fares.insert(record.id, record.clone());
        Ok(record)
    }

    fn get_fare(&self, fare_id: FareId) -> StoreResult<Option<FareRecord>> {
        Ok(read(&self.data).fares.get(&fare_id).cloned())
    }

    fn update_fare(&self, fare_id: FareId, fare: f64) -> StoreResult<FareRecord> {
        let mut data = write(&self.data);
        let record = data
            .fares
            .get_mut(&fare_id)
            .ok_or_else(|| ApiError::NotFound("Fare".into()))?;
        record.fare = fare;
        Ok(record.clone())
    }

    fn list_fares(&self, filter: &FareFilter, page: PageRequest) -> StoreResult<Page<FareRecord>> {
        let data = read(&self.data);
        let matching: Vec<FareRecord> = data
            .fares
            .values()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }

    fn route_fares(&self, route_id: RouteId) -> StoreResult<Vec<FareRecord>> {
        Ok(read(&self.data)
            .fares
            .values()
            .filter(|f| f.route_id == route_id)
            .cloned()
            .collect())
    }

    fn create_jeepney(&self, fields: JeepneyFields) -> StoreResult<Jeepney> {
        let mut data = write(&self.data);
        if data.plate_taken(&fields.plate_number, None) {
            return Err(ApiError::Conflict(format!(
                "Plate number {} is already registered",
                fields.plate_number
            )));
        }
        let jeepney = Jeepney {
            id: JeepneyId(next_id(&data.jeepneys, |k| k.0)),
            plate_number: fields.plate_number,
            route_id: fields.route_id,
            driver_id: fields.driver_id,
            capacity: fields.capacity,
            active: fields.active,
            created_at: Utc::now(),
        };
        data.jeepneys.insert(jeepney.id, jeepney.clone());
        Ok(jeepney)
    }

    fn get_jeepney(&self, jeepney_id: JeepneyId) -> StoreResult<Option<Jeepney>> {
        Ok(read(&self.data).jeepneys.get(&jeepney_id).cloned())
    }

    fn update_jeepney(&self, jeepney_id: JeepneyId, fields: JeepneyFields) -> StoreResult<Jeepney> {
        let mut data = write(&self.data);
        if data.plate_taken(&fields.plate_number, Some(jeepney_id)) {
            return Err(ApiError::Conflict(format!(
                "Plate number {} is already registered",
                fields.plate_number
            )));
        }
        let jeepney = data
            .jeepneys
            .get_mut(&jeepney_id)
            .ok_or_else(|| ApiError::NotFound("Jeepney".into()))?;
        jeepney.plate_number = fields.plate_number;
        jeepney.route_id = fields.route_id;
        jeepney.driver_id = fields.driver_id;
        jeepney.capacity = fields.capacity;
        jeepney.active = fields.active;
        Ok(jeepney.clone())
    }

    fn list_jeepneys(
        &self,
        filter: &JeepneyFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Jeepney>> {
        let data = read(&self.data);
        let matching: Vec<Jeepney> = data
            .jeepneys
            .values()
            .filter(|j| filter.matches(j))
            .cloned()
            .collect();
        Ok(page.slice(&matching))
    }
}
