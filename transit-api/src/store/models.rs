//! Data models for backend storage

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use transit_core::{ApplicationStatus, DiscountCategory, FareSegment, Role, VerificationStatus};

/// Local user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub u64);

/// Jeepney identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JeepneyId(pub u64);

/// Transit route identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteId(pub u64);

/// Checkpoint identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckpointId(pub u64);

/// Fare matrix entry identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FareId(pub u64);

/// A passenger's request for a discounted fare
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscountApplication {
    pub category: DiscountCategory,
    /// Reference to the uploaded proof document
    pub document: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl DiscountApplication {
    pub fn new(category: DiscountCategory, document: String) -> Self {
        Self {
            category,
            document,
            status: ApplicationStatus::Pending,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    /// Category the user may claim right now, if any
    pub fn approved_category(&self) -> Option<DiscountCategory> {
        (self.status == ApplicationStatus::Approved).then_some(self.category)
    }
}

/// A user mirrored from Auth0 or created by an admin
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    /// Auth0 subject id; never changes once stored
    pub auth0_id: String,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub provider: Option<String>,
    pub role: Role,
    pub verification: VerificationStatus,
    pub phone: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub discount: Option<DiscountApplication>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub app_metadata: Value,
    pub user_metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile fields the Auth0 sync writes
#[derive(Debug, Clone)]
pub struct SyncedProfile {
    pub auth0_id: String,
    pub email: String,
    pub name: Option<String>,
    pub email_verified: bool,
    pub provider: Option<String>,
    /// Only applied when the user is created
    pub role: Role,
    pub app_metadata: Value,
    pub user_metadata: Value,
}

/// Result of an Auth0 sync upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(UserId),
    Updated(UserId),
}

impl UpsertOutcome {
    pub fn user_id(&self) -> UserId {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

/// A user created from the admin panel
#[derive(Debug, Clone)]
pub struct NewUser {
    pub auth0_id: String,
    pub email: String,
    pub name: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub phone: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
}

/// Admin profile edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
    pub status: Option<VerificationStatus>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(status) = self.status {
            if user.verification != status {
                return false;
            }
        }
        if let Some(role) = self.role {
            if user.role != role {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                user.email.to_lowercase().contains(&term)
                    || user
                        .name
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(&term))
                        .unwrap_or(false)
            }
            None => true,
        }
    }
}

/// A jeepney unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Jeepney {
    pub id: JeepneyId,
    pub plate_number: String,
    pub route_id: Option<RouteId>,
    pub driver_id: Option<UserId>,
    pub capacity: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Writable jeepney fields; updates replace all of them
#[derive(Debug, Clone)]
pub struct JeepneyFields {
    pub plate_number: String,
    pub route_id: Option<RouteId>,
    pub driver_id: Option<UserId>,
    pub capacity: u32,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct JeepneyFilter {
    /// Case-insensitive match on plate number
    pub search: Option<String>,
    pub active: Option<bool>,
}

impl JeepneyFilter {
    pub fn matches(&self, jeepney: &Jeepney) -> bool {
        if let Some(active) = self.active {
            if jeepney.active != active {
                return false;
            }
        }
        match &self.search {
            Some(term) => jeepney
                .plate_number
                .to_lowercase()
                .contains(&term.to_lowercase()),
            None => true,
        }
    }
}

/// A stored transit route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRecord {
    pub id: RouteId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A stored checkpoint; `sequence` is its fixed position on the route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckpointRecord {
    pub id: CheckpointId,
    pub route_id: RouteId,
    pub name: String,
    pub sequence: u32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Checkpoint edit; the sequence is not editable
#[derive(Debug, Clone, Default)]
pub struct CheckpointUpdate {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A stored fare matrix entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareRecord {
    pub id: FareId,
    pub route_id: RouteId,
    pub from: String,
    pub to: String,
    pub fare: f64,
}

impl FareRecord {
    pub fn segment(&self) -> FareSegment {
        FareSegment {
            from: self.from.clone(),
            to: self.to.clone(),
            fare: self.fare,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewFare {
    pub route_id: RouteId,
    pub from: String,
    pub to: String,
    pub fare: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FareFilter {
    pub route_id: Option<RouteId>,
    /// Case-insensitive match on either checkpoint name
    pub search: Option<String>,
}

impl FareFilter {
    pub fn matches(&self, fare: &FareRecord) -> bool {
        if let Some(route_id) = self.route_id {
            if fare.route_id != route_id {
                return false;
            }
        }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                fare.from.to_lowercase().contains(&term) || fare.to.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Default page size for list endpoints
pub const DEFAULT_PAGE_LIMIT: u32 = 10;
/// Largest page size a client may ask for
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamp client-supplied values: page to at least 1, limit to 1..=100
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Slice an already-filtered, ordered list
    pub fn slice<T: Clone>(&self, items: &[T]) -> Page<T> {
        let start = (self.offset() as usize).min(items.len());
        let end = (start + self.limit as usize).min(items.len());
        Page {
            items: items[start..end].to_vec(),
            total: items.len() as u64,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the unpaginated total
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}
