//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::Value;
use transit_core::{ApplicationStatus, DiscountCategory, Role, VerificationStatus};

use super::{
    CheckpointId, CheckpointRecord, CheckpointUpdate, DiscountApplication, FareFilter, FareId,
    FareRecord, Jeepney, JeepneyFields, JeepneyFilter, JeepneyId, NewCheckpoint, NewFare,
    NewUser, Page, PageRequest, ProfileUpdate, RouteId, RouteRecord, StoreResult, SyncedProfile,
    TransitStore, UpsertOutcome, User, UserFilter, UserId, UserStore,
};
use crate::error::ApiError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const USER_COLUMNS: &str = "id, auth0_id, email, name, email_verified, provider, role, \
     verification, phone, birthdate, address, postal_code, password_hash, app_metadata, \
     user_metadata, discount_category, discount_document, discount_status, discount_submitted_at, \
     discount_reviewed_at, created_at, updated_at";

const CHECKPOINT_COLUMNS: &str = "id, route_id, name, sequence, latitude, longitude";
const FARE_COLUMNS: &str = "id, route_id, from_checkpoint, to_checkpoint, fare";
const JEEPNEY_COLUMNS: &str = "id, plate_number, route_id, driver_id, capacity, active, created_at";

/// SQLite-based store implementing both UserStore and TransitStore
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: rusqlite::Error) -> ApiError {
    ApiError::Database(e.to_string())
}

/// Map a unique-constraint failure to a conflict, anything else to a database error
fn conflict_or_db(message: String) -> impl FnOnce(rusqlite::Error) -> ApiError {
    move |e| {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            if err.code == rusqlite::ErrorCode::ConstraintViolation {
                return ApiError::Conflict(message);
            }
        }
        db_err(e)
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or(Value::Null)
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(db_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, ApiError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(db_err)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(db_err)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                auth0_id TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                name TEXT,
                email_verified INTEGER NOT NULL DEFAULT 0,
                provider TEXT,
                role TEXT NOT NULL DEFAULT 'passenger',
                verification TEXT NOT NULL DEFAULT 'pending',
                phone TEXT,
                birthdate TEXT,
                address TEXT,
                postal_code TEXT,
                password_hash TEXT,
                app_metadata TEXT NOT NULL DEFAULT 'null',
                user_metadata TEXT NOT NULL DEFAULT 'null',
                discount_category TEXT,
                discount_document TEXT,
                discount_status TEXT,
                discount_submitted_at TEXT,
                discount_reviewed_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS checkpoints (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_id INTEGER NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                sequence INTEGER NOT NULL,
                latitude REAL,
                longitude REAL,
                UNIQUE (route_id, name),
                UNIQUE (route_id, sequence)
            );

            CREATE TABLE IF NOT EXISTS fares (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                route_id INTEGER NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
                from_checkpoint TEXT NOT NULL,
                to_checkpoint TEXT NOT NULL,
                fare REAL NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_fares_route_id ON fares(route_id);

            CREATE TABLE IF NOT EXISTS jeepneys (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plate_number TEXT NOT NULL UNIQUE,
                route_id INTEGER REFERENCES routes(id) ON DELETE SET NULL,
                driver_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
                capacity INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(db_err)?;

        Ok(())
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let role: String = row.get(6)?;
    let verification: String = row.get(7)?;
    let birthdate: Option<String> = row.get(9)?;
    let app_metadata: String = row.get(13)?;
    let user_metadata: String = row.get(14)?;
    let discount_category: Option<String> = row.get(15)?;
    let discount_document: Option<String> = row.get(16)?;
    let discount_status: Option<String> = row.get(17)?;
    let discount_submitted_at: Option<String> = row.get(18)?;
    let discount_reviewed_at: Option<String> = row.get(19)?;
    let created_at: String = row.get(20)?;
    let updated_at: String = row.get(21)?;

    let category = discount_category.as_deref().and_then(DiscountCategory::parse);
    let discount = match (category, discount_document) {
        (Some(category), Some(document)) => Some(DiscountApplication {
            category,
            document,
            status: discount_status
                .as_deref()
                .and_then(ApplicationStatus::parse)
                .unwrap_or_default(),
            submitted_at: discount_submitted_at
                .as_deref()
                .map(parse_timestamp)
                .unwrap_or_else(Utc::now),
            reviewed_at: discount_reviewed_at.as_deref().map(parse_timestamp),
        }),
        _ => None,
    };

    Ok(User {
        id: UserId(row.get::<_, i64>(0)? as u64),
        auth0_id: row.get(1)?,
        email: row.get(2)?,
        name: row.get(3)?,
        email_verified: row.get::<_, i32>(4)? != 0,
        provider: row.get(5)?,
        role: Role::parse(&role).unwrap_or_default(),
        verification: VerificationStatus::parse(&verification).unwrap_or_default(),
        phone: row.get(8)?,
        birthdate: birthdate.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
        address: row.get(10)?,
        postal_code: row.get(11)?,
        discount,
        password_hash: row.get(12)?,
        app_metadata: parse_json(&app_metadata),
        user_metadata: parse_json(&user_metadata),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

fn checkpoint_from_row(row: &Row<'_>) -> rusqlite::Result<CheckpointRecord> {
    Ok(CheckpointRecord {
        id: CheckpointId(row.get::<_, i64>(0)? as u64),
        route_id: RouteId(row.get::<_, i64>(1)? as u64),
        name: row.get(2)?,
        sequence: row.get::<_, i64>(3)? as u32,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
    })
}

fn fare_from_row(row: &Row<'_>) -> rusqlite::Result<FareRecord> {
    Ok(FareRecord {
        id: FareId(row.get::<_, i64>(0)? as u64),
        route_id: RouteId(row.get::<_, i64>(1)? as u64),
        from: row.get(2)?,
        to: row.get(3)?,
        fare: row.get(4)?,
    })
}

fn jeepney_from_row(row: &Row<'_>) -> rusqlite::Result<Jeepney> {
    let created_at: String = row.get(6)?;
    Ok(Jeepney {
        id: JeepneyId(row.get::<_, i64>(0)? as u64),
        plate_number: row.get(1)?,
        route_id: row.get::<_, Option<i64>>(2)?.map(|id| RouteId(id as u64)),
        driver_id: row.get::<_, Option<i64>>(3)?.map(|id| UserId(id as u64)),
        capacity: row.get::<_, i64>(4)? as u32,
        active: row.get::<_, i32>(5)? != 0,
        created_at: parse_timestamp(&created_at),
    })
}

/// WHERE clause plus its positional parameters
struct Conditions {
    clauses: Vec<String>,
    values: Vec<SqlValue>,
}

impl Conditions {
    fn new() -> Self {
        Self {
            clauses: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a clause; each `?` in it is bound to one of `values` in order
    fn push(&mut self, clause: &str, values: impl IntoIterator<Item = SqlValue>) {
        self.clauses.push(clause.to_string());
        self.values.extend(values);
    }

    fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// Substring pattern for a `LIKE ? ESCAPE '\\'` clause; the term matches literally
fn like_pattern(term: &str) -> SqlValue {
    let mut pattern = String::from("%");
    for c in term.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    SqlValue::Text(pattern)
}

/// Run a filtered, paginated SELECT ordered by id
fn select_page<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    conditions: &Conditions,
    page: PageRequest,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> StoreResult<Page<T>> {
    let where_sql = conditions.where_sql();

    let total: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {}{}", table, where_sql),
            params_from_iter(conditions.values.iter()),
            |row| row.get(0),
        )
        .map_err(db_err)?;

    let mut values = conditions.values.clone();
    values.push(SqlValue::Integer(i64::from(page.limit)));
    values.push(SqlValue::Integer(page.offset() as i64));

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM {}{} ORDER BY id LIMIT ? OFFSET ?",
            columns, table, where_sql
        ))
        .map_err(db_err)?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), map)
        .map_err(db_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(db_err)?;

    Ok(Page {
        items,
        total: total as u64,
    })
}

impl SqliteStore {
    fn fetch_user(conn: &Connection, user_id: UserId) -> StoreResult<Option<User>> {
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            params![user_id.0 as i64],
            user_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn fetch_checkpoint(
        conn: &Connection,
        id: CheckpointId,
    ) -> StoreResult<Option<CheckpointRecord>> {
        conn.query_row(
            &format!("SELECT {} FROM checkpoints WHERE id = ?1", CHECKPOINT_COLUMNS),
            params![id.0 as i64],
            checkpoint_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn fetch_fare(conn: &Connection, id: FareId) -> StoreResult<Option<FareRecord>> {
        conn.query_row(
            &format!("SELECT {} FROM fares WHERE id = ?1", FARE_COLUMNS),
            params![id.0 as i64],
            fare_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn fetch_jeepney(conn: &Connection, id: JeepneyId) -> StoreResult<Option<Jeepney>> {
        conn.query_row(
            &format!("SELECT {} FROM jeepneys WHERE id = ?1", JEEPNEY_COLUMNS),
            params![id.0 as i64],
            jeepney_from_row,
        )
        .optional()
        .map_err(db_err)
    }

    fn route_exists(conn: &Connection, route_id: RouteId) -> StoreResult<bool> {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM routes WHERE id = ?1)",
            params![route_id.0 as i64],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    /// Run an UPDATE on one user row, failing if the user does not exist
    fn update_user_row(
        &self,
        user_id: UserId,
        sql: &str,
        values: Vec<SqlValue>,
    ) -> StoreResult<()> {
        let conn = self.conn();
        let mut values = values;
        values.push(SqlValue::Text(Utc::now().to_rfc3339()));
        values.push(SqlValue::Integer(user_id.0 as i64));

        let rows_affected = conn
            .execute(
                &format!("UPDATE users SET {}, updated_at = ? WHERE id = ?", sql),
                params_from_iter(values.iter()),
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(ApiError::NotFound("User".into()));
        }
        Ok(())
    }
}

fn opt_text(value: Option<&str>) -> SqlValue {
    value
        .map(|s| SqlValue::Text(s.to_string()))
        .unwrap_or(SqlValue::Null)
}

impl UserStore for SqliteStore {
    fn upsert_synced(&self, profile: &SyncedProfile) -> StoreResult<UpsertOutcome> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let email = profile.email.to_lowercase();
        let app_metadata = profile.app_metadata.to_string();
        let user_metadata = profile.user_metadata.to_string();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE auth0_id = ?1",
                params![profile.auth0_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE users SET email = ?1, name = ?2, email_verified = ?3, provider = ?4,
                     app_metadata = ?5, user_metadata = ?6, updated_at = ?7 WHERE id = ?8",
                    params![
                        email,
                        profile.name,
                        profile.email_verified as i32,
                        profile.provider,
                        app_metadata,
                        user_metadata,
                        now,
                        id
                    ],
                )
                .map_err(db_err)?;
                Ok(UpsertOutcome::Updated(UserId(id as u64)))
            }
            None => {
                conn.execute(
                    "INSERT INTO users (auth0_id, email, name, email_verified, provider, role,
                     verification, app_metadata, user_metadata, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                    params![
                        profile.auth0_id,
                        email,
                        profile.name,
                        profile.email_verified as i32,
                        profile.provider,
                        profile.role.as_str(),
                        VerificationStatus::Pending.as_str(),
                        app_metadata,
                        user_metadata,
                        now
                    ],
                )
                .map_err(db_err)?;
                Ok(UpsertOutcome::Created(UserId(conn.last_insert_rowid() as u64)))
            }
        }
    }

    fn create_user(&self, user: NewUser) -> StoreResult<UserId> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        // The email check and the insert are one statement under the connection lock
        let inserted = conn
            .execute(
                "INSERT INTO users (auth0_id, email, name, role, verification, phone, birthdate,
                 address, postal_code, password_hash, created_at, updated_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11
                 WHERE NOT EXISTS (SELECT 1 FROM users WHERE email = ?2)",
                params![
                    user.auth0_id,
                    user.email.to_lowercase(),
                    user.name,
                    user.role.as_str(),
                    VerificationStatus::Pending.as_str(),
                    user.phone,
                    user.birthdate.map(|d| d.format("%Y-%m-%d").to_string()),
                    user.address,
                    user.postal_code,
                    user.password_hash,
                    now
                ],
            )
            .map_err(conflict_or_db("User already exists".into()))?;
        if inserted == 0 {
            return Err(ApiError::Conflict("Email already registered".into()));
        }

        Ok(UserId(conn.last_insert_rowid() as u64))
    }

    fn get_user(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Self::fetch_user(&self.conn(), user_id)
    }

    fn list_users(&self, filter: &UserFilter, page: PageRequest) -> StoreResult<Page<User>> {
        let mut conditions = Conditions::new();
        if let Some(term) = &filter.search {
            conditions.push(
                "(LOWER(COALESCE(name, '')) LIKE ? ESCAPE '\\' \
                 OR LOWER(email) LIKE ? ESCAPE '\\')",
                [like_pattern(term), like_pattern(term)],
            );
        }
        if let Some(status) = filter.status {
            conditions.push("verification = ?", [SqlValue::Text(status.as_str().into())]);
        }
        if let Some(role) = filter.role {
            conditions.push("role = ?", [SqlValue::Text(role.as_str().into())]);
        }

        select_page(&self.conn(), "users", USER_COLUMNS, &conditions, page, user_from_row)
    }

    fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> StoreResult<()> {
        // COALESCE keeps the stored value when a field is not being changed
        self.update_user_row(
            user_id,
            "name = COALESCE(?, name), role = COALESCE(?, role), phone = COALESCE(?, phone),
             birthdate = COALESCE(?, birthdate), address = COALESCE(?, address),
             postal_code = COALESCE(?, postal_code)",
            vec![
                opt_text(update.name.as_deref()),
                opt_text(update.role.map(|r| r.as_str())),
                opt_text(update.phone.as_deref()),
                opt_text(
                    update
                        .birthdate
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .as_deref(),
                ),
                opt_text(update.address.as_deref()),
                opt_text(update.postal_code.as_deref()),
            ],
        )
    }

    fn set_verification(&self, user_id: UserId, status: VerificationStatus) -> StoreResult<()> {
        self.update_user_row(
            user_id,
            "verification = ?",
            vec![SqlValue::Text(status.as_str().into())],
        )
    }

    fn submit_discount(
        &self,
        user_id: UserId,
        application: DiscountApplication,
    ) -> StoreResult<()> {
        self.update_user_row(
            user_id,
            "discount_category = ?, discount_document = ?, discount_status = ?,
             discount_submitted_at = ?, discount_reviewed_at = ?",
            vec![
                SqlValue::Text(application.category.as_str().into()),
                SqlValue::Text(application.document),
                SqlValue::Text(application.status.as_str().into()),
                SqlValue::Text(application.submitted_at.to_rfc3339()),
                opt_text(application.reviewed_at.map(|t| t.to_rfc3339()).as_deref()),
            ],
        )
    }

    fn review_discount(
        &self,
        user_id: UserId,
        status: ApplicationStatus,
    ) -> StoreResult<DiscountApplication> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        let rows_affected = conn
            .execute(
                "UPDATE users SET discount_status = ?1, discount_reviewed_at = ?2, updated_at = ?2
                 WHERE id = ?3 AND discount_category IS NOT NULL",
                params![status.as_str(), now, user_id.0 as i64],
            )
            .map_err(db_err)?;

        let user = Self::fetch_user(&conn, user_id)?
            .ok_or_else(|| ApiError::NotFound("User".into()))?;
        match user.discount {
            Some(application) if rows_affected > 0 => Ok(application),
            _ => Err(ApiError::NotFound("Discount application".into())),
        }
    }
}

impl TransitStore for SqliteStore {
    fn create_route(&self, name: &str) -> StoreResult<RouteRecord> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO routes (name, created_at) VALUES (?1, ?2)",
            params![name, now.to_rfc3339()],
        )
        .map_err(conflict_or_db(format!("Route {} already exists", name)))?;

        Ok(RouteRecord {
            id: RouteId(conn.last_insert_rowid() as u64),
            name: name.to_string(),
            created_at: now,
        })
    }

    fn get_route(&self, route_id: RouteId) -> StoreResult<Option<RouteRecord>> {
        let conn = self.conn();

        conn.query_row(
            "SELECT id, name, created_at FROM routes WHERE id = ?1",
            params![route_id.0 as i64],
            |row| {
                let created_at: String = row.get(2)?;
                Ok(RouteRecord {
                    id: RouteId(row.get::<_, i64>(0)? as u64),
                    name: row.get(1)?,
                    created_at: parse_timestamp(&created_at),
                })
            },
        )
        .optional()
        .map_err(db_err)
    }

    fn list_routes(&self) -> StoreResult<Vec<RouteRecord>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare("SELECT id, name, created_at FROM routes ORDER BY id")
            .map_err(db_err)?;
        let routes = stmt
            .query_map([], |row| {
                let created_at: String = row.get(2)?;
                Ok(RouteRecord {
                    id: RouteId(row.get::<_, i64>(0)? as u64),
                    name: row.get(1)?,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(routes)
    }

    fn add_checkpoint(
        &self,
        route_id: RouteId,
        checkpoint: NewCheckpoint,
    ) -> StoreResult<CheckpointRecord> {
        let conn = self.conn();
        if !Self::route_exists(&conn, route_id)? {
            return Err(ApiError::NotFound("Transit route".into()));
        }

        let sequence: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(sequence) + 1, 0) FROM checkpoints WHERE route_id = ?1",
                params![route_id.0 as i64],
                |row| row.get(0),
            )
            .map_err(db_err)?;

        conn.execute(
            "INSERT INTO checkpoints (route_id, name, sequence, latitude, longitude)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                route_id.0 as i64,
                checkpoint.name,
                sequence,
                checkpoint.latitude,
                checkpoint.longitude
            ],
        )
        .map_err(conflict_or_db(format!(
            "Checkpoint {} already exists on this route",
            checkpoint.name
        )))?;

        Ok(CheckpointRecord {
            id: CheckpointId(conn.last_insert_rowid() as u64),
            route_id,
            name: checkpoint.name,
            sequence: sequence as u32,
            latitude: checkpoint.latitude,
            longitude: checkpoint.longitude,
        })
    }

    fn list_checkpoints(&self, route_id: RouteId) -> StoreResult<Vec<CheckpointRecord>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM checkpoints WHERE route_id = ?1 ORDER BY sequence",
                CHECKPOINT_COLUMNS
            ))
            .map_err(db_err)?;
        let checkpoints = stmt
            .query_map(params![route_id.0 as i64], checkpoint_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(checkpoints)
    }

    fn update_checkpoint(
        &self,
        checkpoint_id: CheckpointId,
        update: &CheckpointUpdate,
    ) -> StoreResult<CheckpointRecord> {
        let mut conn = self.conn();
        let current = Self::fetch_checkpoint(&conn, checkpoint_id)?
            .ok_or_else(|| ApiError::NotFound("Checkpoint".into()))?;

        let tx = conn.transaction().map_err(db_err)?;

        if let Some(name) = update.name.as_deref().filter(|n| *n != current.name) {
            tx.execute(
                "UPDATE checkpoints SET name = ?1 WHERE id = ?2",
                params![name, checkpoint_id.0 as i64],
            )
            .map_err(conflict_or_db(format!(
                "Checkpoint {} already exists on this route",
                name
            )))?;
            tx.execute(
                "UPDATE fares SET from_checkpoint = ?1 WHERE route_id = ?2 AND from_checkpoint = ?3",
                params![name, current.route_id.0 as i64, current.name],
            )
            .map_err(db_err)?;
            tx.execute(
                "UPDATE fares SET to_checkpoint = ?1 WHERE route_id = ?2 AND to_checkpoint = ?3",
                params![name, current.route_id.0 as i64, current.name],
            )
            .map_err(db_err)?;
        }

        tx.execute(
            "UPDATE checkpoints SET latitude = COALESCE(?1, latitude),
             longitude = COALESCE(?2, longitude) WHERE id = ?3",
            params![update.latitude, update.longitude, checkpoint_id.0 as i64],
        )
        .map_err(db_err)?;

        tx.commit().map_err(db_err)?;

        Self::fetch_checkpoint(&conn, checkpoint_id)?
            .ok_or_else(|| ApiError::NotFound("Checkpoint".into()))
    }

    fn create_fare(&self, fare: NewFare) -> StoreResult<FareRecord> {
        let conn = self.conn();
        if !Self::route_exists(&conn, fare.route_id)? {
            return Err(ApiError::NotFound("Transit route".into()));
        }

        conn.execute(
            "INSERT INTO fares (route_id, from_checkpoint, to_checkpoint, fare)
             VALUES (?1, ?2, ?3, ?4)",
            params![fare.route_id.0 as i64, fare.from, fare.to, fare.fare],
        )
        .map_err(db_err)?;

        Ok(FareRecord {
            id: FareId(conn.last_insert_rowid() as u64),
            route_id: fare.route_id,
            from: fare.from,
            to: fare.to,
            fare: fare.fare,
        })
    }

    fn get_fare(&self, fare_id: FareId) -> StoreResult<Option<FareRecord>> {
        Self::fetch_fare(&self.conn(), fare_id)
    }

    fn update_fare(&self, fare_id: FareId, fare: f64) -> StoreResult<FareRecord> {
        let conn = self.conn();

        let rows_affected = conn
            .execute(
                "UPDATE fares SET fare = ?1 WHERE id = ?2",
                params![fare, fare_id.0 as i64],
            )
            .map_err(db_err)?;
        if rows_affected == 0 {
            return Err(ApiError::NotFound("Fare".into()));
        }

        Self::fetch_fare(&conn, fare_id)?.ok_or_else(|| ApiError::NotFound("Fare".into()))
    }

    fn list_fares(&self, filter: &FareFilter, page: PageRequest) -> StoreResult<Page<FareRecord>> {
        let mut conditions = Conditions::new();
        if let Some(route_id) = filter.route_id {
            conditions.push("route_id = ?", [SqlValue::Integer(route_id.0 as i64)]);
        }
        if let Some(term) = &filter.search {
            conditions.push(
                "(LOWER(from_checkpoint) LIKE ? ESCAPE '\\' \
                 OR LOWER(to_checkpoint) LIKE ? ESCAPE '\\')",
                [like_pattern(term), like_pattern(term)],
            );
        }

        select_page(&self.conn(), "fares", FARE_COLUMNS, &conditions, page, fare_from_row)
    }

    fn route_fares(&self, route_id: RouteId) -> StoreResult<Vec<FareRecord>> {
        let conn = self.conn();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM fares WHERE route_id = ?1 ORDER BY id",
                FARE_COLUMNS
            ))
            .map_err(db_err)?;
        let fares = stmt
            .query_map(params![route_id.0 as i64], fare_from_row)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;

        Ok(fares)
    }

    fn create_jeepney(&self, fields: JeepneyFields) -> StoreResult<Jeepney> {
        let conn = self.conn();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO jeepneys (plate_number, route_id, driver_id, capacity, active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fields.plate_number,
                fields.route_id.map(|id| id.0 as i64),
                fields.driver_id.map(|id| id.0 as i64),
                fields.capacity,
                fields.active as i32,
                now.to_rfc3339()
            ],
        )
        .map_err(conflict_or_db(format!(
            "Plate number {} is already registered",
            fields.plate_number
        )))?;

        Ok(Jeepney {
            id: JeepneyId(conn.last_insert_rowid() as u64),
            plate_number: fields.plate_number,
            route_id: fields.route_id,
            driver_id: fields.driver_id,
            capacity: fields.capacity,
            active: fields.active,
            created_at: now,
        })
    }

    fn get_jeepney(&self, jeepney_id: JeepneyId) -> StoreResult<Option<Jeepney>> {
        Self::fetch_jeepney(&self.conn(), jeepney_id)
    }

    fn update_jeepney(&self, jeepney_id: JeepneyId, fields: JeepneyFields) -> StoreResult<Jeepney> {
        let conn = self.conn();

        let rows_affected = conn
            .execute(
                "UPDATE jeepneys SET plate_number = ?1, route_id = ?2, driver_id = ?3,
                 capacity = ?4, active = ?5 WHERE id = ?6",
                params![
                    fields.plate_number,
                    fields.route_id.map(|id| id.0 as i64),
                    fields.driver_id.map(|id| id.0 as i64),
                    fields.capacity,
                    fields.active as i32,
                    jeepney_id.0 as i64
                ],
            )
            .map_err(conflict_or_db(format!(
                "Plate number {} is already registered",
                fields.plate_number
            )))?;
        if rows_affected == 0 {
            return Err(ApiError::NotFound("Jeepney".into()));
        }

        Self::fetch_jeepney(&conn, jeepney_id)?.ok_or_else(|| ApiError::NotFound("Jeepney".into()))
    }

    fn list_jeepneys(
        &self,
        filter: &JeepneyFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Jeepney>> {
        let mut conditions = Conditions::new();
        if let Some(term) = &filter.search {
            conditions.push("LOWER(plate_number) LIKE ? ESCAPE '\\'", [like_pattern(term)]);
        }
        if let Some(active) = filter.active {
            conditions.push("active = ?", [SqlValue::Integer(active as i64)]);
        }

        select_page(
            &self.conn(),
            "jeepneys",
            JEEPNEY_COLUMNS,
            &conditions,
            page,
            jeepney_from_row,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (SqliteStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let store = SqliteStore::open(path.to_str().unwrap()).unwrap();
        (store, dir) // Return dir to keep it alive
    }

    fn profile(auth0_id: &str) -> SyncedProfile {
        SyncedProfile {
            auth0_id: auth0_id.to_string(),
            email: "Maria@Example.ph".to_string(),
            name: Some("Maria Santos".to_string()),
            email_verified: true,
            provider: Some("google-oauth2".to_string()),
            role: Role::Driver,
            app_metadata: json!({ "role": "driver" }),
            user_metadata: json!({}),
        }
    }

    fn new_user(auth0_id: &str, email: &str) -> NewUser {
        NewUser {
            auth0_id: auth0_id.to_string(),
            email: email.to_string(),
            name: "Maria Santos".to_string(),
            password_hash: None,
            role: Role::Driver,
            phone: None,
            birthdate: None,
            address: None,
            postal_code: None,
        }
    }

    #[test]
    fn test_create_user_rejects_taken_email() {
        let (store, _dir) = create_test_store();
        store.upsert_synced(&profile("google-oauth2|42")).unwrap();

        let result = store.create_user(new_user("local|1", "MARIA@example.ph"));
        assert!(matches!(result, Err(ApiError::Conflict(_))));

        let id = store.create_user(new_user("local|2", "ana@example.ph")).unwrap();
        let page = store.list_users(&UserFilter::default(), PageRequest::new(None, None)).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(store.get_user(id).unwrap().unwrap().email, "ana@example.ph");
    }

    #[test]
    fn test_upsert_round_trip() {
        let (store, _dir) = create_test_store();

        let outcome = store.upsert_synced(&profile("google-oauth2|42")).unwrap();
        let user = store.get_user(outcome.user_id()).unwrap().unwrap();

        assert_eq!(user.auth0_id, "google-oauth2|42");
        assert_eq!(user.email, "maria@example.ph");
        assert_eq!(user.role, Role::Driver);
        assert_eq!(user.verification, VerificationStatus::Pending);
        assert_eq!(user.app_metadata["role"], "driver");
    }

    #[test]
    fn test_upsert_keeps_role_and_verification() {
        let (store, _dir) = create_test_store();

        let id = store.upsert_synced(&profile("auth0|7")).unwrap().user_id();
        store.set_verification(id, VerificationStatus::Verified).unwrap();

        let mut again = profile("auth0|7");
        again.role = Role::Passenger;
        again.name = Some("Maria S.".to_string());
        assert_eq!(store.upsert_synced(&again).unwrap(), UpsertOutcome::Updated(id));

        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.role, Role::Driver);
        assert_eq!(user.verification, VerificationStatus::Verified);
        assert_eq!(user.name.as_deref(), Some("Maria S."));
    }

    #[test]
    fn test_profile_update_leaves_unset_fields() {
        let (store, _dir) = create_test_store();

        let id = store.upsert_synced(&profile("auth0|7")).unwrap().user_id();
        store
            .update_profile(
                id,
                &ProfileUpdate {
                    phone: Some("09171234567".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        let user = store.get_user(id).unwrap().unwrap();
        assert_eq!(user.phone.as_deref(), Some("09171234567"));
        assert_eq!(user.name.as_deref(), Some("Maria Santos"));
    }

    #[test]
    fn test_discount_application_round_trip() {
        let (store, _dir) = create_test_store();

        let id = store.upsert_synced(&profile("auth0|7")).unwrap().user_id();
        store
            .submit_discount(
                id,
                DiscountApplication::new(DiscountCategory::Student, "uploads/id.png".into()),
            )
            .unwrap();
        let reviewed = store.review_discount(id, ApplicationStatus::Approved).unwrap();

        assert_eq!(reviewed.category, DiscountCategory::Student);
        assert_eq!(reviewed.status, ApplicationStatus::Approved);
        assert!(reviewed.reviewed_at.is_some());
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let (store, _dir) = create_test_store();

        store.create_route("Tejero - Pala-pala").unwrap();
        let result = store.create_route("Tejero - Pala-pala");
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[test]
    fn test_list_users_filters_and_paginates() {
        let (store, _dir) = create_test_store();

        for i in 0..15 {
            let mut p = profile(&format!("auth0|{}", i));
            p.email = format!("user{}@example.ph", i);
            p.name = Some(if i % 2 == 0 { "Even".into() } else { "Odd".into() });
            store.upsert_synced(&p).unwrap();
        }

        let filter = UserFilter {
            search: Some("even".into()),
            ..Default::default()
        };
        let page = store.list_users(&filter, PageRequest::new(Some(2), Some(5))).unwrap();

        assert_eq!(page.total, 8);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].email, "user10@example.ph");
    }
}
