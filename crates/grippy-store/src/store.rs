use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Email already in use")]
    EmailInUse,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl From<argon2::password_hash::Error> for StoreError {
    fn from(err: argon2::password_hash::Error) -> Self {
        StoreError::PasswordHash(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub uid: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFavorite {
    pub id: String,
    pub uid: String,
    pub url: String,
}

/// Local store using SQLite
///
/// Holds two tables: `accounts` for email/password sign-in, with passwords
/// kept as Argon2id PHC strings, and `favorites`, partitioned by `uid`. URL uniqueness per user is not a constraint here,
/// callers check before inserting.
pub struct LocalStore {
    conn: Mutex<Connection>,
}

impl LocalStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                uid TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS favorites (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                uid TEXT NOT NULL,
                url TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_favorites_uid_url ON favorites(uid, url)",
            [],
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    pub fn create_account(&self, email: &str, password: &str) -> Result<Account> {
        let email = email.trim().to_lowercase();
        let conn = self.conn()?;

        let exists: Option<String> = conn
            .query_row(
                "SELECT uid FROM accounts WHERE email = ?1",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::EmailInUse);
        }

        let uid = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(password)?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO accounts (uid, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![uid, email, password_hash, created_at.timestamp()],
        )?;

        debug!("Created account {} for {}", uid, email);
        Ok(Account {
            uid,
            email,
            created_at,
        })
    }

    pub fn verify_account(&self, email: &str, password: &str) -> Result<Account> {
        let email = email.trim().to_lowercase();
        let conn = self.conn()?;

        let row: Option<(String, String, i64)> = conn
            .query_row(
                "SELECT uid, password_hash, created_at FROM accounts WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        // Same error for unknown email and wrong password
        let (uid, stored_hash, created_at) = row.ok_or(StoreError::InvalidCredentials)?;
        if !verify_password(password, &stored_hash)? {
            return Err(StoreError::InvalidCredentials);
        }

        Ok(Account {
            uid,
            email,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        })
    }

    /// The account behind `uid`, if it still exists
    pub fn find_account(&self, uid: &str) -> Result<Option<Account>> {
        let row: Option<(String, String, i64)> = self
            .conn()?
            .query_row(
                "SELECT uid, email, created_at FROM accounts WHERE uid = ?1",
                params![uid],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(row.map(|(uid, email, created_at)| Account {
            uid,
            email,
            created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        }))
    }

    pub fn insert_favorite(&self, uid: &str, url: &str) -> Result<StoredFavorite> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.conn()?.execute(
            "INSERT INTO favorites (id, uid, url, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, uid, url, Utc::now().timestamp()],
        )?;

        Ok(StoredFavorite {
            id,
            uid: uid.to_string(),
            url: url.to_string(),
        })
    }

    pub fn find_favorites_by_url(&self, uid: &str, url: &str) -> Result<Vec<StoredFavorite>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, uid, url FROM favorites WHERE uid = ?1 AND url = ?2 ORDER BY seq",
        )?;

        let rows = stmt.query_map(params![uid, url], row_to_favorite)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns false when there was nothing to delete
    pub fn delete_favorite(&self, uid: &str, id: &str) -> Result<bool> {
        let deleted = self.conn()?.execute(
            "DELETE FROM favorites WHERE uid = ?1 AND id = ?2",
            params![uid, id],
        )?;
        Ok(deleted > 0)
    }

    pub fn list_favorites(&self, uid: &str, limit: usize) -> Result<Vec<StoredFavorite>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, uid, url FROM favorites WHERE uid = ?1 ORDER BY seq LIMIT ?2",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![uid, limit], row_to_favorite)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn row_to_favorite(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredFavorite> {
    Ok(StoredFavorite {
        id: row.get(0)?,
        uid: row.get(1)?,
        url: row.get(2)?,
    })
}

/// Argon2id with a fresh random salt, encoded as a PHC string
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Constant-time check against a stored PHC string
fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e.into()),
    }
}
