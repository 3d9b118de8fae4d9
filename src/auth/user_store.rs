//! Account Storage
//! Mission: Persist user and vendor accounts with hashed passwords in SQLite

use crate::auth::models::{Account, Role};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::info;
use uuid::Uuid;

/// Opaque password hashing capability
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool>;
}

/// bcrypt with a configurable cost
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String> {
        bcrypt::hash(password, self.cost).context("Failed to hash password")
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        bcrypt::verify(password, hash).context("Failed to verify password")
    }
}

/// Account storage with SQLite backend
pub struct UserStore {
    db_path: String,
    hasher: Box<dyn PasswordHasher>,
}

impl UserStore {
    /// Create a store with bcrypt at the default cost and initialize the schema
    pub fn new(db_path: &str) -> Result<Self> {
        Self::with_hasher(db_path, Box::new(BcryptHasher::default()))
    }

    pub fn with_hasher(db_path: &str, hasher: Box<dyn PasswordHasher>) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
            hasher,
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        // One row per (role, email); the constraint settles signup races
        conn.execute(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                username TEXT,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (role, email)
            )",
            [],
        )
        .context("Failed to create accounts table")?;

        Ok(())
    }

    /// Look up an account by role and email
    pub fn find_by_email(&self, role: Role, email: &str) -> Result<Option<Account>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, email, username, password_hash, role, created_at
             FROM accounts WHERE role = ?1 AND email = ?2",
        )?;

        let result = stmt.query_row(params![role.as_str(), email], account_from_row);

        match result {
            Ok(account) => Ok(Some(account)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials; `None` covers both unknown email and wrong password
    pub fn authenticate(&self, role: Role, email: &str, password: &str) -> Result<Option<Account>> {
        let Some(account) = self.find_by_email(role, email)? else {
            return Ok(None);
        };

        if self.hasher.verify(password, &account.password_hash)? {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    /// Insert a new account unless one with the same role and email exists.
    ///
    /// Returns `None` when the email is already taken.
    pub fn insert_if_absent(
        &self,
        role: Role,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<Option<Account>> {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.map(str::to_string),
            password_hash: self.hasher.hash(password)?,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = Connection::open(&self.db_path)?;
        let inserted = conn
            .execute(
                "INSERT OR IGNORE INTO accounts (id, email, username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    account.id.to_string(),
                    account.email,
                    account.username,
                    account.password_hash,
                    account.role.as_str(),
                    account.created_at,
                ],
            )
            .context("Failed to insert account")?;

        if inserted == 0 {
            return Ok(None);
        }

        info!("Created {} account {}", account.role.as_str(), account.id);
        Ok(Some(account))
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let id: String = row.get(0)?;
    let role: String = row.get(4)?;

    Ok(Account {
        id: Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
        role: Role::parse(&role).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown role {role:?}").into(),
            )
        })?,
        created_at: row.get(5)?,
    })
}
