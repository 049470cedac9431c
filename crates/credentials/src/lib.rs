use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{fs, path::Path, str::FromStr};

/// Well-known entry names, kept identical to the upstream cookie names
/// so a migrated cache stays readable.
pub const USER_EMAIL: &str = "userEmail";
pub const AUTH_TOKEN: &str = "authToken";
pub const USER_FIRST_NAME: &str = "userFirstName";
pub const USER_LAST_NAME: &str = "userLastName";

pub const SESSION_ENTRIES: [&str; 4] = [USER_EMAIL, AUTH_TOKEN, USER_FIRST_NAME, USER_LAST_NAME];

/// Session entries expire after seven days.
const ENTRY_TTL_DAYS: i64 = 7;

/// Sqlite-backed credential jar. Entries are named string values with
/// an expiry timestamp and a secure flag, the same shape a browser
/// cookie store keeps on disk. Writes are single-key upserts, last
/// write wins; expired entries read back as absent and are purged on
/// the read path.
#[derive(Clone)]
pub struct CredentialStore {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredCredential {
    pub name: String,
    pub value: String,
    pub secure: bool,
    pub expires_at: DateTime<Utc>,
}

impl CredentialStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let store = Self { pool };
        store.ensure_credentials_table().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_credentials_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                name       TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                secure     INTEGER NOT NULL DEFAULT 1,
                expires_at TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure credentials table exists")?;
        Ok(())
    }

    /// Upserts a secure entry with the standard seven-day expiry.
    pub async fn set(&self, name: &str, value: &str) -> Result<()> {
        self.set_with_expiry(name, value, Utc::now() + Duration::days(ENTRY_TTL_DAYS))
            .await
    }

    async fn set_with_expiry(
        &self,
        name: &str,
        value: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO credentials (name, value, secure, expires_at, updated_at)
            VALUES (?1, ?2, 1, ?3, CURRENT_TIMESTAMP)
            ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                secure = excluded.secure,
                expires_at = excluded.expires_at,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(name)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert credential '{name}'"))?;
        Ok(())
    }

    /// Reads an entry, treating anything past its expiry as absent and
    /// deleting it on the way out.
    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        let Some(stored) = self.inspect(name).await? else {
            return Ok(None);
        };
        if stored.expires_at <= Utc::now() {
            self.remove(name).await?;
            return Ok(None);
        }
        Ok(Some(stored.value))
    }

    /// Reads the raw row without applying expiry.
    pub async fn inspect(&self, name: &str) -> Result<Option<StoredCredential>> {
        let row = sqlx::query("SELECT name, value, secure, expires_at FROM credentials WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read credential '{name}'"))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(StoredCredential {
            name: row.try_get("name")?,
            value: row.try_get("value")?,
            secure: row.try_get::<i64, _>("secure")? != 0,
            expires_at: row.try_get("expires_at")?,
        }))
    }

    pub async fn remove(&self, name: &str) -> Result<()> {
        sqlx::query("DELETE FROM credentials WHERE name = ?1")
            .bind(name)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to remove credential '{name}'"))?;
        Ok(())
    }

    /// Deletes every expired entry; returns how many rows went away.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM credentials WHERE expires_at <= ?1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .context("failed to purge expired credentials")?;
        Ok(result.rows_affected())
    }
}

pub fn sqlite_url_for_data_dir(base_dir: &Path) -> String {
    format!(
        "sqlite://{}",
        base_dir.join("credentials.sqlite3").display()
    )
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    if database_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create credential store directory '{}'", parent.display())
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
