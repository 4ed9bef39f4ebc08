//! Relational metadata store
//!
//! [`MetadataStore`] is the seam the rest of the core talks to. The SQLite
//! implementation enforces every uniqueness rule with a table constraint, so
//! racing writers are serialized by the database, never by in-process locks.

use crate::core::models::{
    ApiToken, NewVersion, OrgRole, Organization, Package, StoredToken, User, VersionRecord,
};
use crate::core::service::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a user; duplicate email or username is a conflict
    async fn create_user(&self, email: &str, username: &str) -> Result<User, ServiceError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ServiceError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError>;

    /// Insert an organization and its owner membership in one transaction
    async fn create_organization(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Organization, ServiceError>;

    async fn find_organization(&self, name: &str) -> Result<Option<Organization>, ServiceError>;

    async fn member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, ServiceError>;

    /// Existing membership is a conflict
    async fn add_member(&self, org_id: Uuid, user_id: Uuid, role: OrgRole)
        -> Result<(), ServiceError>;

    async fn list_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Organization, OrgRole)>, ServiceError>;

    async fn insert_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        label: Option<&str>,
    ) -> Result<ApiToken, ServiceError>;

    async fn find_token_by_hash(&self, token_hash: &str)
        -> Result<Option<StoredToken>, ServiceError>;

    async fn get_token(&self, id: Uuid) -> Result<Option<ApiToken>, ServiceError>;

    async fn touch_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError>;

    /// Returns whether a row was removed
    async fn delete_token(&self, id: Uuid) -> Result<bool, ServiceError>;

    async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>, ServiceError>;

    async fn list_packages(&self, org_id: Uuid) -> Result<Vec<Package>, ServiceError>;

    async fn version_exists(
        &self,
        org_id: Uuid,
        package: &str,
        version: &str,
    ) -> Result<bool, ServiceError>;

    /// Create the package if missing and insert the version, atomically.
    /// A duplicate (package, version) is a conflict and changes nothing.
    async fn commit_version(&self, new_version: NewVersion) -> Result<VersionRecord, ServiceError>;

    async fn find_version(
        &self,
        org_id: Uuid,
        package: &str,
        version: &str,
    ) -> Result<Option<VersionRecord>, ServiceError>;

    async fn list_versions(
        &self,
        org_id: Uuid,
        package: &str,
    ) -> Result<Vec<VersionRecord>, ServiceError>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS organizations (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS org_members (
    org_id TEXT NOT NULL REFERENCES organizations(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    role TEXT NOT NULL CHECK (role IN ('OWNER', 'MEMBER')),
    created_at TEXT NOT NULL,
    PRIMARY KEY (org_id, user_id)
);
CREATE TABLE IF NOT EXISTS api_tokens (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    token_hash TEXT NOT NULL UNIQUE,
    label TEXT,
    created_at TEXT NOT NULL,
    last_used_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_api_tokens_user ON api_tokens(user_id);
CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL REFERENCES organizations(id),
    name TEXT NOT NULL,
    description TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (org_id, name)
);
CREATE TABLE IF NOT EXISTS versions (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL REFERENCES packages(id),
    version TEXT NOT NULL,
    checksum TEXT NOT NULL,
    size_bytes INTEGER NOT NULL,
    storage_key TEXT NOT NULL,
    published_by TEXT NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    UNIQUE (package_id, version)
);
";

const VERSION_SELECT: &str = "
SELECT v.id, v.package_id, o.name, p.name, v.version, v.checksum, v.size_bytes,
       v.storage_key, v.published_by, v.created_at
FROM versions v
JOIN packages p ON p.id = v.package_id
JOIN organizations o ON o.id = p.org_id
";

/// SQLite-based metadata store
pub struct SqliteStore {
    /// Path to the SQLite database file
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (and create if needed) the database and its schema
    pub async fn open(db_path: PathBuf) -> Result<Self, ServiceError> {
        let store = Self { db_path };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), ServiceError> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        self.run(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
                .map_err(db_err("Failed to set journal mode"))?;
            debug!("SQLite journal mode: {}", mode);

            conn.execute_batch(SCHEMA)
                .map_err(db_err("Failed to create schema"))
        })
        .await
    }

    /// Run a closure against a fresh connection on the blocking pool
    async fn run<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, ServiceError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = Connection::open(&db_path).map_err(db_err("Failed to open database"))?;
            conn.busy_timeout(Duration::from_secs(5))
                .map_err(db_err("Failed to set busy timeout"))?;
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(db_err("Failed to enable foreign keys"))?;
            op(&mut conn)
        })
        .await
        .map_err(|e| ServiceError::Database(format!("Database task failed: {}", e)))?
    }
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> ServiceError {
    move |e| ServiceError::Database(format!("{}: {}", context, e))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        }
        _ => false,
    }
}

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`
fn write_err(
    context: &'static str,
    conflict: impl Fn() -> String,
) -> impl Fn(rusqlite::Error) -> ServiceError {
    move |e| {
        if is_unique_violation(&e) {
            ServiceError::Conflict(conflict())
        } else {
            ServiceError::Database(format!("{}: {}", context, e))
        }
    }
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(idx)?;
    Uuid::parse_str(&value).map_err(|e| conversion_err(idx, e))
}

fn time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let value: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn opt_time_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|v| {
            DateTime::parse_from_rfc3339(&v)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| conversion_err(idx, e))
        })
        .transpose()
}

fn role_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<OrgRole> {
    let value: String = row.get(idx)?;
    value.parse().map_err(|e: ServiceError| {
        conversion_err(idx, std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_col(row, 0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        created_at: time_col(row, 3)?,
    })
}

fn org_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: uuid_col(row, 0)?,
        name: row.get(1)?,
        created_at: time_col(row, 2)?,
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<ApiToken> {
    Ok(ApiToken {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        label: row.get(2)?,
        created_at: time_col(row, 3)?,
        last_used_at: opt_time_col(row, 4)?,
    })
}

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: uuid_col(row, 0)?,
        org_id: uuid_col(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: time_col(row, 4)?,
    })
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<VersionRecord> {
    let size: i64 = row.get(6)?;
    Ok(VersionRecord {
        id: uuid_col(row, 0)?,
        package_id: uuid_col(row, 1)?,
        org: row.get(2)?,
        package: row.get(3)?,
        version: row.get(4)?,
        checksum: row.get(5)?,
        size_bytes: size.max(0) as u64,
        storage_key: row.get(7)?,
        published_by: uuid_col(row, 8)?,
        created_at: time_col(row, 9)?,
    })
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn create_user(&self, email: &str, username: &str) -> Result<User, ServiceError> {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        let row = user.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (id, email, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    row.id.to_string(),
                    row.email,
                    row.username,
                    row.created_at.to_rfc3339()
                ],
            )
            .map_err(write_err("Failed to insert user", || {
                "A user with this email or username already exists".to_string()
            }))?;
            Ok(())
        })
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, email, username, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                user_from_row,
            )
            .optional()
            .map_err(db_err("Failed to load user"))
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let username = username.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, email, username, created_at FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()
            .map_err(db_err("Failed to load user"))
        })
        .await
    }

    async fn create_organization(
        &self,
        name: &str,
        owner_id: Uuid,
    ) -> Result<Organization, ServiceError> {
        let org = Organization {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        let row = org.clone();
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err("Failed to begin transaction"))?;
            let created_at = row.created_at.to_rfc3339();
            tx.execute(
                "INSERT INTO organizations (id, name, created_at) VALUES (?1, ?2, ?3)",
                params![row.id.to_string(), row.name, created_at],
            )
            .map_err(write_err("Failed to insert organization", || {
                format!("Organization '{}' already exists", row.name)
            }))?;
            tx.execute(
                "INSERT INTO org_members (org_id, user_id, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    row.id.to_string(),
                    owner_id.to_string(),
                    OrgRole::Owner.as_str(),
                    created_at
                ],
            )
            .map_err(db_err("Failed to insert owner membership"))?;
            tx.commit().map_err(db_err("Failed to commit organization"))
        })
        .await?;
        Ok(org)
    }

    async fn find_organization(&self, name: &str) -> Result<Option<Organization>, ServiceError> {
        let name = name.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, name, created_at FROM organizations WHERE name = ?1",
                params![name],
                org_from_row,
            )
            .optional()
            .map_err(db_err("Failed to load organization"))
        })
        .await
    }

    async fn member_role(
        &self,
        org_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<OrgRole>, ServiceError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT role FROM org_members WHERE org_id = ?1 AND user_id = ?2",
                params![org_id.to_string(), user_id.to_string()],
                |row| role_col(row, 0),
            )
            .optional()
            .map_err(db_err("Failed to load membership"))
        })
        .await
    }

    async fn add_member(
        &self,
        org_id: Uuid,
        user_id: Uuid,
        role: OrgRole,
    ) -> Result<(), ServiceError> {
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO org_members (org_id, user_id, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    org_id.to_string(),
                    user_id.to_string(),
                    role.as_str(),
                    Utc::now().to_rfc3339()
                ],
            )
            .map_err(write_err("Failed to insert membership", || {
                "User is already a member of this organization".to_string()
            }))?;
            Ok(())
        })
        .await
    }

    async fn list_memberships(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<(Organization, OrgRole)>, ServiceError> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT o.id, o.name, o.created_at, m.role
                     FROM org_members m JOIN organizations o ON o.id = m.org_id
                     WHERE m.user_id = ?1 ORDER BY o.name",
                )
                .map_err(db_err("Failed to prepare query"))?;
            let rows = stmt
                .query_map(params![user_id.to_string()], |row| {
                    Ok((org_from_row(row)?, role_col(row, 3)?))
                })
                .map_err(db_err("Failed to list memberships"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read membership row"))
        })
        .await
    }

    async fn insert_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        label: Option<&str>,
    ) -> Result<ApiToken, ServiceError> {
        let token = ApiToken {
            id: Uuid::new_v4(),
            user_id,
            label: label.map(str::to_string),
            created_at: Utc::now(),
            last_used_at: None,
        };
        let row = token.clone();
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO api_tokens (id, user_id, token_hash, label, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id.to_string(),
                    row.user_id.to_string(),
                    token_hash,
                    row.label,
                    row.created_at.to_rfc3339()
                ],
            )
            .map_err(write_err("Failed to insert token", || {
                "Token hash collision".to_string()
            }))?;
            Ok(())
        })
        .await?;
        Ok(token)
    }

    async fn find_token_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<StoredToken>, ServiceError> {
        let token_hash = token_hash.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, user_id, label, created_at, last_used_at, token_hash
                 FROM api_tokens WHERE token_hash = ?1",
                params![token_hash],
                |row| {
                    Ok(StoredToken {
                        token: token_from_row(row)?,
                        token_hash: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(db_err("Failed to load token"))
        })
        .await
    }

    async fn get_token(&self, id: Uuid) -> Result<Option<ApiToken>, ServiceError> {
        self.run(move |conn| {
            conn.query_row(
                "SELECT id, user_id, label, created_at, last_used_at FROM api_tokens WHERE id = ?1",
                params![id.to_string()],
                token_from_row,
            )
            .optional()
            .map_err(db_err("Failed to load token"))
        })
        .await
    }

    async fn touch_token(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), ServiceError> {
        self.run(move |conn| {
            conn.execute(
                "UPDATE api_tokens SET last_used_at = ?1 WHERE id = ?2",
                params![at.to_rfc3339(), id.to_string()],
            )
            .map_err(db_err("Failed to update token"))?;
            Ok(())
        })
        .await
    }

    async fn delete_token(&self, id: Uuid) -> Result<bool, ServiceError> {
        self.run(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM api_tokens WHERE id = ?1",
                    params![id.to_string()],
                )
                .map_err(db_err("Failed to delete token"))?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<ApiToken>, ServiceError> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, label, created_at, last_used_at
                     FROM api_tokens WHERE user_id = ?1 ORDER BY created_at",
                )
                .map_err(db_err("Failed to prepare query"))?;
            let rows = stmt
                .query_map(params![user_id.to_string()], token_from_row)
                .map_err(db_err("Failed to list tokens"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read token row"))
        })
        .await
    }

    async fn list_packages(&self, org_id: Uuid) -> Result<Vec<Package>, ServiceError> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, org_id, name, description, created_at
                     FROM packages WHERE org_id = ?1 ORDER BY name",
                )
                .map_err(db_err("Failed to prepare query"))?;
            let rows = stmt
                .query_map(params![org_id.to_string()], package_from_row)
                .map_err(db_err("Failed to list packages"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read package row"))
        })
        .await
    }

    async fn version_exists(
        &self,
        org_id: Uuid,
        package: &str,
        version: &str,
    ) -> Result<bool, ServiceError> {
        let package = package.to_string();
        let version = version.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT EXISTS (
                    SELECT 1 FROM versions v JOIN packages p ON p.id = v.package_id
                    WHERE p.org_id = ?1 AND p.name = ?2 AND v.version = ?3
                 )",
                params![org_id.to_string(), package, version],
                |row| row.get::<_, bool>(0),
            )
            .map_err(db_err("Failed to check version"))
        })
        .await
    }

    async fn commit_version(&self, new_version: NewVersion) -> Result<VersionRecord, ServiceError> {
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(db_err("Failed to begin transaction"))?;
            let now = Utc::now();

            tx.execute(
                "INSERT OR IGNORE INTO packages (id, org_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    new_version.org_id.to_string(),
                    new_version.package,
                    new_version.description,
                    now.to_rfc3339()
                ],
            )
            .map_err(db_err("Failed to insert package"))?;

            let package_id = tx
                .query_row(
                    "SELECT id FROM packages WHERE org_id = ?1 AND name = ?2",
                    params![new_version.org_id.to_string(), new_version.package],
                    |row| uuid_col(row, 0),
                )
                .map_err(db_err("Failed to load package"))?;

            if new_version.description.is_some() {
                tx.execute(
                    "UPDATE packages SET description = ?1 WHERE id = ?2",
                    params![new_version.description, package_id.to_string()],
                )
                .map_err(db_err("Failed to update package description"))?;
            }

            let record = VersionRecord {
                id: Uuid::new_v4(),
                package_id,
                org: new_version.org.clone(),
                package: new_version.package.clone(),
                version: new_version.version.clone(),
                checksum: new_version.checksum.clone(),
                size_bytes: new_version.size_bytes,
                storage_key: new_version.storage_key.clone(),
                published_by: new_version.published_by,
                created_at: now,
            };

            tx.execute(
                "INSERT INTO versions
                 (id, package_id, version, checksum, size_bytes, storage_key, published_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.package_id.to_string(),
                    record.version,
                    record.checksum,
                    record.size_bytes as i64,
                    record.storage_key,
                    record.published_by.to_string(),
                    record.created_at.to_rfc3339()
                ],
            )
            .map_err(write_err("Failed to insert version", || {
                format!(
                    "Version {} of {}/{} already exists",
                    new_version.version, new_version.org, new_version.package
                )
            }))?;

            tx.commit().map_err(db_err("Failed to commit version"))?;
            Ok(record)
        })
        .await
    }

    async fn find_version(
        &self,
        org_id: Uuid,
        package: &str,
        version: &str,
    ) -> Result<Option<VersionRecord>, ServiceError> {
        let package = package.to_string();
        let version = version.to_string();
        self.run(move |conn| {
            let sql = format!(
                "{} WHERE p.org_id = ?1 AND p.name = ?2 AND v.version = ?3",
                VERSION_SELECT
            );
            conn.query_row(
                &sql,
                params![org_id.to_string(), package, version],
                version_from_row,
            )
            .optional()
            .map_err(db_err("Failed to load version"))
        })
        .await
    }

    async fn list_versions(
        &self,
        org_id: Uuid,
        package: &str,
    ) -> Result<Vec<VersionRecord>, ServiceError> {
        let package = package.to_string();
        self.run(move |conn| {
            let sql = format!(
                "{} WHERE p.org_id = ?1 AND p.name = ?2 ORDER BY v.created_at",
                VERSION_SELECT
            );
            let mut stmt = conn.prepare(&sql).map_err(db_err("Failed to prepare query"))?;
            let rows = stmt
                .query_map(params![org_id.to_string(), package], version_from_row)
                .map_err(db_err("Failed to list versions"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read version row"))
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(dir: &TempDir) -> SqliteStore {
        SqliteStore::open(dir.path().join("registry.db")).await.unwrap()
    }

    fn new_version(org: &Organization, user: &User, version: &str) -> NewVersion {
        NewVersion {
            org_id: org.id,
            org: org.name.clone(),
            package: "demo-agent".to_string(),
            description: None,
            version: version.to_string(),
            checksum: "ab".repeat(32),
            size_bytes: 5,
            storage_key: format!("packages/{}/demo-agent/{}/x", org.id, version),
            published_by: user.id,
        }
    }

    #[tokio::test]
    async fn test_user_uniqueness() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;

        store.create_user("a@example.com", "alice").await.unwrap();
        let dup_email = store.create_user("A@example.com", "alice2").await;
        assert!(matches!(dup_email, Err(ServiceError::Conflict(_))));
        let dup_name = store.create_user("b@example.com", "alice").await;
        assert!(matches!(dup_name, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_organization_owner_membership() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let owner = store.create_user("o@example.com", "owner").await.unwrap();
        let other = store.create_user("x@example.com", "other").await.unwrap();

        let org = store.create_organization("acme", owner.id).await.unwrap();
        assert_eq!(
            store.member_role(org.id, owner.id).await.unwrap(),
            Some(OrgRole::Owner)
        );
        assert_eq!(store.member_role(org.id, other.id).await.unwrap(), None);

        let dup = store.create_organization("acme", other.id).await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));

        store.add_member(org.id, other.id, OrgRole::Member).await.unwrap();
        let again = store.add_member(org.id, other.id, OrgRole::Owner).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));

        let memberships = store.list_memberships(other.id).await.unwrap();
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].1, OrgRole::Member);
    }

    #[tokio::test]
    async fn test_commit_version_conflict_keeps_first_row() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let user = store.create_user("o@example.com", "owner").await.unwrap();
        let org = store.create_organization("acme", user.id).await.unwrap();

        let first = store.commit_version(new_version(&org, &user, "1.0.0")).await.unwrap();

        let mut second = new_version(&org, &user, "1.0.0");
        second.checksum = "cd".repeat(32);
        let result = store.commit_version(second).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));

        let stored = store
            .find_version(org.id, "demo-agent", "1.0.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, first);
        assert!(store.version_exists(org.id, "demo-agent", "1.0.0").await.unwrap());
        assert!(!store.version_exists(org.id, "demo-agent", "2.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_package_created_with_first_version() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let user = store.create_user("o@example.com", "owner").await.unwrap();
        let org = store.create_organization("acme", user.id).await.unwrap();

        assert!(store.list_packages(org.id).await.unwrap().is_empty());

        let mut v1 = new_version(&org, &user, "1.0.0");
        v1.description = Some("Demo".to_string());
        store.commit_version(v1).await.unwrap();
        store.commit_version(new_version(&org, &user, "1.1.0")).await.unwrap();

        let packages = store.list_packages(org.id).await.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].description.as_deref(), Some("Demo"));

        let versions = store.list_versions(org.id, "demo-agent").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions.iter().all(|v| v.package_id == packages[0].id));
    }

    #[tokio::test]
    async fn test_token_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir).await;
        let user = store.create_user("o@example.com", "owner").await.unwrap();

        let token = store.insert_token(user.id, "hash-1", Some("ci")).await.unwrap();
        let found = store.find_token_by_hash("hash-1").await.unwrap().unwrap();
        assert_eq!(found.token.id, token.id);

        let now = Utc::now();
        store.touch_token(token.id, now).await.unwrap();
        let touched = store.get_token(token.id).await.unwrap().unwrap();
        assert!(touched.last_used_at.is_some());

        assert!(store.delete_token(token.id).await.unwrap());
        assert!(!store.delete_token(token.id).await.unwrap());
        assert!(store.find_token_by_hash("hash-1").await.unwrap().is_none());
    }
}
