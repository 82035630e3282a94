//! Database migration system for treasuremap.
//!
//! Migrations are applied in order, each inside its own transaction, and the
//! reached version is recorded in the metadata table after every step.

use rusqlite::Connection;

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, CREATE_SLOTS_TABLE};

/// The current schema version.
pub const CURRENT_VERSION: i32 = 1;

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

type Migration = fn(&Connection) -> Result<()>;

/// Migrations indexed by `target version - 1`.
const MIGRATIONS: &[Migration] = &[migrate_v1];

/// Initialize the database schema.
///
/// Creates the metadata table, then applies every migration newer than the
/// recorded version.
///
/// # Errors
///
/// Returns an error if the recorded version is unreadable or newer than this
/// build understands, or if a migration fails.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version {CURRENT_VERSION}"
            ),
        });
    }

    for target in (version + 1)..=CURRENT_VERSION {
        run_migration(conn, target)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Apply the migration that brings the schema to `version`.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    let migration = usize::try_from(version - 1)
        .ok()
        .and_then(|index| MIGRATIONS.get(index))
        .ok_or_else(|| Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        })?;

    let tx = conn.unchecked_transaction()?;
    migration(&tx)?;
    set_schema_version(&tx, version)?;
    tx.commit()?;

    tracing::debug!("Applied schema migration v{}", version);
    Ok(())
}

/// Version 1: the slots table.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_SLOTS_TABLE, [])?;
    Ok(())
}
