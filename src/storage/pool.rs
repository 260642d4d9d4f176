//! Connection pool bring-up: one r2d2-pooled Postgres connection manager
//! shared across all four Writers and the Snapshot Poller's write path.

use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::{Error, Result};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Builds the pool. Does not itself verify connectivity; callers that need
/// a fail-fast startup check should follow with `pool.get()` or
/// `run_migrations`.
pub fn create_pool(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(Error::from)
}

/// Runs all embedded migrations, failing the process at startup rather than
/// at the first write if the schema is out of date.
pub fn run_migrations(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| Error::Migration(e.to_string()))?;
    Ok(())
}
