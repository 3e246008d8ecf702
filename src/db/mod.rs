use log::{error, info};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use diesel::connection::SimpleConnection;
use diesel::r2d2;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::errors::{DatabaseError, Error, Result};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub mod write_actor;
pub use write_actor::{spawn_writer, WriteHandle};

/// Per-account storage handle: one database file, one pool, one writer.
///
/// Every read-modify-write cycle for this account funnels through `writer`,
/// which drains jobs one at a time inside an immediate transaction. Handles
/// are constructed per account and passed explicitly; nothing here is global.
#[derive(Clone)]
pub struct StoreHandle {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    account_id: String,
}

impl StoreHandle {
    /// Opens (creating if needed) the account's database, runs pending
    /// migrations and spawns the writer actor. Must be called from within a
    /// tokio runtime.
    pub fn open(data_dir: &str, account_id: &str) -> Result<Self> {
        let account_id = account_id.trim();
        if account_id.is_empty() {
            return Err(Error::Validation(
                crate::errors::ValidationError::MissingField("account_id".to_string()),
            ));
        }

        let db_path = init(data_dir, account_id)?;
        let pool = create_pool(&db_path)?;
        run_migrations(&pool)?;
        let writer = spawn_writer(pool.as_ref().clone());

        Ok(Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        })
    }

    /// Builds a handle over an existing pool, spawning a fresh writer for it.
    pub fn from_pool(pool: Arc<DbPool>, account_id: &str) -> Self {
        let writer = spawn_writer(pool.as_ref().clone());
        Self {
            pool,
            writer,
            account_id: account_id.to_string(),
        }
    }

    pub fn pool(&self) -> Arc<DbPool> {
        self.pool.clone()
    }

    pub fn writer(&self) -> WriteHandle {
        self.writer.clone()
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

pub fn init(data_dir: &str, account_id: &str) -> Result<String> {
    let db_path = get_db_path(data_dir, account_id);

    if let Some(db_dir) = Path::new(&db_path).parent() {
        if !db_dir.exists() {
            fs::create_dir_all(db_dir)?;
        }
    }

    {
        let mut conn = SqliteConnection::establish(&db_path)
            .map_err(DatabaseError::ConnectionFailed)?;
        conn.batch_execute(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 30000;
            PRAGMA synchronous  = NORMAL;
        ",
        )?;
    }

    Ok(db_path)
}

pub fn create_pool(db_path: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(db_path);
    let pool = r2d2::Pool::builder()
        .max_size(8)
        .min_idle(Some(1)) // Keep at least one connection ready
        .connection_timeout(std::time::Duration::from_secs(30))
        .connection_customizer(Box::new(ConnectionCustomizer {}))
        .build(manager)
        .map_err(DatabaseError::PoolCreationFailed)?;
    Ok(Arc::new(pool))
}

pub fn run_migrations(pool: &DbPool) -> Result<()> {
    info!("Running database migrations");
    let mut connection = get_connection(pool)?;

    let result = connection.run_pending_migrations(MIGRATIONS).map_err(|e| {
        error!("Database migration failed: {}", e);
        Error::Database(DatabaseError::MigrationFailed(e.to_string()))
    })?;

    if result.is_empty() {
        info!("No pending migrations to apply.");
    } else {
        info!("Applied the following migrations:");
        for migration_version in &result {
            info!("  - {}", migration_version);
        }
    }

    Ok(())
}

pub fn get_db_path(data_dir: &str, account_id: &str) -> String {
    // DATABASE_URL wins when set, mainly for tooling
    std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        Path::new(data_dir)
            .join(account_id)
            .join("navfolio.db")
            .to_string_lossy()
            .to_string()
    })
}

/// Gets a connection from the pool
pub fn get_connection(pool: &Pool<ConnectionManager<SqliteConnection>>) -> Result<DbConnection> {
    Ok(pool.get()?)
}

#[derive(Debug)]
struct ConnectionCustomizer;

impl r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionCustomizer {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        use diesel::RunQueryDsl;

        diesel::sql_query(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 30000;
            PRAGMA synchronous = NORMAL;
        ",
        )
        .execute(conn)
        .map_err(diesel::r2d2::Error::QueryError)?;

        Ok(())
    }
}
