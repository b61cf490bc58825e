use crate::config::AppConfig;
use crate::errors::ServiceError;
use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use sea_orm::{
    ConnectOptions, Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());
    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("checkout_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let pool = Database::connect(opt).await.map_err(ServiceError::from)?;

    info!("Database connection pool established");
    Ok(pool)
}

/// Establish DB pool using AppConfig tuning
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    let db_cfg: DbConfig = cfg.into();
    establish_connection_with_config(&db_cfg).await
}

/// Runs the embedded database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    info!("Running database migrations");
    let start = std::time::Instant::now();

    let result = crate::migrator::Migrator::up(pool, None)
        .await
        .map_err(ServiceError::from);

    match &result {
        Ok(_) => info!("Database migrations completed in {:?}", start.elapsed()),
        Err(e) => error!("Database migrations failed after {:?}: {}", start.elapsed(), e),
    }
    result
}

/// Checks that the database connection is alive
pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    pool.ping().await.map_err(|e| {
        counter!("checkout_db.connection_failures", 1);
        ServiceError::from(e)
    })
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("Closing database connection pool");
    pool.close().await.map_err(ServiceError::from)
}

/// Transaction coordinator over the shared connection pool.
///
/// This is the only place transaction boundaries live. A unit of work runs
/// against a single acquired connection: the coordinator begins the
/// transaction, invokes the closure, commits when it returns `Ok`, and rolls
/// back (discarding all writes) when it returns `Err`. Callers never touch
/// begin/commit/rollback themselves, and nested calls are not supported; one
/// logical operation is one transaction.
///
/// Row-locking contract: a `SELECT ... FOR UPDATE` issued inside the unit of
/// work (sea-orm `lock_exclusive`) holds the row until this transaction
/// commits or rolls back, serializing concurrent writers of that row. SQLite
/// has no row locks; its whole-database write lock provides the equivalent
/// guarantee there.
#[derive(Debug, Clone)]
pub struct Db {
    pool: Arc<DbPool>,
}

impl Db {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Borrow the underlying pool for plain (non-transactional) reads.
    pub fn conn(&self) -> &DbPool {
        &self.pool
    }

    pub fn pool(&self) -> Arc<DbPool> {
        self.pool.clone()
    }

    /// Execute `f` inside a single atomic transaction.
    ///
    /// Business failures (`Err` from the closure) roll the transaction back
    /// and propagate with their classification intact so the HTTP boundary
    /// can still map them. Begin/commit/connection failures are wrapped as
    /// `ServiceError::TransactionFailed`; pool acquire timeouts surface as
    /// `ServiceError::Unavailable`.
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, ServiceError>
    where
        F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>>
            + Send,
        T: Send + 'static,
    {
        let transaction_id = Uuid::new_v4();
        let start = std::time::Instant::now();

        debug!(transaction_id = %transaction_id, "beginning transaction");
        counter!("checkout_db.transaction.started", 1);

        let result = self.pool.transaction(move |txn| f(txn)).await;

        let elapsed = start.elapsed();
        histogram!("checkout_db.transaction.duration", elapsed);

        match result {
            Ok(value) => {
                counter!("checkout_db.transaction.committed", 1);
                debug!(transaction_id = %transaction_id, "transaction committed in {:?}", elapsed);
                Ok(value)
            }
            Err(sea_orm::TransactionError::Transaction(err)) => {
                counter!("checkout_db.transaction.rolled_back", 1);
                warn!(
                    transaction_id = %transaction_id,
                    "transaction rolled back; all changes reverted: {}", err
                );
                Err(err)
            }
            Err(sea_orm::TransactionError::Connection(err)) => {
                counter!("checkout_db.transaction.rolled_back", 1);
                error!(
                    transaction_id = %transaction_id,
                    "transaction aborted by connection failure: {}", err
                );
                Err(match err {
                    DbErr::ConnectionAcquire(e) => {
                        ServiceError::Unavailable(format!("could not acquire connection: {}", e))
                    }
                    other => ServiceError::TransactionFailed(format!(
                        "transaction rolled back; all changes reverted: {}",
                        other
                    )),
                })
            }
        }
    }
}
