use std::time::Duration;

use db_migration::Migrator;
use sea_orm::{
    ConnectOptions, Database,
    sqlx::sqlite::{SqliteJournalMode, SqliteSynchronous},
};
use sea_orm_migration::MigratorTrait;

pub mod entities;
pub mod models;
pub mod retry;
pub mod types;

pub use sea_orm::{DatabaseConnection, DbErr, SqlErr, TransactionTrait};

pub type DbPool = DatabaseConnection;

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    ///
    /// SQLite settings live on the connect options so every pooled
    /// connection gets them, not just the first one.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let in_memory = database_url.contains(":memory:");
        let mut options = ConnectOptions::new(database_url.to_string());
        options.sqlx_logging(false).map_sqlx_sqlite_opts(move |opts| {
            let opts = opts.foreign_keys(true);
            if in_memory {
                opts
            } else {
                opts.journal_mode(SqliteJournalMode::Wal)
                    .synchronous(SqliteSynchronous::Normal)
                    .busy_timeout(Duration::from_secs(30))
            }
        });
        let pool = Database::connect(options).await?;

        Migrator::up(&pool, None).await?;
        tracing::debug!("Database migrations applied");
        Ok(DBService { pool })
    }
}
