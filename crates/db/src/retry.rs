use std::{future::Future, time::Duration};

use sea_orm::{DbErr, RuntimeErr};

const MAX_RETRIES: usize = 3;
const INITIAL_BACKOFF_MS: u64 = 50;
const MAX_BACKOFF_MS: u64 = 1_000;

/// Re-runs `op` while SQLite reports lock contention, backing off
/// exponentially between attempts.
pub async fn retry_on_sqlite_busy<T, F, Fut>(op: F) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    retry_when(op, is_sqlite_busy).await
}

async fn retry_when<T, F, Fut>(mut op: F, retryable: fn(&DbErr) -> bool) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut backoff = Duration::from_millis(INITIAL_BACKOFF_MS);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if retryable(&err) && attempt < MAX_RETRIES => {
                attempt += 1;
                tracing::debug!(attempt, error = %err, "SQLite busy; retrying");
                tokio::time::sleep(backoff).await;
                let next_ms = (backoff.as_millis() as u64)
                    .saturating_mul(2)
                    .min(MAX_BACKOFF_MS);
                backoff = Duration::from_millis(next_ms);
            }
            Err(err) => return Err(err),
        }
    }
}

/// SQLITE_BUSY (5) or SQLITE_LOCKED (6) reported by the driver.
fn is_sqlite_busy(err: &DbErr) -> bool {
    let (DbErr::Conn(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx_err))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx_err))) = err
    else {
        return false;
    };
    let Some(db_err) = sqlx_err.as_database_error() else {
        return false;
    };

    if let Some(code) = db_err.code() {
        if code == "5" || code == "6" {
            return true;
        }
    }

    let message = db_err.message();
    message.contains("database is locked") || message.contains("database is busy")
}
