use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, warn};

use super::manager::DatabaseError;

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS posts (
        id BIGSERIAL PRIMARY KEY,
        owner_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        title TEXT NOT NULL DEFAULT 'Untitled',
        content JSONB NOT NULL DEFAULT '{}'::jsonb,
        status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS posts_owner_id_idx ON posts (owner_id)",
];

/// Create the users and posts tables if they are missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    info!("Database schema ready");
    Ok(())
}

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Keep running `ensure_schema` until it succeeds, then raise `ready`.
pub async fn bootstrap_schema(pool: PgPool, ready: &AtomicBool) {
    let pool = &pool;
    retry_with_backoff(|| ensure_schema(pool), ready, INITIAL_RETRY_DELAY, MAX_RETRY_DELAY).await;
}

/// Exponential backoff without an attempt cap; the delay doubles up to `max_delay`.
async fn retry_with_backoff<F, Fut>(mut attempt: F, ready: &AtomicBool, initial_delay: Duration, max_delay: Duration)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), DatabaseError>>,
{
    let mut delay = initial_delay;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        match attempt().await {
            Ok(()) => {
                ready.store(true, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                warn!("Schema bootstrap attempt {} failed: {}; retrying in {:?}", attempts, e, delay);
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn retries_until_bootstrap_succeeds() {
        let ready = AtomicBool::new(false);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        retry_with_backoff(
            || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DatabaseError::ConnectionError("pool timed out".to_string()))
                } else {
                    Ok(())
                }
            },
            &ready,
            Duration::from_millis(1),
            Duration::from_millis(4),
        )
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(ready.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn ready_stays_low_while_bootstrap_fails() {
        let ready = AtomicBool::new(false);

        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            retry_with_backoff(
                || async { Err(DatabaseError::ConnectionError("connection refused".to_string())) },
                &ready,
                Duration::from_millis(1),
                Duration::from_millis(5),
            ),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!ready.load(Ordering::SeqCst));
    }
}
