#![allow(async_fn_in_trait)]

use std::sync::OnceLock;
use std::time::Instant;

use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::warn;

type Params<'a> = &'a [&'a (dyn ToSql + Sync)];

fn slow_query_threshold_ms() -> Option<u64> {
    static THRESHOLD: OnceLock<Option<u64>> = OnceLock::new();

    *THRESHOLD.get_or_init(|| {
        std::env::var("IR_DB_LOG_MIN_DURATION_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
    })
}

fn log_if_slow(label: &str, started_at: Instant) {
    let Some(threshold_ms) = slow_query_threshold_ms() else {
        return;
    };

    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    if elapsed_ms >= threshold_ms {
        warn!(query = label, elapsed_ms, threshold_ms, "slow_query_detected");
    }
}

/// Prepared-statement helpers that report queries slower than
/// `IR_DB_LOG_MIN_DURATION_MS`.
pub trait TimedClientExt: GenericClient {
    async fn timed_query_cached(
        &self,
        sql: &str,
        params: Params<'_>,
        label: &str,
    ) -> Result<Vec<Row>, tokio_postgres::Error> {
        let started = Instant::now();
        let statement = self.prepare_cached(sql).await?;
        let result = self.query(&statement, params).await;
        log_if_slow(label, started);
        result
    }

    async fn timed_query_opt_cached(
        &self,
        sql: &str,
        params: Params<'_>,
        label: &str,
    ) -> Result<Option<Row>, tokio_postgres::Error> {
        let started = Instant::now();
        let statement = self.prepare_cached(sql).await?;
        let result = self.query_opt(&statement, params).await;
        log_if_slow(label, started);
        result
    }

    async fn timed_execute_cached(
        &self,
        sql: &str,
        params: Params<'_>,
        label: &str,
    ) -> Result<u64, tokio_postgres::Error> {
        let started = Instant::now();
        let statement = self.prepare_cached(sql).await?;
        let result = self.execute(&statement, params).await;
        log_if_slow(label, started);
        result
    }
}

impl<T: GenericClient + ?Sized> TimedClientExt for T {}
