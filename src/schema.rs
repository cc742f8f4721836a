//! Database schema management for `agrilink-sensorflow`.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs` when a database is configured.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `sensor_data` for raw readings, `alerts` for alert events and
/// `alert_thresholds` for per-owner bands. Safe to call on every startup;
/// no-op if objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Raw readings; the timestamp stays in whatever encoding the writer used
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_data (
            id            UUID PRIMARY KEY,
            owner_id      TEXT             NOT NULL,
            sensor_id     TEXT,
            sensor_type   TEXT             NOT NULL,
            value         DOUBLE PRECISION NOT NULL,
            unit          TEXT             NOT NULL DEFAULT '',
            location      TEXT             NOT NULL DEFAULT '',
            timestamp_raw JSONB
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alerts (
            id          UUID PRIMARY KEY,
            owner_id    TEXT        NOT NULL,
            sensor_type TEXT        NOT NULL,
            severity    TEXT        NOT NULL,
            message     TEXT        NOT NULL,
            location    TEXT        NOT NULL,
            timestamp   TIMESTAMPTZ NOT NULL,
            is_read     BOOLEAN     NOT NULL DEFAULT FALSE
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS alert_thresholds (
            owner_id    TEXT             NOT NULL,
            sensor_type TEXT             NOT NULL,
            min_value   DOUBLE PRECISION NOT NULL,
            max_value   DOUBLE PRECISION NOT NULL,
            PRIMARY KEY (owner_id, sensor_type),
            CHECK (min_value <= max_value)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Every query is scoped to one owner
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_owner_type
            ON sensor_data (owner_id, sensor_type);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_alerts_owner_timestamp
            ON alerts (owner_id, timestamp DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
