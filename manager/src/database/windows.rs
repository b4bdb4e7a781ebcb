//! Maintenance window database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, error, info};

use super::records::{encode_devices, window_from_row, windows_from_rows, WINDOW_COLUMNS};
use super::retry::retry_transient;
use super::Database;
use crate::errors::{MaintenanceError, Result};
use crate::store::{CatchUp, WindowStore};
use crate::window::{MaintenanceWindow, Status};

#[async_trait]
impl WindowStore for Database {
    async fn insert_window(
        &self,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceWindow> {
        debug!("Storing maintenance window: {}", window.id);

        let mut stored = window.clone();
        stored.inserted_at = Some(now);
        stored.updated_at = Some(now);

        let switches = encode_devices(&stored.switches)?;
        let interfaces = encode_devices(&stored.interfaces)?;
        let links = encode_devices(&stored.links)?;
        let sql = format!(
            "INSERT INTO maintenance_windows ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            WINDOW_COLUMNS
        );

        let (pool, record, sql) = (&self.pool, &stored, sql.as_str());
        let (switches, interfaces, links) = (switches.as_str(), interfaces.as_str(), links.as_str());

        let result = retry_transient(&self.retry, "insert_window", move || async move {
            sqlx::query(sql)
                .bind(&record.id)
                .bind(&record.description)
                .bind(record.start)
                .bind(record.end)
                .bind(switches)
                .bind(interfaces)
                .bind(links)
                .bind(record.status.as_str())
                .bind(record.inserted_at)
                .bind(record.updated_at)
                .execute(pool)
                .await
        })
        .await;

        match result {
            Ok(_) => {
                debug!("Maintenance window stored: {}", stored.id);
                Ok(stored)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(MaintenanceError::DuplicateId(stored.id))
            }
            Err(e) => {
                error!("Failed to store maintenance window {}: {}", stored.id, e);
                Err(e.into())
            }
        }
    }

    async fn update_window(
        &self,
        window: &MaintenanceWindow,
        now: DateTime<Utc>,
    ) -> Result<MaintenanceWindow> {
        debug!("Updating maintenance window: {}", window.id);

        let switches = encode_devices(&window.switches)?;
        let interfaces = encode_devices(&window.interfaces)?;
        let links = encode_devices(&window.links)?;
        let sql = format!(
            r#"
            UPDATE maintenance_windows
            SET description = ?, start_time = ?, end_time = ?,
                switches = ?, interfaces = ?, links = ?, updated_at = ?
            WHERE id = ?
            RETURNING {}
            "#,
            WINDOW_COLUMNS
        );

        let (pool, record, sql) = (&self.pool, window, sql.as_str());
        let (switches, interfaces, links) = (switches.as_str(), interfaces.as_str(), links.as_str());

        let row = retry_transient(&self.retry, "update_window", move || async move {
            sqlx::query(sql)
                .bind(&record.description)
                .bind(record.start)
                .bind(record.end)
                .bind(switches)
                .bind(interfaces)
                .bind(links)
                .bind(now)
                .bind(&record.id)
                .fetch_optional(pool)
                .await
        })
        .await?;

        match row {
            Some(row) => window_from_row(&row),
            None => Err(MaintenanceError::NotFound(window.id.clone())),
        }
    }

    async fn get_window(&self, id: &str) -> Result<Option<MaintenanceWindow>> {
        debug!("Querying maintenance window by ID: {}", id);

        let sql = format!("SELECT {} FROM maintenance_windows WHERE id = ?", WINDOW_COLUMNS);
        let (pool, sql) = (&self.pool, sql.as_str());

        let row = retry_transient(&self.retry, "get_window", move || async move {
            sqlx::query(sql).bind(id).fetch_optional(pool).await
        })
        .await?;

        row.as_ref().map(window_from_row).transpose()
    }

    async fn get_windows(&self) -> Result<Vec<MaintenanceWindow>> {
        let sql = format!(
            "SELECT {} FROM maintenance_windows ORDER BY inserted_at ASC, id ASC",
            WINDOW_COLUMNS
        );
        let (pool, sql) = (&self.pool, sql.as_str());

        let rows = retry_transient(&self.retry, "get_windows", move || async move {
            sqlx::query(sql).fetch_all(pool).await
        })
        .await?;

        windows_from_rows(&rows)
    }

    async fn get_unfinished_windows(&self) -> Result<Vec<MaintenanceWindow>> {
        let sql = format!(
            "SELECT {} FROM maintenance_windows WHERE status != ? ORDER BY start_time ASC, id ASC",
            WINDOW_COLUMNS
        );
        let (pool, sql) = (&self.pool, sql.as_str());

        let rows = retry_transient(&self.retry, "get_unfinished_windows", move || async move {
            sqlx::query(sql)
                .bind(Status::Finished.as_str())
                .fetch_all(pool)
                .await
        })
        .await?;

        windows_from_rows(&rows)
    }

    async fn transition_window(
        &self,
        id: &str,
        from: Status,
        to: Status,
        now: DateTime<Utc>,
    ) -> Result<Option<MaintenanceWindow>> {
        let sql = format!(
            "UPDATE maintenance_windows SET status = ?, updated_at = ? WHERE id = ? AND status = ? RETURNING {}",
            WINDOW_COLUMNS
        );
        let (pool, sql) = (&self.pool, sql.as_str());

        let row = retry_transient(&self.retry, "transition_window", move || async move {
            sqlx::query(sql)
                .bind(to.as_str())
                .bind(now)
                .bind(id)
                .bind(from.as_str())
                .fetch_optional(pool)
                .await
        })
        .await?;

        match row {
            Some(row) => {
                debug!("Maintenance window {} moved {} -> {}", id, from, to);
                window_from_row(&row).map(Some)
            }
            None => {
                debug!("Maintenance window {} is not {}, transition skipped", id, from);
                Ok(None)
            }
        }
    }

    async fn remove_window(&self, id: &str) -> Result<bool> {
        let pool = &self.pool;
        let result = retry_transient(&self.retry, "remove_window", move || async move {
            sqlx::query("DELETE FROM maintenance_windows WHERE id = ?")
                .bind(id)
                .execute(pool)
                .await
        })
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn prepare_start(&self, now: DateTime<Utc>) -> Result<CatchUp> {
        let pool = &self.pool;

        let catch_up = retry_transient(&self.retry, "prepare_start", move || async move {
            let mut tx = pool.begin().await?;
            let rows = sqlx::query(
                "SELECT id, status, start_time, end_time FROM maintenance_windows WHERE status IN (?, ?)",
            )
            .bind(Status::Pending.as_str())
            .bind(Status::Running.as_str())
            .fetch_all(&mut *tx)
            .await?;

            let mut catch_up = CatchUp::default();
            for row in &rows {
                let id: String = row.try_get("id")?;
                let mut status: String = row.try_get("status")?;
                let start: DateTime<Utc> = row.try_get("start_time")?;
                let end: DateTime<Utc> = row.try_get("end_time")?;

                if status == Status::Pending.as_str() && start <= now {
                    sqlx::query("UPDATE maintenance_windows SET status = ?, updated_at = ? WHERE id = ?")
                        .bind(Status::Running.as_str())
                        .bind(now)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                    catch_up.started += 1;
                    status = Status::Running.as_str().to_string();
                }

                if status == Status::Running.as_str() && end <= now {
                    sqlx::query("UPDATE maintenance_windows SET status = ?, updated_at = ? WHERE id = ?")
                        .bind(Status::Finished.as_str())
                        .bind(now)
                        .bind(&id)
                        .execute(&mut *tx)
                        .await?;
                    catch_up.finished += 1;
                }
            }

            tx.commit().await?;
            Ok::<_, sqlx::Error>(catch_up)
        })
        .await?;

        if catch_up.started > 0 || catch_up.finished > 0 {
            info!(
                "Catch-up: {} windows started, {} windows finished while offline",
                catch_up.started, catch_up.finished
            );
        }
        Ok(catch_up)
    }
}
