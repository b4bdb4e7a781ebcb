//! Row mapping for the `maintenance_windows` table.
//!
//! Device lists are stored as JSON arrays in TEXT columns.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::errors::Result;
use crate::window::{MaintenanceWindow, Status};

pub(super) const WINDOW_COLUMNS: &str = "id, description, start_time, end_time, switches, interfaces, links, status, inserted_at, updated_at";

pub(super) fn encode_devices(devices: &[String]) -> Result<String> {
    Ok(serde_json::to_string(devices)?)
}

fn decode_devices(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

pub(super) fn window_from_row(row: &SqliteRow) -> Result<MaintenanceWindow> {
    let switches: String = row.try_get("switches")?;
    let interfaces: String = row.try_get("interfaces")?;
    let links: String = row.try_get("links")?;
    let status: String = row.try_get("status")?;

    Ok(MaintenanceWindow {
        id: row.try_get("id")?,
        description: row.try_get("description")?,
        start: row.try_get("start_time")?,
        end: row.try_get("end_time")?,
        switches: decode_devices(&switches)?,
        interfaces: decode_devices(&interfaces)?,
        links: decode_devices(&links)?,
        status: status.parse::<Status>()?,
        inserted_at: row.try_get("inserted_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn windows_from_rows(rows: &[SqliteRow]) -> Result<Vec<MaintenanceWindow>> {
    rows.iter().map(window_from_row).collect()
}
