//! Repository for the `alerts` table.

use lathe_core::alert::{AlertStatus, SEVERITY_CRITICAL};
use lathe_core::types::{JobId, Timestamp};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::alert::{Alert, NewAlert};
use crate::store::StoreError;

const COLUMNS: &str = "\
    id, machine_id, job_id, created_at, alert_type, severity, message, status, \
    requires_maintenance, triggered_by";

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    machine_id: String,
    job_id: Option<JobId>,
    created_at: Timestamp,
    alert_type: String,
    severity: i16,
    message: String,
    status: String,
    requires_maintenance: bool,
    triggered_by: Option<String>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        let status = AlertStatus::parse(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("alert {}: {e}", row.id)))?;
        Ok(Alert {
            id: row.id,
            machine_id: row.machine_id,
            job_id: row.job_id,
            timestamp: row.created_at,
            alert_type: row.alert_type,
            severity: row.severity,
            message: row.message,
            status,
            requires_maintenance: row.requires_maintenance,
            triggered_by: row.triggered_by,
        })
    }
}

pub struct AlertRepo;

impl AlertRepo {
    pub async fn insert(pool: &PgPool, alert: &NewAlert) -> Result<Alert, StoreError> {
        let query = format!(
            "INSERT INTO alerts (id, machine_id, job_id, alert_type, severity, message, status, \
                 requires_maintenance, triggered_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AlertRow>(&query)
            .bind(Uuid::new_v4())
            .bind(&alert.machine_id)
            .bind(alert.job_id)
            .bind(&alert.alert_type)
            .bind(alert.severity)
            .bind(&alert.message)
            .bind(AlertStatus::Active.as_str())
            .bind(alert.requires_maintenance)
            .bind(&alert.triggered_by)
            .fetch_one(pool)
            .await?;
        Alert::try_from(row)
    }

    /// Most recent active critical alert that requires maintenance.
    pub async fn find_active_critical(
        pool: &PgPool,
        machine_id: &str,
    ) -> Result<Option<Alert>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts \
             WHERE machine_id = $1 AND status = $2 AND severity = $3 AND requires_maintenance \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(machine_id)
            .bind(AlertStatus::Active.as_str())
            .bind(SEVERITY_CRITICAL)
            .fetch_optional(pool)
            .await?
            .map(Alert::try_from)
            .transpose()
    }

    pub async fn list_for_machine(pool: &PgPool, machine_id: &str) -> Result<Vec<Alert>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM alerts WHERE machine_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AlertRow>(&query)
            .bind(machine_id)
            .fetch_all(pool)
            .await?
            .into_iter()
            .map(Alert::try_from)
            .collect()
    }
}
