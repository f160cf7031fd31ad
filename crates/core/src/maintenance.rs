//! In-memory maintenance windows.
//!
//! Windows live only in process memory and are lost on restart. Expired
//! windows are evicted lazily whenever the table is read; there is no
//! background sweep.

use std::collections::{HashMap, HashSet};

use chrono::TimeDelta;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::types::{MachineId, Timestamp};

/// Default length of a scheduled maintenance window.
pub const DEFAULT_WINDOW_MINUTES: i64 = 10;

/// A maintenance window for one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaintenanceWindow {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl MaintenanceWindow {
    pub fn contains(&self, now: Timestamp) -> bool {
        self.start <= now && now <= self.end
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.end
    }
}

/// Process-wide maintenance table keyed by machine id.
///
/// Shared via `Arc` between request handlers and stream tasks; every
/// access goes through the interior `RwLock`.
#[derive(Debug, Default)]
pub struct MaintenanceSchedule {
    windows: RwLock<HashMap<MachineId, MaintenanceWindow>>,
}

impl MaintenanceSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule (or replace) the window for `machine_id`.
    pub async fn schedule(
        &self,
        machine_id: &str,
        start: Timestamp,
        length: TimeDelta,
    ) -> MaintenanceWindow {
        let window = MaintenanceWindow {
            start,
            end: start + length,
        };
        self.windows
            .write()
            .await
            .insert(machine_id.to_string(), window);
        window
    }

    /// Whether `machine_id` is under maintenance at `now`. Evicts the
    /// machine's window if it has expired.
    pub async fn is_under_maintenance(&self, machine_id: &str, now: Timestamp) -> bool {
        let window = self.windows.read().await.get(machine_id).copied();
        match window {
            Some(w) if w.is_expired(now) => {
                let mut windows = self.windows.write().await;
                if windows.get(machine_id).is_some_and(|w| w.is_expired(now)) {
                    windows.remove(machine_id);
                }
                false
            }
            Some(w) => w.contains(now),
            None => false,
        }
    }

    /// Machines under maintenance at `now`. Evicts every expired window.
    pub async fn active_at(&self, now: Timestamp) -> HashSet<MachineId> {
        let mut windows = self.windows.write().await;
        windows.retain(|_, w| !w.is_expired(now));
        windows
            .iter()
            .filter(|(_, w)| w.contains(now))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Number of windows currently held, expired or not.
    pub async fn len(&self) -> usize {
        self.windows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.windows.read().await.is_empty()
    }
}
