//! Fleet definition: which machines exist and how their ids are spelled.

use crate::error::CoreError;
use crate::types::MachineId;

/// Prefix shared by every machine id.
pub const MACHINE_ID_PREFIX: &str = "LATHE-";

/// Number of machines in the default fleet.
pub const DEFAULT_FLEET_SIZE: u16 = 20;

/// Format the canonical id for machine number `n` (1-based), e.g. `LATHE-03`.
pub fn machine_id(n: u16) -> MachineId {
    format!("{MACHINE_ID_PREFIX}{n:02}")
}

/// Parse the machine number out of an id such as `LATHE-03`.
///
/// Returns `None` for anything that is not `LATHE-` followed by digits.
pub fn machine_number(id: &str) -> Option<u16> {
    let digits = id.strip_prefix(MACHINE_ID_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// The set of machines monitored by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fleet {
    size: u16,
}

impl Fleet {
    pub fn new(size: u16) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    /// All machine ids in fleet order.
    pub fn machine_ids(&self) -> Vec<MachineId> {
        (1..=self.size).map(machine_id).collect()
    }

    /// Whether `id` names a machine of this fleet.
    ///
    /// Only the canonical two-digit spelling is accepted (`LATHE-3` is not
    /// `LATHE-03`).
    pub fn contains(&self, id: &str) -> bool {
        match machine_number(id) {
            Some(n) => n >= 1 && n <= self.size && machine_id(n) == id,
            None => false,
        }
    }

    /// Validate that `id` belongs to the fleet.
    pub fn validate_machine_id(&self, id: &str) -> Result<(), CoreError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(CoreError::NotFound {
                entity: "Machine",
                id: id.to_string(),
            })
        }
    }
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new(DEFAULT_FLEET_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn machine_ids_are_zero_padded() {
        assert_eq!(machine_id(1), "LATHE-01");
        assert_eq!(machine_id(20), "LATHE-20");
    }

    #[test]
    fn default_fleet_lists_twenty_machines() {
        let ids = Fleet::default().machine_ids();
        assert_eq!(ids.len(), 20);
        assert_eq!(ids.first().map(String::as_str), Some("LATHE-01"));
        assert_eq!(ids.last().map(String::as_str), Some("LATHE-20"));
    }

    #[test]
    fn contains_rejects_foreign_and_malformed_ids() {
        let fleet = Fleet::new(5);
        assert!(fleet.contains("LATHE-05"));
        assert!(!fleet.contains("LATHE-06"));
        assert!(!fleet.contains("LATHE-00"));
        assert!(!fleet.contains("LATHE-5"));
        assert!(!fleet.contains("lathe-01"));
        assert!(!fleet.contains("LATHE-"));
        assert!(!fleet.contains("MILL-01"));
    }

    #[test]
    fn validate_machine_id_reports_not_found() {
        let err = Fleet::new(2).validate_machine_id("LATHE-09").unwrap_err();
        assert!(matches!(err, CoreError::NotFound { entity: "Machine", .. }));
    }
}
