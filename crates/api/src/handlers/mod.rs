pub mod alerts;
pub mod fleet;
pub mod jobs;
pub mod machines;
pub mod maintenance;
pub mod streams;

use lathe_core::types::MachineId;

use crate::error::AppResult;
use crate::state::AppState;

/// Reject machine ids outside the configured fleet with 404.
pub(crate) fn known_machine(state: &AppState, machine_id: MachineId) -> AppResult<MachineId> {
    state.fleet.validate_machine_id(&machine_id)?;
    Ok(machine_id)
}
