//! Input focus arbitration
//!
//! While the panel is visible no other process may receive controller
//! input. Opening the panel revokes input from the system applets and the
//! running application and grants it to this process; closing restores it.

use std::ops::Range;

use tracing::{debug, warn};

use crate::error::Result;

/// Program ids of the system applets
pub const APPLET_PROGRAM_IDS: Range<u64> = 0x0100_0000_0000_1000..0x0100_0000_0000_1020;

/// Process id addressing the calling process
pub const OWN_PROCESS: u64 = 0;

/// Platform services deciding which process gets controller input
pub trait InputFocus {
    /// Process id of a running program
    fn process_id(&mut self, program_id: u64) -> Option<u64>;

    /// Process id of the foreground application
    fn application_process_id(&mut self) -> Option<u64>;

    /// Allow or deny controller input for a process
    fn permit_input(&mut self, process_id: u64, permit: bool) -> Result<()>;
}

/// Record of a focus takeover, needed to undo it
#[derive(Debug, PartialEq, Eq)]
#[must_use = "focus stays revoked until the grant is restored"]
pub struct FocusGrant {
    revoked: Vec<u64>,
}

impl FocusGrant {
    /// Revoke input from every other running process and grant it to us
    pub fn acquire<F: InputFocus + ?Sized>(focus: &mut F) -> Result<Self> {
        let mut others: Vec<u64> = APPLET_PROGRAM_IDS
            .filter_map(|program_id| focus.process_id(program_id))
            .collect();
        others.extend(focus.application_process_id());

        let mut revoked = Vec::with_capacity(others.len());
        for pid in others {
            if pid == OWN_PROCESS {
                continue;
            }
            match focus.permit_input(pid, false) {
                Ok(()) => revoked.push(pid),
                Err(e) => warn!("Could not revoke input from process {}: {}", pid, e),
            }
        }

        let grant = Self { revoked };
        if let Err(e) = focus.permit_input(OWN_PROCESS, true) {
            grant.restore(focus);
            return Err(e);
        }

        debug!("Input focus taken from {} process(es)", grant.revoked.len());
        Ok(grant)
    }

    /// Processes that lost input
    pub fn revoked(&self) -> &[u64] {
        &self.revoked
    }

    /// Give input back to every process it was taken from
    pub fn restore<F: InputFocus + ?Sized>(self, focus: &mut F) {
        for pid in &self.revoked {
            if let Err(e) = focus.permit_input(*pid, true) {
                warn!("Could not restore input for process {}: {}", pid, e);
            }
        }
        debug!("Input focus restored to {} process(es)", self.revoked.len());
    }
}
