//! Collaborator seam between the limit checker and its host environment.
//!
//! The flight build wires these to the real event service, stored-command
//! processor, and bus; the host binary wires them to TCP broadcast and
//! `tracing`; tests record them.

use serde::{Deserialize, Serialize};

use crate::events::EventSeverity;
use crate::housekeeping::HkPacket;

/// Spacecraft time as delivered by the clock service: whole seconds and
/// 2^-32-second subsecond ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MissionTime {
    pub seconds: u32,
    pub subseconds: u32,
}

/// External services the monitoring engine calls out to.
///
/// All calls are fire-and-forget from the engine's point of view; failures
/// are the collaborator's problem and never unwind into the sampler.
pub trait Services {
    /// Emit a classified event message.
    fn emit_event(&mut self, event_id: u16, severity: EventSeverity, text: &str);

    /// Request execution of a stored command sequence.
    fn request_rts(&mut self, rts_id: u16);

    /// Current spacecraft time.
    fn now(&mut self) -> MissionTime;

    /// Transmit a housekeeping packet on the software bus.
    fn publish_hk(&mut self, packet: &HkPacket);
}
