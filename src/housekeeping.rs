//! Housekeeping telemetry: counter snapshot plus the packed result arrays.
//!
//! The packed encodings are mission interface. This module is the single
//! source of truth for the result codes and bit layout; the unpackers are
//! the exact inverses and exist so ground tooling and tests share them.

use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::rpn::ActionResult;
use crate::services::{MissionTime, Services};
use crate::tables::actionpoint::{ActionResultEntry, ActionpointTable, ApState};
use crate::tables::watchpoint::{WatchResult, WatchpointTable};

// Two-bit watch result codes.
pub const WP_CODE_STALE: u8 = 0b00;
pub const WP_CODE_FALSE: u8 = 0b01;
pub const WP_CODE_TRUE: u8 = 0b10;
pub const WP_CODE_ERROR: u8 = 0b11;

// Two-bit actionpoint state codes; PERMOFF is reported as NOT_USED.
pub const AP_CODE_NOT_USED: u8 = 0b00;
pub const AP_CODE_ACTIVE: u8 = 0b01;
pub const AP_CODE_PASSIVE: u8 = 0b10;
pub const AP_CODE_DISABLED: u8 = 0b11;

// Two-bit actionpoint result codes.
pub const AP_CODE_STALE: u8 = 0b00;
pub const AP_CODE_PASS: u8 = 0b01;
pub const AP_CODE_FAIL: u8 = 0b10;
pub const AP_CODE_ERROR: u8 = 0b11;

pub fn watch_result_code(result: WatchResult) -> u8 {
    match result {
        WatchResult::Stale => WP_CODE_STALE,
        WatchResult::False => WP_CODE_FALSE,
        WatchResult::True => WP_CODE_TRUE,
        WatchResult::Error => WP_CODE_ERROR,
    }
}

pub fn ap_state_code(state: ApState) -> u8 {
    match state {
        ApState::NotUsed | ApState::PermOff => AP_CODE_NOT_USED,
        ApState::Active => AP_CODE_ACTIVE,
        ApState::Passive => AP_CODE_PASSIVE,
        ApState::Disabled => AP_CODE_DISABLED,
    }
}

pub fn action_result_code(result: ActionResult) -> u8 {
    match result {
        ActionResult::Stale => AP_CODE_STALE,
        ActionResult::Pass => AP_CODE_PASS,
        ActionResult::Fail => AP_CODE_FAIL,
        ActionResult::Error => AP_CODE_ERROR,
    }
}

/// Pack watch results four per byte. Byte `k` carries watchpoints
/// `4k..4k+3`, big-endian by index within the group: `4k+3` lands in bits
/// 7-6 and `4k` in bits 1-0.
pub fn pack_watch_results(results: &[WatchResult]) -> Vec<u8> {
    results
        .chunks(4)
        .map(|group| {
            let mut byte = 0u8;
            for (slot, result) in group.iter().enumerate() {
                byte |= watch_result_code(*result) << (slot * 2);
            }
            byte
        })
        .collect()
}

/// Inverse of [`pack_watch_results`]: recover the two-bit codes.
pub fn unpack_watch_results(bytes: &[u8], count: usize) -> Vec<u8> {
    (0..count)
        .map(|index| (bytes[index / 4] >> ((index % 4) * 2)) & 0b11)
        .collect()
}

/// Pack actionpoint state+result two entries per byte. Entry `2k+1` takes
/// bits 7-4 and entry `2k` bits 3-0; within each nibble the state code is
/// the high pair and the result code the low pair.
pub fn pack_action_results(entries: &[ActionResultEntry]) -> Vec<u8> {
    entries
        .chunks(2)
        .map(|group| {
            let mut byte = 0u8;
            for (slot, entry) in group.iter().enumerate() {
                let nibble =
                    (ap_state_code(entry.current_state) << 2) | action_result_code(entry.result);
                byte |= nibble << (slot * 4);
            }
            byte
        })
        .collect()
}

/// Inverse of [`pack_action_results`]: per entry, `(state_code, result_code)`.
pub fn unpack_action_results(bytes: &[u8], count: usize) -> Vec<(u8, u8)> {
    (0..count)
        .map(|index| {
            let nibble = (bytes[index / 2] >> ((index % 2) * 4)) & 0x0F;
            (nibble >> 2, nibble & 0b11)
        })
        .collect()
}

/// Housekeeping packet payload. Field order is mission interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HkPacket {
    pub timestamp: MissionTime,
    pub cmd_count: u8,
    pub cmd_err_count: u8,
    pub lc_state: u8,
    pub active_aps: u8,
    pub ap_sample_count: u16,
    pub passive_rts_exec_count: u16,
    pub wps_in_use: u16,
    pub rts_exec_count: u16,
    pub monitored_msg_count: u32,
    #[serde(with = "serde_bytes")]
    pub wp_results: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub ap_results: Vec<u8>,
}

impl HkPacket {
    /// Wire form of the payload behind the bus header: the fields above in
    /// order, multi-byte fields big-endian. The timestamp rides in the
    /// envelope's secondary header, not here.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + self.wp_results.len() + self.ap_results.len());
        out.push(self.cmd_count);
        out.push(self.cmd_err_count);
        out.push(self.lc_state);
        out.push(self.active_aps);
        out.extend_from_slice(&self.ap_sample_count.to_be_bytes());
        out.extend_from_slice(&self.passive_rts_exec_count.to_be_bytes());
        out.extend_from_slice(&self.wps_in_use.to_be_bytes());
        out.extend_from_slice(&self.rts_exec_count.to_be_bytes());
        out.extend_from_slice(&self.monitored_msg_count.to_be_bytes());
        out.extend_from_slice(&self.wp_results);
        out.extend_from_slice(&self.ap_results);
        out
    }
}

/// Gather counters and packed results into one packet, timestamped via the
/// clock collaborator.
pub fn build_packet<S: Services>(
    app: &AppState,
    watchpoints: &WatchpointTable,
    actionpoints: &ActionpointTable,
    services: &mut S,
) -> HkPacket {
    let watch_codes: Vec<WatchResult> = watchpoints
        .results()
        .iter()
        .map(|entry| entry.result)
        .collect();

    let active_aps = actionpoints
        .results()
        .iter()
        .filter(|entry| entry.current_state == ApState::Active)
        .count() as u8;

    HkPacket {
        timestamp: services.now(),
        cmd_count: app.cmd_count,
        cmd_err_count: app.cmd_err_count,
        lc_state: app.lc_state.to_wire(),
        active_aps,
        ap_sample_count: app.ap_sample_count,
        passive_rts_exec_count: app.passive_rts_exec_count,
        wps_in_use: watchpoints.in_use_count(),
        rts_exec_count: app.rts_exec_count,
        monitored_msg_count: app.monitored_msg_count,
        wp_results: pack_watch_results(&watch_codes),
        ap_results: pack_action_results(actionpoints.results()),
    }
}
