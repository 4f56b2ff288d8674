//! Event identifiers and severities for the event-service interface.
//!
//! Event IDs are part of the mission interface: ground procedures filter on
//! them, so the numbering is fixed here and never reused.

use serde::{Deserialize, Serialize};

/// Severity domain of the external event service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Error,
    Critical,
}

// Application lifecycle
pub const INIT_INF_EID: u16 = 1;
pub const BUS_FATAL_CRIT_EID: u16 = 2;

// Command interface
pub const NOOP_INF_EID: u16 = 10;
pub const RESET_DBG_EID: u16 = 11;
pub const CMD_LEN_ERR_EID: u16 = 12;
pub const CMD_CODE_ERR_EID: u16 = 13;
pub const LC_STATE_INF_EID: u16 = 14;
pub const LC_STATE_ERR_EID: u16 = 15;
pub const AP_STATE_INF_EID: u16 = 16;
pub const AP_STATE_ERR_EID: u16 = 17;
pub const AP_PERMOFF_INF_EID: u16 = 18;
pub const AP_PERMOFF_ERR_EID: u16 = 19;
pub const AP_STATS_INF_EID: u16 = 20;
pub const AP_STATS_ERR_EID: u16 = 21;
pub const WP_STATS_INF_EID: u16 = 22;
pub const WP_STATS_ERR_EID: u16 = 23;

// Monitoring
pub const WP_READ_ERR_EID: u16 = 30;
pub const WP_COMPARE_ERR_EID: u16 = 31;
pub const AP_SAMPLE_RANGE_ERR_EID: u16 = 32;
pub const AP_EQUATION_ERR_EID: u16 = 33;
pub const AP_PASSIVE_FAIL_DBG_EID: u16 = 34;
pub const AP_FAIL_TO_PASS_INF_EID: u16 = 35;

// Table management
pub const TABLE_SWAP_INF_EID: u16 = 40;
