//! Ground command execution.
//!
//! Every command verifies its fixed payload length before anything else
//! (done in `msg::decode_command`); a rejected command bumps the error
//! counter, emits a classified event, and changes no target state.

use crate::app::{LcState, LimitChecker};
use crate::events::{
    EventSeverity, AP_PERMOFF_ERR_EID, AP_PERMOFF_INF_EID, AP_STATE_ERR_EID, AP_STATE_INF_EID,
    AP_STATS_ERR_EID, AP_STATS_INF_EID, CMD_CODE_ERR_EID, CMD_LEN_ERR_EID, LC_STATE_ERR_EID,
    LC_STATE_INF_EID, NOOP_INF_EID, RESET_DBG_EID, WP_STATS_ERR_EID, WP_STATS_INF_EID,
};
use crate::msg::{
    decode_command, CommandError, GroundCommand, ALL_ACTIONPOINTS, ALL_WATCHPOINTS,
};
use crate::services::Services;
use crate::tables::actionpoint::ApState;
use crate::tables::{MAX_ACTIONPOINTS, MAX_WATCHPOINTS};

impl<S: Services> LimitChecker<S> {
    pub(crate) fn handle_command_message(&mut self, payload: &[u8]) {
        let command = match decode_command(payload) {
            Ok(command) => command,
            Err(error) => {
                let event_id = match error {
                    CommandError::UnknownFunction(_) => CMD_CODE_ERR_EID,
                    CommandError::Empty | CommandError::LengthMismatch { .. } => CMD_LEN_ERR_EID,
                };
                self.reject(event_id, &error.to_string());
                return;
            }
        };

        match command {
            GroundCommand::Noop => self.cmd_noop(),
            GroundCommand::ResetCounters => self.cmd_reset_counters(),
            GroundCommand::SetLcState { state } => self.cmd_set_lc_state(state),
            GroundCommand::SetApState { actionpoint, state } => {
                self.cmd_set_ap_state(actionpoint, state);
            }
            GroundCommand::SetApPermOff { actionpoint } => self.cmd_set_ap_permoff(actionpoint),
            GroundCommand::ResetApStats { actionpoint } => self.cmd_reset_ap_stats(actionpoint),
            GroundCommand::ResetWpStats { watchpoint } => self.cmd_reset_wp_stats(watchpoint),
        }
    }

    fn accept(&mut self, event_id: u16, text: &str) {
        self.state.cmd_count = self.state.cmd_count.saturating_add(1);
        self.services.emit_event(event_id, EventSeverity::Info, text);
    }

    fn reject(&mut self, event_id: u16, text: &str) {
        self.state.cmd_err_count = self.state.cmd_err_count.saturating_add(1);
        self.services.emit_event(event_id, EventSeverity::Error, text);
    }

    fn cmd_noop(&mut self) {
        self.accept(
            NOOP_INF_EID,
            &format!("no-op command, version {}", env!("CARGO_PKG_VERSION")),
        );
    }

    fn cmd_reset_counters(&mut self) {
        // The command counter is zeroed along with the other five, so the
        // event reports post-reset counters.
        self.state.reset_counters();
        self.services
            .emit_event(RESET_DBG_EID, EventSeverity::Debug, "counters reset");
    }

    fn cmd_set_lc_state(&mut self, raw: u8) {
        match LcState::from_wire(raw) {
            Some(state) => {
                self.state.lc_state = state;
                self.accept(LC_STATE_INF_EID, &format!("LC state set to {state:?}"));
            }
            None => self.reject(LC_STATE_ERR_EID, &format!("invalid LC state {raw}")),
        }
    }

    fn cmd_set_ap_state(&mut self, actionpoint: u16, raw: u8) {
        let new_state = match ApState::from_wire(raw) {
            Some(state @ (ApState::Active | ApState::Passive | ApState::Disabled)) => state,
            _ => {
                self.reject(AP_STATE_ERR_EID, &format!("invalid AP state {raw}"));
                return;
            }
        };

        if actionpoint == ALL_ACTIONPOINTS {
            // Wildcard form skips sticky entries silently and counts one
            // accepted command regardless of how many entries moved.
            self.actionpoints.set_all_states(new_state);
            self.accept(
                AP_STATE_INF_EID,
                &format!("all actionpoints set to {new_state:?}"),
            );
            return;
        }

        let index = actionpoint as usize;
        match self.actionpoints.current_state(index) {
            None => self.reject(
                AP_STATE_ERR_EID,
                &format!("actionpoint {actionpoint} out of range"),
            ),
            Some(ApState::NotUsed | ApState::PermOff) => self.reject(
                AP_STATE_ERR_EID,
                &format!("AP {actionpoint} state is not command-settable"),
            ),
            Some(_) => {
                self.actionpoints.set_state(index, new_state);
                self.accept(
                    AP_STATE_INF_EID,
                    &format!("AP {actionpoint} set to {new_state:?}"),
                );
            }
        }
    }

    fn cmd_set_ap_permoff(&mut self, actionpoint: u16) {
        if actionpoint == ALL_ACTIONPOINTS {
            self.reject(
                AP_PERMOFF_ERR_EID,
                "permanent-off does not accept the wildcard actionpoint",
            );
            return;
        }
        let index = actionpoint as usize;
        match self.actionpoints.current_state(index) {
            None => self.reject(
                AP_PERMOFF_ERR_EID,
                &format!("actionpoint {actionpoint} out of range"),
            ),
            Some(ApState::Disabled) => {
                self.actionpoints.set_state(index, ApState::PermOff);
                self.accept(
                    AP_PERMOFF_INF_EID,
                    &format!("AP {actionpoint} set permanently off"),
                );
            }
            Some(state) => self.reject(
                AP_PERMOFF_ERR_EID,
                &format!("AP {actionpoint} must be DISABLED for permanent-off, is {state:?}"),
            ),
        }
    }

    fn cmd_reset_ap_stats(&mut self, actionpoint: u16) {
        if actionpoint == ALL_ACTIONPOINTS {
            self.actionpoints.reset_stats(None);
            self.accept(AP_STATS_INF_EID, "all actionpoint statistics reset");
        } else if (actionpoint as usize) < MAX_ACTIONPOINTS {
            self.actionpoints.reset_stats(Some(actionpoint as usize));
            self.accept(
                AP_STATS_INF_EID,
                &format!("AP {actionpoint} statistics reset"),
            );
        } else {
            self.reject(
                AP_STATS_ERR_EID,
                &format!("actionpoint {actionpoint} out of range"),
            );
        }
    }

    fn cmd_reset_wp_stats(&mut self, watchpoint: u16) {
        if watchpoint == ALL_WATCHPOINTS {
            self.watchpoints.reset_stats(None);
            self.accept(WP_STATS_INF_EID, "all watchpoint statistics reset");
        } else if (watchpoint as usize) < MAX_WATCHPOINTS {
            self.watchpoints.reset_stats(Some(watchpoint as usize));
            self.accept(
                WP_STATS_INF_EID,
                &format!("WP {watchpoint} statistics reset"),
            );
        } else {
            self.reject(
                WP_STATS_ERR_EID,
                &format!("watchpoint {watchpoint} out of range"),
            );
        }
    }
}
