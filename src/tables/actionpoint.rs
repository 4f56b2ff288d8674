//! Actionpoint definition/result tables, the per-actionpoint state machine,
//! and the sampler that drives RTS requests.

use arrayvec::ArrayString;
use serde::{Deserialize, Serialize};

use crate::app::{AppState, LcState};
use crate::events::{
    EventSeverity, AP_EQUATION_ERR_EID, AP_FAIL_TO_PASS_INF_EID, AP_PASSIVE_FAIL_DBG_EID,
};
use crate::rpn::{self, ActionResult, RpnEquation};
use crate::services::Services;
use crate::tables::watchpoint::WatchpointTable;
use crate::tables::MAX_EVENT_TEXT;

/// Operational state of one actionpoint.
///
/// `NotUsed` and `PermOff` are sticky: no command moves an actionpoint out
/// of them, only a table load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApState {
    #[default]
    NotUsed,
    Active,
    Passive,
    Disabled,
    PermOff,
}

impl ApState {
    /// Decode the command-interface state byte.
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(ApState::NotUsed),
            1 => Some(ApState::Active),
            2 => Some(ApState::Passive),
            3 => Some(ApState::Disabled),
            4 => Some(ApState::PermOff),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            ApState::NotUsed => 0,
            ApState::Active => 1,
            ApState::Passive => 2,
            ApState::Disabled => 3,
            ApState::PermOff => 4,
        }
    }
}

/// One immutable actionpoint definition (ADT entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub default_state: ApState,
    /// Event rate limits, indexed by the matching transition counters.
    pub max_passive_events: u16,
    pub max_pass_fail_events: u16,
    pub max_fail_pass_events: u16,
    /// Stored command sequence requested when the trigger fires.
    pub rts_id: u16,
    /// Consecutive-FAIL count that fires the trigger.
    pub max_fails_before_rts: u16,
    pub equation: RpnEquation,
    pub event_type: EventSeverity,
    pub event_id: u16,
    pub event_text: ArrayString<MAX_EVENT_TEXT>,
}

impl ActionDefinition {
    /// Entry marking an unused table slot.
    pub fn unused() -> Self {
        Self {
            default_state: ApState::NotUsed,
            max_passive_events: 0,
            max_pass_fail_events: 0,
            max_fail_pass_events: 0,
            rts_id: 0,
            max_fails_before_rts: 0,
            equation: RpnEquation::new(),
            event_type: EventSeverity::Info,
            event_id: 0,
            event_text: ArrayString::new(),
        }
    }

    pub fn is_used(&self) -> bool {
        self.default_state != ApState::NotUsed
    }
}

impl Default for ActionDefinition {
    fn default() -> Self {
        Self::unused()
    }
}

/// One mutable actionpoint results entry (ART entry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResultEntry {
    pub result: ActionResult,
    pub current_state: ApState,
    pub passive_ap_count: u32,
    pub fail_to_pass_count: u32,
    pub pass_to_fail_count: u32,
    pub consecutive_fail_count: u32,
    pub cumulative_fail_count: u32,
    pub cumulative_rts_exec_count: u32,
    pub cumulative_event_msgs_sent: u32,
}

impl ActionResultEntry {
    fn reset_stats(&mut self) {
        self.passive_ap_count = 0;
        self.fail_to_pass_count = 0;
        self.pass_to_fail_count = 0;
        self.consecutive_fail_count = 0;
        self.cumulative_fail_count = 0;
        self.cumulative_rts_exec_count = 0;
        self.cumulative_event_msgs_sent = 0;
    }
}

/// The actionpoint definition table plus its results table.
#[derive(Debug)]
pub struct ActionpointTable {
    definitions: Box<[ActionDefinition]>,
    results: Box<[ActionResultEntry]>,
}

impl ActionpointTable {
    pub(crate) fn new(definitions: Box<[ActionDefinition]>) -> Self {
        let results = definitions
            .iter()
            .map(|definition| ActionResultEntry {
                current_state: definition.default_state,
                ..ActionResultEntry::default()
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            definitions,
            results,
        }
    }

    pub fn definitions(&self) -> &[ActionDefinition] {
        &self.definitions
    }

    pub fn results(&self) -> &[ActionResultEntry] {
        &self.results
    }

    pub fn current_state(&self, index: usize) -> Option<ApState> {
        self.results.get(index).map(|entry| entry.current_state)
    }

    pub(crate) fn set_state(&mut self, index: usize, state: ApState) {
        if let Some(entry) = self.results.get_mut(index) {
            entry.current_state = state;
        }
    }

    /// Apply a commanded state to every entry that is not sticky.
    pub(crate) fn set_all_states(&mut self, state: ApState) {
        for entry in self.results.iter_mut() {
            if !matches!(entry.current_state, ApState::NotUsed | ApState::PermOff) {
                entry.current_state = state;
            }
        }
    }

    /// Reset the statistics of one entry, or of all entries. Latest result
    /// and current state are preserved.
    pub(crate) fn reset_stats(&mut self, index: Option<usize>) {
        match index {
            Some(index) => {
                if let Some(entry) = self.results.get_mut(index) {
                    entry.reset_stats();
                }
            }
            None => {
                for entry in self.results.iter_mut() {
                    entry.reset_stats();
                }
            }
        }
    }

    /// Sample every actionpoint in `[first, last]` in ascending order.
    ///
    /// Sampling is a no-op while the app is DISABLED; individual entries
    /// are skipped unless currently ACTIVE or PASSIVE. Evaluation never
    /// changes `current_state`, only results and counters.
    pub(crate) fn sample_range<S: Services>(
        &mut self,
        first: usize,
        last: usize,
        watchpoints: &WatchpointTable,
        app: &mut AppState,
        services: &mut S,
    ) {
        if app.lc_state == LcState::Disabled {
            return;
        }
        for index in first..=last.min(self.definitions.len() - 1) {
            self.sample_one(index, watchpoints, app, services);
        }
    }

    fn sample_one<S: Services>(
        &mut self,
        index: usize,
        watchpoints: &WatchpointTable,
        app: &mut AppState,
        services: &mut S,
    ) {
        let definition = &self.definitions[index];
        let entry = &mut self.results[index];
        if !matches!(entry.current_state, ApState::Active | ApState::Passive) {
            return;
        }

        let result = rpn::evaluate(&definition.equation, watchpoints);
        let previous = entry.result;
        entry.result = result;

        match result {
            ActionResult::Fail => {
                entry.cumulative_fail_count = entry.cumulative_fail_count.saturating_add(1);
                if matches!(previous, ActionResult::Pass | ActionResult::Stale) {
                    entry.pass_to_fail_count = entry.pass_to_fail_count.saturating_add(1);
                    entry.consecutive_fail_count = 1;
                } else {
                    entry.consecutive_fail_count = entry.consecutive_fail_count.saturating_add(1);
                }

                if entry.consecutive_fail_count == u32::from(definition.max_fails_before_rts) {
                    if entry.pass_to_fail_count <= u32::from(definition.max_pass_fail_events) {
                        services.emit_event(
                            definition.event_id,
                            definition.event_type,
                            definition.event_text.as_str(),
                        );
                        entry.cumulative_event_msgs_sent =
                            entry.cumulative_event_msgs_sent.saturating_add(1);
                    }

                    if app.lc_state == LcState::Active && entry.current_state == ApState::Active {
                        services.request_rts(definition.rts_id);
                        entry.cumulative_rts_exec_count =
                            entry.cumulative_rts_exec_count.saturating_add(1);
                        app.rts_exec_count = app.rts_exec_count.saturating_add(1);
                    } else {
                        entry.passive_ap_count = entry.passive_ap_count.saturating_add(1);
                        app.passive_rts_exec_count = app.passive_rts_exec_count.saturating_add(1);
                        if entry.passive_ap_count <= u32::from(definition.max_passive_events) {
                            services.emit_event(
                                AP_PASSIVE_FAIL_DBG_EID,
                                EventSeverity::Debug,
                                &format!(
                                    "AP {index} failed while passive, RTS {} not requested",
                                    definition.rts_id
                                ),
                            );
                            entry.cumulative_event_msgs_sent =
                                entry.cumulative_event_msgs_sent.saturating_add(1);
                        }
                    }
                }
            }
            ActionResult::Pass => {
                if previous == ActionResult::Fail {
                    entry.fail_to_pass_count = entry.fail_to_pass_count.saturating_add(1);
                    if entry.fail_to_pass_count <= u32::from(definition.max_fail_pass_events) {
                        services.emit_event(
                            AP_FAIL_TO_PASS_INF_EID,
                            EventSeverity::Info,
                            &format!("AP {index} returned to pass"),
                        );
                        entry.cumulative_event_msgs_sent =
                            entry.cumulative_event_msgs_sent.saturating_add(1);
                    }
                }
                entry.consecutive_fail_count = 0;
            }
            ActionResult::Error => {
                services.emit_event(
                    AP_EQUATION_ERR_EID,
                    EventSeverity::Error,
                    &format!("AP {index} equation evaluation error"),
                );
            }
            ActionResult::Stale => {}
        }

        app.ap_sample_count = app.ap_sample_count.saturating_add(1);
    }

    pub(crate) fn snapshot_results(&self) -> Vec<ActionResultEntry> {
        self.results.to_vec()
    }

    pub(crate) fn restore_results(&mut self, entries: &[ActionResultEntry]) {
        for (slot, saved) in self.results.iter_mut().zip(entries) {
            *slot = saved.clone();
        }
    }
}
