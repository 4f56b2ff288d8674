//! Application state and the monitoring orchestrator.
//!
//! `LimitChecker` owns the four tables, the app counters, the reverse
//! index, and the collaborator services. The host hands it every inbound
//! bus message; everything else (sampling, housekeeping, commands, table
//! swap, checkpointing) hangs off that single entry point, so the whole
//! engine runs single-threaded to completion per message.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EventSeverity, AP_SAMPLE_RANGE_ERR_EID, INIT_INF_EID, TABLE_SWAP_INF_EID};
use crate::housekeeping;
use crate::msg::{self, MessageId, SampleRequest, ALL_ACTIONPOINTS};
use crate::router::{classify, MessageClass, MessageRouter};
use crate::services::Services;
use crate::tables::actionpoint::{ActionResultEntry, ActionpointTable};
use crate::tables::watchpoint::{CustomPredicate, WatchResultEntry, WatchpointTable};
use crate::tables::{TableSet, MAX_ACTIONPOINTS};

/// Application-level monitoring state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LcState {
    Active,
    Passive,
    Disabled,
}

impl LcState {
    /// Decode the command-interface state byte.
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(LcState::Active),
            2 => Some(LcState::Passive),
            3 => Some(LcState::Disabled),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u8 {
        match self {
            LcState::Active => 1,
            LcState::Passive => 2,
            LcState::Disabled => 3,
        }
    }
}

/// Application counters and state reported in housekeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppState {
    pub lc_state: LcState,
    pub cmd_count: u8,
    pub cmd_err_count: u8,
    pub ap_sample_count: u16,
    pub monitored_msg_count: u32,
    pub rts_exec_count: u16,
    pub passive_rts_exec_count: u16,
}

impl AppState {
    fn new(lc_state: LcState) -> Self {
        Self {
            lc_state,
            cmd_count: 0,
            cmd_err_count: 0,
            ap_sample_count: 0,
            monitored_msg_count: 0,
            rts_exec_count: 0,
            passive_rts_exec_count: 0,
        }
    }

    /// Zero every scalar counter, the command counter included.
    pub(crate) fn reset_counters(&mut self) {
        self.cmd_count = 0;
        self.cmd_err_count = 0;
        self.ap_sample_count = 0;
        self.monitored_msg_count = 0;
        self.rts_exec_count = 0;
        self.passive_rts_exec_count = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("checkpoint geometry does not match the loaded tables")]
    CheckpointGeometry,
}

/// Snapshot of everything registered with the critical-data store: app
/// counters plus both result tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub app: AppState,
    pub watch_results: Vec<WatchResultEntry>,
    pub action_results: Vec<ActionResultEntry>,
}

/// The limit checker application.
pub struct LimitChecker<S: Services> {
    pub(crate) services: S,
    pub(crate) state: AppState,
    pub(crate) watchpoints: WatchpointTable,
    pub(crate) actionpoints: ActionpointTable,
    router: MessageRouter,
    staged_tables: Option<TableSet>,
}

impl<S: Services> LimitChecker<S> {
    /// Bring up the app over a validated table set. Results start STALE /
    /// default-state; counters start at zero.
    pub fn new(tables: TableSet, initial_state: LcState, mut services: S) -> Self {
        let watchpoints = WatchpointTable::new(tables.watchpoints.into_boxed_slice());
        let actionpoints = ActionpointTable::new(tables.actionpoints.into_boxed_slice());
        let router = MessageRouter::build(watchpoints.definitions());

        services.emit_event(
            INIT_INF_EID,
            EventSeverity::Info,
            &format!(
                "limit checker v{} initialized, {} watchpoints across {} message IDs",
                env!("CARGO_PKG_VERSION"),
                watchpoints.in_use_count(),
                router.monitored_id_count()
            ),
        );

        Self {
            services,
            state: AppState::new(initial_state),
            watchpoints,
            actionpoints,
            router,
            staged_tables: None,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn watchpoints(&self) -> &WatchpointTable {
        &self.watchpoints
    }

    pub fn actionpoints(&self) -> &ActionpointTable {
        &self.actionpoints
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut S {
        &mut self.services
    }

    /// Register the mission predicate backing `OperatorId::Custom`.
    pub fn set_custom_predicate(&mut self, predicate: CustomPredicate) {
        self.watchpoints.set_custom_predicate(predicate);
    }

    /// Process one inbound bus message to completion.
    pub fn process_message(&mut self, msg_id: MessageId, payload: &[u8]) {
        match classify(msg_id) {
            MessageClass::SampleActionpoints => self.handle_sample_request(payload),
            MessageClass::SendHousekeeping => {
                self.send_housekeeping();
                self.maintenance();
            }
            MessageClass::Command => self.handle_command_message(payload),
            MessageClass::Monitored => self.process_monitored(msg_id, payload),
        }
    }

    /// Watchpoint dispatch for candidate telemetry. Unrelated traffic is a
    /// silent no-op; monitoring is halted entirely while DISABLED.
    fn process_monitored(&mut self, msg_id: MessageId, payload: &[u8]) {
        if self.state.lc_state == LcState::Disabled {
            return;
        }
        let indices = self.router.watchpoints_for(msg_id);
        if indices.is_empty() {
            return;
        }
        for &wp_index in indices {
            self.watchpoints
                .evaluate(wp_index as usize, payload, &mut self.services);
        }
        self.state.monitored_msg_count = self.state.monitored_msg_count.saturating_add(1);
    }

    fn handle_sample_request(&mut self, payload: &[u8]) {
        let request = match msg::decode_sample_request(payload) {
            Ok(request) => request,
            Err(error) => {
                self.services.emit_event(
                    AP_SAMPLE_RANGE_ERR_EID,
                    EventSeverity::Error,
                    &error.to_string(),
                );
                return;
            }
        };

        let Some((first, last)) = resolve_sample_range(&request) else {
            self.services.emit_event(
                AP_SAMPLE_RANGE_ERR_EID,
                EventSeverity::Error,
                &format!(
                    "invalid actionpoint sample range {}..{}",
                    request.start, request.end
                ),
            );
            return;
        };

        // Age the watchpoint countdowns first so this sample pass sees any
        // result that just went stale.
        if request.update_age != 0 {
            self.watchpoints.age_results();
        }

        self.actionpoints.sample_range(
            first,
            last,
            &self.watchpoints,
            &mut self.state,
            &mut self.services,
        );
    }

    fn send_housekeeping(&mut self) {
        let packet = housekeeping::build_packet(
            &self.state,
            &self.watchpoints,
            &self.actionpoints,
            &mut self.services,
        );
        self.services.publish_hk(&packet);
    }

    /// Stage a validated table set; it takes effect at the next maintenance
    /// window so a swap never lands mid-sample.
    pub fn stage_table_load(&mut self, tables: TableSet) {
        self.staged_tables = Some(tables);
    }

    /// Quiescent-window work, run after each housekeeping emission.
    fn maintenance(&mut self) {
        if let Some(tables) = self.staged_tables.take() {
            let predicate = self.watchpoints.take_custom_predicate();
            self.watchpoints = WatchpointTable::new(tables.watchpoints.into_boxed_slice());
            self.watchpoints.install_custom_predicate(predicate);
            self.actionpoints = ActionpointTable::new(tables.actionpoints.into_boxed_slice());
            self.router = MessageRouter::build(self.watchpoints.definitions());
            self.services.emit_event(
                TABLE_SWAP_INF_EID,
                EventSeverity::Info,
                &format!(
                    "definition tables replaced, {} watchpoints in use",
                    self.watchpoints.in_use_count()
                ),
            );
        }
    }

    /// Snapshot the state registered with the critical-data store.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            app: self.state,
            watch_results: self.watchpoints.snapshot_results(),
            action_results: self.actionpoints.snapshot_results(),
        }
    }

    /// Warm-restart restore. The checkpoint must match the loaded table
    /// geometry.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), AppError> {
        if checkpoint.watch_results.len() != self.watchpoints.results().len()
            || checkpoint.action_results.len() != self.actionpoints.results().len()
        {
            return Err(AppError::CheckpointGeometry);
        }
        self.state = checkpoint.app;
        self.watchpoints.restore_results(&checkpoint.watch_results);
        self.actionpoints.restore_results(&checkpoint.action_results);
        Ok(())
    }
}

fn resolve_sample_range(request: &SampleRequest) -> Option<(usize, usize)> {
    if request.start == ALL_ACTIONPOINTS && request.end == ALL_ACTIONPOINTS {
        return Some((0, MAX_ACTIONPOINTS - 1));
    }
    let start = request.start as usize;
    let end = request.end as usize;
    if start <= end && end < MAX_ACTIONPOINTS {
        Some((start, end))
    } else {
        None
    }
}
