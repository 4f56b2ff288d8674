#![allow(dead_code)]

use arrayvec::ArrayString;
use limitmon::events::EventSeverity;
use limitmon::msg::{self, MessageId, SampleRequest, ALL_ACTIONPOINTS};
use limitmon::rpn::{RpnEquation, RpnToken};
use limitmon::tables::actionpoint::{ActionDefinition, ApState};
use limitmon::tables::watchpoint::{OperatorId, WatchDefinition};
use limitmon::value::{ComparisonValue, DataType};
use limitmon::{HkPacket, LcState, LimitChecker, MissionTime, Services, TableSet};

/// Records every collaborator call so tests can assert on events, RTS
/// requests, and emitted housekeeping. The clock advances one second per
/// query so transition timestamps are distinguishable.
#[derive(Debug, Default)]
pub struct RecordingServices {
    pub events: Vec<(u16, EventSeverity, String)>,
    pub rts_requests: Vec<u16>,
    pub hk_packets: Vec<HkPacket>,
    pub clock_seconds: u32,
}

impl RecordingServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_with_id(&self, event_id: u16) -> usize {
        self.events.iter().filter(|(id, _, _)| *id == event_id).count()
    }
}

impl Services for RecordingServices {
    fn emit_event(&mut self, event_id: u16, severity: EventSeverity, text: &str) {
        self.events.push((event_id, severity, text.to_string()));
    }

    fn request_rts(&mut self, rts_id: u16) {
        self.rts_requests.push(rts_id);
    }

    fn now(&mut self) -> MissionTime {
        self.clock_seconds += 1;
        MissionTime {
            seconds: self.clock_seconds,
            subseconds: 0,
        }
    }

    fn publish_hk(&mut self, packet: &HkPacket) {
        self.hk_packets.push(packet.clone());
    }
}

/// Message IDs used for test telemetry: watchpoint `i` watches `wp_mid(i)`.
pub fn wp_mid(index: u16) -> MessageId {
    MessageId(0x0800 + index)
}

/// A watchpoint on a big-endian u16 at offset 0 of its own message,
/// tripping when the value exceeds `limit`.
pub fn wp_u16_gt(index: u16, limit: u16) -> WatchDefinition {
    WatchDefinition {
        data_type: DataType::U16Be,
        operator: OperatorId::GreaterThan,
        message_id: wp_mid(index),
        offset: 0,
        bit_mask: 0xFFFF,
        comparison_value: ComparisonValue::Unsigned(u32::from(limit)),
        result_age_when_stale: 0,
        custom_arg: 0,
    }
}

pub fn equation(tokens: &[RpnToken]) -> RpnEquation {
    RpnEquation::from_slice(tokens).expect("equation fits")
}

/// An active actionpoint with generous event limits, triggering RTS 7
/// after one failed sample.
pub fn ap_watching(tokens: &[RpnToken]) -> ActionDefinition {
    ActionDefinition {
        default_state: ApState::Active,
        max_passive_events: 100,
        max_pass_fail_events: 100,
        max_fail_pass_events: 100,
        rts_id: 7,
        max_fails_before_rts: 1,
        equation: equation(tokens),
        event_type: EventSeverity::Error,
        event_id: AP_FAILURE_EID,
        event_text: ArrayString::from("actionpoint limit violation").unwrap(),
    }
}

/// Event ID carried by every test actionpoint's failure event.
pub const AP_FAILURE_EID: u16 = 100;

pub fn checker(
    watch: Vec<WatchDefinition>,
    action: Vec<ActionDefinition>,
) -> LimitChecker<RecordingServices> {
    let tables = TableSet::from_parts(watch, action).expect("valid test tables");
    LimitChecker::new(tables, LcState::Active, RecordingServices::new())
}

pub fn u16_payload(value: u16) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Drive watchpoint `index` TRUE or FALSE against `wp_u16_gt(index, 100)`.
pub fn set_wp(app: &mut LimitChecker<RecordingServices>, index: u16, tripped: bool) {
    let value = if tripped { 150 } else { 50 };
    app.process_message(wp_mid(index), &u16_payload(value));
}

/// Park watchpoint `index` in ERROR by underrunning its field.
pub fn error_wp(app: &mut LimitChecker<RecordingServices>, index: u16) {
    app.process_message(wp_mid(index), &[0x00]);
}

pub fn sample_all(app: &mut LimitChecker<RecordingServices>, update_age: u8) {
    sample_range(app, ALL_ACTIONPOINTS, ALL_ACTIONPOINTS, update_age);
}

pub fn sample_range(app: &mut LimitChecker<RecordingServices>, start: u16, end: u16, update_age: u8) {
    let payload = msg::encode_sample_request(SampleRequest {
        start,
        end,
        update_age,
    });
    app.process_message(msg::SAMPLE_AP_MID, &payload);
}

pub fn send_command(app: &mut LimitChecker<RecordingServices>, command: msg::GroundCommand) {
    let payload = msg::encode_command(command);
    app.process_message(msg::CMD_MID, &payload);
}

pub fn request_hk(app: &mut LimitChecker<RecordingServices>) {
    app.process_message(msg::SEND_HK_MID, &[]);
}
