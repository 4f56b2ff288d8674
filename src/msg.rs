//! Software-bus message identifiers and the fixed command encodings.
//!
//! The bus delivers opaque `(MessageId, payload)` pairs. Three IDs are
//! reserved for the app itself; everything else is candidate telemetry.
//! Ground commands are fixed-size binary payloads with a one-byte function
//! code; every multi-byte field is big-endian.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque bus message identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u16);

/// Ground command message.
pub const CMD_MID: MessageId = MessageId(0x18A4);
/// Housekeeping request.
pub const SEND_HK_MID: MessageId = MessageId(0x18A5);
/// Actionpoint sample request.
pub const SAMPLE_AP_MID: MessageId = MessageId(0x18A6);

/// Wildcard actionpoint index accepted by range commands.
pub const ALL_ACTIONPOINTS: u16 = 0xFFFF;
/// Wildcard watchpoint index accepted by stats-reset commands.
pub const ALL_WATCHPOINTS: u16 = 0xFFFF;

// Command function codes, fixed by the mission interface.
pub const FC_NOOP: u8 = 0;
pub const FC_RESET: u8 = 1;
pub const FC_SET_LC_STATE: u8 = 2;
pub const FC_SET_AP_STATE: u8 = 3;
pub const FC_SET_AP_PERMOFF: u8 = 4;
pub const FC_RESET_AP_STATS: u8 = 5;
pub const FC_RESET_WP_STATS: u8 = 6;

/// Bus envelope as framed by the host binary (JSON line per message).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub msg_id: u16,
    #[serde(with = "serde_bytes")]
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command payload")]
    Empty,
    #[error("function code {code} expects {expected}-byte payload, got {actual}")]
    LengthMismatch {
        code: u8,
        expected: usize,
        actual: usize,
    },
    #[error("unknown function code {0}")]
    UnknownFunction(u8),
}

/// A decoded ground command. Enum payloads are still raw at this level;
/// domain validation happens in the command handler so that rejects are
/// counted and reported uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundCommand {
    Noop,
    ResetCounters,
    SetLcState { state: u8 },
    SetApState { actionpoint: u16, state: u8 },
    SetApPermOff { actionpoint: u16 },
    ResetApStats { actionpoint: u16 },
    ResetWpStats { watchpoint: u16 },
}

fn expected_len(code: u8) -> Option<usize> {
    match code {
        FC_NOOP | FC_RESET => Some(1),
        FC_SET_LC_STATE => Some(2),
        FC_SET_AP_STATE | FC_SET_AP_PERMOFF | FC_RESET_AP_STATS | FC_RESET_WP_STATS => Some(4),
        _ => None,
    }
}

fn index_at(payload: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([payload[offset], payload[offset + 1]])
}

/// Decode a `CMD_MID` payload. Verifies the fixed per-code length before
/// looking at any argument byte.
pub fn decode_command(payload: &[u8]) -> Result<GroundCommand, CommandError> {
    let code = *payload.first().ok_or(CommandError::Empty)?;
    let expected = expected_len(code).ok_or(CommandError::UnknownFunction(code))?;
    if payload.len() != expected {
        return Err(CommandError::LengthMismatch {
            code,
            expected,
            actual: payload.len(),
        });
    }

    let command = match code {
        FC_NOOP => GroundCommand::Noop,
        FC_RESET => GroundCommand::ResetCounters,
        FC_SET_LC_STATE => GroundCommand::SetLcState { state: payload[1] },
        FC_SET_AP_STATE => GroundCommand::SetApState {
            actionpoint: index_at(payload, 2),
            state: payload[1],
        },
        FC_SET_AP_PERMOFF => GroundCommand::SetApPermOff {
            actionpoint: index_at(payload, 2),
        },
        FC_RESET_AP_STATS => GroundCommand::ResetApStats {
            actionpoint: index_at(payload, 2),
        },
        _ => GroundCommand::ResetWpStats {
            watchpoint: index_at(payload, 2),
        },
    };
    Ok(command)
}

/// Encode a ground command into its bus payload; inverse of
/// [`decode_command`], used by the ground console.
pub fn encode_command(command: GroundCommand) -> Vec<u8> {
    match command {
        GroundCommand::Noop => vec![FC_NOOP],
        GroundCommand::ResetCounters => vec![FC_RESET],
        GroundCommand::SetLcState { state } => vec![FC_SET_LC_STATE, state],
        GroundCommand::SetApState { actionpoint, state } => {
            let index = actionpoint.to_be_bytes();
            vec![FC_SET_AP_STATE, state, index[0], index[1]]
        }
        GroundCommand::SetApPermOff { actionpoint } => {
            let index = actionpoint.to_be_bytes();
            vec![FC_SET_AP_PERMOFF, 0, index[0], index[1]]
        }
        GroundCommand::ResetApStats { actionpoint } => {
            let index = actionpoint.to_be_bytes();
            vec![FC_RESET_AP_STATS, 0, index[0], index[1]]
        }
        GroundCommand::ResetWpStats { watchpoint } => {
            let index = watchpoint.to_be_bytes();
            vec![FC_RESET_WP_STATS, 0, index[0], index[1]]
        }
    }
}

/// Fixed length of a `SAMPLE_AP_MID` payload.
pub const SAMPLE_REQUEST_LEN: usize = 6;

/// Decoded actionpoint sample request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRequest {
    pub start: u16,
    pub end: u16,
    pub update_age: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sample request expects {SAMPLE_REQUEST_LEN}-byte payload, got {actual}")]
pub struct SampleRequestError {
    pub actual: usize,
}

pub fn decode_sample_request(payload: &[u8]) -> Result<SampleRequest, SampleRequestError> {
    if payload.len() != SAMPLE_REQUEST_LEN {
        return Err(SampleRequestError {
            actual: payload.len(),
        });
    }
    Ok(SampleRequest {
        start: index_at(payload, 0),
        end: index_at(payload, 2),
        update_age: payload[4],
    })
}

pub fn encode_sample_request(request: SampleRequest) -> Vec<u8> {
    let start = request.start.to_be_bytes();
    let end = request.end.to_be_bytes();
    vec![start[0], start[1], end[0], end[1], request.update_age, 0]
}
