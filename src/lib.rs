//! # Onboard Limit Checker
//!
//! A flight-software monitoring library for a spacecraft message bus: it
//! watches typed fields inside telemetry messages, combines the comparisons
//! through per-actionpoint reverse-Polish boolean programs, and requests
//! stored command sequences (RTS) when an actionpoint fails a configured
//! number of consecutive samples.
//!
//! ## Features
//!
//! - **Watchpoint evaluation**: typed-field extraction (eight scalar types,
//!   both endiannesses), bit masking, relational or custom-predicate
//!   comparison, staleness aging
//! - **Actionpoint logic**: three-valued RPN programs over watchpoint
//!   results with bounded stacks
//! - **RTS triggering**: consecutive-failure thresholds with active/passive
//!   suppression and rate-limited events
//! - **Housekeeping telemetry**: bit-packed result arrays and counter
//!   snapshots
//! - **Ground commands**: enable/disable at app, actionpoint, and
//!   watchpoint granularity with fixed-size payload verification
//! - **Embedded-friendly**: fixed-capacity tables, no allocation on the
//!   monitoring path
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use limitmon::{LcState, LimitChecker, TableSet};
//!
//! let tables = TableSet::load("wdt.json".as_ref(), "adt.json".as_ref())?;
//! let mut app = LimitChecker::new(tables, LcState::Active, services);
//!
//! // Feed every inbound bus message to the checker.
//! app.process_message(msg_id, payload);
//! ```
//!
//! ## Architecture
//!
//! - [`app`] - Application state, orchestrator, and checkpointing
//! - [`tables`] - Definition/result tables, validation, and the evaluators
//! - [`value`] - Typed-field extraction from message payloads
//! - [`rpn`] - Reverse-Polish boolean programs
//! - [`router`] - Message classification and the watchpoint reverse index
//! - [`housekeeping`] - Housekeeping packet and result-code packing
//! - [`command`] - Ground command execution
//! - [`services`] - Collaborator seam (events, RTS, clock, telemetry out)

#![deny(warnings)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod app;
pub mod command;
pub mod events;
pub mod housekeeping;
pub mod msg;
pub mod router;
pub mod rpn;
pub mod services;
pub mod tables;
pub mod value;

// Re-export main public types for convenience
pub use app::{AppState, Checkpoint, LcState, LimitChecker};
pub use housekeeping::HkPacket;
pub use rpn::{ActionResult, RpnToken};
pub use services::{MissionTime, Services};
pub use tables::{TableSet, MAX_ACTIONPOINTS, MAX_RPN_EQU_SIZE, MAX_WATCHPOINTS};
