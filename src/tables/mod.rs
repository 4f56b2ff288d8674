//! Definition and results tables.
//!
//! The two definition tables (WDT, ADT) are loaded once, validated, and
//! treated as read-only for the life of the load; the results tables (WRT,
//! ART) are owned by the monitoring task and initialized to STALE /
//! default-state. Sizing is fixed by mission configuration.

pub mod actionpoint;
pub mod watchpoint;

use std::fs;
use std::path::Path;

use static_assertions::const_assert;
use thiserror::Error;

use crate::rpn;
use actionpoint::ActionDefinition;
use watchpoint::{OperatorId, WatchDefinition};

/// Watchpoint table capacity (mission configuration).
pub const MAX_WATCHPOINTS: usize = 176;
/// Actionpoint table capacity (mission configuration).
pub const MAX_ACTIONPOINTS: usize = 176;
/// Maximum RPN program length in tokens, terminator included.
pub const MAX_RPN_EQU_SIZE: usize = 20;
/// Capacity of the per-actionpoint failure event text.
pub const MAX_EVENT_TEXT: usize = 122;

// Housekeeping packs 4 WP results per byte and 2 AP entries per byte.
const_assert!(MAX_WATCHPOINTS % 4 == 0);
const_assert!(MAX_ACTIONPOINTS % 2 == 0);

#[derive(Debug, Error)]
pub enum TableError {
    #[error("watchpoint table holds {0} entries, limit {MAX_WATCHPOINTS}")]
    TooManyWatchpoints(usize),
    #[error("actionpoint table holds {0} entries, limit {MAX_ACTIONPOINTS}")]
    TooManyActionpoints(usize),
    #[error("WP {index}: in-use entry has undefined data type")]
    WatchDataType { index: usize },
    #[error("WP {index}: offset {offset} violates {align}-byte alignment")]
    WatchAlignment {
        index: usize,
        offset: u32,
        align: usize,
    },
    #[error("WP {index}: comparison value category does not match the data type")]
    WatchComparisonCategory { index: usize },
    #[error("AP {index}: malformed equation: {reason}")]
    ActionEquation { index: usize, reason: &'static str },
    #[error("failed to read table image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse table image: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A validated pair of definition tables, padded to full capacity.
#[derive(Debug, Clone)]
pub struct TableSet {
    pub watchpoints: Vec<WatchDefinition>,
    pub actionpoints: Vec<ActionDefinition>,
}

impl TableSet {
    /// Validate definition images and pad them to table capacity with
    /// not-used entries. Any invalid in-use entry fails the whole load.
    pub fn from_parts(
        mut watchpoints: Vec<WatchDefinition>,
        mut actionpoints: Vec<ActionDefinition>,
    ) -> Result<Self, TableError> {
        if watchpoints.len() > MAX_WATCHPOINTS {
            return Err(TableError::TooManyWatchpoints(watchpoints.len()));
        }
        if actionpoints.len() > MAX_ACTIONPOINTS {
            return Err(TableError::TooManyActionpoints(actionpoints.len()));
        }

        for (index, definition) in watchpoints.iter().enumerate() {
            validate_watchpoint(index, definition)?;
        }
        for (index, definition) in actionpoints.iter().enumerate() {
            validate_actionpoint(index, definition)?;
        }

        watchpoints.resize_with(MAX_WATCHPOINTS, WatchDefinition::unused);
        actionpoints.resize_with(MAX_ACTIONPOINTS, ActionDefinition::unused);
        Ok(Self {
            watchpoints,
            actionpoints,
        })
    }

    /// Load and validate the two JSON table images.
    pub fn load(watch_path: &Path, action_path: &Path) -> Result<Self, TableError> {
        let watchpoints: Vec<WatchDefinition> =
            serde_json::from_str(&fs::read_to_string(watch_path)?)?;
        let actionpoints: Vec<ActionDefinition> =
            serde_json::from_str(&fs::read_to_string(action_path)?)?;
        Self::from_parts(watchpoints, actionpoints)
    }
}

fn validate_watchpoint(index: usize, definition: &WatchDefinition) -> Result<(), TableError> {
    if !definition.is_used() {
        return Ok(());
    }
    let Some(category) = definition.data_type.category() else {
        return Err(TableError::WatchDataType { index });
    };
    let align = definition.data_type.size();
    if definition.offset as usize % align != 0 {
        return Err(TableError::WatchAlignment {
            index,
            offset: definition.offset,
            align,
        });
    }
    // Custom predicates interpret the raw value themselves; only the
    // relational operators pair with the comparison constant.
    if definition.operator != OperatorId::Custom
        && definition.comparison_value.category() != category
    {
        return Err(TableError::WatchComparisonCategory { index });
    }
    Ok(())
}

fn validate_actionpoint(index: usize, definition: &ActionDefinition) -> Result<(), TableError> {
    if !definition.is_used() {
        return Ok(());
    }
    rpn::validate(&definition.equation, MAX_WATCHPOINTS)
        .map_err(|reason| TableError::ActionEquation { index, reason })
}
