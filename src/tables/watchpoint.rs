//! Watchpoint definition/result tables and the watchpoint evaluator.
//!
//! A watchpoint names one scalar field inside one bus message and a
//! comparison against a constant (or a custom predicate). Evaluation keeps
//! per-watchpoint transition statistics and a staleness countdown that the
//! sample command ages down.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{EventSeverity, WP_COMPARE_ERR_EID, WP_READ_ERR_EID};
use crate::msg::MessageId;
use crate::services::{MissionTime, Services};
use crate::value::{read_field, ComparisonValue, DataType};

/// Relational operator applied between the decoded field and the
/// comparison constant. `None` marks an unused table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperatorId {
    #[default]
    None,
    LessThan,
    LessOrEqual,
    Equal,
    NotEqual,
    GreaterOrEqual,
    GreaterThan,
    Custom,
}

/// Ternary-plus-error watch outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WatchResult {
    #[default]
    Stale,
    False,
    True,
    Error,
}

/// One immutable watchpoint definition (WDT entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchDefinition {
    pub data_type: DataType,
    pub operator: OperatorId,
    pub message_id: MessageId,
    pub offset: u32,
    pub bit_mask: u32,
    pub comparison_value: ComparisonValue,
    /// Sample cycles a TRUE/FALSE result stays fresh; 0 never decays.
    pub result_age_when_stale: u32,
    /// Passed through to the custom predicate for `OperatorId::Custom`.
    pub custom_arg: u32,
}

impl WatchDefinition {
    /// Entry marking an unused table slot.
    pub fn unused() -> Self {
        Self {
            data_type: DataType::Undefined,
            operator: OperatorId::None,
            message_id: MessageId(0),
            offset: 0,
            bit_mask: 0xFFFF_FFFF,
            comparison_value: ComparisonValue::Unsigned(0),
            result_age_when_stale: 0,
            custom_arg: 0,
        }
    }

    pub fn is_used(&self) -> bool {
        self.operator != OperatorId::None
    }
}

impl Default for WatchDefinition {
    fn default() -> Self {
        Self::unused()
    }
}

/// Value, type and time of a watch transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub value: u32,
    pub data_type: DataType,
    pub timestamp: MissionTime,
}

/// One mutable watchpoint results entry (WRT entry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchResultEntry {
    pub result: WatchResult,
    pub countdown_to_stale: u32,
    pub evaluation_count: u32,
    pub false_to_true_count: u32,
    pub consecutive_true_count: u32,
    pub cumulative_true_count: u32,
    pub last_false_to_true: TransitionRecord,
    pub last_true_to_false: TransitionRecord,
}

impl WatchResultEntry {
    fn reset_stats(&mut self) {
        self.evaluation_count = 0;
        self.false_to_true_count = 0;
        self.consecutive_true_count = 0;
        self.cumulative_true_count = 0;
        self.last_false_to_true = TransitionRecord::default();
        self.last_true_to_false = TransitionRecord::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("custom predicate fault: {0}")]
pub struct CustomPredicateFault(pub &'static str);

/// Mission-supplied predicate for `OperatorId::Custom` watchpoints.
pub type CustomPredicate =
    fn(watchpoint: usize, value: u32, custom_arg: u32) -> Result<bool, CustomPredicateFault>;

/// The watchpoint definition table plus its results table.
#[derive(Debug)]
pub struct WatchpointTable {
    definitions: Box<[WatchDefinition]>,
    results: Box<[WatchResultEntry]>,
    custom_predicate: Option<CustomPredicate>,
}

impl WatchpointTable {
    pub(crate) fn new(definitions: Box<[WatchDefinition]>) -> Self {
        let results = definitions
            .iter()
            .map(|_| WatchResultEntry::default())
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            definitions,
            results,
            custom_predicate: None,
        }
    }

    pub fn definitions(&self) -> &[WatchDefinition] {
        &self.definitions
    }

    pub fn results(&self) -> &[WatchResultEntry] {
        &self.results
    }

    pub fn result_of(&self, index: usize) -> Option<WatchResult> {
        self.results.get(index).map(|entry| entry.result)
    }

    /// Number of table entries carrying a real operator.
    pub fn in_use_count(&self) -> u16 {
        self.definitions.iter().filter(|d| d.is_used()).count() as u16
    }

    pub fn set_custom_predicate(&mut self, predicate: CustomPredicate) {
        self.custom_predicate = Some(predicate);
    }

    pub(crate) fn take_custom_predicate(&mut self) -> Option<CustomPredicate> {
        self.custom_predicate.take()
    }

    pub(crate) fn install_custom_predicate(&mut self, predicate: Option<CustomPredicate>) {
        self.custom_predicate = predicate;
    }

    /// Evaluate one watchpoint against a message payload.
    ///
    /// Any read or comparison fault parks the entry in ERROR with a zero
    /// countdown and leaves the transition counters alone.
    pub fn evaluate<S: Services>(&mut self, index: usize, payload: &[u8], services: &mut S) {
        let Some(definition) = self.definitions.get(index) else {
            return;
        };
        let custom_predicate = self.custom_predicate;
        let entry = &mut self.results[index];

        entry.evaluation_count = entry.evaluation_count.saturating_add(1);

        let masked = match read_field(payload, definition.offset as usize, definition.data_type) {
            Ok(raw) => {
                if definition.data_type.is_float() {
                    raw
                } else {
                    raw & definition.bit_mask
                }
            }
            Err(fault) => {
                services.emit_event(
                    WP_READ_ERR_EID,
                    EventSeverity::Error,
                    &format!("WP {index} read fault: {fault}"),
                );
                entry.result = WatchResult::Error;
                entry.countdown_to_stale = 0;
                return;
            }
        };

        let verdict = match definition.operator {
            OperatorId::None => Err("entry not in use"),
            OperatorId::Custom => match custom_predicate {
                Some(predicate) => predicate(index, masked, definition.custom_arg)
                    .map_err(|CustomPredicateFault(reason)| reason),
                None => Err("no custom predicate registered"),
            },
            operator => relational_compare(operator, masked, definition.comparison_value),
        };

        let previous = entry.result;
        match verdict {
            Ok(true) => {
                entry.cumulative_true_count = entry.cumulative_true_count.saturating_add(1);
                if matches!(previous, WatchResult::False | WatchResult::Stale) {
                    entry.false_to_true_count = entry.false_to_true_count.saturating_add(1);
                    entry.last_false_to_true = TransitionRecord {
                        value: masked,
                        data_type: definition.data_type,
                        timestamp: services.now(),
                    };
                    entry.consecutive_true_count = 1;
                } else {
                    entry.consecutive_true_count = entry.consecutive_true_count.saturating_add(1);
                }
                entry.result = WatchResult::True;
                entry.countdown_to_stale = definition.result_age_when_stale;
            }
            Ok(false) => {
                if previous == WatchResult::True {
                    entry.last_true_to_false = TransitionRecord {
                        value: masked,
                        data_type: definition.data_type,
                        timestamp: services.now(),
                    };
                }
                entry.consecutive_true_count = 0;
                entry.result = WatchResult::False;
                entry.countdown_to_stale = definition.result_age_when_stale;
            }
            Err(reason) => {
                services.emit_event(
                    WP_COMPARE_ERR_EID,
                    EventSeverity::Error,
                    &format!("WP {index} comparison fault: {reason}"),
                );
                entry.result = WatchResult::Error;
                entry.countdown_to_stale = 0;
            }
        }
    }

    /// Age every staleable result by one sample cycle; a countdown hitting
    /// zero decays the result to STALE.
    pub(crate) fn age_results(&mut self) {
        for entry in self.results.iter_mut() {
            if entry.countdown_to_stale > 0 {
                entry.countdown_to_stale -= 1;
                if entry.countdown_to_stale == 0 {
                    entry.result = WatchResult::Stale;
                }
            }
        }
    }

    /// Reset the statistics of one entry, or of all entries. Latest result
    /// and countdown are preserved.
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

    pub(crate) fn snapshot_results(&self) -> Vec<WatchResultEntry> {
        self.results.to_vec()
    }

    pub(crate) fn restore_results(&mut self, entries: &[WatchResultEntry]) {
        for (slot, saved) in self.results.iter_mut().zip(entries) {
            *slot = saved.clone();
        }
    }
}

fn relational_compare(
    operator: OperatorId,
    value: u32,
    limit: ComparisonValue,
) -> Result<bool, &'static str> {
    let ordering = match limit {
        ComparisonValue::Unsigned(limit) => value.cmp(&limit),
        ComparisonValue::Signed(limit) => (value as i32).cmp(&limit),
        ComparisonValue::Float(limit) => f32::from_bits(value)
            .partial_cmp(&limit)
            .ok_or("NaN operand")?,
    };
    let holds = match operator {
        OperatorId::LessThan => ordering == Ordering::Less,
        OperatorId::LessOrEqual => ordering != Ordering::Greater,
        OperatorId::Equal => ordering == Ordering::Equal,
        OperatorId::NotEqual => ordering != Ordering::Equal,
        OperatorId::GreaterOrEqual => ordering != Ordering::Less,
        OperatorId::GreaterThan => ordering == Ordering::Greater,
        OperatorId::None | OperatorId::Custom => return Err("not a relational operator"),
    };
    Ok(holds)
}
