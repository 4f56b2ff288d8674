//! Reverse-Polish boolean programs over watchpoint results.
//!
//! Each actionpoint carries a postfix token stream; atoms push the named
//! watchpoint's current ternary result, operators combine them under
//! three-valued logic where a stale operand is "unknown". The evaluator
//! runs on a bounded stack and never allocates.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::tables::watchpoint::{WatchResult, WatchpointTable};
use crate::tables::MAX_RPN_EQU_SIZE;

/// One token of an actionpoint equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpnToken {
    /// Push the ternary result of the watchpoint at this index.
    WatchPoint(u16),
    /// Push a constant TRUE or FALSE.
    Const(bool),
    Not,
    And,
    Or,
    Xor,
    Equal,
    /// Terminates the program; exactly one value must remain.
    End,
}

/// Fixed-capacity postfix program.
pub type RpnEquation = Vec<RpnToken, MAX_RPN_EQU_SIZE>;

/// Evaluation outcome, in the actionpoint result domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActionResult {
    #[default]
    Stale,
    Pass,
    Fail,
    Error,
}

/// Three-valued operand: FALSE, TRUE, or unknown (stale).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trit {
    False,
    True,
    Unknown,
}

fn and(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::False, _) | (_, Trit::False) => Trit::False,
        (Trit::True, Trit::True) => Trit::True,
        _ => Trit::Unknown,
    }
}

fn or(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::True, _) | (_, Trit::True) => Trit::True,
        (Trit::False, Trit::False) => Trit::False,
        _ => Trit::Unknown,
    }
}

fn not(a: Trit) -> Trit {
    match a {
        Trit::False => Trit::True,
        Trit::True => Trit::False,
        Trit::Unknown => Trit::Unknown,
    }
}

fn xor(a: Trit, b: Trit) -> Trit {
    match (a, b) {
        (Trit::Unknown, _) | (_, Trit::Unknown) => Trit::Unknown,
        _ => {
            if a == b {
                Trit::False
            } else {
                Trit::True
            }
        }
    }
}

fn equal(a: Trit, b: Trit) -> Trit {
    not(xor(a, b))
}

/// Evaluate a postfix program against the current watchpoint results.
///
/// A watch result of TRUE is the out-of-limits condition, so a program
/// ending TRUE is an actionpoint FAIL. Malformed programs (stack underflow
/// or overflow, no terminator, residue at the terminator, out-of-range
/// atom) and atoms whose watchpoint is in ERROR all yield `Error`.
pub fn evaluate(equation: &[RpnToken], watchpoints: &WatchpointTable) -> ActionResult {
    let mut stack: Vec<Trit, MAX_RPN_EQU_SIZE> = Vec::new();

    for token in equation {
        let pushed = match *token {
            RpnToken::WatchPoint(index) => {
                match watchpoints.result_of(index as usize) {
                    Some(WatchResult::False) => Trit::False,
                    Some(WatchResult::True) => Trit::True,
                    Some(WatchResult::Stale) => Trit::Unknown,
                    Some(WatchResult::Error) | None => return ActionResult::Error,
                }
            }
            RpnToken::Const(value) => {
                if value {
                    Trit::True
                } else {
                    Trit::False
                }
            }
            RpnToken::Not => {
                let Some(a) = stack.pop() else {
                    return ActionResult::Error;
                };
                not(a)
            }
            RpnToken::And | RpnToken::Or | RpnToken::Xor | RpnToken::Equal => {
                let (Some(b), Some(a)) = (stack.pop(), stack.pop()) else {
                    return ActionResult::Error;
                };
                match *token {
                    RpnToken::And => and(a, b),
                    RpnToken::Or => or(a, b),
                    RpnToken::Xor => xor(a, b),
                    _ => equal(a, b),
                }
            }
            RpnToken::End => {
                if stack.len() != 1 {
                    return ActionResult::Error;
                }
                return match stack[0] {
                    Trit::False => ActionResult::Pass,
                    Trit::True => ActionResult::Fail,
                    Trit::Unknown => ActionResult::Stale,
                };
            }
        };
        if stack.push(pushed).is_err() {
            return ActionResult::Error;
        }
    }

    // Ran off the end of the token buffer without a terminator.
    ActionResult::Error
}

/// Static well-formedness check used at table load: verifies the stack
/// effect of every token, a single trailing terminator, and atom indices
/// within the watchpoint table.
pub fn validate(equation: &[RpnToken], watchpoint_count: usize) -> Result<(), &'static str> {
    if equation.is_empty() {
        return Err("empty equation");
    }
    let mut depth: usize = 0;
    for (position, token) in equation.iter().enumerate() {
        match *token {
            RpnToken::WatchPoint(index) => {
                if (index as usize) >= watchpoint_count {
                    return Err("watchpoint atom out of range");
                }
                depth += 1;
            }
            RpnToken::Const(_) => depth += 1,
            RpnToken::Not => {
                if depth < 1 {
                    return Err("operator underflows the stack");
                }
            }
            RpnToken::And | RpnToken::Or | RpnToken::Xor | RpnToken::Equal => {
                if depth < 2 {
                    return Err("operator underflows the stack");
                }
                depth -= 1;
            }
            RpnToken::End => {
                if depth != 1 {
                    return Err("terminator with residue on the stack");
                }
                if position + 1 != equation.len() {
                    return Err("tokens after terminator");
                }
                return Ok(());
            }
        }
        if depth > MAX_RPN_EQU_SIZE {
            return Err("equation overflows the stack");
        }
    }
    Err("missing terminator")
}
