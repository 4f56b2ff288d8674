mod common;

use common::*;
use limitmon::tables::watchpoint::{CustomPredicateFault, OperatorId, WatchDefinition, WatchResult};
use limitmon::value::{ComparisonValue, DataType};

fn wp_with_age(index: u16, age: u32) -> WatchDefinition {
    WatchDefinition {
        result_age_when_stale: age,
        ..wp_u16_gt(index, 100)
    }
}

#[test]
fn test_true_and_false_transitions_update_counters() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![]);

    // STALE -> TRUE counts as a false-to-true transition.
    set_wp(&mut app, 0, true);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::True);
    assert_eq!(wp.evaluation_count, 1);
    assert_eq!(wp.false_to_true_count, 1);
    assert_eq!(wp.consecutive_true_count, 1);
    assert_eq!(wp.cumulative_true_count, 1);
    assert_eq!(wp.last_false_to_true.value, 150);
    assert_eq!(wp.last_false_to_true.data_type, DataType::U16Be);
    assert!(wp.last_false_to_true.timestamp.seconds > 0);

    // TRUE -> TRUE only extends the streak.
    set_wp(&mut app, 0, true);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.false_to_true_count, 1);
    assert_eq!(wp.consecutive_true_count, 2);
    assert_eq!(wp.cumulative_true_count, 2);

    // TRUE -> FALSE records the transition and clears the streak.
    set_wp(&mut app, 0, false);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::False);
    assert_eq!(wp.consecutive_true_count, 0);
    assert_eq!(wp.last_true_to_false.value, 50);

    // FALSE -> TRUE transitions again.
    set_wp(&mut app, 0, true);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.false_to_true_count, 2);
    assert_eq!(wp.consecutive_true_count, 1);
    assert_eq!(wp.evaluation_count, 4);
}

#[test]
fn test_fresh_result_rearms_the_staleness_countdown() {
    let mut app = checker(vec![wp_with_age(0, 3)], vec![]);

    set_wp(&mut app, 0, true);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::True);
    assert_eq!(wp.countdown_to_stale, 3);

    // Two aging passes leave the result fresh, the third decays it.
    sample_all(&mut app, 1);
    sample_all(&mut app, 1);
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::True);
    assert_eq!(app.watchpoints().results()[0].countdown_to_stale, 1);
    sample_all(&mut app, 1);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::Stale);
    assert_eq!(wp.countdown_to_stale, 0);

    // A refresh rearms the countdown in full.
    set_wp(&mut app, 0, false);
    assert_eq!(app.watchpoints().results()[0].countdown_to_stale, 3);
}

#[test]
fn test_age_zero_never_decays() {
    let mut app = checker(vec![wp_with_age(0, 0)], vec![]);
    set_wp(&mut app, 0, true);
    for _ in 0..10 {
        sample_all(&mut app, 1);
    }
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::True);
}

#[test]
fn test_bit_mask_applies_to_integer_fields() {
    let wp = WatchDefinition {
        data_type: DataType::U16Be,
        operator: OperatorId::Equal,
        message_id: wp_mid(0),
        offset: 0,
        bit_mask: 0x0000_00FF,
        comparison_value: ComparisonValue::Unsigned(0x34),
        result_age_when_stale: 0,
        custom_arg: 0,
    };
    let mut app = checker(vec![wp], vec![]);
    app.process_message(wp_mid(0), &u16_payload(0x1234));
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::True);
    assert_eq!(wp.last_false_to_true.value, 0x34);
}

#[test]
fn test_signed_comparison_uses_sign_extension() {
    let wp = WatchDefinition {
        data_type: DataType::I16Be,
        operator: OperatorId::LessThan,
        message_id: wp_mid(0),
        offset: 0,
        bit_mask: 0xFFFF_FFFF,
        comparison_value: ComparisonValue::Signed(-50),
        result_age_when_stale: 0,
        custom_arg: 0,
    };
    let mut app = checker(vec![wp], vec![]);

    app.process_message(wp_mid(0), &(-60_i16).to_be_bytes());
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::True);

    app.process_message(wp_mid(0), &(-40_i16).to_be_bytes());
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::False);
}

#[test]
fn test_float_comparison_is_ordered_and_nan_errors() {
    let wp = WatchDefinition {
        data_type: DataType::F32Be,
        operator: OperatorId::GreaterThan,
        message_id: wp_mid(0),
        offset: 0,
        bit_mask: 0xFFFF_FFFF,
        comparison_value: ComparisonValue::Float(10.0),
        result_age_when_stale: 0,
        custom_arg: 0,
    };
    let mut app = checker(vec![wp], vec![]);

    app.process_message(wp_mid(0), &12.5_f32.to_bits().to_be_bytes());
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::True);

    app.process_message(wp_mid(0), &f32::NAN.to_bits().to_be_bytes());
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::Error);
    assert_eq!(wp.countdown_to_stale, 0);
}

#[test]
fn test_read_fault_parks_the_entry_in_error() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![]);
    set_wp(&mut app, 0, true);

    // Truncated message: the field no longer fits.
    error_wp(&mut app, 0);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::Error);
    assert_eq!(wp.countdown_to_stale, 0);
    assert_eq!(wp.evaluation_count, 2);
    // Transition counters are frozen on errors.
    assert_eq!(wp.false_to_true_count, 1);
    assert_eq!(wp.consecutive_true_count, 1);

    // ERROR -> TRUE extends the streak without a new transition record.
    set_wp(&mut app, 0, true);
    let wp = &app.watchpoints().results()[0];
    assert_eq!(wp.result, WatchResult::True);
    assert_eq!(wp.false_to_true_count, 1);
    assert_eq!(wp.consecutive_true_count, 2);
}

fn equals_arg(_watchpoint: usize, value: u32, custom_arg: u32) -> Result<bool, CustomPredicateFault> {
    Ok(value == custom_arg)
}

#[test]
fn test_custom_predicate_maps_to_ternary() {
    let wp = WatchDefinition {
        data_type: DataType::U16Be,
        operator: OperatorId::Custom,
        message_id: wp_mid(0),
        offset: 0,
        bit_mask: 0xFFFF_FFFF,
        comparison_value: ComparisonValue::Unsigned(0),
        result_age_when_stale: 0,
        custom_arg: 5,
    };
    let mut app = checker(vec![wp], vec![]);
    app.set_custom_predicate(equals_arg);

    app.process_message(wp_mid(0), &u16_payload(5));
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::True);

    app.process_message(wp_mid(0), &u16_payload(6));
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::False);
}

#[test]
fn test_custom_operator_without_predicate_errors() {
    let wp = WatchDefinition {
        operator: OperatorId::Custom,
        ..wp_u16_gt(0, 100)
    };
    let mut app = checker(vec![wp], vec![]);
    app.process_message(wp_mid(0), &u16_payload(5));
    assert_eq!(app.watchpoints().results()[0].result, WatchResult::Error);
}
