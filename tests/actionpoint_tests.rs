mod common;

use common::*;
use limitmon::events::{AP_FAIL_TO_PASS_INF_EID, AP_PASSIVE_FAIL_DBG_EID};
use limitmon::msg::GroundCommand;
use limitmon::rpn::RpnToken;
use limitmon::tables::actionpoint::{ActionDefinition, ApState};
use limitmon::ActionResult;

const WP0: &[RpnToken] = &[RpnToken::WatchPoint(0), RpnToken::End];

fn ap_with(max_fails: u16, default_state: ApState) -> ActionDefinition {
    ActionDefinition {
        max_fails_before_rts: max_fails,
        default_state,
        ..ap_watching(WP0)
    }
}

#[test]
fn test_rts_fires_exactly_on_the_nth_consecutive_fail() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(3, ApState::Active)]);
    set_wp(&mut app, 0, true);

    sample_all(&mut app, 0);
    sample_all(&mut app, 0);
    assert!(app.services().rts_requests.is_empty());
    assert_eq!(app.actionpoints().results()[0].consecutive_fail_count, 2);

    sample_all(&mut app, 0);
    assert_eq!(app.services().rts_requests, vec![7]);
    let ap = &app.actionpoints().results()[0];
    assert_eq!(ap.consecutive_fail_count, 3);
    assert_eq!(ap.cumulative_fail_count, 3);
    assert_eq!(ap.cumulative_rts_exec_count, 1);
    assert_eq!(app.state().rts_exec_count, 1);
    assert_eq!(app.services().events_with_id(AP_FAILURE_EID), 1);

    // A continuing streak does not re-fire.
    sample_all(&mut app, 0);
    sample_all(&mut app, 0);
    assert_eq!(app.services().rts_requests.len(), 1);
    assert_eq!(app.actionpoints().results()[0].consecutive_fail_count, 5);
}

#[test]
fn test_a_fresh_fail_streak_rearms_the_trigger() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(2, ApState::Active)]);

    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);
    sample_all(&mut app, 0);
    assert_eq!(app.services().rts_requests.len(), 1);

    set_wp(&mut app, 0, false);
    sample_all(&mut app, 0);
    let ap = &app.actionpoints().results()[0];
    assert_eq!(ap.result, ActionResult::Pass);
    assert_eq!(ap.consecutive_fail_count, 0);
    assert_eq!(ap.fail_to_pass_count, 1);
    assert_eq!(app.services().events_with_id(AP_FAIL_TO_PASS_INF_EID), 1);

    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);
    sample_all(&mut app, 0);
    assert_eq!(app.services().rts_requests.len(), 2);
    assert_eq!(app.actionpoints().results()[0].cumulative_rts_exec_count, 2);
}

#[test]
fn test_passive_actionpoint_suppresses_the_request() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(2, ApState::Passive)]);
    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);
    sample_all(&mut app, 0);

    assert!(app.services().rts_requests.is_empty());
    let ap = &app.actionpoints().results()[0];
    assert_eq!(ap.passive_ap_count, 1);
    assert_eq!(ap.cumulative_rts_exec_count, 0);
    assert_eq!(app.state().passive_rts_exec_count, 1);
    assert_eq!(app.state().rts_exec_count, 0);
    assert_eq!(app.services().events_with_id(AP_PASSIVE_FAIL_DBG_EID), 1);
}

#[test]
fn test_passive_app_state_suppresses_an_active_actionpoint() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(1, ApState::Active)]);
    send_command(&mut app, GroundCommand::SetLcState { state: 2 });
    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);

    assert!(app.services().rts_requests.is_empty());
    assert_eq!(app.actionpoints().results()[0].passive_ap_count, 1);
    assert_eq!(app.state().passive_rts_exec_count, 1);
}

#[test]
fn test_disabled_entries_and_disabled_app_are_not_sampled() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(1, ApState::Disabled)]);
    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);
    assert_eq!(app.actionpoints().results()[0].result, ActionResult::Stale);
    assert_eq!(app.state().ap_sample_count, 0);

    // Enable the entry but disable the whole app: still no sampling.
    send_command(&mut app, GroundCommand::SetApState { actionpoint: 0, state: 1 });
    send_command(&mut app, GroundCommand::SetLcState { state: 3 });
    sample_all(&mut app, 0);
    assert_eq!(app.actionpoints().results()[0].result, ActionResult::Stale);
    assert_eq!(app.state().ap_sample_count, 0);
}

#[test]
fn test_sample_count_tracks_only_sampled_entries() {
    let mut app = checker(
        vec![wp_u16_gt(0, 100)],
        vec![
            ap_with(10, ApState::Active),
            ap_with(10, ApState::Disabled),
            ap_with(10, ApState::Passive),
        ],
    );
    sample_all(&mut app, 0);
    assert_eq!(app.state().ap_sample_count, 2);

    sample_range(&mut app, 0, 0, 0);
    assert_eq!(app.state().ap_sample_count, 3);
}

#[test]
fn test_stale_samples_move_no_counters() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(1, ApState::Active)]);
    sample_all(&mut app, 0);
    sample_all(&mut app, 0);

    let ap = &app.actionpoints().results()[0];
    assert_eq!(ap.result, ActionResult::Stale);
    assert_eq!(ap.cumulative_fail_count, 0);
    assert_eq!(ap.pass_to_fail_count, 0);
    assert_eq!(ap.consecutive_fail_count, 0);
    // The entries were still visited.
    assert_eq!(app.state().ap_sample_count, 2);
}

#[test]
fn test_event_rate_limits_suppress_but_never_block_the_rts() {
    let silent = ActionDefinition {
        max_pass_fail_events: 0,
        ..ap_with(1, ApState::Active)
    };
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![silent]);
    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);

    assert_eq!(app.services().rts_requests, vec![7]);
    assert_eq!(app.services().events_with_id(AP_FAILURE_EID), 0);
    // Suppressed events are not counted as sent.
    assert_eq!(app.actionpoints().results()[0].cumulative_event_msgs_sent, 0);
}

#[test]
fn test_permoff_requires_a_disabled_entry() {
    let mut app = checker(
        vec![wp_u16_gt(0, 100)],
        vec![ap_with(1, ApState::Active), ap_with(1, ApState::Disabled)],
    );

    send_command(&mut app, GroundCommand::SetApPermOff { actionpoint: 0 });
    assert_eq!(app.actionpoints().current_state(0), Some(ApState::Active));
    assert_eq!(app.state().cmd_err_count, 1);

    send_command(&mut app, GroundCommand::SetApPermOff { actionpoint: 1 });
    assert_eq!(app.actionpoints().current_state(1), Some(ApState::PermOff));
    assert_eq!(app.state().cmd_count, 1);

    // PERMOFF is sticky against state commands.
    send_command(&mut app, GroundCommand::SetApState { actionpoint: 1, state: 1 });
    assert_eq!(app.actionpoints().current_state(1), Some(ApState::PermOff));
    assert_eq!(app.state().cmd_err_count, 2);
}

#[test]
fn test_wildcard_state_command_skips_sticky_entries() {
    let mut app = checker(
        vec![wp_u16_gt(0, 100)],
        vec![
            ap_with(1, ApState::Active),
            ap_with(1, ApState::Disabled),
            ap_with(1, ApState::NotUsed),
        ],
    );
    send_command(&mut app, GroundCommand::SetApPermOff { actionpoint: 1 });

    send_command(
        &mut app,
        GroundCommand::SetApState {
            actionpoint: limitmon::msg::ALL_ACTIONPOINTS,
            state: 2,
        },
    );
    assert_eq!(app.actionpoints().current_state(0), Some(ApState::Passive));
    assert_eq!(app.actionpoints().current_state(1), Some(ApState::PermOff));
    assert_eq!(app.actionpoints().current_state(2), Some(ApState::NotUsed));
    // One accepted command regardless of how many entries moved.
    assert_eq!(app.state().cmd_count, 2);
    assert_eq!(app.state().cmd_err_count, 0);
}

#[test]
fn test_evaluation_never_changes_commanded_state() {
    let mut app = checker(vec![wp_u16_gt(0, 100)], vec![ap_with(1, ApState::Active)]);
    set_wp(&mut app, 0, true);
    sample_all(&mut app, 0);
    assert_eq!(app.actionpoints().results()[0].result, ActionResult::Fail);
    assert_eq!(app.actionpoints().current_state(0), Some(ApState::Active));
}
