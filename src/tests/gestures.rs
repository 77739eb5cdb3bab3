use approx::assert_abs_diff_eq;
use sheet_motion_config::ResistancePolicy;

use super::fixture::*;
use crate::animation::CubicBezier;
use crate::sheet::{Lifecycle, Phase};
use crate::transition::TransitionMode;

#[test]
fn flick_open_moves_to_the_next_point() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    assert_eq!(f.offset(), 800.);
    assert_eq!(f.rendered(), 800.);

    f.sim.press(950.);
    assert_eq!(f.sim.sheet().phase(), Phase::Pressed);

    f.drag(&[940., 865., 790., 715., 640.]);
    assert_abs_diff_eq!(f.offset(), 500.);
    assert!(matches!(f.sim.sheet().phase(), Phase::Dragging(_)));
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Instant);

    f.sim.release();
    assert_eq!(f.sim.sheet().snap().current_index(), 1);
    assert_eq!(f.offset(), 100.);
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Resting);
    assert_eq!(f.sim.sheet().phase(), Phase::Releasing);
    assert!(f.sim.sheet().can_scroll().get());

    f.wait(ms(600));
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);
    assert_eq!(f.rendered(), 100.);
}

#[test]
fn slow_release_settles_at_the_nearest_point() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.press(900.);
    f.drag(&[900., 850., 800., 750., 700., 650., 600., 599., 599.]);
    assert_abs_diff_eq!(f.offset(), 499.);

    f.sim.release();
    // 499 is 301 from the closed point at 800 and 399 from the open one at 100.
    assert_eq!(f.sim.sheet().snap().current_index(), 0);
    assert_eq!(f.offset(), 800.);
}

#[test]
fn flick_closed_from_the_most_closed_point_dismisses() {
    let mut f = Fixture::new(config(&[1.], 0), 1000., 0.);
    assert_eq!(f.offset(), 0.);

    f.sim.press(100.);
    f.drag(&[150., 250., 350.]);
    // Resisted, since the sheet is at its most closed point.
    assert_abs_diff_eq!(f.offset(), 80.);

    f.sim.release();
    assert_eq!(f.sim.sheet().lifecycle(), Lifecycle::Exiting);
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Exiting);

    f.wait(ms(600));
    assert!(f.sim.is_removed());
    assert_eq!(f.rendered(), 1000.);
}

#[test]
fn tap_returns_to_idle_and_follows_resizes() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.press(900.);
    f.sim.release();
    assert_eq!(f.sim.sheet().phase(), Phase::Releasing);
    assert!(!f.sim.surface().is_transitioning());

    f.step();
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);

    f.sim.resize(2000.);
    assert_eq!(f.offset(), 1600.);
    assert_eq!(f.rendered(), 1600.);
}

#[test]
fn press_above_the_panel_is_ignored() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.press(500.);
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);
    assert!(f.sim.sheet().is_touching());

    f.drag(&[600., 700., 800.]);
    assert_eq!(f.offset(), 800.);

    f.sim.release();
    assert!(!f.sim.sheet().is_touching());
    assert_eq!(f.sim.sheet().lifecycle(), Lifecycle::Mounted);
}

#[test]
fn press_interrupts_a_running_transition() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.sheet().navigate(1);
    assert!(f.sim.surface().is_transitioning());

    f.wait(ms(256));
    let rendered = f.rendered();
    assert!(rendered < 800. && rendered > 100.);

    f.sim.press(950.);
    // Projected along the reference curve 0.18 ahead of the elapsed 256 / 500.
    let expected = 800. - 700. * CubicBezier::new(0.35, 0.79, 0.23, 1.).y(0.512 + 0.18);
    assert_abs_diff_eq!(f.offset(), expected, epsilon = 1e-6);
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Instant);
    assert!(!f.sim.surface().is_transitioning());
    assert_abs_diff_eq!(f.rendered(), expected, epsilon = 1e-6);
}

#[test]
fn press_on_a_resting_sheet_reads_back_its_position() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.press(850.);
    assert_eq!(f.offset(), 800.);
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Instant);
}

#[test]
fn cancel_returns_to_the_current_point() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 0), 1000., 0.);
    f.sim.press(900.);
    f.drag(&[900., 800., 700.]);
    assert_abs_diff_eq!(f.offset(), 600.);

    f.sim.cancel();
    assert_eq!(f.sim.sheet().phase(), Phase::Releasing);
    assert_eq!(f.offset(), 800.);
    assert_eq!(f.sim.sheet().transition().get(), TransitionMode::Resting);
    assert_eq!(f.sim.sheet().snap().current_index(), 0);

    f.wait(ms(600));
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);
    assert_eq!(f.rendered(), 800.);
}

#[test]
fn drag_is_clamped_to_the_container() {
    let mut config = config(&[0.5, 1.], 0);
    config.sheet.resistance_policy = ResistancePolicy::Off;
    let mut f = Fixture::new(config, 1000., 0.);

    f.sim.press(600.);
    f.drag(&[700., 800., 900., 1000., 1100., 1200.]);
    assert_abs_diff_eq!(f.offset(), 1000.);
    f.drag(&[1300.]);
    assert_abs_diff_eq!(f.offset(), 1000.);

    f.sim.release();
    assert_eq!(f.sim.sheet().lifecycle(), Lifecycle::Exiting);
}

#[test]
fn moving_toward_open_when_fully_open_hands_off_to_the_content() {
    let mut f = Fixture::new(config(&[0.5, 1.], 1), 1000., 2000.);
    assert!(f.sim.sheet().can_scroll().get());

    f.sim.press(500.);
    f.drag(&[480., 440.]);
    assert_eq!(f.sim.sheet().phase(), Phase::ScrollHandoff);
    assert_eq!(f.offset(), 0.);
}

#[test]
fn short_content_does_not_take_over_the_drag() {
    let mut f = Fixture::new(config(&[0.2, 0.9], 1), 1000., 0.);
    assert_eq!(f.offset(), 100.);
    assert!(f.sim.sheet().can_scroll().get());

    f.sim.press(150.);
    f.drag(&[140., 120., 100., 80.]);
    assert!(matches!(f.sim.sheet().phase(), Phase::Dragging(_)));
    assert_abs_diff_eq!(f.offset(), 40.);
}

#[test]
fn both_edges_resists_dragging_past_the_most_open_point() {
    let mut config = config(&[0.2, 0.9], 1);
    config.sheet.resistance_policy = ResistancePolicy::BothEdges;
    let mut f = Fixture::new(config, 1000., 0.);

    f.sim.press(150.);
    f.drag(&[140., 120., 100., 80., 60., 40.]);
    // 100 pixels toward open against 0.6 resistance only move 40.
    assert_abs_diff_eq!(f.offset(), 60.);

    f.sim.release();
    assert_eq!(f.sim.sheet().snap().current_index(), 1);
    assert_eq!(f.offset(), 100.);

    f.wait(ms(600));
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);
    assert_eq!(f.rendered(), 100.);
}
