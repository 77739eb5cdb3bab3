use approx::assert_abs_diff_eq;

use sheet_motion_config::Config;

use super::fixture::*;
use crate::sheet::Phase;

fn open_sheet() -> Fixture {
    Fixture::new(config(&[0.5, 1.], 1), 1000., 2000.)
}

/// Drags the open sheet 100 pixels down, then scrolls the content while still touching.
fn drag_then_scroll(f: &mut Fixture, scroll: f64) {
    f.sim.press(500.);
    f.drag(&[510., 560., 610.]);
    assert_abs_diff_eq!(f.offset(), 100.);

    f.sim.scroll(scroll);
}

#[test]
fn content_reaching_the_top_bounces() {
    let mut f = open_sheet();
    f.sim.scroll(300.);
    f.step();
    f.sim.scroll(200.);
    f.step();
    f.sim.scroll(100.);
    assert_eq!(f.sim.sheet().bounce().get(), None);

    // The bounce starts one frame later.
    f.step();
    let bounce = f.sim.sheet().bounce().get().unwrap();
    assert_abs_diff_eq!(bounce.velocity, -6250., epsilon = 1e-6);
    assert!(bounce.duration > ms(0));

    f.step();
    assert!(f.rendered() > f.offset() + 1.);

    // Reaching the top does not bounce again.
    f.sim.scroll(0.);
    f.step();
    assert_eq!(f.sim.sheet().bounce().get(), Some(bounce));

    // Moving the sheet ends it.
    f.sim.sheet().navigate(0);
    assert_eq!(f.sim.sheet().bounce().get(), None);
}

#[test]
fn undamped_bounce_spring_is_bounded() {
    let err = r#"{ "bounce": { "damping": 0 } }"#.parse::<Config>().unwrap_err();
    assert!(format!("{err:#}").contains("bounce spring must have a positive damping"));

    // A config built in code skips validation; the bounce still ends.
    let mut config = config(&[0.5, 1.], 1);
    config.bounce.damping = 0.;
    let mut f = Fixture::new(config, 1000., 2000.);
    for scroll in [300., 200., 100.] {
        f.sim.scroll(scroll);
        f.step();
    }
    let bounce = f.sim.sheet().bounce().get().unwrap();
    assert_eq!(bounce.duration, ms(60_000));
}

#[test]
fn no_bounce_while_touching() {
    let mut f = open_sheet();
    f.sim.press(500.);
    for scroll in [300., 200., 100., 0.] {
        f.sim.scroll(scroll);
        f.step();
    }
    assert_eq!(f.sim.sheet().bounce().get(), None);
}

#[test]
fn release_with_scrolled_content_starts_momentum() {
    let mut f = open_sheet();
    drag_then_scroll(&mut f, 300.);
    f.drag(&[600.]);
    assert_eq!(f.sim.sheet().phase(), Phase::ScrollHandoff);
    assert_abs_diff_eq!(f.offset(), 100.);

    f.sim.release();
    assert_eq!(f.sim.sheet().phase(), Phase::Idle);
    assert!(f.sim.sheet().has_momentum());

    f.wait(ms(200));
    let scroll = f.sim.surface().scroll();
    assert!(scroll > 0. && scroll < 300., "{scroll}");
    assert!(f.sim.sheet().has_momentum());

    // The momentum runs into the top, then the compensation returns the sheet to its point.
    f.wait(ms(2000));
    assert!(!f.sim.sheet().has_momentum());
    assert_eq!(f.sim.surface().scroll(), 0.);
    assert_eq!(f.sim.sheet().content_scroll().get(), 0.);
    assert_eq!(f.offset(), 0.);
    assert_eq!(f.rendered(), 0.);
}

#[test]
fn press_stops_momentum() {
    let mut f = open_sheet();
    drag_then_scroll(&mut f, 300.);
    f.drag(&[600.]);
    f.sim.release();
    f.wait(ms(100));
    assert!(f.sim.sheet().has_momentum());

    f.sim.press(600.);
    assert!(!f.sim.sheet().has_momentum());
    let scroll = f.sim.surface().scroll();
    f.wait(ms(100));
    assert_eq!(f.sim.surface().scroll(), scroll);
}

#[test]
fn compensation_is_deferred_until_release() {
    let mut f = open_sheet();
    drag_then_scroll(&mut f, 300.);
    // Hold still, so that the release has no momentum.
    f.drag(&[610., 610.]);
    f.sim.release();
    assert!(!f.sim.sheet().has_momentum());

    f.sim.press(600.);
    f.sim.scroll(250.);
    f.wait(ms(200));
    assert_abs_diff_eq!(f.offset(), 100.);

    f.sim.release();
    f.wait(ms(50));
    assert_abs_diff_eq!(f.offset(), 100.);

    // The scroll absorbs the 100 pixels the sheet is away from its point.
    f.wait(ms(650));
    assert_eq!(f.offset(), 0.);
    assert_eq!(f.rendered(), 0.);
    assert_abs_diff_eq!(f.sim.sheet().content_scroll().get(), 150.);
    assert_abs_diff_eq!(f.sim.surface().scroll(), 150.);
}
