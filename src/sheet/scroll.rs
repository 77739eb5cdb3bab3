use std::time::Duration;

use super::{FrameTask, Lifecycle, Sheet};
use crate::animation::{SpringParams, SpringSolution, TimingCurve, DEFAULT_STEP_COUNT};
use crate::transition::TransitionMode;

/// A small spring-driven displacement played when scrolled content hits its top edge.
///
/// The host translates the sheet by `1 - curve(progress)` pixels on top of its offset for
/// `duration`. The curve starts by moving away from 0 with the scroll velocity, which makes the
/// sheet follow through past the edge before settling back.
#[derive(Debug, Clone, PartialEq)]
pub struct OverscrollBounce {
    /// Initial velocity of the spring, in normalized units per second.
    pub velocity: f64,
    pub duration: Duration,
    pub curve: TimingCurve,
}

impl OverscrollBounce {
    /// Displacement in pixels `elapsed` after the start, or `None` once finished.
    pub fn displacement(&self, elapsed: Duration) -> Option<f64> {
        if elapsed >= self.duration {
            return None;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        Some(1. - self.curve.sample(progress))
    }
}

/// Notices the content scroll reaching its top edge without a finger down.
#[derive(Debug, Default)]
pub(super) struct BounceDetector {
    /// Scroll velocity one event before the latest, in pixels per second toward the top.
    last_velocity: f64,
    performing: bool,
    last_event_at: Option<Duration>,
}

/// State of the reconciliation between the content scroll and the sheet offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum Compensation {
    /// Waiting for a scroll event to start the debounce.
    Listening,
    Scheduled { deadline: Duration },
    /// The debounce elapsed while touching.
    AwaitingRelease,
}

impl BounceDetector {
    /// Records a scroll change and returns the bounce velocity if it should start.
    pub(super) fn on_scroll(
        &mut self,
        previous: f64,
        latest: f64,
        now: Duration,
        touching: bool,
    ) -> Option<f64> {
        let movement = previous - latest;
        let velocity = match self.last_event_at.replace(now) {
            Some(last) if now > last => movement / (now - last).as_secs_f64(),
            Some(_) => self.last_velocity,
            None => 0.,
        };

        // The last delta before the edge is shortened by clamping, so the bounce fires one event
        // early, using the velocity from the event before.
        if latest > movement {
            self.last_velocity = velocity;
            self.performing = false;
            return None;
        }

        if touching || self.performing {
            return None;
        }

        self.performing = true;
        Some(-self.last_velocity)
    }
}

impl Sheet {
    /// The content scroll offset changed, as reported by the host.
    pub fn scroll_changed(&mut self, scroll: f64) {
        if !scroll.is_finite() {
            warn!("ignoring non-finite content scroll {scroll}");
            return;
        }
        self.apply_content_scroll(scroll, true);
    }

    pub(super) fn apply_content_scroll(&mut self, scroll: f64, detect_bounce: bool) {
        let previous = self.content_scroll.get();
        if !self.content_scroll.set(scroll) {
            return;
        }

        let now = self.clock.now();
        if matches!(
            self.compensation,
            Some(Compensation::Listening | Compensation::Scheduled { .. })
        ) {
            self.arm_compensation();
        }

        if !detect_bounce || self.lifecycle.get() != Lifecycle::Mounted {
            return;
        }

        if let Some(velocity) = self
            .bounce_detector
            .on_scroll(previous, scroll, now, self.touching)
        {
            debug!("content reached the top edge, bouncing with velocity {velocity}");
            self.frame_tasks.push(FrameTask::StartBounce { velocity });
        }
    }

    pub(super) fn start_bounce(&mut self, velocity: f64) {
        if self.lifecycle.get() != Lifecycle::Mounted {
            return;
        }

        let solution = SpringSolution::new(SpringParams::from(self.config.bounce), velocity);
        let duration = solution.settle_duration();

        let curve = TimingCurve::from_spring(&solution, DEFAULT_STEP_COUNT);
        self.bounce.set(Some(OverscrollBounce {
            velocity,
            duration,
            curve,
        }));
    }

    pub(super) fn advance_momentum(&mut self) {
        let Some(momentum) = &self.momentum else {
            return;
        };

        let value = momentum.value();
        let done = momentum.is_done();
        let applied = self.host.scroll_content_to(value);
        self.apply_content_scroll(applied, true);

        // Stop at either end of the content.
        if done || applied <= 0. || (applied - value).abs() > 0.5 {
            trace!("scroll momentum stopped at {applied}");
            self.momentum = None;
        }
    }

    pub(super) fn arm_compensation(&mut self) {
        let debounce = Duration::from_millis(u64::from(self.config.scroll.compensation_debounce_ms));
        let deadline = self.clock.now().saturating_add(debounce);
        self.compensation = Some(Compensation::Scheduled { deadline });
    }

    pub(super) fn compensation_waits_for_release(&self) -> bool {
        self.compensation == Some(Compensation::AwaitingRelease)
    }

    /// Pauses the debounce for a new press; the next scroll event restarts it.
    pub(super) fn pause_compensation(&mut self) {
        if let Some(Compensation::Scheduled { .. }) = self.compensation {
            self.compensation = Some(Compensation::Listening);
        }
    }

    pub(super) fn advance_compensation(&mut self) {
        let Some(Compensation::Scheduled { deadline }) = self.compensation else {
            return;
        };
        if self.clock.now() < deadline {
            return;
        }

        if self.touching {
            trace!("deferring scroll compensation until release");
            self.compensation = Some(Compensation::AwaitingRelease);
            return;
        }

        self.compensation = None;
        self.compensate();
    }

    /// Moves the sheet back to its snap point while keeping the content where it is on screen.
    fn compensate(&mut self) {
        if self.lifecycle.get() != Lifecycle::Mounted {
            return;
        }

        let extent = self.host.container_extent();
        let Some(target) = self.snap.current_offset(extent) else {
            return;
        };
        let remaining = self
            .host
            .read_rendered_offset()
            .unwrap_or_else(|| self.offset.get());
        let scroll = self.content_scroll.get();
        let excess = remaining - target;
        debug!("compensating scroll {scroll} against offset {remaining}, resting at {target}");

        if scroll < excess {
            // Not enough scroll to absorb the offset: trade the scroll for offset, then settle.
            self.transition.set(TransitionMode::Instant);
            self.commit_offset(remaining - scroll);
            let applied = self.host.scroll_content_to(0.);
            self.apply_content_scroll(applied, false);

            self.transition.set(TransitionMode::Resting);
            self.commit_offset(target);
        } else {
            let applied = self.host.scroll_content_to(scroll - excess);
            self.apply_content_scroll(applied, false);
            self.transition.set(TransitionMode::Instant);
            self.commit_offset(target);
        }
    }
}
