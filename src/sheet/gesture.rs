use std::time::Duration;

use sheet_motion_config::ResistancePolicy;

use super::{Lifecycle, Sheet};
use crate::animation::Animation;
use crate::movement::{DEFAULT_WINDOW, SMOOTHED_WINDOW};
use crate::speculation::TransitionMotion;
use crate::transition::TransitionMode;

/// Where the pointer and the sheet were when a drag took over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureState {
    pub anchor_pointer: f64,
    pub anchor_offset: f64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub enum Phase {
    #[default]
    Idle,
    /// A pointer is down on the panel but has not moved the sheet yet.
    Pressed,
    Dragging(GestureState),
    /// The content scroll absorbs the gesture.
    ScrollHandoff,
    /// Released, and moving to the resolved snap point.
    Releasing,
}

/// Whether a drag `pointer_offset` pixels toward open is resisted.
pub fn applies_resistance(
    policy: ResistancePolicy,
    at_most_closed: bool,
    at_most_open: bool,
    pointer_offset: f64,
) -> bool {
    match policy {
        ResistancePolicy::Off => false,
        ResistancePolicy::ClosedEdge => at_most_closed && pointer_offset < 0.,
        ResistancePolicy::BothEdges => {
            (at_most_closed && pointer_offset < 0.) || (at_most_open && pointer_offset > 0.)
        }
    }
}

impl GestureState {
    /// Offset of the sheet for a pointer at `pointer`, before clamping.
    pub fn offset_for(&self, pointer: f64, resistance: Option<f64>) -> f64 {
        let pointer_offset = self.anchor_pointer - pointer;
        let resisted = resistance.map_or(0., |coefficient| pointer_offset * coefficient);
        self.anchor_offset - pointer_offset + resisted
    }
}

impl Sheet {
    /// A pointer went down at `pointer` along the drag axis.
    pub fn press(&mut self, pointer: f64) {
        if self.lifecycle.get() != Lifecycle::Mounted {
            debug!("ignoring press while {:?}", self.lifecycle.get());
            return;
        }

        self.touching = true;
        self.pause_compensation();
        if self.momentum.take().is_some() {
            debug!("press stopped the scroll momentum");
        }

        let rendered = self
            .host
            .read_rendered_offset()
            .unwrap_or_else(|| self.offset.get());
        if pointer < rendered {
            trace!("press at {pointer} is above the panel at {rendered}");
            self.set_phase(Phase::Idle);
            return;
        }

        self.seize_position();

        self.tracker.reset();
        self.tracker.track(pointer);
        self.last_move_at = Some(self.clock.now());
        self.move_interval = Duration::ZERO;
        self.set_phase(Phase::Pressed);
    }

    /// Takes over the sheet wherever it is, so that the gesture starts without a jump.
    fn seize_position(&mut self) {
        let current = self.offset.get();
        let motion = TransitionMotion {
            previous: self.offset.previous().unwrap_or(current),
            current,
            elapsed: self.clock.now().saturating_sub(self.offset_changed_at.get()),
            duration: self
                .transition
                .get()
                .duration(&self.config.transitions),
        };

        match self
            .speculator
            .speculate(&self.transitions, motion, &*self.host)
        {
            Ok(position) => {
                let extent = self.host.container_extent();
                let position = position.clamp(0., extent.max(0.));
                trace!("seized the sheet at {position}");
                self.transition.set(TransitionMode::Instant);
                self.commit_offset_forced(position);
            }
            Err(err) => {
                warn!("{err}, keeping offset {current}");
            }
        }
    }

    pub fn pointer_move(&mut self, pointer: f64) {
        if matches!(self.phase, Phase::Idle | Phase::Releasing) {
            return;
        }

        let now = self.clock.now();
        if let Some(last) = self.last_move_at.replace(now) {
            self.move_interval = now.saturating_sub(last);
        }

        self.tracker.track(pointer);
        let velocity = self.tracker.calculate_velocity(DEFAULT_WINDOW);

        let extent = self.host.container_extent();
        let offset = self.offset.get();
        let has_scrolled = self.content_scroll.get() > 0.;
        let fully_open = self
            .snap
            .offset_of(self.snap.most_open_index(extent).unwrap_or(0), extent)
            .is_some_and(|open| offset <= open);
        let has_scroll_room = self.host.max_content_scroll() > self.content_scroll.get();
        // Moving the pointer toward open scrolls the content down.
        let scrolling_content =
            fully_open && self.can_scroll.get() && has_scroll_room && velocity < 0.;

        if has_scrolled || scrolling_content {
            self.set_phase(Phase::ScrollHandoff);
            return;
        }

        let dragging = matches!(self.phase, Phase::Dragging(_));
        // A drag resisted toward open leaves the pointer above the panel.
        if !dragging && pointer < offset {
            return;
        }

        let gesture = match self.phase {
            Phase::Dragging(gesture) => gesture,
            _ => {
                let gesture = GestureState {
                    anchor_pointer: pointer,
                    anchor_offset: offset,
                };
                debug!("drag started at {pointer} with the sheet at {offset}");
                self.transition.set(TransitionMode::Instant);
                self.set_phase(Phase::Dragging(gesture));
                gesture
            }
        };

        let pointer_offset = gesture.anchor_pointer - pointer;
        let resist = applies_resistance(
            self.config.sheet.resistance_policy,
            self.snap.is_at_most_closed(extent),
            self.snap.is_at_most_open(extent),
            pointer_offset,
        );
        let resistance = resist.then_some(self.config.sheet.resistance);
        let target = gesture.offset_for(pointer, resistance);
        self.commit_offset(target.clamp(0., extent.max(0.)));
    }

    /// The pointer was lifted.
    pub fn release(&mut self) {
        self.touching = false;
        if self.compensation_waits_for_release() {
            self.arm_compensation();
        }

        let phase = self.phase;
        let velocity = self.tracker.calculate_velocity(SMOOTHED_WINDOW);
        self.tracker.reset();
        self.last_move_at = None;

        if matches!(phase, Phase::Idle | Phase::Releasing) {
            return;
        }

        let scroll = self.content_scroll.get();
        if scroll > 0. {
            debug!("released with the content scrolled to {scroll}, handing off to momentum");
            self.set_phase(Phase::Idle);
            self.start_momentum(velocity);
            self.arm_compensation();
            return;
        }

        let extent = self.host.container_extent();
        let offset = self.offset.get();
        let target = self
            .snap
            .resolve(offset, velocity, extent, self.config.sheet.flick_threshold);
        debug!("released at {offset} with velocity {velocity}, resolved to {target:?}");

        self.set_phase(Phase::Releasing);
        match target {
            Some(target) => self.settle_at(target.index),
            None => self.dismiss(),
        }
    }

    /// The gesture was interrupted by the system; return to the current snap point.
    pub fn cancel(&mut self) {
        self.touching = false;
        self.tracker.reset();
        self.last_move_at = None;

        if matches!(self.phase, Phase::Idle | Phase::Releasing) {
            return;
        }

        debug!("gesture cancelled");
        self.set_phase(Phase::Releasing);
        self.settle_at(self.snap.current_index());
    }

    fn start_momentum(&mut self, velocity: f64) {
        let interval = self.move_interval.as_secs_f64();
        if interval <= 0. {
            return;
        }

        // The pointer moving toward open scrolls the content further.
        let velocity = -velocity / interval;
        let scroll = &self.config.scroll;
        let momentum = Animation::decelerate(
            self.clock.clone(),
            self.content_scroll.get(),
            velocity,
            scroll.deceleration_rate,
            scroll.stop_threshold,
        );
        if !momentum.is_done() {
            trace!("scroll momentum from {} to {}", momentum.from(), momentum.to());
            self.momentum = Some(momentum);
        }
    }
}
