//! The draggable sheet.
//!
//! A [`Sheet`] turns raw pointer and scroll input into an offset and a [`TransitionMode`] for its
//! host to render. Both are published through [`ReactiveCell`]s; the host applies them to the
//! surface and reports back the lifecycle of the transitions it runs.
//!
//! Time only moves when the host calls [`Sheet::on_frame`]. Work that has to wait for the next
//! frame (the second half of the enter and exit sequences, the overscroll bounce), the scroll
//! momentum and the scroll compensation debounce are all driven from there.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use sheet_motion_config::Config;

use crate::animation::{Animation, Clock};
use crate::movement::MovementTracker;
use crate::reactive::{ReactiveCell, Subscription};
use crate::snap::SnapControl;
use crate::speculation::{ActiveTransitionTracker, PositionSpeculator, RenderedOffset};
use crate::transition::TransitionMode;

mod gesture;
mod scroll;

pub use gesture::{applies_resistance, GestureState, Phase};
pub use scroll::OverscrollBounce;
use scroll::{BounceDetector, Compensation};

/// What the sheet needs from the surface that renders it.
pub trait SheetHost: RenderedOffset {
    /// Extent of the container along the drag axis.
    ///
    /// Read every time it is needed, since it can change between gestures.
    fn container_extent(&self) -> f64;

    /// Scrolls the sheet content, returning the offset actually applied after clamping.
    ///
    /// Scrolls requested through this method must not be reported back through
    /// [`Sheet::scroll_changed`].
    fn scroll_content_to(&self, offset: f64) -> f64;

    /// Largest scroll offset the content can reach; zero when it fits without scrolling.
    fn max_content_scroll(&self) -> f64;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but not mounted yet.
    #[default]
    Detached,
    Mounted,
    Exiting,
    /// The exit finished or the sheet was unmounted.
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameTask {
    /// Second half of the enter sequence: move to the current snap point.
    Enter,
    /// Second half of the exit sequence: move out of the container.
    Exit,
    /// Finishes the exit if no transition started since the given generation.
    ConfirmExit { generation: u64 },
    /// Ends a release whose snap point needed no transition.
    ConfirmSettled { generation: u64 },
    StartBounce { velocity: f64 },
}

pub struct Sheet {
    config: Config,
    clock: Clock,
    host: Rc<dyn SheetHost>,
    snap: SnapControl,

    offset: ReactiveCell<f64>,
    transition: ReactiveCell<TransitionMode>,
    can_scroll: ReactiveCell<bool>,
    content_scroll: ReactiveCell<f64>,
    shadow_height: ReactiveCell<f64>,
    bounce: ReactiveCell<Option<OverscrollBounce>>,

    lifecycle: Rc<Cell<Lifecycle>>,
    phase: Phase,
    /// Whether a pointer is down, including presses that missed the panel.
    touching: bool,
    tracker: MovementTracker,
    last_move_at: Option<Duration>,
    move_interval: Duration,

    transitions: ActiveTransitionTracker,
    speculator: PositionSpeculator,
    offset_changed_at: Rc<Cell<Duration>>,

    frame_tasks: Vec<FrameTask>,
    /// Handlers the sheet registered on its own cells.
    subscriptions: Vec<Subscription>,
    momentum: Option<Animation>,
    compensation: Option<Compensation>,
    bounce_detector: BounceDetector,

    on_dismiss: Option<Box<dyn FnMut()>>,
    safe_to_remove: Option<Box<dyn FnOnce()>>,
    /// Transition generation when the sheet started moving out.
    exit_generation: Option<u64>,
}

impl Sheet {
    pub fn new(config: Config, clock: Clock, host: Rc<dyn SheetHost>) -> Self {
        let snap = SnapControl::new(config.sheet.snap_points.clone(), config.sheet.initial_index);
        let speculator = PositionSpeculator::from_config(&config.speculation);

        let offset = ReactiveCell::new(host.container_extent());
        let transition = ReactiveCell::new(TransitionMode::Instant);
        let can_scroll = ReactiveCell::new(false);
        let bounce = ReactiveCell::new(None);
        let lifecycle = Rc::new(Cell::new(Lifecycle::Detached));
        let offset_changed_at = Rc::new(Cell::new(clock.now()));

        // Timestamp every offset change for speculation; any change also ends the bounce.
        let on_offset = offset.observe_fn(
            {
                let clock = clock.clone();
                let changed_at = offset_changed_at.clone();
                let bounce = bounce.clone();
                move |_: &f64| {
                    changed_at.set(clock.now());
                    bounce.set(None);
                }
            },
            false,
        );

        // Navigation re-applies the snap point even if the index did not change.
        let on_navigate = snap.index().observe_fn(
            {
                let snap = snap.clone();
                let host = host.clone();
                let offset = offset.clone();
                let transition = transition.clone();
                let can_scroll = can_scroll.clone();
                let lifecycle = lifecycle.clone();
                move |&index: &usize| {
                    if lifecycle.get() != Lifecycle::Mounted {
                        return;
                    }

                    let extent = host.container_extent();
                    let Some(target) = snap.offset_of(index, extent) else {
                        return;
                    };
                    transition.set(TransitionMode::Resting);
                    offset.set_forced(target);
                    can_scroll.set(snap.is_at_most_open(extent));
                }
            },
            false,
        );

        Self {
            config,
            clock,
            host,
            snap,
            offset,
            transition,
            can_scroll,
            content_scroll: ReactiveCell::new(0.),
            shadow_height: ReactiveCell::new(0.),
            bounce,
            lifecycle,
            phase: Phase::Idle,
            touching: false,
            tracker: MovementTracker::new(),
            last_move_at: None,
            move_interval: Duration::ZERO,
            transitions: ActiveTransitionTracker::new(),
            speculator,
            offset_changed_at,
            frame_tasks: Vec::new(),
            subscriptions: vec![on_offset, on_navigate],
            momentum: None,
            compensation: None,
            bounce_detector: BounceDetector::default(),
            on_dismiss: None,
            safe_to_remove: None,
            exit_generation: None,
        }
    }

    /// Sets the callback invoked when a gesture or a backdrop click asks to dismiss the sheet.
    ///
    /// The callback is expected to start the exit sequence with [`Sheet::exit`] once the current
    /// input handler returns.
    pub fn set_on_dismiss(&mut self, on_dismiss: impl FnMut() + 'static) {
        self.on_dismiss = Some(Box::new(on_dismiss));
    }

    /// Distance of the sheet's leading edge from the open edge of the container.
    pub fn offset(&self) -> &ReactiveCell<f64> {
        &self.offset
    }

    pub fn transition(&self) -> &ReactiveCell<TransitionMode> {
        &self.transition
    }

    /// Whether the content may scroll; true only while resting at the most open snap point.
    pub fn can_scroll(&self) -> &ReactiveCell<bool> {
        &self.can_scroll
    }

    pub fn content_scroll(&self) -> &ReactiveCell<f64> {
        &self.content_scroll
    }

    /// Size of the panel, for the element that holds its place in the layout.
    pub fn shadow_height(&self) -> &ReactiveCell<f64> {
        &self.shadow_height
    }

    pub fn bounce(&self) -> &ReactiveCell<Option<OverscrollBounce>> {
        &self.bounce
    }

    pub fn snap(&self) -> &SnapControl {
        &self.snap
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.get()
    }

    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn has_momentum(&self) -> bool {
        self.momentum.is_some()
    }

    pub fn navigate(&self, index: usize) -> bool {
        self.snap.navigate(index)
    }

    /// Starts the enter sequence.
    ///
    /// The sheet is placed just outside the container right away and moves to its snap point
    /// on the next frame.
    pub fn mount(&mut self) {
        if self.lifecycle.get() != Lifecycle::Detached {
            warn!("ignoring mount of a sheet that is {:?}", self.lifecycle.get());
            return;
        }

        debug!("mounting");
        self.lifecycle.set(Lifecycle::Mounted);
        self.transition.set(TransitionMode::Instant);
        self.commit_offset(self.host.container_extent());
        self.frame_tasks.push(FrameTask::Enter);
    }

    /// Starts the exit sequence.
    ///
    /// `safe_to_remove` is invoked once the exit transition ends, or on the frame after the sheet
    /// moved out if no transition started at all.
    pub fn exit(&mut self, safe_to_remove: impl FnOnce() + 'static) {
        match self.lifecycle.get() {
            Lifecycle::Mounted => (),
            Lifecycle::Detached => {
                // Never shown, nothing to animate.
                self.lifecycle.set(Lifecycle::Removed);
                safe_to_remove();
                return;
            }
            Lifecycle::Exiting | Lifecycle::Removed => {
                debug!("ignoring exit of a sheet that is {:?}", self.lifecycle.get());
                return;
            }
        }

        debug!("exiting");
        self.lifecycle.set(Lifecycle::Exiting);
        self.safe_to_remove = Some(Box::new(safe_to_remove));

        self.phase = Phase::Idle;
        self.tracker.reset();
        self.momentum = None;
        self.compensation = None;
        self.frame_tasks
            .retain(|task| !matches!(task, FrameTask::Enter));

        self.transition.set(TransitionMode::Exiting);
        self.frame_tasks.push(FrameTask::Exit);
    }

    /// Tears the sheet down, dropping every subscriber and pending task.
    pub fn unmount(&mut self) {
        debug!("unmounting");
        self.lifecycle.set(Lifecycle::Removed);
        self.phase = Phase::Idle;
        self.frame_tasks.clear();
        self.momentum = None;
        self.compensation = None;
        self.safe_to_remove = None;
        self.unsubscribe();
        self.clear_host_subscribers();
    }

    pub fn panel_resized(&mut self, height: f64) {
        if height.is_finite() && height >= 0. {
            self.shadow_height.set(height);
        }
    }

    /// Re-applies the current snap point after the container changed size.
    pub fn container_resized(&mut self) {
        if self.lifecycle.get() != Lifecycle::Mounted || self.phase != Phase::Idle {
            return;
        }

        let extent = self.host.container_extent();
        if let Some(target) = self.snap.current_offset(extent) {
            self.transition.set(TransitionMode::Instant);
            self.commit_offset(target);
            self.can_scroll.set(self.snap.is_at_most_open(extent));
        }
    }

    /// A click outside of the panel.
    pub fn backdrop_clicked(&mut self) {
        if self.lifecycle.get() == Lifecycle::Mounted {
            debug!("backdrop clicked, dismissing");
            self.dismiss();
        }
    }

    /// The host started running a transition (CSS `transitionrun` or `transitionstart`).
    pub fn transition_started(&mut self) {
        self.transitions.transition_started();
    }

    pub fn transition_ended(&mut self) {
        self.transitions.transition_ended();
        self.transition_finished();
    }

    pub fn transition_cancelled(&mut self) {
        self.transitions.transition_cancelled();
        self.transition_finished();
    }

    /// Advances deferred work; call once per frame after updating the clock.
    pub fn on_frame(&mut self) {
        let tasks = std::mem::take(&mut self.frame_tasks);
        for task in tasks {
            self.run_frame_task(task);
        }

        self.advance_momentum();
        self.advance_compensation();
    }

    fn run_frame_task(&mut self, task: FrameTask) {
        trace!("running frame task {task:?}");
        let extent = self.host.container_extent();

        match task {
            FrameTask::Enter => {
                if self.lifecycle.get() != Lifecycle::Mounted {
                    return;
                }
                self.transition.set(TransitionMode::Entering);
                if let Some(target) = self.snap.current_offset(extent) {
                    self.commit_offset(target);
                }
                self.can_scroll.set(self.snap.is_at_most_open(extent));
            }
            FrameTask::Exit => {
                if self.lifecycle.get() != Lifecycle::Exiting {
                    return;
                }
                self.can_scroll.set(false);
                let generation = self.transitions.generation();
                self.exit_generation = Some(generation);
                self.commit_offset_forced(extent);
                self.frame_tasks.push(FrameTask::ConfirmExit { generation });
            }
            FrameTask::ConfirmExit { generation } => {
                if self.lifecycle.get() == Lifecycle::Exiting
                    && self.transitions.generation() == generation
                    && !self.transitions.is_active()
                {
                    debug!("no exit transition started, finishing exit");
                    self.finish_exit();
                }
            }
            FrameTask::ConfirmSettled { generation } => {
                if self.phase == Phase::Releasing
                    && self.transitions.generation() == generation
                    && !self.transitions.is_active()
                {
                    debug!("release started no transition, already at the snap point");
                    self.set_phase(Phase::Idle);
                }
            }
            FrameTask::StartBounce { velocity } => self.start_bounce(velocity),
        }
    }

    /// Moves to the snap point at `index`, leaving the release phase once it is there.
    fn settle_at(&mut self, index: usize) {
        let generation = self.transitions.generation();
        self.snap.navigate(index);
        self.frame_tasks
            .push(FrameTask::ConfirmSettled { generation });
    }

    fn transition_finished(&mut self) {
        if self.phase == Phase::Releasing {
            self.set_phase(Phase::Idle);
        }

        // Only a transition started by the exit itself finishes it.
        let exit_started = self
            .exit_generation
            .is_some_and(|generation| self.transitions.generation() > generation);
        if self.lifecycle.get() == Lifecycle::Exiting && exit_started {
            self.finish_exit();
        }
    }

    fn finish_exit(&mut self) {
        self.lifecycle.set(Lifecycle::Removed);
        self.frame_tasks.clear();
        if let Some(safe_to_remove) = self.safe_to_remove.take() {
            debug!("exit finished, safe to remove");
            safe_to_remove();
        }
    }

    fn dismiss(&mut self) {
        if let Some(on_dismiss) = &mut self.on_dismiss {
            on_dismiss();
        } else {
            debug!("no dismiss handler, returning to the current snap point");
            self.settle_at(self.snap.current_index());
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            trace!("phase {:?} -> {phase:?}", self.phase);
            self.phase = phase;
        }
    }

    /// Publishes a new offset, dropping values that are not finite.
    fn commit_offset(&self, value: f64) {
        if value.is_finite() {
            self.offset.set(value);
        } else {
            warn!("dropping non-finite offset {value}");
        }
    }

    fn commit_offset_forced(&self, value: f64) {
        if value.is_finite() {
            self.offset.set_forced(value);
        } else {
            warn!("dropping non-finite offset {value}");
        }
    }

    fn unsubscribe(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
    }

    /// Drops whatever the host still has registered on the published cells.
    fn clear_host_subscribers(&self) {
        self.offset.clear_subscribers();
        self.transition.clear_subscribers();
        self.can_scroll.clear_subscribers();
        self.content_scroll.clear_subscribers();
        self.shadow_height.clear_subscribers();
        self.bounce.clear_subscribers();
        self.snap.index().clear_subscribers();
    }
}

impl Drop for Sheet {
    fn drop(&mut self) {
        // The navigation handler holds a handle to the snap control it is registered on.
        self.unsubscribe();
    }
}
