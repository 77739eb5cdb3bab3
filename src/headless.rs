//! A sheet host without a window system.
//!
//! [`HeadlessSurface`] plays the part of the element that renders the sheet: it animates offset
//! changes with the configured transitions using the animation engine, reports the transition
//! lifecycle the way a browser would, and exposes its position as a CSS transform. [`Simulation`]
//! wires it to a [`Sheet`] and drives both frame by frame.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use sheet_motion_config::{Config, Transitions};

use crate::animation::{Animation, Clock};
use crate::sheet::{Lifecycle, OverscrollBounce, Phase, Sheet, SheetHost};
use crate::speculation::{translate_y_from_css, RenderedOffset};
use crate::transition::TransitionMode;
use crate::utils::approx_eq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    TransitionStarted,
    TransitionEnded,
    TransitionCancelled,
}

pub struct HeadlessSurface {
    clock: Clock,
    transitions: Transitions,
    state: RefCell<SurfaceState>,
}

#[derive(Debug)]
struct SurfaceState {
    extent: f64,
    max_scroll: f64,
    scroll: f64,
    /// Offset the surface rests at once the running transition ends.
    offset: f64,
    transition: Option<Animation>,
    bounce: Option<(Duration, OverscrollBounce)>,
    events: VecDeque<SurfaceEvent>,
}

impl SurfaceState {
    fn base_offset(&self) -> f64 {
        self.transition
            .as_ref()
            .map_or(self.offset, Animation::value)
    }
}

impl HeadlessSurface {
    pub fn new(clock: Clock, transitions: Transitions, extent: f64, max_scroll: f64) -> Self {
        Self {
            clock,
            transitions,
            state: RefCell::new(SurfaceState {
                extent,
                max_scroll: max_scroll.max(0.),
                scroll: 0.,
                offset: extent,
                transition: None,
                bounce: None,
                events: VecDeque::new(),
            }),
        }
    }

    /// Starts rendering the cells of `sheet`.
    pub fn attach(self: &Rc<Self>, sheet: &Sheet) {
        let transition = sheet.transition().clone();
        let _ = sheet.offset().observe_fn(
            {
                let surface = self.clone();
                move |&offset: &f64| surface.offset_changed(offset, transition.get())
            },
            true,
        );

        let _ = sheet.bounce().observe_fn(
            {
                let surface = self.clone();
                move |bounce: &Option<OverscrollBounce>| {
                    let start = surface.clock.now();
                    surface.state.borrow_mut().bounce = bounce.clone().map(|b| (start, b));
                }
            },
            false,
        );
    }

    fn offset_changed(&self, offset: f64, mode: TransitionMode) {
        let mut state = self.state.borrow_mut();
        let current = state.base_offset();

        if let Some(running) = state.transition.take() {
            if !running.is_done() {
                state.events.push_back(SurfaceEvent::TransitionCancelled);
            }
        }

        state.offset = offset;
        match mode.animation(&self.transitions) {
            Some(config) if !approx_eq(current, offset) => {
                let animation = Animation::new(self.clock.clone(), current, offset, 0., config);
                trace!("surface animating {current} -> {offset} over {:?}", animation.duration());
                state.transition = Some(animation);
                state.events.push_back(SurfaceEvent::TransitionStarted);
            }
            _ => trace!("surface jumped to {offset}"),
        }
    }

    /// Finishes whatever completed by the current time.
    pub fn tick(&self) {
        let now = self.clock.now();
        let mut state = self.state.borrow_mut();

        if state.transition.as_ref().is_some_and(Animation::is_done) {
            state.transition = None;
            state.events.push_back(SurfaceEvent::TransitionEnded);
        }

        if let Some((start, bounce)) = &state.bounce {
            if bounce.displacement(now.saturating_sub(*start)).is_none() {
                state.bounce = None;
            }
        }
    }

    pub fn take_events(&self) -> Vec<SurfaceEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }

    pub fn is_transitioning(&self) -> bool {
        self.state.borrow().transition.is_some()
    }

    /// The computed transform, as a browser would report it.
    pub fn css_transform(&self) -> String {
        let now = self.clock.now();
        let state = self.state.borrow();
        let displacement = state
            .bounce
            .as_ref()
            .and_then(|(start, bounce)| bounce.displacement(now.saturating_sub(*start)))
            .unwrap_or(0.);
        let y = state.base_offset() + displacement;
        format!("matrix(1, 0, 0, 1, 0, {y})")
    }

    pub fn set_extent(&self, extent: f64) {
        self.state.borrow_mut().extent = extent;
    }

    /// Scrolls the content as the user would, returning the clamped scroll offset.
    pub fn user_scroll(&self, offset: f64) -> f64 {
        let mut state = self.state.borrow_mut();
        state.scroll = offset.clamp(0., state.max_scroll);
        state.scroll
    }

    pub fn scroll(&self) -> f64 {
        self.state.borrow().scroll
    }
}

impl RenderedOffset for HeadlessSurface {
    fn read_rendered_offset(&self) -> Option<f64> {
        translate_y_from_css(&self.css_transform())
    }
}

impl SheetHost for HeadlessSurface {
    fn container_extent(&self) -> f64 {
        self.state.borrow().extent
    }

    fn scroll_content_to(&self, offset: f64) -> f64 {
        self.user_scroll(offset)
    }

    fn max_content_scroll(&self) -> f64 {
        self.state.borrow().max_scroll
    }
}

/// The state of a simulation after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRecord {
    pub at: Duration,
    pub offset: f64,
    pub rendered: Option<f64>,
    pub mode: TransitionMode,
    pub scroll: f64,
    pub phase: Phase,
}

/// A sheet rendered on a headless surface, with dismissal wired to the exit sequence.
pub struct Simulation {
    clock: Clock,
    surface: Rc<HeadlessSurface>,
    sheet: Sheet,
    dismiss_requested: Rc<Cell<bool>>,
    removed: Rc<Cell<bool>>,
}

impl Simulation {
    pub fn new(config: Config, extent: f64, max_scroll: f64) -> Self {
        let mut clock = Clock::with_time(Duration::ZERO);
        if config.slowdown > 0. {
            clock.set_rate(1. / config.slowdown);
        }

        let surface = Rc::new(HeadlessSurface::new(
            clock.clone(),
            config.transitions,
            extent,
            max_scroll,
        ));
        let mut sheet = Sheet::new(config, clock.clone(), surface.clone());
        surface.attach(&sheet);

        let dismiss_requested = Rc::new(Cell::new(false));
        sheet.set_on_dismiss({
            let dismiss_requested = dismiss_requested.clone();
            move || dismiss_requested.set(true)
        });

        Self {
            clock,
            surface,
            sheet,
            dismiss_requested,
            removed: Rc::new(Cell::new(false)),
        }
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    pub fn sheet_mut(&mut self) -> &mut Sheet {
        &mut self.sheet
    }

    pub fn surface(&self) -> &HeadlessSurface {
        &self.surface
    }

    pub fn now(&self) -> Duration {
        self.clock.now_unadjusted()
    }

    /// Whether the exit sequence reported that the sheet can be removed.
    pub fn is_removed(&self) -> bool {
        self.removed.get()
    }

    pub fn mount(&mut self) {
        self.sheet.mount();
        self.flush();
    }

    pub fn exit(&mut self) {
        let removed = self.removed.clone();
        self.sheet.exit(move || removed.set(true));
        self.flush();
    }

    /// Renders a frame at `at`.
    pub fn frame(&mut self, at: Duration) -> FrameRecord {
        self.clock.set_unadjusted(at);
        self.surface.tick();
        self.flush();
        self.sheet.on_frame();
        self.flush();
        self.record()
    }

    /// Renders frames every `interval` up to and including `until`.
    pub fn run_until(&mut self, until: Duration, interval: Duration) -> Vec<FrameRecord> {
        let mut records = Vec::new();
        if interval.is_zero() {
            return records;
        }

        let mut at = self.now();
        while at < until {
            at = (at + interval).min(until);
            records.push(self.frame(at));
        }
        records
    }

    pub fn press(&mut self, y: f64) {
        self.sheet.press(y);
        self.flush();
    }

    pub fn pointer_move(&mut self, y: f64) {
        self.sheet.pointer_move(y);
        self.flush();
    }

    pub fn release(&mut self) {
        self.sheet.release();
        self.flush();
    }

    pub fn cancel(&mut self) {
        self.sheet.cancel();
        self.flush();
    }

    /// Scrolls the content to `offset` as the user would.
    pub fn scroll(&mut self, offset: f64) {
        let applied = self.surface.user_scroll(offset);
        self.sheet.scroll_changed(applied);
        self.flush();
    }

    pub fn navigate(&mut self, index: usize) -> bool {
        let navigated = self.sheet.navigate(index);
        self.flush();
        navigated
    }

    pub fn backdrop_click(&mut self) {
        self.sheet.backdrop_clicked();
        self.flush();
    }

    pub fn resize(&mut self, extent: f64) {
        self.surface.set_extent(extent);
        self.sheet.container_resized();
        self.flush();
    }

    pub fn panel_resized(&mut self, height: f64) {
        self.sheet.panel_resized(height);
        self.flush();
    }

    pub fn record(&self) -> FrameRecord {
        FrameRecord {
            at: self.now(),
            offset: self.sheet.offset().get(),
            rendered: self.surface.read_rendered_offset(),
            mode: self.sheet.transition().get(),
            scroll: self.sheet.content_scroll().get(),
            phase: self.sheet.phase(),
        }
    }

    /// Delivers surface events and dismiss requests until none are left.
    fn flush(&mut self) {
        loop {
            let events = self.surface.take_events();
            let dismiss = self.dismiss_requested.replace(false);
            if events.is_empty() && !dismiss {
                break;
            }

            for event in events {
                match event {
                    SurfaceEvent::TransitionStarted => self.sheet.transition_started(),
                    SurfaceEvent::TransitionEnded => self.sheet.transition_ended(),
                    SurfaceEvent::TransitionCancelled => self.sheet.transition_cancelled(),
                }
            }

            if dismiss && self.sheet.lifecycle() == Lifecycle::Mounted {
                debug!("dismiss requested, starting exit");
                self.exit();
            }
        }
    }
}
