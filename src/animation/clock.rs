use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::utils::get_monotonic_time;

/// Shared frame clock for one sheet and its host.
///
/// The clock fetches the monotonic time once and then holds it until [`Clock::clear`] is called
/// (normally at the start of every frame), so everything computed within one frame agrees on
/// "now". The rate can be lowered to slow down every animation driven by this clock.
#[derive(Debug, Default, Clone)]
pub struct Clock {
    inner: Rc<RefCell<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    /// Raw time for the current frame, if it was fetched or set.
    frame_time: Option<Duration>,
    /// Raw time that `adjusted_time` corresponds to.
    last_raw_time: Duration,
    /// Time as seen by animations, with the rate applied.
    adjusted_time: Duration,
    rate: f64,
    complete_instantly: bool,
}

impl Clock {
    /// Creates a clock frozen at the given time, until it is cleared or set.
    pub fn with_time(time: Duration) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ClockState::new(Some(time)))),
        }
    }

    /// Returns the current time, adjusted for the rate.
    pub fn now(&self) -> Duration {
        self.inner.borrow_mut().adjusted_now()
    }

    /// Returns the current time, not adjusted for the rate.
    pub fn now_unadjusted(&self) -> Duration {
        self.inner.borrow_mut().raw_now()
    }

    /// Sets the raw time of the current frame.
    pub fn set_unadjusted(&mut self, time: Duration) {
        self.inner.borrow_mut().frame_time = Some(time);
    }

    /// Moves the raw time of the current frame forward.
    pub fn advance(&mut self, by: Duration) {
        let mut state = self.inner.borrow_mut();
        let now = state.raw_now();
        state.frame_time = Some(now.saturating_add(by));
    }

    /// Forgets the stored frame time so that it's fetched again next time.
    pub fn clear(&mut self) {
        self.inner.borrow_mut().frame_time = None;
    }

    pub fn rate(&self) -> f64 {
        self.inner.borrow().rate
    }

    /// Sets the clock rate, clamped to `[0, 1000]`.
    pub fn set_rate(&mut self, rate: f64) {
        let mut state = self.inner.borrow_mut();
        // Bring the adjusted time up to date so that the new rate only affects the future.
        state.adjusted_now();
        state.rate = rate.clamp(0., 1000.);
    }

    pub fn should_complete_instantly(&self) -> bool {
        self.inner.borrow().complete_instantly
    }

    pub fn set_complete_instantly(&mut self, value: bool) {
        self.inner.borrow_mut().complete_instantly = value;
    }
}

impl PartialEq for Clock {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Clock {}

impl Default for ClockState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ClockState {
    fn new(frame_time: Option<Duration>) -> Self {
        let mut state = Self {
            frame_time,
            last_raw_time: Duration::ZERO,
            adjusted_time: Duration::ZERO,
            rate: 1.,
            complete_instantly: false,
        };
        let now = state.raw_now();
        state.last_raw_time = now;
        state.adjusted_time = now;
        state
    }

    fn raw_now(&mut self) -> Duration {
        *self.frame_time.get_or_insert_with(get_monotonic_time)
    }

    fn adjusted_now(&mut self) -> Duration {
        let raw = self.raw_now();
        if raw == self.last_raw_time {
            return self.adjusted_time;
        }

        if self.last_raw_time < raw {
            let delta = (raw - self.last_raw_time).mul_f64(self.rate);
            self.adjusted_time = self.adjusted_time.saturating_add(delta);
        } else {
            let delta = (self.last_raw_time - raw).mul_f64(self.rate);
            self.adjusted_time = self.adjusted_time.saturating_sub(delta);
        }

        self.last_raw_time = raw;
        self.adjusted_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_until_set() {
        let mut clock = Clock::with_time(Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);
        assert_eq!(clock.now(), Duration::ZERO);

        clock.set_unadjusted(Duration::from_millis(16));
        assert_eq!(clock.now(), Duration::from_millis(16));

        clock.advance(Duration::from_millis(16));
        assert_eq!(clock.now(), Duration::from_millis(32));
    }

    #[test]
    fn clones_share_time() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let other = clock.clone();
        assert_eq!(clock, other);

        clock.set_unadjusted(Duration::from_millis(100));
        assert_eq!(other.now(), Duration::from_millis(100));
        assert_ne!(clock, Clock::with_time(Duration::ZERO));
    }

    #[test]
    fn slowdown_applies_from_the_moment_it_is_set() {
        let mut clock = Clock::with_time(Duration::ZERO);
        clock.set_unadjusted(Duration::from_millis(100));
        clock.set_rate(0.5);

        clock.set_unadjusted(Duration::from_millis(200));
        assert_eq!(clock.now_unadjusted(), Duration::from_millis(200));
        assert_eq!(clock.now(), Duration::from_millis(150));

        clock.set_unadjusted(Duration::from_millis(150));
        assert_eq!(clock.now(), Duration::from_millis(125));

        clock.set_rate(2.);
        clock.set_unadjusted(Duration::from_millis(250));
        assert_eq!(clock.now(), Duration::from_millis(325));
    }
}
