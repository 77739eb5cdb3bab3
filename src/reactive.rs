//! Observable values shared between the sheet and its host.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

pub type Handler<T> = Rc<dyn Fn(&T)>;

/// A value that notifies its subscribers whenever it changes.
///
/// Clones are handles to the same cell. Handlers run synchronously, in registration order, with
/// no borrow of the cell held, so they are free to read or set this or any other cell.
pub struct ReactiveCell<T> {
    inner: Rc<RefCell<CellState<T>>>,
}

struct CellState<T> {
    value: T,
    previous: Option<T>,
    subscribers: Vec<(u64, Handler<T>)>,
    next_id: u64,
}

/// The handler passed to [`ReactiveCell::observe`] is already subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("handler is already subscribed to this value")]
pub struct DuplicateSubscriberError;

/// Registration of a handler on a [`ReactiveCell`].
///
/// Dropping it keeps the handler registered; call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    remove: Box<dyn FnOnce()>,
}

impl<T: Clone + PartialEq + 'static> ReactiveCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CellState {
                value,
                previous: None,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Value before the most recent successful set.
    pub fn previous(&self) -> Option<T> {
        self.inner.borrow().previous.clone()
    }

    /// Sets the value and notifies subscribers, unless it is equal to the current one.
    ///
    /// Returns whether subscribers were notified.
    pub fn set(&self, value: T) -> bool {
        self.store(value, false)
    }

    /// Sets the value and notifies subscribers even if it did not change.
    pub fn set_forced(&self, value: T) {
        self.store(value, true);
    }

    pub fn observe(
        &self,
        handler: Handler<T>,
        run_immediately: bool,
    ) -> Result<Subscription, DuplicateSubscriberError> {
        let id = {
            let mut state = self.inner.borrow_mut();
            if state
                .subscribers
                .iter()
                .any(|(_, existing)| same_handler(existing, &handler))
            {
                return Err(DuplicateSubscriberError);
            }

            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, handler.clone()));
            id
        };

        if run_immediately {
            let value = self.get();
            call_isolated(&handler, &value);
        }

        let weak: Weak<RefCell<CellState<T>>> = Rc::downgrade(&self.inner);
        Ok(Subscription {
            remove: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.retain(|(i, _)| *i != id);
                }
            }),
        })
    }

    /// Subscribes a fresh closure, which can never be a duplicate.
    pub fn observe_fn(&self, handler: impl Fn(&T) + 'static, run_immediately: bool) -> Subscription {
        let handler: Handler<T> = Rc::new(handler);
        let id = {
            let mut state = self.inner.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, handler.clone()));
            id
        };

        if run_immediately {
            let value = self.get();
            call_isolated(&handler, &value);
        }

        let weak = Rc::downgrade(&self.inner);
        Subscription {
            remove: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.borrow_mut().subscribers.retain(|(i, _)| *i != id);
                }
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub fn clear_subscribers(&self) {
        self.inner.borrow_mut().subscribers.clear();
    }

    fn store(&self, value: T, force: bool) -> bool {
        let (value, subscribers) = {
            let mut state = self.inner.borrow_mut();
            if !force && state.value == value {
                return false;
            }

            let previous = std::mem::replace(&mut state.value, value);
            state.previous = Some(previous);
            let handlers: Vec<_> = state.subscribers.iter().map(|(_, h)| h.clone()).collect();
            (state.value.clone(), handlers)
        };

        for handler in &subscribers {
            call_isolated(handler, &value);
        }
        true
    }
}

impl<T> Clone for ReactiveCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReactiveCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("ReactiveCell")
            .field("value", &state.value)
            .field("previous", &state.previous)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.remove)();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

fn same_handler<T>(a: &Handler<T>, b: &Handler<T>) -> bool {
    // Compare data pointers only; vtable pointers are not unique.
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

fn call_isolated<T>(handler: &Handler<T>, value: &T) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(value))) {
        error!("subscriber panicked: {}", panic_message(&*payload));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, Handler<T>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let handler: Handler<T> = {
            let seen = seen.clone();
            Rc::new(move |value: &T| seen.borrow_mut().push(value.clone()))
        };
        (seen, handler)
    }

    #[test]
    fn equal_value_is_a_noop_unless_forced() {
        let cell = ReactiveCell::new(5);
        let (seen, handler) = recorder();
        let _sub = cell.observe(handler, false).unwrap();

        assert!(!cell.set(5));
        assert!(seen.borrow().is_empty());
        assert_eq!(cell.previous(), None);

        cell.set_forced(5);
        assert_eq!(*seen.borrow(), [5]);
        assert_eq!(cell.previous(), Some(5));
    }

    #[test]
    fn previous_tracks_last_successful_set() {
        let cell = ReactiveCell::new(1);
        assert!(cell.set(2));
        assert!(cell.set(3));
        assert!(!cell.set(3));
        assert_eq!(cell.get(), 3);
        assert_eq!(cell.previous(), Some(2));
    }

    #[test]
    fn run_immediately_and_order() {
        let cell = ReactiveCell::new("a".to_owned());
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second"] {
            let log = log.clone();
            let _ = cell.observe_fn(
                move |v: &String| log.borrow_mut().push(format!("{name}:{v}")),
                true,
            );
        }
        cell.set("b".to_owned());
        assert_eq!(*log.borrow(), ["first:a", "second:a", "first:b", "second:b"]);
    }

    #[test]
    fn duplicate_handler_is_rejected() {
        let cell = ReactiveCell::new(0);
        let (_, handler) = recorder::<i32>();
        let _sub = cell.observe(handler.clone(), false).unwrap();
        assert_eq!(
            cell.observe(handler, false).unwrap_err(),
            DuplicateSubscriberError
        );
        assert_eq!(cell.subscriber_count(), 1);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let cell = ReactiveCell::new(0);
        let (seen, handler) = recorder();
        let sub = cell.observe(handler.clone(), false).unwrap();
        cell.set(1);
        sub.unsubscribe();
        cell.set(2);
        assert_eq!(*seen.borrow(), [1]);

        // The same handler may subscribe again once removed.
        assert!(cell.observe(handler, false).is_ok());
    }

    #[test]
    fn handlers_may_set_cells_reentrantly() {
        let a = ReactiveCell::new(0);
        let b = ReactiveCell::new(0);

        let _ = a.observe_fn(
            {
                let b = b.clone();
                move |v: &i32| {
                    b.set(*v * 10);
                }
            },
            false,
        );
        let _ = a.observe_fn(
            {
                let a = a.clone();
                move |v: &i32| {
                    // Clamp from inside the notification.
                    if *v > 5 {
                        a.set(5);
                    }
                }
            },
            false,
        );

        a.set(3);
        assert_eq!(b.get(), 30);

        a.set(9);
        assert_eq!(a.get(), 5);
        assert_eq!(b.get(), 50);
    }

    #[test]
    fn panicking_handler_is_isolated() {
        let cell = ReactiveCell::new(0);
        let _ = cell.observe_fn(|_: &i32| panic!("boom"), false);
        let count = Rc::new(Cell::new(0));
        let _ = cell.observe_fn(
            {
                let count = count.clone();
                move |_: &i32| count.set(count.get() + 1)
            },
            false,
        );

        cell.set(1);
        cell.set(2);
        assert_eq!(count.get(), 2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn clear_subscribers_on_teardown() {
        let cell = ReactiveCell::new(0);
        let (seen, handler) = recorder();
        let _sub = cell.observe(handler, false).unwrap();
        cell.clear_subscribers();
        cell.set(1);
        assert!(seen.borrow().is_empty());
        assert_eq!(cell.subscriber_count(), 0);
    }
}
