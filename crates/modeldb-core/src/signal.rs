#![forbid(unsafe_code)]

//! Synchronous change signal shared by every observable container.
//!
//! # Design
//!
//! A [`Signal<S, A>`] is an ordered list of subscriber callbacks invoked with
//! `(&sender, &args)`. Callbacks are owned by the [`Subscription`] guard
//! returned from [`Signal::connect`]; the signal itself only keeps `Weak`
//! references, so dropping the guard is all it takes to unsubscribe.
//!
//! # Invariants
//!
//! 1. Subscribers are invoked in registration order.
//! 2. Delivery is synchronous: `emit` returns only after every live callback
//!    has run. Nothing is queued.
//! 3. No internal borrow is held while a callback runs, so a callback may
//!    mutate the sender or connect new subscribers.
//! 4. Once [`Signal::close`] has been called, `emit` never invokes anything
//!    again and `connect` hands back an inert guard.
//!
//! # Failure Modes
//!
//! - **Subscriber leak**: guards that are stored forever keep their callbacks
//!   alive. Dead weak references are pruned lazily on the next `emit`.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type SlotRc<S, A> = Rc<dyn Fn(&S, &A)>;
type SlotWeak<S, A> = Weak<dyn Fn(&S, &A)>;

/// A synchronous publish/subscribe channel carrying `(sender, args)` pairs.
pub struct Signal<S, A> {
    slots: RefCell<Vec<SlotWeak<S, A>>>,
    closed: Cell<bool>,
}

impl<S, A> fmt::Debug for Signal<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.slots.borrow().len())
            .field("closed", &self.closed.get())
            .finish()
    }
}

impl<S: 'static, A: 'static> Default for Signal<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static, A: 'static> Signal<S, A> {
    /// Create an open signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            closed: Cell::new(false),
        }
    }

    /// Register a callback. It stays connected until the returned
    /// [`Subscription`] is dropped or the signal is closed.
    pub fn connect(&self, callback: impl Fn(&S, &A) + 'static) -> Subscription {
        let strong: SlotRc<S, A> = Rc::new(callback);
        if !self.closed.get() {
            self.slots.borrow_mut().push(Rc::downgrade(&strong));
        }
        Subscription {
            _guard: Box::new(strong),
        }
    }

    /// Deliver `args` to every live subscriber, in registration order.
    pub fn emit(&self, sender: &S, args: &A) {
        if self.closed.get() {
            return;
        }
        // Snapshot first: callbacks run with no borrow held.
        let live: Vec<SlotRc<S, A>> = {
            let mut slots = self.slots.borrow_mut();
            slots.retain(|w| w.strong_count() > 0);
            slots.iter().filter_map(Weak::upgrade).collect()
        };
        tracing::trace!(subscribers = live.len(), "signal emit");
        for slot in &live {
            // A subscriber may have disposed the sender.
            if self.closed.get() {
                break;
            }
            slot(sender, args);
        }
    }

    /// Drop every registered subscriber. The signal stays usable.
    pub fn disconnect_all(&self) {
        self.slots.borrow_mut().clear();
    }

    /// Permanently silence the signal and drop every subscriber.
    pub fn close(&self) {
        self.closed.set(true);
        self.disconnect_all();
    }

    /// Whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slots.borrow().len()
    }
}

/// RAII guard for a connected callback.
///
/// Dropping the guard drops the only strong reference to the callback, so the
/// signal's weak entry fails to upgrade from then on.
#[must_use = "dropping a Subscription disconnects the callback immediately"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_sender_and_args() {
        let signal: Signal<&'static str, u32> = Signal::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let _sub = signal.connect(move |sender, args| {
            seen_clone.borrow_mut().push((*sender, *args));
        });

        signal.emit(&"list", &7);
        assert_eq!(*seen.borrow(), vec![("list", 7)]);
    }

    #[test]
    fn registration_order() {
        let signal: Signal<(), ()> = Signal::new();
        let log = Rc::new(RefCell::new(String::new()));
        let subs: Vec<Subscription> = ['a', 'b', 'c']
            .into_iter()
            .map(|c| {
                let log = Rc::clone(&log);
                signal.connect(move |_, _| log.borrow_mut().push(c))
            })
            .collect();

        signal.emit(&(), &());
        assert_eq!(*log.borrow(), "abc");
        drop(subs);
    }

    #[test]
    fn dropping_guard_unsubscribes() {
        let signal: Signal<(), ()> = Signal::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let sub = signal.connect(move |_, _| count_clone.set(count_clone.get() + 1));

        signal.emit(&(), &());
        drop(sub);
        signal.emit(&(), &());

        assert_eq!(count.get(), 1);
        // Pruned on the emit above.
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn closed_signal_is_silent() {
        let signal: Signal<(), ()> = Signal::new();
        let count = Rc::new(Cell::new(0));
        let count_clone = Rc::clone(&count);
        let _sub = signal.connect(move |_, _| count_clone.set(count_clone.get() + 1));

        signal.close();
        signal.emit(&(), &());
        assert_eq!(count.get(), 0);

        let count_clone = Rc::clone(&count);
        let _late = signal.connect(move |_, _| count_clone.set(count_clone.get() + 1));
        signal.emit(&(), &());
        assert_eq!(count.get(), 0);
        assert!(signal.is_closed());
    }

    #[test]
    fn connect_during_emit_is_allowed() {
        let signal: Rc<Signal<(), ()>> = Rc::new(Signal::new());
        let late_subs = Rc::new(RefCell::new(Vec::new()));
        let signal_clone = Rc::clone(&signal);
        let late_clone = Rc::clone(&late_subs);
        let _sub = signal.connect(move |_, _| {
            late_clone.borrow_mut().push(signal_clone.connect(|_, _| {}));
        });

        signal.emit(&(), &());
        assert_eq!(signal.subscriber_count(), 2);
    }

    #[test]
    fn close_from_inside_callback_stops_delivery() {
        let signal: Rc<Signal<(), ()>> = Rc::new(Signal::new());
        let count = Rc::new(Cell::new(0));

        let signal_clone = Rc::clone(&signal);
        let _first = signal.connect(move |_, _| signal_clone.close());
        let count_clone = Rc::clone(&count);
        let _second = signal.connect(move |_, _| count_clone.set(count_clone.get() + 1));

        signal.emit(&(), &());
        assert_eq!(count.get(), 0);
    }
}
