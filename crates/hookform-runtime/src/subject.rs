#![forbid(unsafe_code)]

//! Synchronous multicast channel.
//!
//! A [`Subject`] pushes each value to every current observer, in subscription
//! order, before [`next`](Subject::next) returns. The form uses one subject
//! for state deltas and one for value changes.
//!
//! # Invariants
//!
//! 1. Observers are called in subscription order.
//! 2. No replay: an observer added during or after a `next` never sees that
//!    value.
//! 3. A delivery runs over the observers present when it started. Removing an
//!    observer mid-delivery does not disturb that delivery but excludes the
//!    observer from every later one.
//! 4. A panicking observer is logged and skipped; the rest still receive the
//!    value.
//! 5. Unsubscribing twice, or after [`teardown`](Subject::teardown), does
//!    nothing.
//!
//! # Ownership
//!
//! The subject keeps only `Weak` references to observers. The strong
//! reference lives in the [`Subscription`]; dropping it unsubscribes. Dead
//! entries are pruned after each delivery.

use std::cell::RefCell;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use tracing::warn;

type Observer<T> = dyn Fn(&T);

struct Entry<T> {
    id: u64,
    observer: Weak<Observer<T>>,
}

struct SubjectInner<T> {
    next_id: u64,
    observers: Vec<Entry<T>>,
}

impl<T> SubjectInner<T> {
    fn remove(&mut self, id: u64) {
        self.observers.retain(|entry| entry.id != id);
    }
}

/// Multicast channel. Cloning yields another handle to the same channel.
pub struct Subject<T> {
    inner: Rc<RefCell<SubjectInner<T>>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SubjectInner {
                next_id: 0,
                observers: Vec::new(),
            })),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl<T: 'static> Subject<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`. It stays registered while the returned
    /// [`Subscription`] is alive.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, observer: impl Fn(&T) + 'static) -> Subscription {
        let observer: Rc<Observer<T>> = Rc::new(observer);
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.observers.push(Entry {
                id,
                observer: Rc::downgrade(&observer),
            });
            id
        };

        let subject = Rc::downgrade(&self.inner);
        Subscription {
            unsubscribe: Some(Box::new(move || {
                if let Some(inner) = subject.upgrade() {
                    inner.borrow_mut().remove(id);
                }
                drop(observer);
            })),
        }
    }

    /// Deliver `value` to every current observer.
    pub fn next(&self, value: &T) {
        let targets: Vec<Rc<Observer<T>>> = self
            .inner
            .borrow()
            .observers
            .iter()
            .filter_map(|entry| entry.observer.upgrade())
            .collect();

        for (position, observer) in targets.iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| observer(value))) {
                warn!(
                    observer = position,
                    reason = panic_message(payload.as_ref()),
                    "subject observer panicked; continuing delivery"
                );
            }
        }
        drop(targets);

        self.inner
            .borrow_mut()
            .observers
            .retain(|entry| entry.observer.strong_count() > 0);
    }

    /// Drop every observer. Existing subscriptions become inert.
    pub fn teardown(&self) {
        self.inner.borrow_mut().observers.clear();
    }
}

impl<T> Subject<T> {
    /// Live observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner
            .borrow()
            .observers
            .iter()
            .filter(|entry| entry.observer.strong_count() > 0)
            .count()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

/// Handle for one observer. Unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Stop receiving values. Calling this again is a no-op.
    pub fn unsubscribe(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(&i32) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |v: &i32| sink.borrow_mut().push(*v))
    }

    #[test]
    fn delivers_in_subscription_order() {
        let subject = Subject::<i32>::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&order), Rc::clone(&order));
        let _s1 = subject.subscribe(move |v| a.borrow_mut().push(("first", *v)));
        let _s2 = subject.subscribe(move |v| b.borrow_mut().push(("second", *v)));

        subject.next(&7);

        assert_eq!(*order.borrow(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn unsubscribe_stops_delivery_and_is_idempotent() {
        let subject = Subject::<i32>::new();
        let (log, observer) = recorder();
        let mut sub = subject.subscribe(observer);

        subject.next(&1);
        sub.unsubscribe();
        subject.next(&2);
        sub.unsubscribe();

        assert_eq!(*log.borrow(), vec![1]);
        assert!(!sub.is_active());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn drop_unsubscribes() {
        let subject = Subject::<i32>::new();
        let (log, observer) = recorder();
        {
            let _sub = subject.subscribe(observer);
            subject.next(&1);
        }
        subject.next(&2);
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn no_replay_for_late_subscribers() {
        let subject = Subject::<i32>::new();
        subject.next(&1);
        let (log, observer) = recorder();
        let _sub = subject.subscribe(observer);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn panicking_observer_is_isolated() {
        let subject = Subject::<i32>::new();
        let _bad = subject.subscribe(|_| panic!("observer failure"));
        let (log, observer) = recorder();
        let _good = subject.subscribe(observer);

        subject.next(&3);
        subject.next(&4);

        assert_eq!(*log.borrow(), vec![3, 4]);
        assert_eq!(subject.observer_count(), 2);
    }

    #[test]
    fn unsubscribe_during_delivery_keeps_running_delivery() {
        let subject = Subject::<i32>::new();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&victim);
        let _killer = subject.subscribe(move |_| {
            if let Some(mut sub) = slot.borrow_mut().take() {
                sub.unsubscribe();
            }
        });
        let (log, observer) = recorder();
        *victim.borrow_mut() = Some(subject.subscribe(observer));

        subject.next(&1);
        subject.next(&2);

        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(subject.observer_count(), 1);
    }

    #[test]
    fn subscribe_during_delivery_waits_for_next_value() {
        let subject = Subject::<i32>::new();
        let late_calls = Rc::new(Cell::new(0));
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let (handle, calls, keep) = (subject.clone(), Rc::clone(&late_calls), Rc::clone(&held));
        let _adder = subject.subscribe(move |_| {
            if keep.borrow().is_empty() {
                let calls = Rc::clone(&calls);
                let sub = handle.subscribe(move |_| calls.set(calls.get() + 1));
                keep.borrow_mut().push(sub);
            }
        });

        subject.next(&1);
        assert_eq!(late_calls.get(), 0);
        subject.next(&2);
        assert_eq!(late_calls.get(), 1);
        held.borrow_mut().clear();
    }

    #[test]
    fn teardown_clears_and_later_unsubscribe_is_noop() {
        let subject = Subject::<i32>::new();
        let (log, observer) = recorder();
        let mut sub = subject.subscribe(observer);

        subject.teardown();
        subject.next(&1);
        sub.unsubscribe();
        sub.unsubscribe();

        assert!(log.borrow().is_empty());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn subscription_outliving_subject_is_harmless() {
        let (_, observer) = recorder();
        let mut sub = {
            let subject = Subject::<i32>::new();
            subject.subscribe(observer)
        };
        sub.unsubscribe();
        assert!(!sub.is_active());
    }
}
