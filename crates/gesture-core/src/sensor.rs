//! Sensor port: the abstract event source the engine consumes.
//!
//! Out of scope for this crate (see spec §1): any concrete driver. This
//! module only describes the interface a ground-term node subscribes to.

use crate::error::GestureError;

/// One event published by a sensor: a feature tag plus an opaque payload.
#[derive(Debug, Clone)]
pub struct SensorEvent<F, E> {
    pub feature: F,
    pub payload: E,
}

/// A handle to an installed subscription. `cancel` must be idempotent —
/// calling it twice has the same effect as calling it once.
pub trait SensorSubscription {
    fn cancel(&mut self);
}

/// Any object exposing a publish/subscribe event stream whose items carry a
/// feature tag and an opaque payload. A ground-term node holds at most one
/// subscription at a time and installs it only while its held-token set is
/// non-empty (invariant 2).
pub trait Sensor<F, E> {
    /// Install a handler on the sensor's event stream. The handler receives
    /// every published event; feature filtering is the subscriber's
    /// responsibility (ground-term node step 1), matching a port that
    /// exposes one undifferentiated stream rather than per-feature channels.
    fn subscribe(
        &self,
        handler: Box<dyn FnMut(&SensorEvent<F, E>)>,
    ) -> Result<Box<dyn SensorSubscription>, GestureError>;
}

/// A minimal in-process sensor for tests and demos: events are delivered
/// synchronously to every currently-subscribed handler, in subscription
/// order, exactly as they are fed via [`MockSensor::feed`].
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Slot<F, E> {
        handler: Option<Box<dyn FnMut(&SensorEvent<F, E>)>>,
        in_flight: bool,
        cancelled_while_in_flight: bool,
    }

    /// Sensor feature enumeration used throughout the engine's own test
    /// fixtures, matching spec §8's literal `{A, B, C}` mock.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Feature {
        A,
        B,
        C,
    }

    struct Inner<F, E> {
        slots: Vec<Slot<F, E>>,
        fail_next_subscribe: bool,
    }

    /// A synchronous, single-threaded mock sensor whose payload is whatever
    /// `E` the caller chooses (spec §8 uses a plain integer).
    pub struct MockSensor<F, E> {
        inner: Rc<RefCell<Inner<F, E>>>,
    }

    impl<F, E> Clone for MockSensor<F, E> {
        fn clone(&self) -> Self {
            MockSensor {
                inner: self.inner.clone(),
            }
        }
    }

    impl<F, E> Default for MockSensor<F, E> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<F, E> MockSensor<F, E> {
        pub fn new() -> Self {
            MockSensor {
                inner: Rc::new(RefCell::new(Inner {
                    slots: Vec::new(),
                    fail_next_subscribe: false,
                })),
            }
        }

        /// Make the next `subscribe` call fail, to exercise the
        /// `SubscriptionFailed` error path (§7).
        pub fn fail_next_subscribe(&self) {
            self.inner.borrow_mut().fail_next_subscribe = true;
        }

        /// Current number of live subscriptions, used by tests asserting the
        /// "subscription economy" invariant (§8.1).
        pub fn subscription_count(&self) -> usize {
            self.inner
                .borrow()
                .slots
                .iter()
                .filter(|s| s.handler.is_some())
                .count()
        }

        /// Publish one event to every currently-subscribed handler.
        ///
        /// Handlers may synchronously subscribe or unsubscribe while this
        /// call is in flight (reentrancy, §5). Each slot is marked
        /// `in_flight` for the duration of its own callback so that a
        /// handler cancelling *itself* (the swap-then-unsubscribe order of
        /// §4.2) is distinguished from the bookkeeping that temporarily
        /// takes the closure out of the slot to satisfy the borrow checker;
        /// newly-subscribed slots are not fed until the next call.
        pub fn feed(&self, feature: F, payload: E)
        where
            F: Clone,
        {
            let event = SensorEvent { feature, payload };
            let len = self.inner.borrow().slots.len();
            for i in 0..len {
                let mut handler = {
                    let mut inner = self.inner.borrow_mut();
                    let slot = &mut inner.slots[i];
                    match slot.handler.take() {
                        Some(h) => {
                            slot.in_flight = true;
                            slot.cancelled_while_in_flight = false;
                            h
                        }
                        None => continue,
                    }
                };
                handler(&event);
                let mut inner = self.inner.borrow_mut();
                let slot = &mut inner.slots[i];
                slot.in_flight = false;
                if slot.cancelled_while_in_flight {
                    slot.handler = None;
                } else {
                    slot.handler = Some(handler);
                }
            }
        }
    }

    struct MockSubscription<F, E> {
        inner: Rc<RefCell<Inner<F, E>>>,
        index: usize,
    }

    impl<F, E> SensorSubscription for MockSubscription<F, E> {
        fn cancel(&mut self) {
            if let Some(slot) = self.inner.borrow_mut().slots.get_mut(self.index) {
                if slot.in_flight {
                    slot.cancelled_while_in_flight = true;
                } else {
                    slot.handler = None;
                }
            }
        }
    }

    impl<F: 'static, E: 'static> Sensor<F, E> for MockSensor<F, E> {
        fn subscribe(
            &self,
            handler: Box<dyn FnMut(&SensorEvent<F, E>)>,
        ) -> Result<Box<dyn SensorSubscription>, GestureError> {
            let mut inner = self.inner.borrow_mut();
            if inner.fail_next_subscribe {
                inner.fail_next_subscribe = false;
                return Err(GestureError::subscription_failed(
                    "mock",
                    "forced failure for test",
                ));
            }
            let index = inner.slots.len();
            inner.slots.push(Slot {
                handler: Some(handler),
                in_flight: false,
                cancelled_while_in_flight: false,
            });
            drop(inner);
            Ok(Box::new(MockSubscription {
                inner: self.inner.clone(),
                index,
            }))
        }
    }
}
