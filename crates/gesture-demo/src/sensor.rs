//! A synthetic, single-threaded sensor for the demo binary.
//!
//! Stands in for the concrete motion-tracking driver the core engine never
//! depends on (spec §1, "out of scope"). Events arrive on a background
//! thread via `crossbeam-channel` and are drained one at a time on the main
//! thread, which is the only thread that ever touches this registry — the
//! "single-consumer queue" the engine's thread-safety note requires of any
//! host that generates events off-thread.

use gesture_core::error::GestureError;
use gesture_core::sensor::{Sensor, SensorEvent, SensorSubscription};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// The three synthetic feature channels this demo generates. A stand-in for
/// whatever finite enumeration a real sensor driver would expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    A,
    B,
    C,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Slot {
    handler: Option<Box<dyn FnMut(&SensorEvent<Feature, i32>)>>,
    in_flight: bool,
    cancelled_while_in_flight: bool,
}

#[derive(Default)]
struct Inner {
    slots: Vec<Slot>,
}

/// Single-threaded, reference-counted registry of handlers, dispatched by
/// [`DemoSensor::dispatch`]. Cheap to clone: every clone shares the same
/// registry, the same way a real sensor handle would be shared between the
/// event-generating thread's join handle and the engine's wiring.
#[derive(Clone, Default)]
pub struct DemoSensor {
    inner: Rc<RefCell<Inner>>,
}

impl DemoSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of live subscriptions; logged by the demo loop so a
    /// reader can watch the "subscription economy" invariant (spec §8.1)
    /// hold in practice.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .iter()
            .filter(|s| s.handler.is_some())
            .count()
    }

    /// Deliver one event to every currently-subscribed handler, in
    /// subscription order. Mirrors the reentrancy discipline ground-term
    /// firing requires: a handler may synchronously subscribe or
    /// unsubscribe (including unsubscribing itself) while this call is in
    /// flight.
    pub fn dispatch(&self, feature: Feature, payload: i32) {
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

struct DemoSubscription {
    inner: Rc<RefCell<Inner>>,
    index: usize,
}

impl SensorSubscription for DemoSubscription {
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

impl Sensor<Feature, i32> for DemoSensor {
    fn subscribe(
        &self,
        handler: Box<dyn FnMut(&SensorEvent<Feature, i32>)>,
    ) -> Result<Box<dyn SensorSubscription>, GestureError> {
        let mut inner = self.inner.borrow_mut();
        let index = inner.slots.len();
        inner.slots.push(Slot {
            handler: Some(handler),
            in_flight: false,
            cancelled_while_in_flight: false,
        });
        drop(inner);
        Ok(Box::new(DemoSubscription {
            inner: self.inner.clone(),
            index,
        }))
    }
}
