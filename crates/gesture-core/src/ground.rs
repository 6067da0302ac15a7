//! Ground-term node: the leaf that binds one feature and optional predicate
//! to the sensor stream.

use crate::error::GestureError;
use crate::network::{CompletionHub, CompletionListener, NetworkNode};
use crate::sensor::{Sensor, SensorEvent, SensorSubscription};
use crate::token::TokenSet;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Runtime node compiled from an `Expression::Ground`. Holds the live
/// sensor subscription (if any) and the tokens currently waiting at this
/// leaf.
pub struct GroundNode<F, E> {
    feature: F,
    predicate: Option<Rc<dyn Fn(&E) -> bool>>,
    held: RefCell<TokenSet>,
    subscription: RefCell<Option<Box<dyn SensorSubscription>>>,
    sensor: Rc<dyn Sensor<F, E>>,
    completion: CompletionHub,
    self_ref: RefCell<Weak<GroundNode<F, E>>>,
}

impl<F, E> GroundNode<F, E>
where
    F: Copy + PartialEq + std::fmt::Debug + 'static,
    E: 'static,
{
    pub fn compile(
        feature: F,
        predicate: Option<Rc<dyn Fn(&E) -> bool>>,
        sensor: Rc<dyn Sensor<F, E>>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|weak| GroundNode {
            feature,
            predicate,
            held: RefCell::new(TokenSet::new()),
            subscription: RefCell::new(None),
            sensor,
            completion: CompletionHub::new(),
            self_ref: RefCell::new(weak.clone()),
        })
    }

    /// Invariant 2: `has_subscription ⇔ held_tokens ≠ ∅`.
    pub fn has_subscription(&self) -> bool {
        self.subscription.borrow().is_some()
    }

    pub fn held_count(&self) -> usize {
        self.held.borrow().len()
    }

    fn subscribe(self: &Rc<Self>) -> Result<(), GestureError> {
        let handler_node = Rc::clone(self);
        let handler = move |event: &SensorEvent<F, E>| {
            handler_node.handle_event(event);
        };
        let sub = self.sensor.subscribe(Box::new(handler))?;
        *self.subscription.borrow_mut() = Some(sub);
        Ok(())
    }

    fn handle_event(self: &Rc<Self>, event: &SensorEvent<F, E>) {
        if event.feature != self.feature {
            return;
        }
        if let Some(pred) = &self.predicate {
            if !(pred.as_ref())(&event.payload) {
                return;
            }
        }
        // Swap-then-unsubscribe (§4.2): the held set is captured and cleared,
        // and the subscription dropped, *before* the completion is emitted.
        // This re-establishes invariant 2 immediately and ensures a
        // downstream subscription installed while the completion is in
        // flight is not torn down by a reentrant call back into this node.
        let captured = self.held.replace(TokenSet::new());
        if let Some(mut sub) = self.subscription.borrow_mut().take() {
            sub.cancel();
        }
        trace!(
            target: "gesture.ground",
            feature = ?self.feature,
            count = captured.len(),
            "fire"
        );
        self.completion.emit(&captured);
    }
}

impl<F, E> NetworkNode for GroundNode<F, E>
where
    F: Copy + PartialEq + std::fmt::Debug + 'static,
    E: 'static,
{
    fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        let strong = self
            .self_ref
            .borrow()
            .upgrade()
            .expect("GroundNode always holds a strong reference to itself while live");
        vec![strong as Rc<dyn NetworkNode>]
    }

    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        if tokens.is_empty() {
            return Ok(());
        }
        let was_empty = self.held.borrow().is_empty();
        self.held.borrow_mut().extend(tokens.iter().copied());
        if was_empty {
            let strong = self
                .self_ref
                .borrow()
                .upgrade()
                .expect("GroundNode always holds a strong reference to itself while live");
            if let Err(err) = strong.subscribe() {
                // Leave the held set unmodified on failure (§7): undo the
                // extend we just did.
                let mut held = self.held.borrow_mut();
                for t in tokens {
                    if let Some(pos) = held.iter().position(|h| h == t) {
                        held.remove(pos);
                    }
                }
                return Err(err);
            }
            trace!(target: "gesture.ground", feature = ?self.feature, "subscribe");
        }
        Ok(())
    }

    fn remove_tokens(&self, tokens: &TokenSet) {
        if tokens.is_empty() {
            return;
        }
        let mut held = self.held.borrow_mut();
        for t in tokens {
            if let Some(pos) = held.iter().position(|h| h == t) {
                held.remove(pos);
            }
        }
        if held.is_empty() {
            drop(held);
            if let Some(mut sub) = self.subscription.borrow_mut().take() {
                sub.cancel();
                trace!(target: "gesture.ground", feature = ?self.feature, "unsubscribe");
            }
        }
    }

    fn on_completion(&self, listener: CompletionListener) {
        self.completion.subscribe(listener);
    }
}
