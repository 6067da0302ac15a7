//! Iteration `X*`: feeds every completion of the body back as fresh tokens
//! at the body's front, raising the owning expression's `Gesture` event per
//! completion, but never completing upward itself.
//!
//! Open question (spec §9): because this node's own completion signal is
//! permanently silent, an `Iter` composed directly as the left child of a
//! `Sequence` would stall that sequence forever — its right side would
//! never receive tokens. This is documented, intentional behavior, not a
//! bug to silently work around.

use crate::error::GestureError;
use crate::network::{forward_add_tokens, CompletionHub, CompletionListener, NetworkNode};
use crate::token::TokenSet;
use std::rc::Rc;
use tracing::trace;

pub struct IterNode {
    body: Rc<dyn NetworkNode>,
    /// Always empty: `on_completion` listeners are registered but never
    /// invoked, matching "the outer completion signal is silent" (§4.7).
    completion: CompletionHub,
    refeed: Rc<dyn Fn(&TokenSet)>,
}

impl IterNode {
    pub fn compile(body: Rc<dyn NetworkNode>, on_gesture: Rc<dyn Fn(&TokenSet)>) -> Rc<Self> {
        let node = Rc::new(IterNode {
            body: body.clone(),
            completion: CompletionHub::new(),
            refeed: on_gesture,
        });

        let body_for_feedback = body.clone();
        let gesture = node.refeed.clone();
        body.on_completion(Box::new(move |ts: &TokenSet| {
            trace!(target: "gesture.iter", count = ts.len(), "refeed");
            if let Err(err) = body_for_feedback.add_tokens(ts) {
                tracing::warn!(target: "gesture.iter", error = %err, "refeed_add_tokens_failed");
            }
            (*gesture)(ts);
        }));

        node
    }
}

impl NetworkNode for IterNode {
    fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        self.body.front()
    }

    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        forward_add_tokens(&self.front(), tokens)
    }

    fn remove_tokens(&self, tokens: &TokenSet) {
        self.body.remove_tokens(tokens);
    }

    fn on_completion(&self, listener: CompletionListener) {
        // Registered but structurally unreachable: `body`'s completions are
        // consumed entirely by the refeed closure above and never forwarded
        // here.
        self.completion.subscribe(listener);
    }

    fn refeed_sources(self: Rc<Self>) -> Vec<Rc<dyn NetworkNode>> {
        self.body.clone().refeed_sources()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::GroundNode;
    use crate::sensor::mock::{Feature, MockSensor};
    use std::cell::RefCell;

    #[test]
    fn refeeds_body_and_never_completes_upward() {
        let sensor: MockSensor<Feature, i32> = MockSensor::new();
        let sensor_rc = Rc::new(sensor.clone());
        let body = GroundNode::compile(Feature::A, None, sensor_rc);

        let gestures = Rc::new(RefCell::new(0usize));
        let gestures_clone = gestures.clone();
        let iter = IterNode::compile(
            body.clone(),
            Rc::new(move |_: &TokenSet| {
                *gestures_clone.borrow_mut() += 1;
            }),
        );

        let upward_fired = Rc::new(RefCell::new(0usize));
        let upward_clone = upward_fired.clone();
        iter.on_completion(Box::new(move |_: &TokenSet| {
            *upward_clone.borrow_mut() += 1;
        }));

        let mut ts = TokenSet::new();
        ts.push(crate::token::Token::fresh());
        iter.add_tokens(&ts).unwrap();

        for _ in 0..3 {
            sensor.feed(Feature::A, 1);
        }

        assert_eq!(*gestures.borrow(), 3);
        assert_eq!(*upward_fired.borrow(), 0);
        assert_eq!(body.held_count(), 1, "body re-armed with one fresh token each time");
    }
}
