//! Sequence `L ; R`: routes every completion of the left side as fresh
//! tokens into the right side; only the right side's completion is visible
//! upward.

use crate::error::GestureError;
use crate::network::{forward_add_tokens, CompletionHub, CompletionListener, NetworkNode};
use crate::token::TokenSet;
use std::rc::Rc;
use tracing::{trace, warn};

pub struct SequenceNode {
    left: Rc<dyn NetworkNode>,
    right: Rc<dyn NetworkNode>,
    completion: CompletionHub,
}

impl SequenceNode {
    pub fn compile(left: Rc<dyn NetworkNode>, right: Rc<dyn NetworkNode>) -> Rc<Self> {
        let node = Rc::new(SequenceNode {
            left: left.clone(),
            right: right.clone(),
            completion: CompletionHub::new(),
        });

        // Left's completion feeds right's front as new tokens.
        let right_for_left = right.clone();
        left.on_completion(Box::new(move |ts: &TokenSet| {
            trace!(target: "gesture.sequence", count = ts.len(), "left_complete_feeds_right");
            if let Err(err) = right_for_left.add_tokens(ts) {
                warn!(target: "gesture.sequence", error = %err, "right_add_tokens_failed");
            }
        }));

        // Right's completion is this node's own completion.
        let completion_for_right = CompletionTap(node.clone());
        right.on_completion(Box::new(move |ts: &TokenSet| {
            completion_for_right.0.completion.emit(ts);
        }));

        node
    }
}

// Small wrapper so the closure above holds a strong `Rc<SequenceNode>`
// rather than capturing `node` by value twice (which would move it).
struct CompletionTap(Rc<SequenceNode>);

impl NetworkNode for SequenceNode {
    fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        self.left.front()
    }

    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        forward_add_tokens(&self.front(), tokens)
    }

    fn remove_tokens(&self, tokens: &TokenSet) {
        // Direct children, not just the front: a token may be waiting
        // anywhere in either sub-network (e.g. inside `right`).
        self.left.remove_tokens(tokens);
        self.right.remove_tokens(tokens);
    }

    fn on_completion(&self, listener: CompletionListener) {
        self.completion.subscribe(listener);
    }

    fn refeed_sources(self: Rc<Self>) -> Vec<Rc<dyn NetworkNode>> {
        self.left.clone().refeed_sources()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::GroundNode;
    use crate::sensor::mock::{Feature, MockSensor};
    use crate::token::Token;

    #[test]
    fn routes_left_completion_into_right() {
        let sensor: MockSensor<Feature, i32> = MockSensor::new();
        let sensor_rc = Rc::new(sensor.clone());
        let left = GroundNode::compile(Feature::A, None, sensor_rc.clone());
        let right = GroundNode::compile(Feature::B, None, sensor_rc.clone());
        let seq = SequenceNode::compile(left.clone(), right.clone());

        let fired = Rc::new(std::cell::RefCell::new(Vec::new()));
        let fired_clone = fired.clone();
        seq.on_completion(Box::new(move |ts: &TokenSet| {
            fired_clone.borrow_mut().extend(ts.iter().copied());
        }));

        let t = Token::fresh();
        let mut ts = TokenSet::new();
        ts.push(t);
        seq.add_tokens(&ts).unwrap();

        assert_eq!(right.held_count(), 0);
        sensor.feed(Feature::A, 1);
        assert_eq!(right.held_count(), 1);
        assert!(fired.borrow().is_empty());

        sensor.feed(Feature::B, 1);
        assert_eq!(fired.borrow().as_slice(), &[t]);
    }
}
