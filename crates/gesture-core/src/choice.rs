//! Choice `L ⊕ R`: the first branch to recognize wins; the loser's partial
//! progress for the winning tokens is cancelled.

use crate::error::GestureError;
use crate::network::{forward_add_tokens, CompletionHub, CompletionListener, NetworkNode};
use crate::token::TokenSet;
use std::cell::Cell;
use std::rc::Rc;
use tracing::trace;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Branch {
    Left,
    Right,
}

pub struct ChoiceNode {
    left: Rc<dyn NetworkNode>,
    right: Rc<dyn NetworkNode>,
    completion: CompletionHub,
    /// The branch currently being cancelled by the other branch's win,
    /// for the duration of that win's synchronous completion chain only.
    /// A root-level re-arm reacting to this same completion (nested inside
    /// it, see `refeed_sources` below) must skip that branch: handing it a
    /// brand-new token here would silently undo the cancel it's reacting
    /// to (invariant 4 — the loser holds no residual token afterwards).
    settling: Cell<Option<Branch>>,
}

impl ChoiceNode {
    pub fn compile(left: Rc<dyn NetworkNode>, right: Rc<dyn NetworkNode>) -> Rc<Self> {
        let node = Rc::new(ChoiceNode {
            left: left.clone(),
            right: right.clone(),
            completion: CompletionHub::new(),
            settling: Cell::new(None),
        });

        let (left_for_left, right_for_left) = (node.clone(), right.clone());
        left.on_completion(Box::new(move |ts: &TokenSet| {
            trace!(target: "gesture.choice", side = "left", count = ts.len(), "won");
            left_for_left.settling.set(Some(Branch::Right));
            right_for_left.remove_tokens(ts);
            left_for_left.completion.emit(ts);
            left_for_left.settling.set(None);
        }));

        let (left_for_right, right_for_right) = (node.clone(), left.clone());
        right.on_completion(Box::new(move |ts: &TokenSet| {
            trace!(target: "gesture.choice", side = "right", count = ts.len(), "won");
            left_for_right.settling.set(Some(Branch::Left));
            right_for_right.remove_tokens(ts);
            left_for_right.completion.emit(ts);
            left_for_right.settling.set(None);
        }));

        node
    }
}

impl NetworkNode for ChoiceNode {
    fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        let mut front = self.left.front();
        front.extend(self.right.front());
        front
    }

    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        match self.settling.get() {
            Some(Branch::Left) => self.right.add_tokens(tokens),
            Some(Branch::Right) => self.left.add_tokens(tokens),
            None => forward_add_tokens(&self.front(), tokens),
        }
    }

    fn remove_tokens(&self, tokens: &TokenSet) {
        self.left.remove_tokens(tokens);
        self.right.remove_tokens(tokens);
    }

    fn on_completion(&self, listener: CompletionListener) {
        self.completion.subscribe(listener);
    }

    fn refeed_sources(self: Rc<Self>) -> Vec<Rc<dyn NetworkNode>> {
        // A single entry: the choice's own completion, not each leaf's. The
        // root's re-arm must run nested inside the same settlement that
        // performs the cancel (see `add_tokens` above), not as an
        // independent sibling reaction to the same upstream leaf firing.
        vec![self as Rc<dyn NetworkNode>]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::GroundNode;
    use crate::sensor::mock::{Feature, MockSensor};
    use crate::token::Token;

    #[test]
    fn first_branch_wins_and_clears_the_other() {
        let sensor: MockSensor<Feature, i32> = MockSensor::new();
        let sensor_rc = Rc::new(sensor.clone());
        let left = GroundNode::compile(Feature::A, None, sensor_rc.clone());
        let right = GroundNode::compile(Feature::B, None, sensor_rc.clone());
        let choice = ChoiceNode::compile(left.clone(), right.clone());

        let fired = Rc::new(std::cell::RefCell::new(Vec::new()));
        let fired_clone = fired.clone();
        choice.on_completion(Box::new(move |ts: &TokenSet| {
            fired_clone.borrow_mut().extend(ts.iter().copied());
        }));

        let t = Token::fresh();
        let mut ts = TokenSet::new();
        ts.push(t);
        choice.add_tokens(&ts).unwrap();

        sensor.feed(Feature::A, 1);
        assert_eq!(fired.borrow().as_slice(), &[t]);
        assert_eq!(right.held_count(), 0, "loser's token must be cleared");
        assert!(!right.has_subscription());

        sensor.feed(Feature::B, 1); // no-op: right was never re-armed
        assert_eq!(fired.borrow().len(), 1);
    }
}
