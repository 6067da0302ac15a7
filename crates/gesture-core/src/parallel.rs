//! Parallel `L ‖ R`: a token is emitted upward only once both branches have
//! completed it.

use crate::error::GestureError;
use crate::network::{forward_add_tokens, CompletionHub, CompletionListener, NetworkNode};
use crate::token::{Token, TokenSet};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::trace;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Branch {
    Left,
    Right,
}

pub struct ParallelNode {
    left: Rc<dyn NetworkNode>,
    right: Rc<dyn NetworkNode>,
    completion: CompletionHub,
    /// Tokens completed by exactly one branch so far, keyed to which branch
    /// contributed the pending half.
    half_completed: RefCell<HashMap<Token, Branch>>,
}

impl ParallelNode {
    pub fn compile(left: Rc<dyn NetworkNode>, right: Rc<dyn NetworkNode>) -> Rc<Self> {
        let node = Rc::new(ParallelNode {
            left: left.clone(),
            right: right.clone(),
            completion: CompletionHub::new(),
            half_completed: RefCell::new(HashMap::new()),
        });

        let from_left = node.clone();
        left.on_completion(Box::new(move |ts: &TokenSet| {
            from_left.on_branch_completion(Branch::Left, ts);
        }));
        let from_right = node.clone();
        right.on_completion(Box::new(move |ts: &TokenSet| {
            from_right.on_branch_completion(Branch::Right, ts);
        }));

        node
    }

    fn on_branch_completion(&self, branch: Branch, tokens: &TokenSet) {
        let mut half = self.half_completed.borrow_mut();
        let mut outgoing = TokenSet::new();
        for t in tokens {
            match half.remove(t) {
                Some(pending_branch) => {
                    // Open question (spec §9): by construction the pending
                    // half should always belong to the *other* branch. If
                    // the same branch somehow completes a token twice before
                    // the other branch ever sees it, this still toggles the
                    // token out and emits it (preserving the documented
                    // behavior) but flags the violation loudly in debug
                    // builds rather than silently mis-pairing it.
                    debug_assert_ne!(
                        pending_branch, branch,
                        "token {t:?} completed twice by the same parallel branch \
                         before the other branch ever completed it"
                    );
                    outgoing.push(*t);
                }
                None => {
                    half.insert(*t, branch);
                }
            }
        }
        drop(half);
        trace!(target: "gesture.parallel", paired = outgoing.len(), "branch_complete");
        self.completion.emit(&outgoing);
    }
}

impl NetworkNode for ParallelNode {
    fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        let mut front = self.left.front();
        front.extend(self.right.front());
        front
    }

    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        // Both branches must see the tokens: each independently tracks its
        // own progress toward recognizing them.
        forward_add_tokens(&self.front(), tokens)
    }

    fn remove_tokens(&self, tokens: &TokenSet) {
        self.left.remove_tokens(tokens);
        self.right.remove_tokens(tokens);
        let mut half = self.half_completed.borrow_mut();
        for t in tokens {
            half.remove(t);
        }
    }

    fn on_completion(&self, listener: CompletionListener) {
        self.completion.subscribe(listener);
    }

    fn refeed_sources(self: Rc<Self>) -> Vec<Rc<dyn NetworkNode>> {
        let mut sources = self.left.clone().refeed_sources();
        sources.extend(self.right.clone().refeed_sources());
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::GroundNode;
    use crate::sensor::mock::{Feature, MockSensor};

    #[test]
    fn pairs_tokens_across_both_branches() {
        let sensor: MockSensor<Feature, i32> = MockSensor::new();
        let sensor_rc: Rc<dyn crate::sensor::Sensor<Feature, i32>> = Rc::new(sensor.clone());
        let left = GroundNode::compile(Feature::A, None, sensor_rc.clone());
        let right = GroundNode::compile(Feature::B, None, sensor_rc.clone());
        let par = ParallelNode::compile(left, right);

        let fired = Rc::new(RefCell::new(Vec::new()));
        let fired_clone = fired.clone();
        par.on_completion(Box::new(move |ts: &TokenSet| {
            fired_clone.borrow_mut().extend(ts.iter().copied());
        }));

        let t = Token::fresh();
        let mut ts = TokenSet::new();
        ts.push(t);
        par.add_tokens(&ts).unwrap();

        sensor.feed(Feature::A, 1);
        assert!(fired.borrow().is_empty(), "only one side fired so far");

        sensor.feed(Feature::B, 1);
        assert_eq!(fired.borrow().as_slice(), &[t]);
    }
}
