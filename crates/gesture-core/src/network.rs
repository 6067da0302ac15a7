//! The compiled runtime graph: nodes that route tokens and emit completions.

use crate::error::GestureError;
use crate::token::TokenSet;
use std::cell::RefCell;
use std::rc::Rc;

/// A boxed listener invoked with the set of tokens a node has just completed.
pub type CompletionListener = Box<dyn FnMut(&TokenSet)>;

/// A handle to a compiled sub-network. Every combinator and ground-term node
/// implements this; host code normally only needs `add_tokens` /
/// `remove_tokens` on the root, reached through [`crate::expression::Network`].
pub trait NetworkNode {
    /// The subset of descendant ground-term nodes currently eligible to
    /// accept fresh tokens.
    fn front(&self) -> Vec<Rc<dyn NetworkNode>>;

    /// Inject tokens at the front of this sub-network.
    fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError>;

    /// Withdraw tokens from anywhere in this sub-network. Unlike
    /// `add_tokens`, this must reach every direct child, not just the front,
    /// because a token may be waiting at any depth (e.g. inside the right
    /// side of a `Sequence`).
    fn remove_tokens(&self, tokens: &TokenSet);

    /// Register a listener invoked every time this node completes.
    /// Multiple listeners may be registered (e.g. a ground node at the root
    /// front is tapped both by its parent combinator and by the root
    /// auto-refeed handler).
    fn on_completion(&self, listener: CompletionListener);

    /// The completion signals the root auto-refeed policy (§4.8) should
    /// subscribe to. Defaults to one subscription per `front()` node,
    /// matching §4.8 item 1 literally ("every front node's completion").
    ///
    /// `Choice` overrides this: its front spans two mutually-exclusive
    /// alternatives that cancel each other, so the refeed must be wired to
    /// the choice's *own* completion rather than to each leaf — see
    /// `choice.rs` for why subscribing per leaf re-arms the branch a win
    /// just cancelled.
    fn refeed_sources(self: Rc<Self>) -> Vec<Rc<dyn NetworkNode>> {
        self.front()
    }
}

/// Default `add_tokens` forwarding: inject into every node in `front`.
/// Combinators that don't need bespoke add-token behavior call this from
/// their own `NetworkNode::add_tokens` impl.
///
/// Transactional across the whole `front` slice: a single `GroundNode`
/// already undoes its own held-set extend when its subscribe attempt fails
/// (see `ground.rs`), but that per-leaf rollback doesn't by itself keep a
/// multi-node front (`Parallel`, `Choice`) atomic. If a later node in the
/// slice fails, every node that already succeeded in this same call is
/// rolled back via `remove_tokens` before the error is returned, so a
/// caller never observes a partially-applied batch.
pub(crate) fn forward_add_tokens(
    front: &[Rc<dyn NetworkNode>],
    tokens: &TokenSet,
) -> Result<(), GestureError> {
    for (i, node) in front.iter().enumerate() {
        if let Err(err) = node.add_tokens(tokens) {
            for prior in &front[..i] {
                prior.remove_tokens(tokens);
            }
            return Err(err);
        }
    }
    Ok(())
}

/// Multi-subscriber, synchronous, fire-and-forget completion broadcast.
/// Chosen per the design note allowing "a callback list, a broadcast
/// channel, or observer registration" — a callback list is the simplest
/// thing that gives single-threaded synchronous delivery with the implicit
/// unsubscribe-by-drop semantics this engine needs (a node's listeners live
/// exactly as long as the node itself).
pub(crate) struct CompletionHub {
    listeners: RefCell<Vec<CompletionListener>>,
}

impl CompletionHub {
    pub fn new() -> Self {
        CompletionHub {
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: CompletionListener) {
        self.listeners.borrow_mut().push(listener);
    }

    /// Emit `tokens` to every listener, in registration order. A no-op for
    /// an empty set so callers can emit unconditionally without checking
    /// first (e.g. parallel's half-completed batch).
    pub fn emit(&self, tokens: &TokenSet) {
        if tokens.is_empty() {
            return;
        }
        for listener in self.listeners.borrow_mut().iter_mut() {
            listener(tokens);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ground::GroundNode;
    use crate::sensor::mock::{Feature, MockSensor};
    use crate::token::Token;

    /// A front with three nodes where the middle one fails to subscribe
    /// must leave the first node exactly as it was before the call, not
    /// holding the rejected batch (spec §7, at combinator granularity).
    #[test]
    fn forward_add_tokens_rolls_back_already_succeeded_nodes_on_failure() {
        let sensor: Rc<MockSensor<Feature, i32>> = Rc::new(MockSensor::new());
        let sensor_dyn: Rc<dyn crate::sensor::Sensor<Feature, i32>> = sensor.clone();
        let a = GroundNode::compile(Feature::A, None, sensor_dyn.clone());
        let b = GroundNode::compile(Feature::B, None, sensor_dyn.clone());
        let c = GroundNode::compile(Feature::C, None, sensor_dyn);

        // Arm `a` ahead of time so the batch below finds it already
        // subscribed: its `add_tokens` call won't need to subscribe again,
        // so it can't consume the mock's one-shot failure itself.
        let pre_existing = Token::fresh();
        let mut preload = TokenSet::new();
        preload.push(pre_existing);
        a.add_tokens(&preload).unwrap();

        let front: Vec<Rc<dyn NetworkNode>> = vec![a.clone(), b.clone(), c.clone()];
        sensor.fail_next_subscribe();
        let batch_token = Token::fresh();
        let mut batch = TokenSet::new();
        batch.push(batch_token);

        let result = forward_add_tokens(&front, &batch);
        assert!(result.is_err());
        assert_eq!(
            a.held_count(),
            1,
            "a's successful add_tokens for this batch must be rolled back"
        );
        assert_eq!(b.held_count(), 0, "b's own subscribe failure already left it unmodified");
        assert!(!b.has_subscription());
        assert_eq!(c.held_count(), 0, "c is never reached once b fails");
    }
}
