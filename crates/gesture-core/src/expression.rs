//! The declarative front layer: an immutable algebraic description of a
//! gesture, and its compilation into an executable network.

use crate::choice::ChoiceNode;
use crate::error::GestureError;
use crate::ground::GroundNode;
use crate::gesture::Gesture;
use crate::iter::IterNode;
use crate::network::NetworkNode;
use crate::parallel::ParallelNode;
use crate::sensor::Sensor;
use crate::sequence::SequenceNode;
use crate::token::{Token, TokenSet};
use std::rc::Rc;
use tracing::{debug, warn};

enum Kind<F, E> {
    Ground {
        feature: F,
        predicate: Option<Rc<dyn Fn(&E) -> bool>>,
    },
    Sequence(Rc<Expression<F, E>>, Rc<Expression<F, E>>),
    Parallel(Rc<Expression<F, E>>, Rc<Expression<F, E>>),
    Choice(Rc<Expression<F, E>>, Rc<Expression<F, E>>),
    Iter(Rc<Expression<F, E>>),
}

/// An immutable gesture expression. Reusable: `compile` may be called any
/// number of times, each producing an independent network.
pub struct Expression<F, E> {
    kind: Kind<F, E>,
    /// Fires whenever *this* expression's compiled network recognizes a
    /// completion, across every network ever compiled from it.
    pub gesture: Gesture,
}

impl<F, E> Expression<F, E>
where
    F: Copy + PartialEq + std::fmt::Debug + 'static,
    E: 'static,
{
    /// `Ground(feature, None)`: matches any event on `feature`.
    pub fn ground(feature: F) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Ground {
                feature,
                predicate: None,
            },
            gesture: Gesture::new(),
        })
    }

    /// `Ground(feature, Some(predicate))`.
    pub fn ground_where(feature: F, predicate: impl Fn(&E) -> bool + 'static) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Ground {
                feature,
                predicate: Some(Rc::new(predicate)),
            },
            gesture: Gesture::new(),
        })
    }

    /// `Sequence(self, other)`: `self ; other`.
    pub fn then(self: &Rc<Self>, other: &Rc<Self>) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Sequence(self.clone(), other.clone()),
            gesture: Gesture::new(),
        })
    }

    /// `Parallel(self, other)`: `self ‖ other`.
    pub fn and(self: &Rc<Self>, other: &Rc<Self>) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Parallel(self.clone(), other.clone()),
            gesture: Gesture::new(),
        })
    }

    /// `Choice(self, other)`: `self ⊕ other`.
    pub fn or(self: &Rc<Self>, other: &Rc<Self>) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Choice(self.clone(), other.clone()),
            gesture: Gesture::new(),
        })
    }

    /// `Iter(self)`: `self*`.
    pub fn repeated(self: &Rc<Self>) -> Rc<Self> {
        Rc::new(Expression {
            kind: Kind::Iter(self.clone()),
            gesture: Gesture::new(),
        })
    }

    /// Internal compile: produces a network whose completion signal is
    /// observable to the parent combinator. Also wires this expression's
    /// own `gesture` to fire on that same completion (except for `Iter`,
    /// whose network completion is permanently silent — see `iter.rs`).
    pub(crate) fn compile_internal(
        self: &Rc<Self>,
        sensor: &Rc<dyn Sensor<F, E>>,
    ) -> Rc<dyn NetworkNode> {
        match &self.kind {
            Kind::Ground { feature, predicate } => {
                let node = GroundNode::compile(*feature, predicate.clone(), sensor.clone());
                self.wire_gesture(node.clone());
                node
            }
            Kind::Sequence(l, r) => {
                let node =
                    SequenceNode::compile(l.compile_internal(sensor), r.compile_internal(sensor));
                self.wire_gesture(node.clone());
                node
            }
            Kind::Parallel(l, r) => {
                let node =
                    ParallelNode::compile(l.compile_internal(sensor), r.compile_internal(sensor));
                self.wire_gesture(node.clone());
                node
            }
            Kind::Choice(l, r) => {
                let node =
                    ChoiceNode::compile(l.compile_internal(sensor), r.compile_internal(sensor));
                self.wire_gesture(node.clone());
                node
            }
            Kind::Iter(body) => {
                let gesture = self.gesture.clone();
                IterNode::compile(
                    body.compile_internal(sensor),
                    Rc::new(move |ts: &TokenSet| gesture.fire(ts)),
                )
            }
        }
    }

    fn wire_gesture(&self, node: Rc<dyn NetworkNode>) {
        let gesture = self.gesture.clone();
        node.on_completion(Box::new(move |ts: &TokenSet| gesture.fire(ts)));
    }

    /// Root compile (§4.8): internal compile plus the auto-refeed policy —
    /// every refeed source's completion injects one fresh token at the
    /// root, and one initial token is injected immediately, so the returned
    /// network is continuously armed. A refeed source is usually a front
    /// ground node, but combinators whose front spans mutually-exclusive
    /// alternatives (`Choice`) collapse it to their own single completion
    /// (see `NetworkNode::refeed_sources`).
    pub fn compile(self: &Rc<Self>, sensor: Rc<dyn Sensor<F, E>>) -> Result<Network, GestureError> {
        let root = self.compile_internal(&sensor);

        for refeed_source in root.clone().refeed_sources() {
            let root_for_refeed = root.clone();
            refeed_source.on_completion(Box::new(move |_ts: &TokenSet| {
                let mut fresh = TokenSet::new();
                fresh.push(Token::fresh());
                debug!(target: "gesture.root", "refeed");
                if let Err(err) = root_for_refeed.add_tokens(&fresh) {
                    warn!(target: "gesture.root", error = %err, "refeed_failed");
                }
            }));
        }

        let mut initial = TokenSet::new();
        initial.push(Token::fresh());
        root.add_tokens(&initial)?;

        Ok(Network { root })
    }
}

/// A compiled, executable gesture network. Host code normally only needs
/// [`Expression::gesture`]; this handle is exposed primarily for the
/// engine's own wiring and for tests that assert on network-level state.
pub struct Network {
    root: Rc<dyn NetworkNode>,
}

impl Network {
    pub fn add_tokens(&self, tokens: &TokenSet) -> Result<(), GestureError> {
        self.root.add_tokens(tokens)
    }

    pub fn remove_tokens(&self, tokens: &TokenSet) {
        self.root.remove_tokens(tokens);
    }

    pub fn front(&self) -> Vec<Rc<dyn NetworkNode>> {
        self.root.front()
    }
}
