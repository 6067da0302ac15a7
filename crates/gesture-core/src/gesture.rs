//! Per-expression broadcast: a multi-subscriber, synchronous, fire-and-forget
//! channel that fires whenever the owning expression's compiled network
//! signals a completion (§4.1, §9).

use crate::token::TokenSet;
use std::cell::RefCell;
use std::rc::Rc;

type GestureListener = Box<dyn FnMut(&TokenSet)>;

/// A cheap-to-clone handle onto one expression's gesture broadcast. Cloning
/// shares the same listener list — every clone observes the same firings.
#[derive(Clone)]
pub struct Gesture {
    listeners: Rc<RefCell<Vec<GestureListener>>>,
}

impl Gesture {
    pub(crate) fn new() -> Self {
        Gesture {
            listeners: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Register a listener invoked every time this expression's compiled
    /// network recognizes the gesture it describes.
    pub fn subscribe(&self, listener: impl FnMut(&TokenSet) + 'static) {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub(crate) fn fire(&self, tokens: &TokenSet) {
        for listener in self.listeners.borrow_mut().iter_mut() {
            listener(tokens);
        }
    }
}
