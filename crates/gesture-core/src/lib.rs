//! Compiles declarative gesture expressions into a token-flow recognizer
//! network: a small, single-threaded Petri-net-like engine that recognizes
//! sequences, parallel combinations, exclusive choices, and repetitions of
//! sensor events.
//!
//! The engine never spawns a thread and never locks: every sensor callback
//! runs to completion synchronously and may reentrantly call back into the
//! network it is itself part of (see [`sensor`] and the module docs on
//! [`ground::GroundNode`]).

pub mod choice;
pub mod error;
pub mod expression;
pub mod gesture;
pub mod ground;
pub mod iter;
pub mod network;
pub mod parallel;
pub mod sensor;
pub mod sequence;
pub mod token;

pub use error::GestureError;
pub use expression::{Expression, Network};
pub use gesture::Gesture;
pub use network::NetworkNode;
pub use sensor::{Sensor, SensorEvent, SensorSubscription};
pub use token::{Token, TokenSet};
