//! Opaque token identity.
//!
//! A [`Token`] carries no payload; two tokens are equal only if they are the
//! same instance. Fresh tokens are minted from a process-wide monotonic
//! counter, the "atomically-incremented integer id" scheme the spec allows
//! as an alternative to heap-allocated markers.

use smallvec::SmallVec;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// An opaque flow marker. Identity-equal only to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    /// Mint a fresh, globally distinct token.
    pub fn fresh() -> Self {
        Token(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// Small, usually single- or few-element batches of tokens flow through the
/// network together; `SmallVec` avoids a heap allocation for the common case
/// of one token per batch.
pub type TokenSet = SmallVec<[Token; 4]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_are_distinct() {
        let a = Token::fresh();
        let b = Token::fresh();
        assert_ne!(a, b);
    }
}
