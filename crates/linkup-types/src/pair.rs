//! Direction-independent keys for two-user relationships.
//!
//! Every connection lookup goes through [`canonicalize`], so a query for
//! `(x, y)` hits the same row as a query for `(y, x)`.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    #[error("a user cannot connect to themselves")]
    SelfPair,
    #[error("invalid user id {0}: expected a positive integer")]
    NonPositive(i64),
}

/// An unordered user pair stored as `(user_a, user_b)` with `user_a < user_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanonicalPair {
    user_a: i64,
    user_b: i64,
}

impl CanonicalPair {
    pub fn user_a(&self) -> i64 {
        self.user_a
    }

    pub fn user_b(&self) -> i64 {
        self.user_b
    }
}

pub fn canonicalize(x: i64, y: i64) -> Result<CanonicalPair, PairError> {
    if x <= 0 {
        return Err(PairError::NonPositive(x));
    }
    if y <= 0 {
        return Err(PairError::NonPositive(y));
    }
    if x == y {
        return Err(PairError::SelfPair);
    }

    Ok(CanonicalPair {
        user_a: x.min(y),
        user_b: x.max(y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_independent() {
        for (x, y) in [(1, 2), (9, 5), (100, 3), (7, 8), (i64::MAX, 1)] {
            let forward = canonicalize(x, y).unwrap();
            let backward = canonicalize(y, x).unwrap();
            assert_eq!(forward, backward);
            assert!(forward.user_a() < forward.user_b());
        }
    }

    #[test]
    fn rejects_self_pair() {
        assert_eq!(canonicalize(4, 4), Err(PairError::SelfPair));
    }

    #[test]
    fn rejects_non_positive_ids() {
        assert_eq!(canonicalize(0, 3), Err(PairError::NonPositive(0)));
        assert_eq!(canonicalize(3, -2), Err(PairError::NonPositive(-2)));
    }
}
