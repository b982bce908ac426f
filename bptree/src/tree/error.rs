//! Errors surfaced by the tree facade.

/// Smallest order a tree accepts.
pub const MIN_ORDER: usize = 3;

/// Errors returned by tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError<K> {
    /// The key is already present. Carries the offending key.
    DuplicateKey(K),
    /// The key is absent, or the tree is empty.
    NotFound,
    /// The requested order is below `MIN_ORDER`.
    InvalidOrder(usize),
}

impl<K: std::fmt::Debug> std::fmt::Display for TreeError<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateKey(key) => write!(f, "duplicate key: {key:?}"),
            Self::NotFound => write!(f, "key not found"),
            Self::InvalidOrder(order) => {
                write!(f, "invalid order {order} (must be at least {MIN_ORDER})")
            }
        }
    }
}

impl<K: std::fmt::Debug> std::error::Error for TreeError<K> {}

/// A structural check failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    /// Which property failed.
    pub invariant: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl InvariantViolation {
    pub(super) fn new(invariant: &'static str, message: impl Into<String>) -> Self {
        Self {
            invariant,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for InvariantViolation {}
