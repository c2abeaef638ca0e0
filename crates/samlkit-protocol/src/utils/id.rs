//! Message ID generation.

use uuid::Uuid;

/// Source of message IDs.
///
/// IDs must be valid `xs:ID` values, so they must not start with a digit.
/// Closures returning a `String` implement the trait, which makes fixed
/// IDs easy in tests.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh ID.
    fn generate(&self) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn() -> String + Send + Sync,
{
    fn generate(&self) -> String {
        self()
    }
}

/// Prefix plus a random v4 UUID, `_` by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidGenerator {
    prefix: String,
}

impl UuidGenerator {
    /// Creates a generator with a custom prefix.
    #[must_use]
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for UuidGenerator {
    fn default() -> Self {
        Self::with_prefix("_")
    }
}

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4())
    }
}
