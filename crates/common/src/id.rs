//! Identifier and session token generation.

use ulid::Ulid;
use uuid::Uuid;

/// Generates entity identifiers and bearer tokens.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a lowercase ULID.
    ///
    /// Users, seller profiles, products and orders all use these as primary
    /// keys, so listings ordered by id are also ordered by creation time.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate an opaque bearer token.
    ///
    /// Two random v4 UUIDs, so the token carries no timestamp.
    #[must_use]
    pub fn generate_token(&self) -> String {
        format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
    }
}
