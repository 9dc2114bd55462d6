//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// Length of the short poll tokens handed out to chat users.
pub const POLL_ID_LEN: usize = 8;

/// ID generator for entities.
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

    /// Generate a new ULID-based ID.
    ///
    /// Used for ledger rows, where ids only need to be unique and
    /// roughly insertion-ordered.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a short poll token: a random UUIDv4 truncated to
    /// [`POLL_ID_LEN`] hex characters.
    ///
    /// Truncation weakens the collision-free guarantee, so callers
    /// creating polls must treat an id collision as retryable.
    #[must_use]
    pub fn generate_poll_id(&self) -> String {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(POLL_ID_LEN);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ulid() {
        let id_gen = IdGenerator::new();
        let id1 = id_gen.generate();
        let id2 = id_gen.generate();

        assert_eq!(id1.len(), 26);
        assert_eq!(id2.len(), 26);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_generate_poll_id_is_short_hex() {
        let id_gen = IdGenerator::new();
        let id = id_gen.generate_poll_id();

        assert_eq!(id.len(), POLL_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_poll_id_varies() {
        let id_gen = IdGenerator::new();
        let ids: std::collections::HashSet<String> =
            (0..100).map(|_| id_gen.generate_poll_id()).collect();

        // 100 draws from a 16^8 space should not collide.
        assert_eq!(ids.len(), 100);
    }
}
