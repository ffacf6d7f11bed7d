use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Build a process-unique identifier with a type prefix, e.g.
/// `chat_17254418239870003`.
///
/// The millisecond timestamp keeps identifiers sortable across runs; the
/// sequence suffix keeps them unique within a run even when several are
/// minted in the same millisecond.
pub fn unique_id(prefix: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("{}_{}{:04}", prefix, Utc::now().timestamp_millis(), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_the_prefix() {
        assert!(unique_id("user").starts_with("user_"));
        assert!(unique_id("chat").starts_with("chat_"));
    }

    #[test]
    fn ids_minted_back_to_back_are_distinct() {
        let a = unique_id("msg");
        let b = unique_id("msg");
        assert_ne!(a, b);
    }
}
