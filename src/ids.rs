//! Statement, portal and session name generation.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic name sequence.
///
/// Safe to share between threads: every call takes the next value with an
/// atomic increment, so names from one generator never repeat.
#[derive(Debug, Default)]
pub struct NameGenerator {
    next: AtomicU64,
}

impl NameGenerator {
    /// Create a generator starting at 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide generator used when a session is not given its own.
    pub fn shared() -> Arc<NameGenerator> {
        static SHARED: OnceLock<Arc<NameGenerator>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(NameGenerator::new())).clone()
    }

    /// Next raw value.
    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Prepared statement name, e.g. `s1`.
    pub fn statement(&self) -> String {
        format!("s{}", self.next_id())
    }

    /// Portal name, e.g. `p2`.
    pub fn portal(&self) -> String {
        format!("p{}", self.next_id())
    }

    /// Session id, e.g. `pg3`.
    pub fn session(&self) -> String {
        format!("pg{}", self.next_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_increase() {
        let names = NameGenerator::new();
        assert_eq!(names.statement(), "s1");
        assert_eq!(names.portal(), "p2");
        assert_eq!(names.session(), "pg3");
    }

    #[test]
    fn test_concurrent_unique() {
        let names = Arc::new(NameGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let names = names.clone();
                std::thread::spawn(move || (0..100).map(|_| names.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_shared_is_single_instance() {
        assert!(Arc::ptr_eq(&NameGenerator::shared(), &NameGenerator::shared()));
    }
}
