//! Sequential record identifiers.
//!
//! Identifiers look like `BR-000001`: the schema prefix, a dash, and a
//! counter zero-padded to six digits (wider once it passes 999999).
//! Candidates already in the used set are skipped.

use std::collections::HashSet;

/// Minimum width of the numeric part
pub const ID_DIGITS: usize = 6;

/// Format a candidate identifier
pub fn format_id(prefix: &str, seq: u64) -> String {
    format!("{}-{:0width$}", prefix, seq, width = ID_DIGITS)
}

/// Reserve the first free identifier at or after `counter`.
///
/// Returns the identifier and the counter to use for the next call.
pub fn allocate(prefix: &str, used: &mut HashSet<String>, mut counter: u64) -> (String, u64) {
    loop {
        let candidate = format_id(prefix, counter);
        if !used.contains(&candidate) {
            used.insert(candidate.clone());
            return (candidate, counter + 1);
        }
        counter += 1;
    }
}

/// Job-local identifier allocator
#[derive(Debug, Clone)]
pub struct IdAllocator {
    prefix: String,
    used: HashSet<String>,
    next: u64,
}

impl IdAllocator {
    /// Start at 1 with nothing reserved
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), used: HashSet::new(), next: 1 }
    }

    /// Start at 1, never handing out any of `reserved`
    pub fn with_reserved<I, S>(prefix: impl Into<String>, reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allocator = Self::new(prefix);
        allocator.used.extend(reserved.into_iter().map(Into::into));
        allocator
    }

    pub fn next_id(&mut self) -> String {
        let (id, next) = allocate(&self.prefix, &mut self.used, self.next);
        self.next = next;
        id
    }

    /// Number of identifiers reserved so far, including pre-reserved ones
    pub fn reserved_count(&self) -> usize {
        self.used.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_starts_at_one() {
        let mut ids = IdAllocator::new("BR");
        assert_eq!(ids.next_id(), "BR-000001");
        assert_eq!(ids.next_id(), "BR-000002");
        assert_eq!(ids.reserved_count(), 2);
    }

    #[test]
    fn test_reserved_ids_are_skipped() {
        let mut ids = IdAllocator::with_reserved("TN", ["TN-000002", "TN-000003"]);
        assert_eq!(ids.next_id(), "TN-000001");
        assert_eq!(ids.next_id(), "TN-000004");
        assert_eq!(ids.next_id(), "TN-000005");
    }

    #[test]
    fn test_allocate_returns_next_counter() {
        let mut used = HashSet::new();
        used.insert("UP-000007".to_string());

        let (id, next) = allocate("UP", &mut used, 7);
        assert_eq!(id, "UP-000008");
        assert_eq!(next, 9);
        assert!(used.contains("UP-000008"));
    }

    #[test]
    fn test_width_grows_past_six_digits() {
        assert_eq!(format_id("BR", 1_000_000), "BR-1000000");
        assert_eq!(format_id("BR", 42), "BR-000042");
    }
}
