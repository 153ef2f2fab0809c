//! Round robin host ordering

use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotates the candidate list with a shared atomic cursor
///
/// Each apply rotates the input left by `cursor mod len` and increments the
/// cursor, so successive calls cycle through every rotation before repeating.
/// Not stats-aware.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, endpoints: &[String]) -> Vec<String> {
        if endpoints.len() <= 1 {
            return endpoints.to_vec();
        }

        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        let mut rotated = endpoints.to_vec();
        rotated.rotate_left(cursor % endpoints.len());
        rotated
    }
}
