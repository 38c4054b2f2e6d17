/// Monotonic version counter.
///
/// Producers call [`changed`](Self::changed); consumers remember the last
/// version they acted on and compare. This is how effect "shader changed"
/// and pass "topology changed" notifications reach the material manager and
/// the resolver without a listener registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChangeTracker {
    version: u64,
}

impl ChangeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self { version: 0 }
    }

    pub fn changed(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_bumps_version() {
        let mut tracker = ChangeTracker::new();
        assert_eq!(tracker.version(), 0);

        tracker.changed();
        tracker.changed();
        assert_eq!(tracker.version(), 2);
    }
}
