//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during session
//! execution. Unlike example-based tests that check specific scenarios,
//! invariants verify behavioral properties across all possible event
//! sequences.
//!
//! # Architecture
//!
//! Observable state is extracted from a session into a [`SessionSnapshot`],
//! then every registered [`Invariant`] is checked against it.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SessionSnapshot::capture(&session);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{ActiveConversationRead, HistoryOrdered, PresenceMirrored, TimersExclusive};
pub use snapshot::{ConversationSnapshot, SessionSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against session state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SessionSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard session invariants.
    ///
    /// Includes:
    /// - [`ActiveConversationRead`]: the conversation on screen has no unread
    /// - [`HistoryOrdered`]: histories sorted by time, no duplicate ids
    /// - [`PresenceMirrored`]: `is_online` agrees with the presence set
    /// - [`TimersExclusive`]: heartbeat only while open, backoff only while
    ///   closed
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ActiveConversationRead);
        registry.add(HistoryOrdered);
        registry.add(PresenceMirrored);
        registry.add(TimersExclusive);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SessionSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SessionSnapshot::default()).is_ok());
    }

    #[test]
    fn violations_are_collected() {
        let registry = InvariantRegistry::standard();
        let snapshot = SessionSnapshot { heartbeat_armed: true, backoff_armed: true, ..Default::default() };

        let violations = registry.check_all(&snapshot).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].invariant, "timers_exclusive");
    }
}
