use serde::{Deserialize, Serialize};

/// Identifies one fetch started by a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket(u64);

/// Decides whether the result of a fetch may still be applied to a screen.
///
/// Every fetch takes a ticket with `begin`. Only the most recent ticket is accepted, and nothing is
/// accepted once the screen has been unmounted. Dropping the fetch future itself cancels the
/// request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchGuard {
    generation: u64,
    mounted: bool,
}

impl Default for FetchGuard {
    fn default() -> Self {
        Self {
            generation: 0,
            mounted: true,
        }
    }
}

impl FetchGuard {
    /// Starts a new fetch. Earlier tickets become stale.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    pub fn accepts(&self, ticket: Ticket) -> bool {
        self.mounted && ticket.0 == self.generation
    }

    /// Marks the screen as gone. No result is accepted afterwards.
    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_accepted() {
        let mut guard = FetchGuard::default();
        let first = guard.begin();
        assert!(guard.accepts(first));
        let second = guard.begin();
        assert!(!guard.accepts(first));
        assert!(guard.accepts(second));
    }

    #[test]
    fn test_unmounted_accepts_nothing() {
        let mut guard = FetchGuard::default();
        let ticket = guard.begin();
        guard.unmount();
        assert!(!guard.is_mounted());
        assert!(!guard.accepts(ticket));
    }
}
