//! Endpoint failover state.
//!
//! Holds the ordered endpoint list and the pointer to the active one.
//! Switching advances through the priority order and wraps past the last
//! entry, so there is always a next endpoint to try.

use std::sync::Mutex;

use tracing::warn;

/// Cyclic pointer over the configured endpoints, highest priority first.
#[derive(Debug)]
pub struct FailoverController {
    endpoints: Vec<String>,
    current: Mutex<String>,
}

impl FailoverController {
    /// Build a controller starting at the first (primary) endpoint.
    ///
    /// The endpoint list must be non-empty; config validation guarantees it.
    pub fn new(endpoints: Vec<String>) -> Self {
        let current = Mutex::new(endpoints[0].clone());
        Self { endpoints, current }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, String> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The active endpoint.
    pub fn current(&self) -> String {
        self.lock().clone()
    }

    /// Advance to the next endpoint in priority order, wrapping at the end.
    ///
    /// If the current pointer is somehow not in the list, reset to the
    /// highest-priority endpoint instead of failing.
    pub fn switch(&self) -> String {
        let mut current = self.lock();
        let next = match self.endpoints.iter().position(|e| e == &*current) {
            Some(index) => self.endpoints[(index + 1) % self.endpoints.len()].clone(),
            None => {
                warn!(stale = %*current, "active endpoint not in priority list; resetting");
                self.endpoints[0].clone()
            }
        };
        *current = next.clone();
        next
    }

    #[cfg(test)]
    fn force_current(&self, endpoint: &str) {
        *self.lock() = endpoint.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> FailoverController {
        FailoverController::new(vec![
            "primary".to_string(),
            "fallback".to_string(),
            "fallback-pro".to_string(),
            "fallback-flash".to_string(),
        ])
    }

    #[test]
    fn test_starts_at_primary() {
        assert_eq!(controller().current(), "primary");
    }

    #[test]
    fn test_switch_advances_in_priority_order() {
        let failover = controller();
        assert_eq!(failover.switch(), "fallback");
        assert_eq!(failover.switch(), "fallback-pro");
        assert_eq!(failover.switch(), "fallback-flash");
        assert_eq!(failover.switch(), "primary");
    }

    #[test]
    fn test_n_switches_return_to_origin() {
        let failover = controller();
        let origin = failover.current();
        for _ in 0..4 {
            failover.switch();
        }
        assert_eq!(failover.current(), origin);
    }

    #[test]
    fn test_unknown_current_resets_to_first() {
        let failover = controller();
        failover.force_current("decommissioned");
        assert_eq!(failover.switch(), "primary");
    }

    #[test]
    fn test_single_endpoint_wraps_to_itself() {
        let failover = FailoverController::new(vec!["only".to_string()]);
        assert_eq!(failover.switch(), "only");
        assert_eq!(failover.current(), "only");
    }
}
