//! Application state module

use std::{fmt, sync::Arc};

use crate::domain::relay::RelayService;

/// Global application state
#[derive(Clone)]
pub struct AppState<R: RelayService> {
    /// Relay service
    pub relay: Arc<R>,
}

impl<R> AppState<R>
where
    R: RelayService,
{
    /// Create a new application state
    pub fn new(relay: R) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}

impl<R> fmt::Debug for AppState<R>
where
    R: RelayService,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("relay", &"RelayService")
            .finish()
    }
}

#[cfg(test)]
use crate::domain::relay::tests::MockRelayService;

#[cfg(test)]
pub fn test_state(relay: Option<MockRelayService>) -> AppState<MockRelayService> {
    AppState::new(relay.unwrap_or_else(MockRelayService::new))
}
