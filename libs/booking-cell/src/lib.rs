pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use shared_config::AppConfig;
use shared_database::BookingStore;
use shared_models::events::EventBus;
use uuid::Uuid;

/// One async mutex per provider. Admission holds a provider's lock across its
/// conflict check and insert so concurrent bookings serialize per provider
/// while leaving other providers untouched.
#[derive(Clone, Default)]
pub struct ProviderLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ProviderLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, provider_id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(provider_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BookingStore>,
    pub locks: ProviderLocks,
    pub events: EventBus,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn BookingStore>) -> Self {
        Self {
            config,
            store,
            locks: ProviderLocks::new(),
            events: EventBus::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_are_per_provider() {
        let locks = ProviderLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(Arc::ptr_eq(&locks.lock_for(a), &locks.lock_for(a)));
        assert!(!Arc::ptr_eq(&locks.lock_for(a), &locks.lock_for(b)));
    }
}
