pub mod participant;

use std::sync::Arc;

use crate::{config::AppConfig, dao::game_store::GameStore, notify::NotificationQueue};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;

/// Central application state: the installed storage backend, the outbound
/// notification queue and the runtime configuration.
pub struct AppState {
    store: Arc<dyn GameStore>,
    notifications: NotificationQueue,
    config: AppConfig,
}

impl AppState {
    /// Assemble the shared state, wrapped in an [`Arc`] so it can be cloned
    /// cheaply across tasks.
    pub fn new(
        store: Arc<dyn GameStore>,
        notifications: NotificationQueue,
        config: AppConfig,
    ) -> SharedState {
        Arc::new(Self {
            store,
            notifications,
            config,
        })
    }

    /// Handle to the storage backend.
    pub fn store(&self) -> Arc<dyn GameStore> {
        self.store.clone()
    }

    /// Producer handle to the notification queue.
    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
