use kubebuild_controller::ControllerHandle;
use kubebuild_storage::DynStore;
use std::sync::Arc;

use crate::config::AppConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub controller: ControllerHandle,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(store: DynStore, controller: ControllerHandle, config: AppConfig) -> Self {
        Self {
            store,
            controller,
            config: Arc::new(config),
        }
    }
}
