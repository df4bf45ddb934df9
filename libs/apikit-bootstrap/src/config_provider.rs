use std::sync::Arc;

use apikit::ConfigProvider;

use crate::config::AppConfig;

/// [`ConfigProvider`] backed by the loaded [`AppConfig`]: modules see only
/// their own slice of the `modules` bag.
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }

    pub fn from_arc(config: Arc<AppConfig>) -> Self {
        Self(config)
    }

    pub fn inner(&self) -> &AppConfig {
        &self.0
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }
}
