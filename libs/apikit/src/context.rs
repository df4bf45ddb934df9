use std::sync::Arc;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Provider of per-module configuration slices (raw JSON by module name).
pub trait ConfigProvider: Send + Sync {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration for module '{module}'")]
    Invalid {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-module view of shared runtime facilities: the module's own config
/// slice, an optional database pool, and the shutdown token.
#[derive(Clone)]
pub struct ModuleCtx {
    module: &'static str,
    config: Arc<dyn ConfigProvider>,
    db: Option<sqlx::PgPool>,
    cancel: CancellationToken,
}

impl ModuleCtx {
    pub fn module_name(&self) -> &'static str {
        self.module
    }

    /// Deserialize this module's config section. A missing section yields
    /// the type's defaults, so every module config must be fully defaulted.
    pub fn config<T: DeserializeOwned + Default>(&self) -> Result<T, ConfigError> {
        match self.config.get_module_config(self.module) {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(|source| ConfigError::Invalid {
                    module: self.module.to_string(),
                    source,
                })
            }
            None => Ok(T::default()),
        }
    }

    /// The shared database pool, when the host was configured with one.
    /// Acquisition is per request; the pool releases connections on every
    /// exit path, including errors.
    pub fn db_optional(&self) -> Option<&sqlx::PgPool> {
        self.db.as_ref()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Builds per-module contexts over the shared facilities.
#[derive(Clone)]
pub struct ModuleCtxBuilder {
    config: Arc<dyn ConfigProvider>,
    db: Option<sqlx::PgPool>,
    cancel: CancellationToken,
}

impl ModuleCtxBuilder {
    pub fn new(
        config: Arc<dyn ConfigProvider>,
        db: Option<sqlx::PgPool>,
        cancel: CancellationToken,
    ) -> Self {
        Self { config, db, cancel }
    }

    pub fn for_module(&self, module: &'static str) -> ModuleCtx {
        ModuleCtx {
            module,
            config: self.config.clone(),
            db: self.db.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapProvider(std::collections::HashMap<String, serde_json::Value>);

    impl ConfigProvider for MapProvider {
        fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
            self.0.get(module_name)
        }
    }

    #[derive(Debug, Default, PartialEq, serde::Deserialize)]
    struct DemoConfig {
        #[serde(default)]
        limit: u32,
    }

    fn builder(provider: MapProvider) -> ModuleCtxBuilder {
        ModuleCtxBuilder::new(Arc::new(provider), None, CancellationToken::new())
    }

    #[test]
    fn missing_section_yields_defaults() {
        let ctx = builder(MapProvider(Default::default())).for_module("demo");
        let cfg: DemoConfig = ctx.config().unwrap();
        assert_eq!(cfg, DemoConfig::default());
    }

    #[test]
    fn present_section_is_deserialized() {
        let mut map = std::collections::HashMap::new();
        map.insert("demo".to_string(), serde_json::json!({ "limit": 7 }));
        let ctx = builder(MapProvider(map)).for_module("demo");
        let cfg: DemoConfig = ctx.config().unwrap();
        assert_eq!(cfg.limit, 7);
    }

    #[test]
    fn malformed_section_is_an_error() {
        let mut map = std::collections::HashMap::new();
        map.insert("demo".to_string(), serde_json::json!({ "limit": "lots" }));
        let ctx = builder(MapProvider(map)).for_module("demo");
        let err = ctx.config::<DemoConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref module, .. } if module == "demo"));
    }
}
