use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tracing::{debug, info};

use apikit::{Module, ModuleCtx, Registrator, RegistryBuilder, RestfulModule};

use crate::api::QrState;
use crate::config::QrGeneratorConfig;
use crate::service::QrService;

/// QR PNG generator, mounted under v1.
pub struct QrGeneratorModule {
    // Built during init; read-mostly afterwards.
    state: arc_swap::ArcSwapOption<QrState>,
}

impl Default for QrGeneratorModule {
    fn default() -> Self {
        Self {
            state: arc_swap::ArcSwapOption::from(None),
        }
    }
}

#[async_trait]
impl Module for QrGeneratorModule {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: QrGeneratorConfig = ctx.config()?;
        debug!(watermark = ?cfg.watermark_path, "loaded qr_generator config");

        let service = QrService::new(cfg.watermark_path.as_deref().map(Path::new))?;
        self.state.store(Some(Arc::new(QrState {
            service: Arc::new(service),
            default_url: Arc::from(cfg.default_url.as_str()),
        })));

        info!("qr_generator module initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for QrGeneratorModule {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        let state = self
            .state
            .load()
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("qr service not initialized"))?
            .clone();
        Ok(router.merge(crate::api::routes((*state).clone())))
    }
}

fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
    let module = Arc::new(QrGeneratorModule::default());
    b.register_core_with_meta("qr_generator", &["rest", "v1", "qr"], module.clone());
    b.register_rest_with_meta("qr_generator", module);
    Ok(())
}

inventory::submit! { Registrator(register) }
