use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use apikit::{Module, ModuleCtx, Registrator, RegistryBuilder, RestfulModule};

/// Unversioned liveness probe: `GET /health` answers 204 with an empty
/// body, no side effects.
#[derive(Default)]
pub struct HealthModule;

#[async_trait]
impl Module for HealthModule {
    async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for HealthModule {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        Ok(router.route("/health", get(health)))
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
    let module = Arc::new(HealthModule);
    b.register_core_with_meta("health", &["rest", "health"], module.clone());
    b.register_rest_with_meta("health", module);
    Ok(())
}

inventory::submit! { Registrator(register) }
