use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::context::ModuleCtx;
use crate::gql::GqlContribution;

/// Core module: wiring and per-module setup. Runs once during startup,
/// before the router is composed.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()>;
    fn as_any(&self) -> &dyn std::any::Any;
}

/// REST capability: contribute a sub-router built on a fresh `Router`.
///
/// Must be sync; runs during the compose pass. The returned router is
/// nested under the unit's inferred version prefix by the composer.
pub trait RestfulModule: Send + Sync {
    fn register_rest(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router>;
}

/// GraphQL capability: contribute root fragments (or a pre-built bundle)
/// to the global accumulator. GraphQL is unversioned; contributions from
/// all units are merged into one schema.
pub trait GraphqlModule: Send + Sync {
    fn graphql_contribution(&self, ctx: &ModuleCtx) -> GqlContribution;
}

/// Background capability: started after the router handoff, stopped in
/// reverse registration order on shutdown.
#[async_trait]
pub trait StatefulModule: Send + Sync {
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn stop(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}
