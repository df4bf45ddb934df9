use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tracing::info;

use apikit::{
    GqlContribution, GraphqlModule, Module, ModuleCtx, Registrator, RegistryBuilder,
    RestfulModule,
};

use crate::domain::UserStore;

/// Demo user CRUD over a stub-backed store, exposed both as v1 REST routes
/// and a `user(id)` GraphQL query.
#[derive(Default)]
pub struct UsersModule {
    store: Arc<UserStore>,
}

#[async_trait]
impl Module for UsersModule {
    async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("users module initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for UsersModule {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        Ok(router.merge(crate::api::rest::routes(self.store.clone())))
    }
}

impl GraphqlModule for UsersModule {
    fn graphql_contribution(&self, _ctx: &ModuleCtx) -> GqlContribution {
        crate::api::gql::contribution(self.store.clone())
    }
}

fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
    let module = Arc::new(UsersModule::default());
    b.register_core_with_meta("users", &["rest", "v1", "user"], module.clone());
    b.register_rest_with_meta("users", module.clone());
    b.register_graphql_with_meta("users", module);
    Ok(())
}

inventory::submit! { Registrator(register) }
