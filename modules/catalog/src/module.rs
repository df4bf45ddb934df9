use std::sync::Arc;

use async_trait::async_trait;

use apikit::{
    GqlContribution, GraphqlModule, Module, ModuleCtx, Registrator, RegistryBuilder, SchemaBundle,
};

/// GraphQL-only unit: no REST routes, contributes `item(id)` through the
/// pre-built bundle path.
#[derive(Default)]
pub struct CatalogModule;

#[async_trait]
impl Module for CatalogModule {
    async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl GraphqlModule for CatalogModule {
    fn graphql_contribution(&self, _ctx: &ModuleCtx) -> GqlContribution {
        GqlContribution::Bundle(SchemaBundle::new(crate::schema::build_roots))
    }
}

fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
    let module = Arc::new(CatalogModule);
    b.register_core_with_meta("catalog", &["gql", "v1", "catalog"], module.clone());
    b.register_graphql_with_meta("catalog", module);
    Ok(())
}

inventory::submit! { Registrator(register) }
