//! REST/GraphQL router composition.
//!
//! Walks the built registry once, nests every unit's REST sub-router under
//! its inferred version prefix, accumulates GraphQL root fragments globally
//! and mounts the merged schema (at most one endpoint, unversioned). Every
//! per-unit failure is isolated: the unit is logged and dropped, composition
//! continues with the rest.

use std::panic::AssertUnwindSafe;

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::GraphQL;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;

use crate::context::ModuleCtxBuilder;
use crate::gql::{GqlAccumulator, GqlError};
use crate::registry::ModuleRegistry;
use crate::version::infer_version;

pub struct ComposeOptions {
    /// Mount path of the single global GraphQL endpoint.
    pub graphql_path: String,
    /// Units excluded from composition (e.g. the host disabled them after
    /// a failed init).
    pub skip_units: Vec<&'static str>,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            graphql_path: "/graphql".to_string(),
            skip_units: Vec::new(),
        }
    }
}

/// Compose the full router from the registry. Infallible by design: the
/// worst case is a router with fewer routes than registered.
pub fn compose(registry: &ModuleRegistry, ctxb: &ModuleCtxBuilder, opts: ComposeOptions) -> Router {
    let mut router = Router::new();
    let mut mounted: Vec<String> = Vec::new();
    let mut gql = GqlAccumulator::new();
    let mut gql_abandoned = false;

    for entry in registry.modules() {
        if opts.skip_units.contains(&entry.name) {
            tracing::debug!(unit = entry.name, "unit skipped");
            continue;
        }
        let ctx = ctxb.for_module(entry.name);
        let version = infer_version(entry.path);

        if let Some(rest) = &entry.rest {
            // Route conflicts surface as panics inside axum; catch them so
            // one bad unit cannot take down the whole surface.
            let before = router.clone();
            let attempt = std::panic::catch_unwind(AssertUnwindSafe(|| {
                let sub = rest.register_rest(&ctx, Router::new())?;
                Ok::<Router, anyhow::Error>(match version {
                    Some(v) => router.clone().nest(&format!("/{v}"), sub),
                    None => router.clone().merge(sub),
                })
            }));
            match attempt {
                Ok(Ok(next)) => {
                    router = next;
                    mounted.push(match version {
                        Some(v) => format!("/{v} <- {}", entry.name),
                        None => format!("/ <- {}", entry.name),
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(unit = entry.name, error = %e, "REST mount failed; unit dropped");
                    router = before;
                }
                Err(_) => {
                    tracing::warn!(unit = entry.name, "REST mount panicked (route conflict?); unit dropped");
                    router = before;
                }
            }
        }

        if let (Some(graphql), false) = (&entry.graphql, gql_abandoned) {
            match gql.absorb(entry.name, graphql.graphql_contribution(&ctx)) {
                Ok(()) => {}
                Err(e @ GqlError::Extraction { .. }) => {
                    tracing::warn!(unit = entry.name, error = %e, "GraphQL extraction failed; unit dropped");
                }
                Err(e) => {
                    // Field collisions poison the whole schema: serving a
                    // union with a silently shadowed field is worse than
                    // serving no GraphQL at all.
                    tracing::error!(unit = entry.name, error = %e, "GraphQL merge failed; endpoint disabled");
                    gql_abandoned = true;
                }
            }
        }
    }

    if !gql_abandoned {
        match gql.finish() {
            Ok(Some(schema)) => {
                let endpoint = opts.graphql_path.clone();
                let page = move || {
                    let endpoint = endpoint.clone();
                    async move {
                        Html(GraphiQLSource::build().endpoint(&endpoint).finish()).into_response()
                    }
                };
                router = router.route(
                    &opts.graphql_path,
                    get(page).post_service(GraphQL::new(schema)),
                );
                mounted.push(format!("{} <- graphql", opts.graphql_path));
            }
            Ok(None) => {
                tracing::debug!("no GraphQL contributions; endpoint not mounted");
            }
            Err(e) => {
                tracing::error!(error = %e, "GraphQL schema build failed; endpoint disabled");
            }
        }
    }

    tracing::debug!(routes = ?mounted, "routes generated");
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_graphql::dynamic::{FieldFuture, TypeRef};
    use async_graphql::Value;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use crate::context::{ConfigProvider, ModuleCtx};
    use crate::contracts::{GraphqlModule, Module, RestfulModule};
    use crate::gql::{GqlContribution, NamedField, RootSet};
    use crate::registry::RegistryBuilder;

    struct NoConfig;
    impl ConfigProvider for NoConfig {
        fn get_module_config(&self, _m: &str) -> Option<&serde_json::Value> {
            None
        }
    }

    fn ctxb() -> ModuleCtxBuilder {
        ModuleCtxBuilder::new(
            Arc::new(NoConfig),
            None,
            tokio_util::sync::CancellationToken::new(),
        )
    }

    struct Core;
    #[async_trait::async_trait]
    impl Module for Core {
        async fn init(&self, _ctx: &ModuleCtx) -> anyhow::Result<()> {
            Ok(())
        }
        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    }

    struct FixedRoute(&'static str);
    impl RestfulModule for FixedRoute {
        fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            Ok(router.route(self.0, get(|| async { "ok" })))
        }
    }

    struct BrokenRest;
    impl RestfulModule for BrokenRest {
        fn register_rest(&self, _ctx: &ModuleCtx, _router: Router) -> anyhow::Result<Router> {
            anyhow::bail!("cannot build routes")
        }
    }

    struct PingGql;
    impl GraphqlModule for PingGql {
        fn graphql_contribution(&self, _ctx: &ModuleCtx) -> GqlContribution {
            GqlContribution::Roots(RootSet::new().query_field(NamedField::new(
                "ping",
                TypeRef::named_nn(TypeRef::STRING),
                |_ctx| FieldFuture::new(async { Ok(Some(Value::from("pong"))) }),
            )))
        }
    }

    async fn status_of(router: Router, method: &str, uri: &str) -> StatusCode {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        router.oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn versioned_unit_is_nested_under_its_prefix() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("widgets", &["rest", "v2", "widgets"], Arc::new(Core));
        b.register_rest_with_meta("widgets", Arc::new(FixedRoute("/widgets")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(
            status_of(router.clone(), "GET", "/v2/widgets").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(router, "GET", "/widgets").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn unversioned_unit_mounts_at_root() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("health", &["rest", "health"], Arc::new(Core));
        b.register_rest_with_meta("health", Arc::new(FixedRoute("/health")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(status_of(router, "GET", "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn failing_rest_unit_does_not_affect_others() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("bad", &["v1", "bad"], Arc::new(Core));
        b.register_rest_with_meta("bad", Arc::new(BrokenRest));
        b.register_core_with_meta("good", &["v1", "good"], Arc::new(Core));
        b.register_rest_with_meta("good", Arc::new(FixedRoute("/good")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(status_of(router, "GET", "/v1/good").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn conflicting_route_drops_the_later_unit_only() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("first", &["v1", "first"], Arc::new(Core));
        b.register_rest_with_meta("first", Arc::new(FixedRoute("/thing")));
        b.register_core_with_meta("second", &["v1", "second"], Arc::new(Core));
        b.register_rest_with_meta("second", Arc::new(FixedRoute("/thing")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(status_of(router, "GET", "/v1/thing").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn graphql_endpoint_serves_the_merged_schema() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("pinger", &["gql", "ping"], Arc::new(Core));
        b.register_graphql_with_meta("pinger", Arc::new(PingGql));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        let req = Request::builder()
            .method("POST")
            .uri("/graphql")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"query":"{ ping }"}"#))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"]["ping"], "pong");
    }

    #[tokio::test]
    async fn without_contributions_graphql_route_is_absent() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("health", &["health"], Arc::new(Core));
        b.register_rest_with_meta("health", Arc::new(FixedRoute("/health")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(
            status_of(router, "GET", "/graphql").await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn field_collision_disables_graphql_but_not_rest() {
        let mut b = RegistryBuilder::default();
        b.register_core_with_meta("a", &["a"], Arc::new(Core));
        b.register_graphql_with_meta("a", Arc::new(PingGql));
        b.register_core_with_meta("b", &["b"], Arc::new(Core));
        b.register_graphql_with_meta("b", Arc::new(PingGql));
        b.register_core_with_meta("health", &["health"], Arc::new(Core));
        b.register_rest_with_meta("health", Arc::new(FixedRoute("/health")));
        let reg = b.build().unwrap();

        let router = compose(&reg, &ctxb(), ComposeOptions::default());
        assert_eq!(
            status_of(router.clone(), "GET", "/health").await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(router, "GET", "/graphql").await,
            StatusCode::NOT_FOUND
        );
    }
}
