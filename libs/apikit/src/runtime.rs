//! Host runtime: drives the registry through its lifecycle phases.
//!
//! init -> compose -> start -> serve -> stop. A unit that fails `init` is
//! disabled (its REST/GraphQL contributions are skipped) but the host still
//! starts; only binding the listener is fatal.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::compose::{compose, ComposeOptions};
use crate::context::ModuleCtxBuilder;
use crate::registry::ModuleRegistry;

#[derive(Clone, Debug)]
pub struct ShutdownOptions {
    /// Upper bound for each stateful unit's `stop`.
    pub stop_timeout: Duration,
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(10),
        }
    }
}

pub struct RunOptions {
    pub bind_addr: SocketAddr,
    pub graphql_path: String,
    pub shutdown: ShutdownOptions,
}

/// Run the host to completion. `finalize` lets the binary wrap the composed
/// router (root-path nesting, middleware) before it is bound; the router is
/// not touched afterwards.
pub async fn run<F>(
    registry: ModuleRegistry,
    ctxb: ModuleCtxBuilder,
    cancel: CancellationToken,
    opts: RunOptions,
    finalize: F,
) -> anyhow::Result<()>
where
    F: FnOnce(Router) -> Router,
{
    let disabled = init_modules(&registry, &ctxb).await;

    let router = compose(
        &registry,
        &ctxb,
        ComposeOptions {
            graphql_path: opts.graphql_path,
            skip_units: disabled.clone(),
        },
    );
    let router = finalize(router);

    let started = start_stateful(&registry, &disabled, &cancel).await;

    let listener = tokio::net::TcpListener::bind(opts.bind_addr).await?;
    tracing::info!(addr = %opts.bind_addr, "listening");

    let shutdown = cancel.clone();
    let serve = axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await });
    let result = serve.await;

    stop_stateful(&registry, &started, &cancel, opts.shutdown.stop_timeout).await;

    result.map_err(Into::into)
}

/// Initialize every unit; returns the names of units whose init failed.
async fn init_modules(registry: &ModuleRegistry, ctxb: &ModuleCtxBuilder) -> Vec<&'static str> {
    let mut disabled = Vec::new();
    for entry in registry.modules() {
        let ctx = ctxb.for_module(entry.name);
        match entry.core.init(&ctx).await {
            Ok(()) => tracing::debug!(unit = entry.name, "unit initialized"),
            Err(e) => {
                tracing::warn!(unit = entry.name, error = %e, "unit init failed; unit disabled");
                disabled.push(entry.name);
            }
        }
    }
    disabled
}

/// Start stateful units in registration order; returns the names that
/// actually started, for the reverse-order stop.
async fn start_stateful(
    registry: &ModuleRegistry,
    disabled: &[&'static str],
    cancel: &CancellationToken,
) -> Vec<&'static str> {
    let mut started = Vec::new();
    for entry in registry.modules() {
        if disabled.contains(&entry.name) {
            continue;
        }
        let Some(stateful) = &entry.stateful else {
            continue;
        };
        match stateful.start(cancel.clone()).await {
            Ok(()) => {
                tracing::debug!(unit = entry.name, "unit started");
                started.push(entry.name);
            }
            Err(e) => {
                tracing::warn!(unit = entry.name, error = %e, "unit start failed");
            }
        }
    }
    started
}

/// Stop started units in reverse start order, each bounded by the timeout.
async fn stop_stateful(
    registry: &ModuleRegistry,
    started: &[&'static str],
    cancel: &CancellationToken,
    timeout: Duration,
) {
    for name in started.iter().rev() {
        let Some(entry) = registry.modules().iter().find(|e| e.name == *name) else {
            continue;
        };
        let Some(stateful) = &entry.stateful else {
            continue;
        };
        match tokio::time::timeout(timeout, stateful.stop(cancel.clone())).await {
            Ok(Ok(())) => tracing::debug!(unit = name, "unit stopped"),
            Ok(Err(e)) => tracing::warn!(unit = name, error = %e, "unit stop failed"),
            Err(_) => tracing::warn!(unit = name, ?timeout, "unit stop timed out"),
        }
    }
}
