use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use apikit::{Module, ModuleCtx, Registrator, RegistryBuilder, RestfulModule, StatefulModule};

use crate::worker::{job_channel, Job, JobQueue, JobRunner};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourcesConfig {
    #[serde(default = "default_job_duration_ms")]
    pub job_duration_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            job_duration_ms: default_job_duration_ms(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_job_duration_ms() -> u64 {
    5000
}

fn default_queue_capacity() -> usize {
    16
}

/// Demo endpoint whose handler hands work to a module-owned worker instead
/// of spawning a detached thread.
pub struct ResourcesModule {
    queue: arc_swap::ArcSwapOption<QueueState>,
    runner: Mutex<Option<JobRunner>>,
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

struct QueueState {
    queue: JobQueue,
    job_duration: Duration,
}

impl Default for ResourcesModule {
    fn default() -> Self {
        Self {
            queue: arc_swap::ArcSwapOption::from(None),
            runner: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Module for ResourcesModule {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        let cfg: ResourcesConfig = ctx.config()?;
        let (queue, runner) = job_channel(cfg.queue_capacity);
        self.queue.store(Some(Arc::new(QueueState {
            queue,
            job_duration: Duration::from_millis(cfg.job_duration_ms),
        })));
        *self.runner.lock() = Some(runner);
        info!(capacity = cfg.queue_capacity, "resources module initialized");
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl RestfulModule for ResourcesModule {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        let state = self
            .queue
            .load()
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("job queue not initialized"))?
            .clone();
        Ok(router.merge(
            Router::new()
                .route("/resources", get(get_resources))
                .with_state(state),
        ))
    }
}

#[async_trait]
impl StatefulModule for ResourcesModule {
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        let runner = self
            .runner
            .lock()
            .take()
            .ok_or_else(|| anyhow::anyhow!("worker already started or not initialized"))?;
        *self.handle.lock() = Some(tokio::spawn(runner.run(cancel)));
        Ok(())
    }

    async fn stop(&self, cancel: CancellationToken) -> anyhow::Result<()> {
        cancel.cancel();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            handle.await?;
        }
        Ok(())
    }
}

async fn get_resources(State(state): State<Arc<QueueState>>) -> &'static str {
    state.queue.submit(Job {
        duration: state.job_duration,
    });
    "Resources endpoint is working"
}

fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
    let module = Arc::new(ResourcesModule::default());
    b.register_core_with_meta("resources", &["rest", "v1", "resources"], module.clone());
    b.register_rest_with_meta("resources", module.clone());
    b.register_stateful_with_meta("resources", module);
    Ok(())
}

inventory::submit! { Registrator(register) }
