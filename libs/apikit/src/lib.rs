//! # ApiKit - Module Registry & Router Composer
//!
//! A small kit for building modular HTTP APIs out of independently
//! registered endpoint units.
//!
//! ## How it works
//!
//! - Each endpoint unit (a crate under `modules/`) submits a [`registry::Registrator`]
//!   via `inventory::submit!` - an explicit registration list instead of
//!   filesystem scanning.
//! - On startup, [`registry::ModuleRegistry::discover_and_build`] collects every
//!   registrator into a validated registry. A failing registrator is logged
//!   and skipped; it never aborts startup.
//! - [`compose::compose`] walks the registry once: REST sub-routers are
//!   nested under a `/<version>` prefix inferred from the unit's declared
//!   path segments, GraphQL root fragments are accumulated globally and
//!   merged into at most one Query/Mutation/Subscription type each, and the
//!   result is one `axum::Router` the host mounts before serving.
//!
//! ## Example unit
//!
//! ```rust,ignore
//! use apikit::registry::{Registrator, RegistryBuilder};
//!
//! fn register(b: &mut RegistryBuilder) -> anyhow::Result<()> {
//!     let module = std::sync::Arc::new(HealthModule::default());
//!     b.register_core_with_meta("health", &["health"], module.clone());
//!     b.register_rest_with_meta("health", module);
//!     Ok(())
//! }
//!
//! inventory::submit! { Registrator(register) }
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Re-exported for unit crates that submit registrators.
pub use inventory;

pub mod compose;
pub mod context;
pub mod contracts;
pub mod error;
pub mod gql;
pub mod middleware;
pub mod registry;
pub mod runtime;
pub mod version;

pub use compose::{compose, ComposeOptions};
pub use context::{ConfigError, ConfigProvider, ModuleCtx, ModuleCtxBuilder};
pub use contracts::{GraphqlModule, Module, RestfulModule, StatefulModule};
pub use error::ApiError;
pub use gql::{GqlContribution, NamedField, NamedSubscriptionField, RootSet, SchemaBundle};
pub use registry::{ModuleRegistry, Registrator, RegistryBuilder};
pub use runtime::{run, RunOptions, ShutdownOptions};
pub use version::infer_version;
