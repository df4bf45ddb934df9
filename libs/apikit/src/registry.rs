use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::contracts;

/// One registered endpoint unit with its declared path segments and the
/// capabilities it implements.
pub struct ModuleEntry {
    pub name: &'static str,
    /// Path segments used for version inference only (mirrors the unit's
    /// logical location, e.g. `["rest", "v1", "users"]`).
    pub path: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub graphql: Option<Arc<dyn contracts::GraphqlModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("has_rest", &self.rest.is_some())
            .field("has_graphql", &self.graphql.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// The function type submitted by unit crates via `inventory::submit!`.
///
/// A registrator may fail; that failure is the unit-load failure boundary:
/// the unit is logged and skipped, discovery continues.
pub struct Registrator(pub fn(&mut RegistryBuilder) -> anyhow::Result<()>);

inventory::collect!(Registrator);

/// The final registry, in registration order. Units are visited exactly
/// once each; no cross-unit ordering beyond that is guaranteed.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    /// Discover via inventory, have registrators fill the builder, then
    /// validate. A registrator error only drops that unit.
    pub fn discover_and_build() -> Result<Self, RegistryError> {
        let mut b = RegistryBuilder::default();
        for r in ::inventory::iter::<Registrator> {
            if let Err(e) = r.0(&mut b) {
                tracing::warn!(error = %e, "unit registration failed; skipping unit");
            }
        }
        b.build()
    }

    pub fn get_module(&self, name: &str) -> Option<Arc<dyn contracts::Module>> {
        self.modules
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.core.clone())
    }
}

/// Mutable builder that registrators feed. Keys are unit names;
/// uniqueness and capability binding are enforced at build time.
#[derive(Default)]
pub struct RegistryBuilder {
    order: Vec<&'static str>,
    core: HashMap<&'static str, Arc<dyn contracts::Module>>,
    path: HashMap<&'static str, &'static [&'static str]>,
    rest: HashMap<&'static str, Arc<dyn contracts::RestfulModule>>,
    graphql: HashMap<&'static str, Arc<dyn contracts::GraphqlModule>>,
    stateful: HashMap<&'static str, Arc<dyn contracts::StatefulModule>>,
    errors: Vec<String>,
}

impl RegistryBuilder {
    pub fn register_core_with_meta(
        &mut self,
        name: &'static str,
        path: &'static [&'static str],
        m: Arc<dyn contracts::Module>,
    ) {
        if name.starts_with('_') {
            self.errors
                .push(format!("unit name '{name}' uses the private-name prefix"));
            return;
        }
        if self.core.contains_key(name) {
            self.errors.push(format!("unit '{name}' is already registered"));
            return;
        }
        self.order.push(name);
        self.core.insert(name, m);
        self.path.insert(name, path);
    }

    pub fn register_rest_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::RestfulModule>,
    ) {
        self.rest.insert(name, m);
    }

    pub fn register_graphql_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::GraphqlModule>,
    ) {
        self.graphql.insert(name, m);
    }

    pub fn register_stateful_with_meta(
        &mut self,
        name: &'static str,
        m: Arc<dyn contracts::StatefulModule>,
    ) {
        self.stateful.insert(name, m);
    }

    /// Finalize: verify every capability binds to a known core and keep
    /// registration order.
    pub fn build(mut self) -> Result<ModuleRegistry, RegistryError> {
        if !self.errors.is_empty() {
            return Err(RegistryError::InvalidRegistryConfiguration {
                errors: self.errors,
            });
        }

        for n in self.rest.keys() {
            if !self.core.contains_key(n) {
                return Err(RegistryError::UnknownModule((*n).to_string()));
            }
        }
        for n in self.graphql.keys() {
            if !self.core.contains_key(n) {
                return Err(RegistryError::UnknownModule((*n).to_string()));
            }
        }
        for n in self.stateful.keys() {
            if !self.core.contains_key(n) {
                return Err(RegistryError::UnknownModule((*n).to_string()));
            }
        }

        let mut entries = Vec::with_capacity(self.order.len());
        for name in &self.order {
            let core = self
                .core
                .remove(name)
                .ok_or_else(|| RegistryError::CoreNotFound(name.to_string()))?;
            let path = self
                .path
                .remove(name)
                .ok_or_else(|| RegistryError::CoreNotFound(name.to_string()))?;

            entries.push(ModuleEntry {
                name,
                path,
                core,
                rest: self.rest.remove(name),
                graphql: self.graphql.remove(name),
                stateful: self.stateful.remove(name),
            });
        }

        tracing::info!(
            units = ?entries.iter().map(|e| e.name).collect::<Vec<_>>(),
            "unit registry built"
        );

        Ok(ModuleRegistry { modules: entries })
    }
}

/// Structured errors for the unit registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown unit '{0}' referenced by a capability registration")]
    UnknownModule(String),
    #[error("core not found for '{0}'")]
    CoreNotFound(String),
    #[error("invalid registry configuration:\n{errors:#?}")]
    InvalidRegistryConfiguration { errors: Vec<String> },
}
