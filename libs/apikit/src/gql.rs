//! GraphQL root accumulation and merge.
//!
//! Units contribute named root fields built on [`async_graphql::dynamic`]
//! types. Accumulation is global: every unit's fragments land in one pot
//! regardless of the unit's REST version, and at most one schema is built
//! from the union. Same-named fields from two units are a hard merge error,
//! not a silent shadow.

use std::collections::HashMap;

use async_graphql::dynamic::{
    Field, FieldFuture, InputValue, Object, ResolverContext, Schema, SchemaError, Subscription,
    SubscriptionField, SubscriptionFieldFuture, Type, TypeRef,
};
use thiserror::Error;

/// A root field that remembers its own name.
///
/// `dynamic::Field` does not expose the name it was created with, so the
/// merge step could not detect cross-unit collisions from the raw type.
pub struct NamedField {
    name: String,
    field: Field,
}

impl NamedField {
    pub fn new<N, F>(name: N, ty: TypeRef, resolver: F) -> Self
    where
        N: Into<String>,
        F: for<'a> Fn(ResolverContext<'a>) -> FieldFuture<'a> + Send + Sync + 'static,
    {
        let name = name.into();
        let field = Field::new(name.clone(), ty, resolver);
        Self { name, field }
    }

    pub fn argument(mut self, input: InputValue) -> Self {
        self.field = self.field.argument(input);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Subscription counterpart of [`NamedField`]; the dynamic schema uses a
/// distinct field type for subscription roots.
pub struct NamedSubscriptionField {
    name: String,
    field: SubscriptionField,
}

impl NamedSubscriptionField {
    pub fn new<N, F>(name: N, ty: TypeRef, resolver: F) -> Self
    where
        N: Into<String>,
        F: for<'a> Fn(ResolverContext<'a>) -> SubscriptionFieldFuture<'a> + Send + Sync + 'static,
    {
        let name = name.into();
        let field = SubscriptionField::new(name.clone(), ty, resolver);
        Self { name, field }
    }

    pub fn argument(mut self, input: InputValue) -> Self {
        self.field = self.field.argument(input);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One unit's explicit root fragments, plus any auxiliary output types the
/// fields refer to.
#[derive(Default)]
pub struct RootSet {
    pub(crate) query: Vec<NamedField>,
    pub(crate) mutation: Vec<NamedField>,
    pub(crate) subscription: Vec<NamedSubscriptionField>,
    pub(crate) types: Vec<Type>,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query_field(mut self, field: NamedField) -> Self {
        self.query.push(field);
        self
    }

    pub fn mutation_field(mut self, field: NamedField) -> Self {
        self.mutation.push(field);
        self
    }

    pub fn subscription_field(mut self, field: NamedSubscriptionField) -> Self {
        self.subscription.push(field);
        self
    }

    /// Register an output/input type used by one of the root fields.
    pub fn register<T: Into<Type>>(mut self, ty: T) -> Self {
        self.types.push(ty.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.mutation.is_empty() && self.subscription.is_empty()
    }
}

/// Deferred root-set producer for units that assemble their schema piece
/// elsewhere. Extraction runs during composition; a failure there is
/// isolated to the owning unit, and an empty result is "no contribution".
pub struct SchemaBundle {
    producer: Box<dyn FnOnce() -> anyhow::Result<RootSet> + Send>,
}

impl SchemaBundle {
    pub fn new<F>(producer: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<RootSet> + Send + 'static,
    {
        Self {
            producer: Box::new(producer),
        }
    }

    pub(crate) fn extract(self) -> anyhow::Result<RootSet> {
        (self.producer)()
    }
}

/// How a unit participates in the global GraphQL schema. A unit contributes
/// through exactly one path.
pub enum GqlContribution {
    /// Explicit root fragments.
    Roots(RootSet),
    /// Pre-assembled bundle; root fragments are extracted at compose time.
    Bundle(SchemaBundle),
    /// No GraphQL capability.
    None,
}

#[derive(Debug, Error)]
pub enum GqlError {
    #[error(
        "duplicate {kind} field '{field}': contributed by both '{first}' and '{second}'"
    )]
    FieldCollision {
        kind: &'static str,
        field: String,
        first: String,
        second: String,
    },
    #[error("schema has mutation or subscription roots but no query root")]
    NoQueryRoot,
    #[error("schema bundle extraction failed for unit '{unit}'")]
    Extraction {
        unit: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("schema build failed: {0}")]
    Build(#[from] SchemaError),
}

/// Global accumulator: absorbs contributions unit by unit, then builds at
/// most one schema from the union.
#[derive(Default)]
pub struct GqlAccumulator {
    query: Vec<NamedField>,
    mutation: Vec<NamedField>,
    subscription: Vec<NamedSubscriptionField>,
    types: Vec<Type>,
    // field name -> owning unit, per operation kind
    query_owners: HashMap<String, String>,
    mutation_owners: HashMap<String, String>,
    subscription_owners: HashMap<String, String>,
}

impl GqlAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one unit's contribution in. Collisions abort the whole merge:
    /// a schema missing a field another unit promised is worse than no
    /// schema at all.
    pub fn absorb(&mut self, unit: &str, contribution: GqlContribution) -> Result<(), GqlError> {
        let roots = match contribution {
            GqlContribution::Roots(roots) => roots,
            GqlContribution::Bundle(bundle) => {
                let roots = bundle.extract().map_err(|source| GqlError::Extraction {
                    unit: unit.to_string(),
                    source,
                })?;
                if roots.is_empty() {
                    tracing::debug!(unit, "schema bundle extracted no root fields");
                    return Ok(());
                }
                roots
            }
            GqlContribution::None => return Ok(()),
        };

        for f in roots.query {
            claim(&mut self.query_owners, "query", f.name(), unit)?;
            self.query.push(f);
        }
        for f in roots.mutation {
            claim(&mut self.mutation_owners, "mutation", f.name(), unit)?;
            self.mutation.push(f);
        }
        for f in roots.subscription {
            claim(&mut self.subscription_owners, "subscription", f.name(), unit)?;
            self.subscription.push(f);
        }
        self.types.extend(roots.types);
        Ok(())
    }

    /// Build the merged schema. `Ok(None)` means no unit contributed
    /// anything and no endpoint should be mounted.
    pub fn finish(self) -> Result<Option<Schema>, GqlError> {
        if self.query.is_empty() {
            if self.mutation.is_empty() && self.subscription.is_empty() {
                return Ok(None);
            }
            return Err(GqlError::NoQueryRoot);
        }

        let mutation_name: Option<&str> = (!self.mutation.is_empty()).then_some("Mutation");
        let subscription_name: Option<&str> =
            (!self.subscription.is_empty()).then_some("Subscription");

        let mut query = Object::new("Query");
        for f in self.query {
            query = query.field(f.field);
        }
        let mut builder = Schema::build("Query", mutation_name, subscription_name).register(query);

        if mutation_name.is_some() {
            let mut mutation = Object::new("Mutation");
            for f in self.mutation {
                mutation = mutation.field(f.field);
            }
            builder = builder.register(mutation);
        }
        if subscription_name.is_some() {
            let mut subscription = Subscription::new("Subscription");
            for f in self.subscription {
                subscription = subscription.field(f.field);
            }
            builder = builder.register(subscription);
        }
        for ty in self.types {
            builder = builder.register(ty);
        }

        Ok(Some(builder.finish()?))
    }
}

fn claim(
    owners: &mut HashMap<String, String>,
    kind: &'static str,
    field: &str,
    unit: &str,
) -> Result<(), GqlError> {
    if let Some(first) = owners.get(field) {
        return Err(GqlError::FieldCollision {
            kind,
            field: field.to_string(),
            first: first.clone(),
            second: unit.to_string(),
        });
    }
    owners.insert(field.to_string(), unit.to_string());
    Ok(())
}
