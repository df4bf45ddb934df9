use std::sync::Arc;

use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};
use async_graphql::Value;
use uuid::Uuid;

use apikit::{GqlContribution, NamedField, RootSet};

use crate::domain::{User, UserStore};

/// `user(id: ID!)` query root fragment plus the `User` output type.
pub fn contribution(store: Arc<UserStore>) -> GqlContribution {
    GqlContribution::Roots(
        RootSet::new()
            .query_field(
                NamedField::new("user", TypeRef::named_nn("User"), move |ctx| {
                    let store = store.clone();
                    FieldFuture::new(async move {
                        let raw = ctx.args.try_get("id")?;
                        let id = Uuid::parse_str(raw.string()?)
                            .map_err(|e| async_graphql::Error::new(format!("invalid user id: {e}")))?;
                        Ok(Some(FieldValue::owned_any(store.get(id))))
                    })
                })
                .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
            )
            .register(user_type()),
    )
}

fn user_type() -> Object {
    Object::new("User")
        .field(Field::new("id", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let user = ctx.parent_value.try_downcast_ref::<User>()?;
                Ok(Some(Value::from(user.id.to_string())))
            })
        }))
        .field(Field::new(
            "username",
            TypeRef::named_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let user = ctx.parent_value.try_downcast_ref::<User>()?;
                    Ok(Some(Value::from(user.username.clone())))
                })
            },
        ))
        .field(Field::new(
            "email",
            TypeRef::named_nn(TypeRef::STRING),
            |ctx| {
                FieldFuture::new(async move {
                    let user = ctx.parent_value.try_downcast_ref::<User>()?;
                    Ok(Some(Value::from(user.email.clone())))
                })
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apikit::gql::GqlAccumulator;

    #[tokio::test]
    async fn user_query_resolves_the_stub() {
        let mut acc = GqlAccumulator::new();
        acc.absorb("users", contribution(Arc::new(UserStore::default())))
            .unwrap();
        let schema = acc.finish().unwrap().unwrap();

        let id = Uuid::new_v4();
        let query = format!(r#"{{ user(id: "{id}") {{ id username email }} }}"#);
        let resp = schema.execute(query.as_str()).await;
        assert!(resp.errors.is_empty(), "{:?}", resp.errors);
        let data = resp.data.into_json().unwrap();
        assert_eq!(data["user"]["id"], id.to_string());
        assert_eq!(data["user"]["username"], "demo");
    }

    #[tokio::test]
    async fn invalid_id_surfaces_as_a_graphql_error() {
        let mut acc = GqlAccumulator::new();
        acc.absorb("users", contribution(Arc::new(UserStore::default())))
            .unwrap();
        let schema = acc.finish().unwrap().unwrap();

        let resp = schema.execute(r#"{ user(id: "nope") { id } }"#).await;
        assert!(!resp.errors.is_empty());
        assert!(resp.errors[0].message.contains("invalid user id"));
    }
}
