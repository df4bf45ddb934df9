use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, TypeRef};
use async_graphql::Value;
use uuid::Uuid;

use apikit::{NamedField, RootSet};

#[derive(Debug, Clone)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: String,
}

impl Item {
    fn stub(id: Uuid) -> Self {
        Self {
            id,
            title: "Book".to_string(),
            description: "A random book you find on a shelf.".to_string(),
        }
    }
}

/// The catalog schema piece is assembled here, away from the module type;
/// the module hands it over as a pre-built bundle.
pub fn build_roots() -> anyhow::Result<RootSet> {
    Ok(RootSet::new()
        .query_field(
            NamedField::new("item", TypeRef::named_nn("Item"), |ctx| {
                FieldFuture::new(async move {
                    let raw = ctx.args.try_get("id")?;
                    let id = Uuid::parse_str(raw.string()?)
                        .map_err(|e| async_graphql::Error::new(format!("invalid item id: {e}")))?;
                    Ok(Some(FieldValue::owned_any(Item::stub(id))))
                })
            })
            .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
        )
        .register(item_type()))
}

fn item_type() -> Object {
    let string_field = |name: &'static str, get: fn(&Item) -> String| {
        Field::new(name, TypeRef::named_nn(TypeRef::STRING), move |ctx| {
            FieldFuture::new(async move {
                let item = ctx.parent_value.try_downcast_ref::<Item>()?;
                Ok(Some(Value::from(get(item))))
            })
        })
    };

    Object::new("Item")
        .field(Field::new("id", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let item = ctx.parent_value.try_downcast_ref::<Item>()?;
                Ok(Some(Value::from(item.id.to_string())))
            })
        }))
        .field(string_field("title", |i| i.title.clone()))
        .field(string_field("description", |i| i.description.clone()))
}
