pub mod module;
pub use module::CatalogModule;

#[doc(hidden)]
pub mod schema;
