pub mod module;
pub use module::UsersModule;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod domain;
