pub mod module;
pub use module::ResourcesModule;

#[doc(hidden)]
pub mod worker;
