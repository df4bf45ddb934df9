pub mod module;
pub use module::QrGeneratorModule;

#[doc(hidden)]
pub mod api;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod service;
