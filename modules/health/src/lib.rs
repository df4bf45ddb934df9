pub mod module;
pub use module::HealthModule;
