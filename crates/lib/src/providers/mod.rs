//! # Providers
//!
//! Model handles for each supported AI backend, the settings they are built
//! from, and the registry that resolves a logical role into a handle.

pub mod ai;
pub mod factory;
pub mod settings;

pub use factory::{default_model_id, ModelProvider, ProviderRegistry, ResolvedModel};
pub use settings::{ModelRole, ProviderCredentials, ProviderKind, ProviderSettings};
