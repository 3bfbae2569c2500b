//! buildcfg - build-configuration resolution for app packaging
//!
//! Loads layered property files (defaults, per-environment overrides, an
//! environment snapshot, a secrets file), validates the merged result
//! against a schema, resolves signing material and emits a deterministic
//! build descriptor for the packaging backend.

pub mod descriptor;
pub mod emit;
pub mod error;
pub mod resolver;
pub mod schema;
pub mod secrets;
pub mod source;
pub mod variant;

pub use buildcfg_properties::PropertyValue;
pub use descriptor::ResolvedDescriptor;
pub use emit::{EmitFormat, Emitter};
pub use error::{ErrorCode, ResolveError, Violation};
pub use resolver::{ConfigResolver, MergedConfig, ResolutionState};
pub use schema::Schema;
pub use secrets::{SecretResolver, SigningMaterialRef};
pub use source::{LayerRole, Locator, PropertyLayer, PropertySource};
pub use variant::Variant;
