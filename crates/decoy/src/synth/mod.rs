//! Proxy type synthesis.
//!
//! A [`ProxySynthesizer`] turns a [`TypeDescriptor`](crate::reflect::TypeDescriptor)
//! into a [`ProxyDefinition`]: one [`MethodOverride`] per declared method plus
//! a constructor strategy. A [`ProxyLoader`] then makes the definition
//! instantiable. Definitions can also be rendered to Rust source for
//! ahead-of-time use.

mod definition;
mod loader;
mod render;
mod synthesizer;

pub use definition::{ConstructorStrategy, Fallback, MethodOverride, ProxyDefinition};
pub use loader::{InProcessLoader, ProxyLoader, ProxyType};
pub use synthesizer::ProxySynthesizer;
