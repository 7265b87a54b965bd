//! Reflection snapshot of mockable types.
//!
//! Mock synthesis never inspects Rust types directly. It works from
//! [`TypeDescriptor`]s supplied by a [`Reflector`], usually a
//! [`TypeCatalog`] populated in code or loaded from YAML. Classes may carry a
//! real implementation ([`RealObject`]) that proxies fall back to.

mod catalog;
mod object;
mod types;

pub use catalog::{CatalogFile, Reflector, TypeCatalog};
pub use object::{ClassDefinition, Constructor, MethodTable, RealObject};
pub use types::{
    is_identifier, is_type_name, Arity, MethodSignature, Parameter, TargetKind, TypeDescriptor,
    TypeTag, TypeTagError,
};

pub(crate) use types::short_name;
