//! Type catalogs: where the factory looks up descriptors and real
//! implementations.

use super::object::{ClassDefinition, Constructor, RealObject};
use super::types::{TargetKind, TypeDescriptor};
use crate::error::MockError;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Source of type information for proxy synthesis.
pub trait Reflector: Send + Sync {
    /// Descriptor of `type_name`. Unknown types fail with
    /// [`MockError::SynthesisFailure`].
    fn reflect(&self, type_name: &str) -> Result<TypeDescriptor, MockError>;

    /// Real implementation of a class, if one is registered.
    fn class(&self, type_name: &str) -> Option<ClassDefinition>;
}

/// On-disk catalog layout.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

impl CatalogFile {
    /// Parse without validating descriptors.
    pub fn parse(contents: &str) -> Result<Self, anyhow::Error> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Every problem in the file, prefixed with the type it belongs to.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        for descriptor in &self.types {
            if !seen.insert(descriptor.name.as_str()) {
                problems.push(format!("{}: type declared more than once", descriptor.name));
            }
            for problem in descriptor.problems() {
                problems.push(format!("{}: {problem}", descriptor.name));
            }
        }
        problems
    }
}

/// In-memory [`Reflector`].
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<HashMap<String, TypeDescriptor>>,
    implementations: RwLock<HashMap<String, Constructor>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        Self::from_yaml_str(&contents)
    }

    /// Load a validated catalog. Classes loaded this way have no real
    /// implementation until [`TypeCatalog::implement`] attaches one.
    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let file = CatalogFile::parse(contents)?;
        let problems = file.problems();
        if !problems.is_empty() {
            anyhow::bail!("Invalid type catalog:\n  {}", problems.join("\n  "));
        }
        let catalog = Self::new();
        for descriptor in file.types {
            catalog.register(descriptor);
        }
        Ok(catalog)
    }

    /// Add or replace a descriptor.
    pub fn register(&self, descriptor: TypeDescriptor) {
        debug!(type_name = %descriptor.name, kind = %descriptor.kind, "Registered type");
        self.types.write().insert(descriptor.name.clone(), descriptor);
    }

    /// Add a class with its real implementation.
    pub fn register_class(&self, definition: ClassDefinition) {
        let name = definition.descriptor().name.clone();
        self.implementations
            .write()
            .insert(name, definition.constructor().clone());
        self.register(definition.descriptor().clone());
    }

    /// Attach a real implementation to an already registered class.
    pub fn implement<F>(&self, type_name: &str, constructor: F) -> Result<(), MockError>
    where
        F: Fn(&[Value]) -> Result<Arc<dyn RealObject>, MockError> + Send + Sync + 'static,
    {
        match self.types.read().get(type_name) {
            Some(descriptor) if descriptor.kind == TargetKind::Class => {}
            Some(_) => {
                return Err(MockError::synthesis(
                    type_name,
                    "interfaces cannot have an implementation",
                ))
            }
            None => return Err(MockError::synthesis(type_name, "type not found")),
        }
        self.implementations
            .write()
            .insert(type_name.to_string(), Arc::new(constructor));
        Ok(())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.read().contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }

    /// All descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<TypeDescriptor> {
        let mut descriptors: Vec<TypeDescriptor> = self.types.read().values().cloned().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }
}

impl Reflector for TypeCatalog {
    fn reflect(&self, type_name: &str) -> Result<TypeDescriptor, MockError> {
        self.types
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| MockError::synthesis(type_name, "type not found"))
    }

    fn class(&self, type_name: &str) -> Option<ClassDefinition> {
        let constructor = self.implementations.read().get(type_name).cloned()?;
        let descriptor = self.types.read().get(type_name).cloned()?;
        Some(ClassDefinition::from_parts(descriptor, constructor))
    }
}

impl std::fmt::Debug for TypeCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("TypeCatalog").field("types", &names).finish()
    }
}
