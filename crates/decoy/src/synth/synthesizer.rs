//! Builds and caches proxy definitions from type descriptors.

use super::definition::{ConstructorStrategy, Fallback, MethodOverride, ProxyDefinition};
use crate::error::MockError;
use crate::reflect::{is_identifier, TargetKind, TypeDescriptor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Synthesizes one proxy definition per proxy name.
///
/// A name is synthesized at most once; later requests for the same name
/// return the cached definition.
#[derive(Debug, Default)]
pub struct ProxySynthesizer {
    cache: RwLock<HashMap<String, Arc<ProxyDefinition>>>,
}

impl ProxySynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn synthesize(
        &self,
        target: &TypeDescriptor,
        proxy_name: &str,
        override_constructor: bool,
    ) -> Result<Arc<ProxyDefinition>, MockError> {
        if let Some(existing) = self.cache.read().get(proxy_name) {
            if existing.target != target.name {
                return Err(MockError::synthesis(
                    &target.name,
                    format!(
                        "proxy name {proxy_name} is already used for {}",
                        existing.target
                    ),
                ));
            }
            return Ok(existing.clone());
        }

        if !is_identifier(proxy_name) {
            return Err(MockError::synthesis(
                &target.name,
                format!("invalid proxy name '{proxy_name}'"),
            ));
        }
        target.validate()?;

        let definition = Arc::new(build_definition(target, proxy_name, override_constructor));
        debug!(
            proxy = proxy_name,
            target = %target.name,
            kind = %target.kind,
            methods = definition.methods.len(),
            "Synthesized proxy type"
        );
        Ok(self
            .cache
            .write()
            .entry(proxy_name.to_string())
            .or_insert(definition)
            .clone())
    }

    pub fn cached(&self, proxy_name: &str) -> Option<Arc<ProxyDefinition>> {
        self.cache.read().get(proxy_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

fn build_definition(
    target: &TypeDescriptor,
    proxy_name: &str,
    override_constructor: bool,
) -> ProxyDefinition {
    let (constructor, fallback) = match target.kind {
        TargetKind::Interface => (ConstructorStrategy::Implicit, Fallback::NotMocked),
        TargetKind::Class if override_constructor => (ConstructorStrategy::Override, Fallback::Base),
        TargetKind::Class if target.has_constructor() => {
            (ConstructorStrategy::Forward, Fallback::Base)
        }
        TargetKind::Class => (ConstructorStrategy::Implicit, Fallback::Base),
    };

    let methods = target
        .methods
        .iter()
        .map(|signature| MethodOverride {
            signature: signature.clone(),
            fallback,
        })
        .collect();

    ProxyDefinition {
        name: proxy_name.to_string(),
        target: target.name.clone(),
        kind: target.kind,
        constructor,
        constructor_parameters: target.constructor.clone().unwrap_or_default(),
        methods,
    }
}
