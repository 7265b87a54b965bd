//! Loading synthesized definitions into instantiable proxy types.

use super::definition::{bind_parameters, ConstructorStrategy, MethodOverride, ProxyDefinition};
use crate::error::MockError;
use crate::reflect::{ClassDefinition, Constructor, RealObject, TargetKind};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Turns a [`ProxyDefinition`] into a [`ProxyType`].
pub trait ProxyLoader: Send + Sync {
    /// `class` is the real implementation for class targets.
    fn load(
        &self,
        definition: Arc<ProxyDefinition>,
        class: Option<ClassDefinition>,
    ) -> Result<ProxyType, MockError>;
}

/// Loader that builds dispatch tables in the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessLoader;

impl ProxyLoader for InProcessLoader {
    fn load(
        &self,
        definition: Arc<ProxyDefinition>,
        class: Option<ClassDefinition>,
    ) -> Result<ProxyType, MockError> {
        let constructor = match (definition.kind, class) {
            (TargetKind::Interface, _) => None,
            (TargetKind::Class, Some(class)) => Some(class.constructor().clone()),
            (TargetKind::Class, None) => {
                return Err(MockError::synthesis(
                    &definition.target,
                    "no implementation registered for class",
                ))
            }
        };

        let index = definition
            .methods
            .iter()
            .enumerate()
            .map(|(i, m)| (m.signature.name.clone(), i))
            .collect();

        debug!(proxy = %definition.name, target = %definition.target, "Loaded proxy type");
        Ok(ProxyType {
            definition,
            index,
            constructor,
        })
    }
}

/// A loaded proxy type, ready to create instances.
pub struct ProxyType {
    definition: Arc<ProxyDefinition>,
    index: HashMap<String, usize>,
    constructor: Option<Constructor>,
}

impl ProxyType {
    pub fn definition(&self) -> &Arc<ProxyDefinition> {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn target(&self) -> &str {
        &self.definition.target
    }

    pub fn kind(&self) -> TargetKind {
        self.definition.kind
    }

    pub fn method(&self, name: &str) -> Option<&MethodOverride> {
        self.index.get(name).map(|&i| &self.definition.methods[i])
    }

    /// Build the real base instance. Interfaces have none.
    pub fn construct_base(
        &self,
        params: &[Value],
    ) -> Result<Option<Arc<dyn RealObject>>, MockError> {
        let Some(constructor) = &self.constructor else {
            return Ok(None);
        };
        let instance = match self.definition.constructor {
            ConstructorStrategy::Forward => {
                let bound = bind_parameters(
                    "constructor",
                    &self.definition.constructor_parameters,
                    params.to_vec(),
                )?;
                constructor(&bound)?
            }
            ConstructorStrategy::Override | ConstructorStrategy::Implicit => constructor(&[])?,
        };
        Ok(Some(instance))
    }
}

impl fmt::Debug for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyType")
            .field("name", &self.definition.name)
            .field("target", &self.definition.target)
            .field("kind", &self.definition.kind)
            .field("has_base", &self.constructor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{MethodSignature, MethodTable, Parameter, TypeDescriptor, TypeTag};
    use crate::synth::ProxySynthesizer;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recording_class(seen: Arc<Mutex<Vec<Vec<Value>>>>) -> ClassDefinition {
        let descriptor = TypeDescriptor::class("User")
            .with_constructor(vec![
                Parameter::new("id").typed(TypeTag::Int),
                Parameter::new("active").with_default(true),
            ])
            .with_method(MethodSignature::new("getId"));
        ClassDefinition::new(descriptor, move |params| {
            seen.lock().push(params.to_vec());
            Ok(Arc::new(MethodTable::new("User")) as Arc<dyn RealObject>)
        })
    }

    #[test]
    fn test_forwarded_constructor_gets_bound_params() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let class = recording_class(seen.clone());
        let definition = ProxySynthesizer::new()
            .synthesize(class.descriptor(), "Mock_User_10", false)
            .unwrap();
        let proxy = InProcessLoader.load(definition, Some(class)).unwrap();

        assert!(proxy.method("getId").is_some());
        assert!(proxy.construct_base(&[json!(7)]).unwrap().is_some());
        assert_eq!(*seen.lock(), vec![vec![json!(7), json!(true)]]);

        assert!(matches!(
            proxy.construct_base(&[]),
            Err(MockError::ArgumentCount { .. })
        ));
    }

    #[test]
    fn test_overridden_constructor_gets_nothing() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let class = recording_class(seen.clone());
        let definition = ProxySynthesizer::new()
            .synthesize(class.descriptor(), "Mock_User_11", true)
            .unwrap();
        let proxy = InProcessLoader.load(definition, Some(class)).unwrap();

        proxy.construct_base(&[json!(1), json!(false)]).unwrap();
        assert_eq!(*seen.lock(), vec![Vec::<Value>::new()]);
    }

    #[test]
    fn test_class_without_implementation_fails_to_load() {
        let descriptor = TypeDescriptor::class("Ghost");
        let definition = ProxySynthesizer::new()
            .synthesize(&descriptor, "Mock_Ghost_1", false)
            .unwrap();
        let err = InProcessLoader.load(definition, None).unwrap_err();
        assert!(matches!(err, MockError::SynthesisFailure { .. }));
    }

    #[test]
    fn test_interface_has_no_base() {
        let descriptor = TypeDescriptor::interface("Clock");
        let definition = ProxySynthesizer::new()
            .synthesize(&descriptor, "Mock_Clock_10", false)
            .unwrap();
        let proxy = InProcessLoader.load(definition, None).unwrap();
        assert!(proxy.construct_base(&[json!(1)]).unwrap().is_none());
    }
}
