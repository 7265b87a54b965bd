//! Proxy type definitions produced by the synthesizer.

use crate::error::MockError;
use crate::reflect::{MethodSignature, Parameter, TargetKind, TypeTag};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// How a class proxy builds its real base instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructorStrategy {
    /// Forward the caller's constructor parameters to the real constructor
    Forward,
    /// Skip the declared constructor; the base is built without parameters
    Override,
    /// No declared constructor (or an interface target)
    Implicit,
}

impl fmt::Display for ConstructorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorStrategy::Forward => f.write_str("forward"),
            ConstructorStrategy::Override => f.write_str("override"),
            ConstructorStrategy::Implicit => f.write_str("implicit"),
        }
    }
}

/// What a known method does when no pipeline is configured for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Fallback {
    /// Call the real implementation
    Base,
    /// Fail with `MethodNotMocked`
    NotMocked,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodOverride {
    pub signature: MethodSignature,
    pub fallback: Fallback,
}

impl MethodOverride {
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    pub fn is_void(&self) -> bool {
        self.signature.is_void()
    }

    /// Check the argument count and fill trailing defaults.
    pub fn bind_arguments(&self, args: Vec<Value>) -> Result<Vec<Value>, MockError> {
        bind_parameters(&self.signature.name, &self.signature.parameters, args)
    }

    /// Check a mocked result against the declared return type.
    pub fn check_return(&self, value: &Value) -> Result<(), MockError> {
        match &self.signature.returns {
            Some(tag) if !tag.accepts(value) => Err(MockError::ReturnTypeMismatch {
                method: self.signature.name.clone(),
                expected: tag.to_string(),
                value: value.clone(),
            }),
            _ => Ok(()),
        }
    }

    pub fn returns(&self) -> Option<&TypeTag> {
        self.signature.returns.as_ref()
    }
}

pub(crate) fn bind_parameters(
    owner: &str,
    parameters: &[Parameter],
    args: Vec<Value>,
) -> Result<Vec<Value>, MockError> {
    let signature = MethodSignature {
        name: owner.to_string(),
        parameters: parameters.to_vec(),
        returns: None,
        is_static: false,
    };
    let arity = signature.arity();
    if !arity.contains(args.len()) {
        return Err(MockError::ArgumentCount {
            method: owner.to_string(),
            expected: arity.to_string(),
            actual: args.len(),
        });
    }

    let mut bound = args;
    for parameter in parameters.iter().skip(bound.len()) {
        match &parameter.default {
            Some(default) if !parameter.variadic => bound.push(default.clone()),
            _ => break,
        }
    }
    Ok(bound)
}

/// A synthesized proxy type: one override per method of the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDefinition {
    pub name: String,
    pub target: String,
    pub kind: TargetKind,
    pub constructor: ConstructorStrategy,
    pub constructor_parameters: Vec<Parameter>,
    pub methods: Vec<MethodOverride>,
}

impl ProxyDefinition {
    pub fn method(&self, name: &str) -> Option<&MethodOverride> {
        self.methods.iter().find(|m| m.signature.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn find_override() -> MethodOverride {
        MethodOverride {
            signature: MethodSignature::new("find")
                .param(Parameter::new("id").typed(TypeTag::Int))
                .param(Parameter::new("fresh").with_default(false))
                .returns("?string".parse().unwrap()),
            fallback: Fallback::Base,
        }
    }

    #[test]
    fn test_bind_fills_defaults() {
        let method = find_override();
        assert_eq!(
            method.bind_arguments(vec![json!(1)]).unwrap(),
            vec![json!(1), json!(false)]
        );
        assert_eq!(
            method.bind_arguments(vec![json!(1), json!(true)]).unwrap(),
            vec![json!(1), json!(true)]
        );
    }

    #[test]
    fn test_bind_rejects_wrong_arity() {
        let method = find_override();
        let err = method.bind_arguments(vec![]).unwrap_err();
        assert_eq!(err.to_string(), "Method find expects 1 to 2 arguments, got 0");
        assert!(method
            .bind_arguments(vec![json!(1), json!(2), json!(3)])
            .is_err());
    }

    #[test]
    fn test_variadic_accepts_surplus() {
        let method = MethodOverride {
            signature: MethodSignature::new("sum")
                .param(Parameter::new("first"))
                .param(Parameter::new("rest").variadic()),
            fallback: Fallback::NotMocked,
        };
        let args = vec![json!(1), json!(2), json!(3)];
        assert_eq!(method.bind_arguments(args.clone()).unwrap(), args);
        assert_eq!(method.bind_arguments(vec![json!(1)]).unwrap(), vec![json!(1)]);
    }

    #[test]
    fn test_check_return() {
        let method = find_override();
        assert!(method.check_return(&json!("x")).is_ok());
        assert!(method.check_return(&Value::Null).is_ok());
        let err = method.check_return(&json!(5)).unwrap_err();
        assert!(matches!(err, MockError::ReturnTypeMismatch { .. }));
    }
}
