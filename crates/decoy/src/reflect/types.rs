//! Type descriptors: the reflection snapshot proxies are synthesized from.

use crate::error::MockError;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
static TYPE_NAME: OnceLock<Regex> = OnceLock::new();

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"))
        .is_match(name)
}

/// Type names may be namespaced with `::` or `\`.
pub fn is_type_name(name: &str) -> bool {
    TYPE_NAME
        .get_or_init(|| {
            Regex::new(r"^\\?[A-Za-z_][A-Za-z0-9_]*((::|\\)[A-Za-z_][A-Za-z0-9_]*)*$")
                .expect("valid type name regex")
        })
        .is_match(name)
}

/// Whether the mocked type is a concrete class or an abstract contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    #[default]
    Class,
    Interface,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Class => f.write_str("class"),
            TargetKind::Interface => f.write_str("interface"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeTagError {
    #[error("empty type")]
    Empty,
    #[error("invalid type name '{0}'")]
    InvalidName(String),
    #[error("'{0}' cannot be nullable")]
    NotNullable(String),
    #[error("'{0}' cannot be part of a union")]
    NotUnionMember(String),
}

/// Declared parameter or return type.
///
/// Written in its textual form: `int`, `?string`, `int|string`, `Date`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeTag {
    Void,
    Mixed,
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Named(String),
    Nullable(Box<TypeTag>),
    Union(Vec<TypeTag>),
}

impl TypeTag {
    /// Whether `value` satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeTag::Void | TypeTag::Null => value.is_null(),
            TypeTag::Mixed => true,
            TypeTag::Bool => value.is_boolean(),
            TypeTag::Int => value.is_i64() || value.is_u64(),
            // Integers widen to float
            TypeTag::Float => value.is_number(),
            TypeTag::String => value.is_string(),
            TypeTag::Array => value.is_array() || value.is_object(),
            TypeTag::Named(_) => !value.is_null(),
            TypeTag::Nullable(inner) => value.is_null() || inner.accepts(value),
            TypeTag::Union(members) => members.iter().any(|m| m.accepts(value)),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeTag::Void)
    }

    /// Rust type used for this tag in rendered proxy source.
    pub fn rust_type(&self) -> String {
        match self {
            TypeTag::Void | TypeTag::Null => "()".to_string(),
            TypeTag::Mixed | TypeTag::Union(_) => "serde_json::Value".to_string(),
            TypeTag::Bool => "bool".to_string(),
            TypeTag::Int => "i64".to_string(),
            TypeTag::Float => "f64".to_string(),
            TypeTag::String => "String".to_string(),
            TypeTag::Array => "Vec<serde_json::Value>".to_string(),
            TypeTag::Named(name) => short_name(name).to_string(),
            TypeTag::Nullable(inner) => format!("Option<{}>", inner.rust_type()),
        }
    }

    fn parse_single(text: &str) -> Result<TypeTag, TypeTagError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TypeTagError::Empty);
        }
        if let Some(inner) = text.strip_prefix('?') {
            let inner = TypeTag::parse_single(inner)?;
            return match inner {
                TypeTag::Void | TypeTag::Mixed | TypeTag::Null | TypeTag::Nullable(_) => {
                    Err(TypeTagError::NotNullable(inner.to_string()))
                }
                other => Ok(TypeTag::Nullable(Box::new(other))),
            };
        }
        let tag = match text.to_ascii_lowercase().as_str() {
            "void" => TypeTag::Void,
            "mixed" => TypeTag::Mixed,
            "null" => TypeTag::Null,
            "bool" | "boolean" => TypeTag::Bool,
            "int" | "integer" => TypeTag::Int,
            "float" | "double" => TypeTag::Float,
            "string" => TypeTag::String,
            "array" => TypeTag::Array,
            _ if is_type_name(text) => TypeTag::Named(text.to_string()),
            _ => return Err(TypeTagError::InvalidName(text.to_string())),
        };
        Ok(tag)
    }
}

/// Last path segment of a namespaced type name.
pub(crate) fn short_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '\\' || c == ':')
        .find(|segment| !segment.is_empty())
        .unwrap_or(name)
}

impl FromStr for TypeTag {
    type Err = TypeTagError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if !text.contains('|') {
            return TypeTag::parse_single(text);
        }
        let mut members = Vec::new();
        for part in text.split('|') {
            let member = TypeTag::parse_single(part)?;
            if matches!(
                member,
                TypeTag::Void | TypeTag::Mixed | TypeTag::Nullable(_)
            ) {
                return Err(TypeTagError::NotUnionMember(member.to_string()));
            }
            if !members.contains(&member) {
                members.push(member);
            }
        }
        Ok(TypeTag::Union(members))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Void => f.write_str("void"),
            TypeTag::Mixed => f.write_str("mixed"),
            TypeTag::Null => f.write_str("null"),
            TypeTag::Bool => f.write_str("bool"),
            TypeTag::Int => f.write_str("int"),
            TypeTag::Float => f.write_str("float"),
            TypeTag::String => f.write_str("string"),
            TypeTag::Array => f.write_str("array"),
            TypeTag::Named(name) => f.write_str(name),
            TypeTag::Nullable(inner) => write!(f, "?{inner}"),
            TypeTag::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                f.write_str(&parts.join("|"))
            }
        }
    }
}

impl TryFrom<String> for TypeTag {
    type Error = TypeTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeTag> for String {
    fn from(tag: TypeTag) -> Self {
        tag.to_string()
    }
}

/// Number of arguments a method accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` for variadic methods
    pub max: Option<usize>,
}

impl Arity {
    pub fn contains(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// A present `default: null` must stay distinguishable from a missing default.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<TypeTag>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub variadic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub by_reference: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: None,
            default: None,
            variadic: false,
            by_reference: false,
        }
    }

    pub fn typed(mut self, tag: TypeTag) -> Self {
        self.type_tag = Some(tag);
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn by_reference(mut self) -> Self {
        self.by_reference = true;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.default.is_some() || self.variadic
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// `None` when the method declares no return type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<TypeTag>,
    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,
}

impl MethodSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: None,
            is_static: false,
        }
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn returns(mut self, tag: TypeTag) -> Self {
        self.returns = Some(tag);
        self
    }

    pub fn static_method(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn is_void(&self) -> bool {
        matches!(self.returns, Some(TypeTag::Void))
    }

    pub fn arity(&self) -> Arity {
        let min = self
            .parameters
            .iter()
            .rposition(|p| !p.is_optional())
            .map_or(0, |i| i + 1);
        let max = if self.parameters.iter().any(|p| p.variadic) {
            None
        } else {
            Some(self.parameters.len())
        };
        Arity { min, max }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: TargetKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodSignature>,
    /// Constructor parameters; `None` when the class declares no constructor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constructor: Option<Vec<Parameter>>,
}

impl TypeDescriptor {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TargetKind::Class,
            methods: Vec::new(),
            constructor: None,
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TargetKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn with_method(mut self, signature: MethodSignature) -> Self {
        self.methods.push(signature);
        self
    }

    pub fn with_constructor(mut self, parameters: Vec<Parameter>) -> Self {
        self.constructor = Some(parameters);
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodSignature> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TargetKind::Interface
    }

    /// Every structural problem with this descriptor, in declaration order.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !is_type_name(&self.name) {
            problems.push(format!("invalid type name '{}'", self.name));
        }
        if self.is_interface() && self.constructor.is_some() {
            problems.push("interfaces cannot declare a constructor".to_string());
        }
        if let Some(parameters) = &self.constructor {
            check_parameters("constructor", parameters, &mut problems);
        }

        let mut seen = HashSet::new();
        for method in &self.methods {
            if !is_identifier(&method.name) {
                problems.push(format!("invalid method name '{}'", method.name));
            }
            if !seen.insert(method.name.as_str()) {
                problems.push(format!("method '{}' declared more than once", method.name));
            }
            check_parameters(&method.name, &method.parameters, &mut problems);
        }
        problems
    }

    pub fn validate(&self) -> Result<(), MockError> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }
        Err(MockError::synthesis(&self.name, problems.join("; ")))
    }
}

fn check_parameters(owner: &str, parameters: &[Parameter], problems: &mut Vec<String>) {
    let mut seen = HashSet::new();
    let last = parameters.len().saturating_sub(1);
    for (index, parameter) in parameters.iter().enumerate() {
        let name = parameter.name.as_str();
        if !is_identifier(name) {
            problems.push(format!("{owner}: invalid parameter name '{name}'"));
        }
        if !seen.insert(name) {
            problems.push(format!("{owner}: duplicate parameter '{name}'"));
        }
        if parameter.variadic && index != last {
            problems.push(format!(
                "{owner}: variadic parameter '{name}' must be the last parameter"
            ));
        }
        if parameter.variadic && parameter.default.is_some() {
            problems.push(format!(
                "{owner}: variadic parameter '{name}' cannot have a default"
            ));
        }
        if let Some(tag) = &parameter.type_tag {
            if tag.is_void() {
                problems.push(format!("{owner}: parameter '{name}' cannot be void"));
            }
            if let Some(default) = &parameter.default {
                if !tag.accepts(default) {
                    problems.push(format!(
                        "{owner}: default {default} of '{name}' does not satisfy {tag}"
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_type_tags() {
        assert_eq!("int".parse::<TypeTag>().unwrap(), TypeTag::Int);
        assert_eq!("Boolean".parse::<TypeTag>().unwrap(), TypeTag::Bool);
        assert_eq!(
            "?string".parse::<TypeTag>().unwrap(),
            TypeTag::Nullable(Box::new(TypeTag::String))
        );
        assert_eq!(
            "int|string|int".parse::<TypeTag>().unwrap(),
            TypeTag::Union(vec![TypeTag::Int, TypeTag::String])
        );
        assert_eq!(
            "App\\Models\\User".parse::<TypeTag>().unwrap(),
            TypeTag::Named("App\\Models\\User".to_string())
        );
        assert_eq!("?void".parse::<TypeTag>(), Err(TypeTagError::NotNullable("void".into())));
        assert!("int|void".parse::<TypeTag>().is_err());
        assert!("not a type".parse::<TypeTag>().is_err());
        assert!("".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_type_tag_display_round_trips_text() {
        for text in ["void", "?int", "int|string|null", "Date"] {
            assert_eq!(text.parse::<TypeTag>().unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_accepts() {
        assert!(TypeTag::Int.accepts(&json!(3)));
        assert!(!TypeTag::Int.accepts(&json!(3.5)));
        assert!(TypeTag::Float.accepts(&json!(3)));
        assert!(TypeTag::Void.accepts(&Value::Null));
        assert!(!TypeTag::String.accepts(&Value::Null));
        assert!("?string".parse::<TypeTag>().unwrap().accepts(&Value::Null));
        assert!("int|string".parse::<TypeTag>().unwrap().accepts(&json!("x")));
        assert!(TypeTag::Array.accepts(&json!({"k": 1})));
        assert!(TypeTag::Named("Date".into()).accepts(&json!({})));
    }

    #[test]
    fn test_rust_type_names() {
        assert_eq!(TypeTag::Named("App\\User".into()).rust_type(), "User");
        assert_eq!(TypeTag::Named("crate::db::Pool".into()).rust_type(), "Pool");
        assert_eq!(
            "?int".parse::<TypeTag>().unwrap().rust_type(),
            "Option<i64>"
        );
    }

    #[test]
    fn test_arity() {
        let sig = MethodSignature::new("find")
            .param(Parameter::new("id").typed(TypeTag::Int))
            .param(Parameter::new("fresh").with_default(false));
        assert_eq!(sig.arity(), Arity { min: 1, max: Some(2) });
        assert_eq!(sig.arity().to_string(), "1 to 2");

        let variadic = MethodSignature::new("sum").param(Parameter::new("values").variadic());
        assert_eq!(variadic.arity(), Arity { min: 0, max: None });
        assert!(variadic.arity().contains(10));
        assert_eq!(variadic.arity().to_string(), "at least 0");
    }

    #[test]
    fn test_descriptor_from_yaml() {
        let yaml = r#"
name: UserService
kind: interface
methods:
  - name: find
    parameters:
      - name: id
        type: int
      - name: fallback
        type: "?string"
        default: null
    returns: "?User"
  - name: flush
    returns: void
"#;
        let descriptor: TypeDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert!(descriptor.is_interface());
        let find = descriptor.method("find").unwrap();
        assert_eq!(find.parameters[1].default, Some(Value::Null));
        assert_eq!(find.parameters[0].default, None);
        assert!(descriptor.method("flush").unwrap().is_void());
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_problems_are_reported() {
        let descriptor = TypeDescriptor::interface("Broken")
            .with_constructor(vec![])
            .with_method(
                MethodSignature::new("m")
                    .param(Parameter::new("rest").variadic())
                    .param(Parameter::new("after")),
            )
            .with_method(
                MethodSignature::new("m")
                    .param(Parameter::new("n").typed(TypeTag::Int).with_default("x")),
            );
        let problems = descriptor.problems();
        assert_eq!(problems.len(), 4, "{problems:?}");
        let err = descriptor.validate().unwrap_err();
        assert!(matches!(err, MockError::SynthesisFailure { .. }));
    }
}
