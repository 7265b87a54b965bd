//! Rust source for proxy definitions.
//!
//! The rendered shim wraps a [`MockObject`](crate::MockObject) and implements
//! the target's trait by forwarding every method to it, so generated code can
//! be checked in and compiled ahead of time instead of synthesized at run
//! time.

use super::definition::{MethodOverride, ProxyDefinition};
use crate::reflect::{short_name, Parameter, TypeTag};

const INDENT: &str = "    ";

impl ProxyDefinition {
    pub fn render(&self) -> String {
        let trait_name = short_name(&self.target);
        let mut out: Vec<String> = Vec::new();

        out.push(format!(
            "// Generated by decoy for {} `{}`. Do not edit.",
            self.kind, self.target
        ));
        if !self.constructor_parameters.is_empty() {
            let params: Vec<String> = self
                .constructor_parameters
                .iter()
                .map(render_parameter)
                .collect();
            out.push(format!(
                "// constructor ({}): {}",
                self.constructor,
                params.join(", ")
            ));
        }
        out.push(String::new());
        out.push("#[allow(non_camel_case_types)]".to_string());
        out.push(format!("pub struct {} {{", self.name));
        out.push(format!("{INDENT}inner: decoy::MockObject,"));
        out.push("}".to_string());
        out.push(String::new());

        out.push("#[allow(non_snake_case, dead_code)]".to_string());
        out.push(format!("impl {} {{", self.name));
        out.push(format!("{INDENT}pub fn new(inner: decoy::MockObject) -> Self {{"));
        out.push(format!("{INDENT}{INDENT}Self {{ inner }}"));
        out.push(format!("{INDENT}}}"));
        out.push(String::new());
        out.push(format!("{INDENT}pub fn mock(&self) -> &decoy::MockObject {{"));
        out.push(format!("{INDENT}{INDENT}&self.inner"));
        out.push(format!("{INDENT}}}"));
        for method in self.methods.iter().filter(|m| m.signature.is_static) {
            out.push(String::new());
            render_method(&mut out, method, trait_name, true);
        }
        out.push("}".to_string());

        let instance_methods: Vec<&MethodOverride> = self
            .methods
            .iter()
            .filter(|m| !m.signature.is_static)
            .collect();
        out.push(String::new());
        out.push("#[allow(non_snake_case)]".to_string());
        out.push(format!("impl {} for {} {{", trait_name, self.name));
        for (i, method) in instance_methods.iter().enumerate() {
            if i > 0 {
                out.push(String::new());
            }
            render_method(&mut out, method, trait_name, false);
        }
        out.push("}".to_string());

        let mut source = out.join("\n");
        source.push('\n');
        source
    }
}

fn parameter_type(parameter: &Parameter) -> String {
    let base = parameter
        .type_tag
        .as_ref()
        .map(TypeTag::rust_type)
        .unwrap_or_else(|| "serde_json::Value".to_string());
    let base = if parameter.variadic {
        format!("Vec<{base}>")
    } else {
        base
    };
    if parameter.by_reference {
        format!("&mut {base}")
    } else {
        base
    }
}

fn render_parameter(parameter: &Parameter) -> String {
    format!("{}: {}", parameter.name, parameter_type(parameter))
}

fn render_method(out: &mut Vec<String>, method: &MethodOverride, trait_name: &str, is_static: bool) {
    let signature = &method.signature;
    let pad = INDENT;
    let body = format!("{INDENT}{INDENT}");

    let mut params: Vec<String> = Vec::new();
    if is_static {
        params.push("mock: &decoy::MockObject".to_string());
    } else {
        params.push("&self".to_string());
    }
    params.extend(signature.parameters.iter().map(render_parameter));

    let return_type = match &signature.returns {
        Some(TypeTag::Void) => None,
        Some(tag) => Some(tag.rust_type()),
        None => Some("serde_json::Value".to_string()),
    };
    let visibility = if is_static { "pub " } else { "" };
    match &return_type {
        Some(ty) => out.push(format!(
            "{pad}{visibility}fn {}({}) -> {ty} {{",
            signature.name,
            params.join(", ")
        )),
        None => out.push(format!(
            "{pad}{visibility}fn {}({}) {{",
            signature.name,
            params.join(", ")
        )),
    }

    let fixed: Vec<String> = signature
        .parameters
        .iter()
        .filter(|p| !p.variadic)
        .map(|p| format!("serde_json::json!({})", p.name))
        .collect();
    let variadic = signature.parameters.iter().find(|p| p.variadic);
    match variadic {
        Some(rest) => {
            out.push(format!(
                "{body}let mut args: Vec<serde_json::Value> = vec![{}];",
                fixed.join(", ")
            ));
            out.push(format!(
                "{body}args.extend({}.iter().map(|v| serde_json::json!(v)));",
                rest.name
            ));
        }
        None => out.push(format!(
            "{body}let args: Vec<serde_json::Value> = vec![{}];",
            fixed.join(", ")
        )),
    }

    let receiver = if is_static { "mock" } else { "self.inner" };
    let label = format!("{trait_name}::{}", signature.name);
    match return_type {
        None => {
            out.push(format!(
                "{body}if let Err(e) = {receiver}.call(\"{}\", args) {{",
                signature.name
            ));
            out.push(format!("{body}{INDENT}panic!(\"{label}: {{e}}\");"));
            out.push(format!("{body}}}"));
        }
        Some(ty) => {
            out.push(format!("{body}{receiver}"));
            out.push(format!(
                "{body}{INDENT}.call_as::<{ty}>(\"{}\", args)",
                signature.name
            ));
            out.push(format!(
                "{body}{INDENT}.unwrap_or_else(|e| panic!(\"{label}: {{e}}\"))"
            ));
        }
    }
    out.push(format!("{pad}}}"));
}

#[cfg(test)]
mod tests {
    use crate::reflect::{MethodSignature, Parameter, TypeDescriptor, TypeTag};
    use crate::synth::ProxySynthesizer;

    #[test]
    fn test_render_interface_proxy() {
        let contract = TypeDescriptor::interface("App\\Clock")
            .with_method(MethodSignature::new("now").returns(TypeTag::String))
            .with_method(
                MethodSignature::new("sleep")
                    .param(Parameter::new("seconds").typed(TypeTag::Int))
                    .returns(TypeTag::Void),
            );
        let definition = ProxySynthesizer::new()
            .synthesize(&contract, "Mock_Clock_1", false)
            .unwrap();

        let source = definition.render();
        assert!(source.starts_with("// Generated by decoy for interface `App\\Clock`."));
        assert!(source.contains("pub struct Mock_Clock_1 {"));
        assert!(source.contains("impl Clock for Mock_Clock_1 {"));
        assert!(source.contains("    fn now(&self) -> String {"));
        assert!(source.contains(".call_as::<String>(\"now\", args)"));
        assert!(source.contains("    fn sleep(&self, seconds: i64) {"));
        assert!(source.contains("let args: Vec<serde_json::Value> = vec![serde_json::json!(seconds)];"));
        assert!(source.contains("panic!(\"Clock::sleep: {e}\");"));
    }

    #[test]
    fn test_render_variadic_static_and_constructor() {
        let class = TypeDescriptor::class("Math")
            .with_constructor(vec![Parameter::new("precision").typed(TypeTag::Int)])
            .with_method(
                MethodSignature::new("sum")
                    .param(Parameter::new("first").typed(TypeTag::Int))
                    .param(Parameter::new("rest").typed(TypeTag::Int).variadic())
                    .returns(TypeTag::Int),
            )
            .with_method(
                MethodSignature::new("create")
                    .returns("?Math".parse().unwrap())
                    .static_method(),
            );
        let definition = ProxySynthesizer::new()
            .synthesize(&class, "Mock_Math_1", false)
            .unwrap();

        let source = definition.render();
        assert!(source.contains("// constructor (forward): precision: i64"));
        assert!(source.contains("fn sum(&self, first: i64, rest: Vec<i64>) -> i64 {"));
        assert!(source.contains("args.extend(rest.iter().map(|v| serde_json::json!(v)));"));
        assert!(source.contains("pub fn create(mock: &decoy::MockObject) -> Option<Math> {"));
        assert!(source.contains("mock\n"));
    }
}
