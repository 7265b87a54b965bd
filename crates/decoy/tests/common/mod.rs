//! Shared fixtures for integration tests.

#![allow(dead_code)]

use decoy::{
    ClassDefinition, MethodSignature, MethodTable, MockObjectFactory, Parameter, RealObject,
    TypeCatalog, TypeDescriptor, TypeTag,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CATALOG_YAML: &str = r#"
types:
  - name: App\Clock
    kind: interface
    methods:
      - name: now
        returns: int
      - name: sleep
        parameters:
          - name: seconds
            type: int
        returns: void
  - name: App\Mailer
    methods:
      - name: send
        parameters:
          - name: to
            type: string
          - name: subject
            type: string
            default: "(no subject)"
        returns: bool
"#;

/// Side effects recorded by real implementations.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

/// `User(id: int = 0, name: string = "anonymous")` with `getId`, `getName`,
/// `now` and `touch`.
pub fn user_class(journal: Arc<Journal>) -> ClassDefinition {
    let descriptor = TypeDescriptor::class("App\\User")
        .with_constructor(vec![
            Parameter::new("id").typed(TypeTag::Int).with_default(0),
            Parameter::new("name")
                .typed(TypeTag::String)
                .with_default("anonymous"),
        ])
        .with_method(MethodSignature::new("getId").returns(TypeTag::Int))
        .with_method(MethodSignature::new("getName").returns(TypeTag::String))
        .with_method(MethodSignature::new("now").returns(TypeTag::Int))
        .with_method(MethodSignature::new("touch").returns(TypeTag::Void));

    ClassDefinition::new(descriptor, move |params| {
        journal.push(format!("constructed {}", Value::Array(params.to_vec())));
        let id = params.first().cloned().unwrap_or(Value::Null);
        let name = params.get(1).cloned().unwrap_or(Value::Null);
        let touched = journal.clone();
        let table = MethodTable::new("App\\User")
            .method("getId", move |_| Ok(id.clone()))
            .method("getName", move |_| Ok(name.clone()))
            .method("now", |_| Ok(json!(1)))
            .method("touch", move |_| {
                touched.push("touched");
                Ok(Value::Null)
            });
        Ok(Arc::new(table) as Arc<dyn RealObject>)
    })
}

pub fn catalog(journal: Arc<Journal>) -> Arc<TypeCatalog> {
    let catalog = TypeCatalog::from_yaml_str(CATALOG_YAML).expect("fixture catalog is valid");
    catalog.register_class(user_class(journal.clone()));
    catalog
        .implement("App\\Mailer", move |_| {
            let sent = journal.clone();
            let table = MethodTable::new("App\\Mailer").method("send", move |args| {
                sent.push(format!("sent to {}", args[0]));
                Ok(json!(true))
            });
            Ok(Arc::new(table) as Arc<dyn RealObject>)
        })
        .expect("App\\Mailer is a class");
    Arc::new(catalog)
}

pub fn factory() -> (MockObjectFactory, Arc<Journal>) {
    let journal = Arc::new(Journal::default());
    (MockObjectFactory::new(catalog(journal.clone())), journal)
}
