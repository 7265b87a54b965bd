//! Subcommand implementations. Each returns the text to print.

use anyhow::{Context, Result};
use decoy::reflect::CatalogFile;
use decoy::{ProxySynthesizer, TargetKind, TypeCatalog, TypeDescriptor};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Problems found in one catalog file.
#[derive(Debug, Default, Serialize)]
pub struct CheckReport {
    pub file: PathBuf,
    pub types: usize,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Parse and validate each catalog file. Unreadable or unparsable files are
/// reported as problems rather than aborting the run.
pub fn check(paths: &[PathBuf]) -> Vec<CheckReport> {
    paths
        .iter()
        .map(|path| {
            let mut report = CheckReport {
                file: path.clone(),
                ..CheckReport::default()
            };
            match load_catalog_file(path) {
                Ok(file) => {
                    report.types = file.types.len();
                    report.problems = file.problems();
                }
                Err(e) => report.problems.push(format!("{e:#}")),
            }
            debug!(file = %path.display(), problems = report.problems.len(), "Checked catalog");
            report
        })
        .collect()
}

fn load_catalog_file(path: &Path) -> Result<CatalogFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    CatalogFile::parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeSummary {
    pub name: String,
    pub kind: TargetKind,
    pub methods: Vec<String>,
    pub constructor: Option<String>,
}

impl From<&TypeDescriptor> for TypeSummary {
    fn from(descriptor: &TypeDescriptor) -> Self {
        let methods = descriptor
            .methods
            .iter()
            .map(|m| {
                let prefix = if m.is_static { "static " } else { "" };
                match &m.returns {
                    Some(tag) => format!("{prefix}{}({}): {tag}", m.name, m.arity()),
                    None => format!("{prefix}{}({})", m.name, m.arity()),
                }
            })
            .collect();
        let constructor = descriptor.constructor.as_ref().map(|params| {
            params
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        });
        Self {
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            methods,
            constructor,
        }
    }
}

pub fn list(catalog: &Path, json: bool) -> Result<String> {
    let catalog = TypeCatalog::from_file(catalog)?;
    let summaries: Vec<TypeSummary> = catalog.descriptors().iter().map(TypeSummary::from).collect();
    if json {
        return Ok(serde_json::to_string_pretty(&summaries)?);
    }

    let mut out = String::new();
    for summary in &summaries {
        out.push_str(&format!("{} {}", summary.kind, summary.name));
        if let Some(constructor) = &summary.constructor {
            out.push_str(&format!(" (constructor: {constructor})"));
        }
        out.push('\n');
        for method in &summary.methods {
            out.push_str(&format!("  {method}\n"));
        }
    }
    Ok(out)
}

/// Rust source of a proxy for `type_name`.
pub fn render(
    catalog: &Path,
    type_name: &str,
    proxy_name: Option<&str>,
    override_constructor: bool,
) -> Result<String> {
    let catalog = TypeCatalog::from_file(catalog)?;
    let descriptor = catalog
        .descriptors()
        .into_iter()
        .find(|d| d.name == type_name)
        .with_context(|| format!("Type {type_name} not found in catalog"))?;

    let proxy_name = match proxy_name {
        Some(name) => name.to_string(),
        None => default_proxy_name(&descriptor.name),
    };
    let definition = ProxySynthesizer::new().synthesize(&descriptor, &proxy_name, override_constructor)?;
    info!(proxy = %proxy_name, target = type_name, "Rendered proxy");
    Ok(definition.render())
}

fn default_proxy_name(type_name: &str) -> String {
    let short = type_name.rsplit(['\\', ':']).next().unwrap_or(type_name);
    format!("Mock{short}")
}
