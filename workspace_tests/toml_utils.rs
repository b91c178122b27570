use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DependencyValue {
    String(String),
    Object { version: String, path: Option<String> },
    CrateObject { workspace: Option<bool>, features: Option<Vec<String>>, path: Option<String> },
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Package {
    version: String,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct WorkspaceFields {
    package: Package,
    members: Vec<String>,
    dependencies: HashMap<String, DependencyValue>,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CargoToml {
    workspace: WorkspaceFields,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PackageEntryValue {
    String(String),
    Object { workspace: bool },
    Other(toml::Value),
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct CrateCargoToml {
    pub(crate) package: HashMap<String, PackageEntryValue>,
    dependencies: Option<HashMap<String, DependencyValue>>,
    #[serde(rename = "dev-dependencies")]
    dev_dependencies: Option<HashMap<String, DependencyValue>>,
    pub(crate) lints: Option<toml::Value>,
}

#[derive(Debug)]
pub(crate) struct LocalCrate {
    pub(crate) path: String,
    pub(crate) version: String,
}

pub(crate) static ROOT_TOML: LazyLock<CargoToml> = LazyLock::new(|| {
    toml::from_str(include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../Cargo.toml"))).unwrap()
});

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

impl CargoToml {
    pub(crate) fn members(&self) -> &Vec<String> {
        &self.workspace.members
    }

    pub(crate) fn workspace_version(&self) -> &str {
        &self.workspace.package.version
    }

    pub(crate) fn workspace_path_dependencies(&self) -> impl Iterator<Item = LocalCrate> + '_ {
        self.workspace.dependencies.values().filter_map(|value| match value {
            DependencyValue::Object { path: Some(path), version } => {
                Some(LocalCrate { path: path.to_string(), version: version.to_string() })
            }
            _ => None,
        })
    }

    /// Member paths and their parsed manifests.
    pub(crate) fn member_cargo_tomls(&self) -> Vec<(String, CrateCargoToml)> {
        self.members().iter().map(|member| (member.clone(), read_cargo_toml(member))).collect()
    }
}

impl CrateCargoToml {
    /// Dependencies, including dev-dependencies, declared by path instead of through the
    /// workspace.
    pub(crate) fn crate_path_dependencies(&self) -> impl Iterator<Item = (&String, &String)> + '_ {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .flatten()
            .filter_map(|(name, value)| match value {
                DependencyValue::Object { path: Some(path), .. }
                | DependencyValue::CrateObject { path: Some(path), .. } => Some((name, path)),
                _ => None,
            })
    }
}

pub(crate) fn read_cargo_toml(member: &str) -> CrateCargoToml {
    let cargo_toml_path = workspace_root().join(member).join("Cargo.toml");
    let cargo_toml_content = fs::read_to_string(&cargo_toml_path)
        .unwrap_or_else(|err| panic!("Failed to read {cargo_toml_path:?}: {err}"));
    toml::from_str(&cargo_toml_content)
        .unwrap_or_else(|err| panic!("Failed to parse {cargo_toml_path:?}: {err}"))
}
