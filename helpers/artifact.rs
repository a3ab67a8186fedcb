//! Compiled contract artifacts and ABIs read from the build directory.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::error::{DeployError, Result};

/// Suffix of the CASM file sitting next to a Sierra class.
const COMPILED_CLASS_SUFFIX: &str = ".compiled_contract_class.json";

/// Encoding of a compiled contract class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Cairo 0 class with its program inline.
    Legacy,
    /// Sierra class together with the text of its compiled CASM class.
    Sierra { compiled_class: String },
}

/// Compiled contract loaded from disk. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct ContractArtifact {
    pub path: PathBuf,
    pub source: String,
    pub kind: ArtifactKind,
}

/// Names of the entrypoints a contract ABI exposes.
#[derive(Debug, Clone, Default)]
pub struct ContractAbi {
    pub path: PathBuf,
    functions: BTreeSet<String>,
}

impl ContractAbi {
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }
}

/// Reads artifacts out of one build output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    build_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn path_of(&self, file: &str) -> PathBuf {
        self.build_dir.join(file)
    }

    /// Loads a compiled contract and works out which class encoding it uses.
    pub fn load(&self, file: &str) -> Result<ContractArtifact> {
        let path = self.path_of(file);
        let source = read_utf8(&path)?;
        let json: Value = serde_json::from_str(&source).map_err(|e| malformed(&path, e))?;

        let kind = if json.get("sierra_program").is_some() {
            let casm_path = compiled_class_path(&path);
            let compiled_class = read_utf8(&casm_path)?;
            ArtifactKind::Sierra { compiled_class }
        } else if json.get("program").is_some() {
            ArtifactKind::Legacy
        } else {
            return Err(malformed(
                &path,
                "neither a legacy (`program`) nor a Sierra (`sierra_program`) class",
            ));
        };

        Ok(ContractArtifact { path, source, kind })
    }

    /// Loads a JSON ABI, either a bare entry list or a class carrying an `abi` field.
    pub fn load_abi(&self, file: &str) -> Result<ContractAbi> {
        let path = self.path_of(file);
        let source = read_utf8(&path)?;
        let json: Value = serde_json::from_str(&source).map_err(|e| malformed(&path, e))?;

        let entries = match &json {
            Value::Array(entries) => entries.clone(),
            Value::Object(object) => match object.get("abi") {
                Some(Value::Array(entries)) => entries.clone(),
                // Sierra classes may carry the ABI as an embedded JSON string
                Some(Value::String(text)) => {
                    serde_json::from_str(text).map_err(|e| malformed(&path, e))?
                }
                _ => return Err(malformed(&path, "no `abi` entry list")),
            },
            _ => return Err(malformed(&path, "ABI must be a JSON list")),
        };

        let mut functions = BTreeSet::new();
        collect_functions(&entries, &mut functions);
        Ok(ContractAbi { path, functions })
    }
}

fn collect_functions(entries: &[Value], functions: &mut BTreeSet<String>) {
    for entry in entries {
        match entry.get("type").and_then(Value::as_str) {
            Some("function") | Some("l1_handler") => {
                if let Some(name) = entry.get("name").and_then(Value::as_str) {
                    functions.insert(name.to_string());
                }
            }
            Some("interface") => {
                if let Some(Value::Array(items)) = entry.get("items") {
                    collect_functions(items, functions);
                }
            }
            _ => {}
        }
    }
}

fn compiled_class_path(sierra_path: &Path) -> PathBuf {
    let file_name = sierra_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(".contract_class.json")
        .or_else(|| file_name.strip_suffix(".json"))
        .unwrap_or(file_name);
    sierra_path.with_file_name(format!("{stem}{COMPILED_CLASS_SUFFIX}"))
}

fn read_utf8(path: &Path) -> Result<String> {
    if !path.is_file() {
        return Err(DeployError::ArtifactNotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|e| malformed(path, e))
}

fn malformed(path: &Path, reason: impl ToString) -> DeployError {
    DeployError::MalformedArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
