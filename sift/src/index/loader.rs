use super::descriptor::{IndexDefinition, IndexDescriptor};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Loads index definitions from YAML files
pub struct DefinitionLoader {
    definitions_dir: PathBuf,
}

impl DefinitionLoader {
    pub fn new(definitions_dir: impl AsRef<Path>) -> Self {
        Self {
            definitions_dir: definitions_dir.as_ref().to_path_buf(),
        }
    }

    /// Load every `.yaml`/`.yml` file in the directory, keyed by index name
    pub fn load_all(&self) -> Result<BTreeMap<String, IndexDescriptor>> {
        if !self.definitions_dir.exists() {
            return Err(Error::Config(format!(
                "Definitions directory does not exist: {}",
                self.definitions_dir.display()
            )));
        }

        let mut descriptors = BTreeMap::new();
        for entry in fs::read_dir(&self.definitions_dir)? {
            let path = entry?.path();
            if !matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            ) {
                continue;
            }

            let descriptor = load_definition(&path)?;
            descriptors.insert(descriptor.name().to_string(), descriptor);
        }

        Ok(descriptors)
    }
}

/// Read one definition file into a descriptor
pub fn load_definition(path: impl AsRef<Path>) -> Result<IndexDescriptor> {
    let content = fs::read_to_string(path.as_ref())?;
    let def: IndexDefinition = serde_yaml::from_str(&content)?;
    if def.index.trim().is_empty() {
        return Err(Error::Config(format!(
            "{}: index name must not be empty",
            path.as_ref().display()
        )));
    }
    Ok(def.into())
}
