//! Language lookup and upload.
//!
//! The registry root holds a mapping file (`languages.json` by default)
//! and a directory of definition files:
//!
//! ```text
//! <root>/
//! ├── languages.json      extension -> file, name -> file
//! └── languages/
//!     ├── c.toml
//!     └── python.json
//! ```
//!
//! Mapping paths are relative to the root, so the whole directory can be
//! moved. Uploads copy the definition into `languages/` before the mapping
//! is rewritten; a crash between the two leaves an unreferenced copy
//! behind but never a mapping entry without a file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use synergy_core::RegistryConfig;
use uuid::Uuid;

use crate::language::Language;
use crate::loader::LanguageLoader;
use crate::{SyntaxError, SyntaxResult};

/// Contents of the mapping file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageMapping {
    /// `.ext` -> definition path
    pub extensions: BTreeMap<String, String>,
    /// language name -> definition path
    pub languages: BTreeMap<String, String>,
}

/// Finds languages by file extension or name and accepts new ones.
#[derive(Debug)]
pub struct LanguageRegistry {
    root: PathBuf,
    mapping_path: PathBuf,
    definitions_dir: String,
    mapping: LanguageMapping,
    loader: LanguageLoader,
    extension_pattern: Regex,
}

impl LanguageRegistry {
    /// Opens the registry described by the config.
    pub fn open(config: &RegistryConfig) -> SyntaxResult<Self> {
        let root = config.root_dir()?;
        Self::open_at(root, &config.mapping_file, &config.definitions_dir)
    }

    /// Opens (or initializes) a registry rooted at `root`.
    ///
    /// A missing mapping file is created empty.
    pub fn open_at(
        root: impl Into<PathBuf>,
        mapping_file: &str,
        definitions_dir: &str,
    ) -> SyntaxResult<Self> {
        let root = root.into();
        let mapping_path = root.join(mapping_file);

        let mapping = if mapping_path.is_file() {
            let content = std::fs::read_to_string(&mapping_path)?;
            serde_json::from_str(&content)?
        } else {
            tracing::info!("Creating language mapping at {}", mapping_path.display());
            std::fs::create_dir_all(&root)?;
            let mapping = LanguageMapping::default();
            write_mapping(&mapping_path, &mapping)?;
            mapping
        };

        Ok(Self {
            root,
            mapping_path,
            definitions_dir: definitions_dir.to_string(),
            mapping,
            loader: LanguageLoader::new(),
            extension_pattern: Regex::new(r"^[.]\w+$")?,
        })
    }

    /// Uses a custom loader (for extra style converters).
    pub fn with_loader(mut self, loader: LanguageLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mapping(&self) -> &LanguageMapping {
        &self.mapping
    }

    /// Names of every registered language, sorted.
    pub fn language_names(&self) -> impl Iterator<Item = &str> {
        self.mapping.languages.keys().map(String::as_str)
    }

    /// Loads the language registered for `.ext`.
    ///
    /// `Ok(None)` if nothing claims the extension; `NotFound` if the mapped
    /// file has gone missing.
    pub fn language_for_extension(&self, extension: &str) -> SyntaxResult<Option<Language>> {
        match self.mapping.extensions.get(extension) {
            Some(relative) => self.loader.load(self.root.join(relative)).map(Some),
            None => Ok(None),
        }
    }

    /// Loads the language for a file, by its extension.
    pub fn language_for_path(&self, path: &Path) -> SyntaxResult<Option<Language>> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.language_for_extension(&format!(".{ext}")),
            None => Ok(None),
        }
    }

    /// Loads a language by name.
    pub fn language_by_name(&self, name: &str) -> SyntaxResult<Option<Language>> {
        match self.mapping.languages.get(name) {
            Some(relative) => self.loader.load(self.root.join(relative)).map(Some),
            None => Ok(None),
        }
    }

    /// Validates a definition file, copies it into the registry and maps
    /// its name and extensions to the copy. Returns the language name.
    ///
    /// Nothing in the mapping changes unless every check passes and the
    /// new mapping has been written.
    pub fn upload(&mut self, path: impl AsRef<Path>) -> SyntaxResult<String> {
        let path = path.as_ref();
        let language = self.loader.load(path)?;
        let name = language.name().to_string();

        if self.mapping.languages.contains_key(&name) {
            return Err(SyntaxError::Validation(format!(
                "Language name '{name}' is already taken"
            )));
        }
        for ext in language.extensions() {
            if !self.extension_pattern.is_match(ext) {
                return Err(SyntaxError::Validation(format!(
                    "Extension '{ext}' is invalid"
                )));
            }
            if self.mapping.extensions.contains_key(ext) {
                return Err(SyntaxError::Validation(format!(
                    "Extension '{ext}' is already taken"
                )));
            }
        }

        let relative = self.copy_definition(path)?;

        let mut mapping = self.mapping.clone();
        for ext in language.extensions() {
            mapping.extensions.insert(ext.clone(), relative.clone());
        }
        mapping.languages.insert(name.clone(), relative);
        write_mapping(&self.mapping_path, &mapping)?;
        self.mapping = mapping;

        tracing::info!("Uploaded language {}", name);
        Ok(name)
    }

    /// Copies a definition into the definitions directory and returns its
    /// root-relative path. A taken file name gets a fresh UUID prefix.
    fn copy_definition(&self, path: &Path) -> SyntaxResult<String> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| SyntaxError::Validation(format!("Bad file name: {}", path.display())))?;

        let dir = self.root.join(&self.definitions_dir);
        std::fs::create_dir_all(&dir)?;

        let mut stored = file_name.to_string();
        if dir.join(&stored).exists() {
            stored = format!("{}{}", Uuid::new_v4(), file_name);
        }
        std::fs::copy(path, dir.join(&stored))?;

        Ok(format!("{}/{}", self.definitions_dir, stored))
    }
}

fn write_mapping(path: &Path, mapping: &LanguageMapping) -> SyntaxResult<()> {
    let content = serde_json::to_string_pretty(mapping)?;
    std::fs::write(path, content)?;
    Ok(())
}
