//! Language definition files.
//!
//! One file per language, TOML or JSON depending on its extension:
//!
//! ```toml
//! languageName = "C"
//! fileExtensions = [".c", ".h"]
//!
//! [[keywordGroups]]
//! kind = "Normal"
//! keywords = ["int", "return"]
//! styles = [{ propertyName = "Foreground", valueDescriptor = "solid(0,0,255)" }]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::language::{Group, GroupKind, Language};
use crate::style::StyleConverters;
use crate::{SyntaxError, SyntaxResult};

/// The on-disk shape of a language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDefinition {
    pub language_name: String,
    #[serde(default)]
    pub file_extensions: Vec<String>,
    #[serde(default)]
    pub keyword_groups: Vec<GroupDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDefinition {
    #[serde(default)]
    pub kind: GroupKind,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub styles: Vec<StyleDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub property_name: String,
    pub value_descriptor: String,
}

/// Serialization format of a definition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionFormat {
    Toml,
    Json,
}

impl DefinitionFormat {
    /// JSON for `.json` files, TOML for everything else.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DefinitionFormat::Json,
            _ => DefinitionFormat::Toml,
        }
    }
}

impl LanguageDefinition {
    /// Reads a definition file. A missing file is `NotFound`.
    pub fn read(path: impl AsRef<Path>) -> SyntaxResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SyntaxError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, DefinitionFormat::from_path(path))
    }

    pub fn parse(content: &str, format: DefinitionFormat) -> SyntaxResult<Self> {
        let definition = match format {
            DefinitionFormat::Json => serde_json::from_str(content)?,
            DefinitionFormat::Toml => toml::from_str(content)?,
        };
        Ok(definition)
    }

    /// Writes the definition, picking the format from the path.
    pub fn write(&self, path: impl AsRef<Path>) -> SyntaxResult<()> {
        let path = path.as_ref();
        let content = match DefinitionFormat::from_path(path) {
            DefinitionFormat::Json => serde_json::to_string_pretty(self)?,
            DefinitionFormat::Toml => toml::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Converts every style descriptor and assembles the language.
    pub fn build(&self, converters: &StyleConverters) -> SyntaxResult<Language> {
        let groups = self
            .keyword_groups
            .iter()
            .map(|group| {
                let styles = group
                    .styles
                    .iter()
                    .map(|s| converters.convert(&s.property_name, &s.value_descriptor))
                    .collect::<SyntaxResult<Vec<_>>>()?;
                Ok(Group::new(group.kind, &group.keywords, styles))
            })
            .collect::<SyntaxResult<Vec<_>>>()?;

        Ok(Language::new(
            self.language_name.clone(),
            self.file_extensions.clone(),
            groups,
        ))
    }
}

/// Loads definition files into languages.
#[derive(Debug, Clone, Default)]
pub struct LanguageLoader {
    converters: StyleConverters,
}

impl LanguageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_converters(converters: StyleConverters) -> Self {
        Self { converters }
    }

    pub fn converters(&self) -> &StyleConverters {
        &self.converters
    }

    pub fn load(&self, path: impl AsRef<Path>) -> SyntaxResult<Language> {
        let definition = LanguageDefinition::read(path)?;
        definition.build(&self.converters)
    }
}
