//! Document service
//!
//! Loads configuration documents, resolves their expressions and renders
//! the result.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, DocumentResultExt, IoResultExt};
use crate::domain::{ResolveOptions, Resolver, Value};
use crate::infrastructure::traits::FileSystem;

/// Serialization format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Pick the format from the file extension: `.json` is JSON, anything
    /// else (`.yaml`, `.yml`, `.ymx`, none) is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }

    pub fn deserialize(self, content: &str) -> Result<Value, String> {
        match self {
            DocumentFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
            DocumentFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        }
    }

    /// JSON has no infinity or NaN; such a float is an error rather than `null`.
    pub fn serialize(self, value: &Value) -> Result<String, String> {
        match self {
            DocumentFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
            DocumentFormat::Json => {
                if let Some(location) = non_finite_location(value, &mut Vec::new()) {
                    return Err(format!("{location}: JSON cannot represent a non-finite number"));
                }
                serde_json::to_string_pretty(value)
                    .map(|s| s + "\n")
                    .map_err(|e| e.to_string())
            }
        }
    }
}

/// Dotted location of the first infinite or NaN float in `value`.
fn non_finite_location(value: &Value, location: &mut Vec<String>) -> Option<String> {
    match value {
        Value::Float(x) if !x.is_finite() => Some(if location.is_empty() {
            "<root>".to_string()
        } else {
            location.join(".")
        }),
        Value::Mapping(map) => map
            .iter()
            .find_map(|(key, child)| descend(key.clone(), child, location)),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(index, child)| descend(index.to_string(), child, location)),
        _ => None,
    }
}

fn descend(segment: String, child: &Value, location: &mut Vec<String>) -> Option<String> {
    location.push(segment);
    let found = non_finite_location(child, location);
    location.pop();
    found
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "json" => Ok(DocumentFormat::Json),
            other => Err(format!("unknown document format: {other} (expected yaml or json)")),
        }
    }
}

/// Service for loading and resolving configuration documents.
pub struct DocumentService {
    fs: Arc<dyn FileSystem>,
    resolver: Resolver,
}

impl DocumentService {
    /// Create a new document service.
    pub fn new(fs: Arc<dyn FileSystem>, options: ResolveOptions) -> Self {
        Self {
            fs,
            resolver: Resolver::new(options),
        }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Read and deserialize a document, format chosen by extension.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<Value> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::DocumentNotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read document", path)?;
        let format = DocumentFormat::from_path(path);
        debug!("load: {} bytes as {:?}", content.len(), format);
        format.deserialize(&content).with_document_context(path)
    }

    /// Load a document and resolve every expression in it.
    pub fn resolve_file(&self, path: &Path) -> ApplicationResult<Value> {
        let document = self.load(path)?;
        Ok(self.resolver.resolve(&document)?)
    }

    /// Evaluate one expression, optionally against a document.
    ///
    /// Without a context document every variable reference is missing.
    pub fn evaluate(&self, expression: &str, context: Option<&Path>) -> ApplicationResult<f64> {
        let document = match context {
            Some(path) => self.load(path)?,
            None => Value::Mapping(Default::default()),
        };
        Ok(self.resolver.evaluate(expression, &document)?)
    }

    /// Serialize `value` in `format`.
    pub fn render(&self, value: &Value, format: DocumentFormat) -> ApplicationResult<String> {
        format
            .serialize(value)
            .map_err(|message| ApplicationError::Render { message })
    }

    /// Render `value` and write it to `path`.
    pub fn write(&self, path: &Path, value: &Value, format: DocumentFormat) -> ApplicationResult<()> {
        let rendered = self.render(value, format)?;
        self.fs
            .write(path, &rendered)
            .with_path_context("write document", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn given_extensions_when_detecting_format_then_json_only_for_json() {
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.JSON")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a.ymx")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a")), DocumentFormat::Yaml);
    }

    #[test]
    fn given_nested_infinity_when_serializing_json_then_error_names_location() {
        let value: Value = [(
            "limits",
            Value::from(vec![Value::Float(1.0), Value::Float(f64::INFINITY)]),
        )]
        .into_iter()
        .collect();

        let err = DocumentFormat::Json.serialize(&value).unwrap_err();

        assert_eq!(err, "limits.1: JSON cannot represent a non-finite number");
        assert!(DocumentFormat::Yaml.serialize(&value).is_ok());
    }

    #[test]
    fn given_root_nan_when_serializing_json_then_error() {
        let err = DocumentFormat::Json.serialize(&Value::Float(f64::NAN)).unwrap_err();

        assert!(err.starts_with("<root>:"), "{err}");
    }

    #[test]
    fn given_format_names_when_parsing_then_accepts_aliases() {
        assert_eq!("yml".parse::<DocumentFormat>(), Ok(DocumentFormat::Yaml));
        assert_eq!("JSON".parse::<DocumentFormat>(), Ok(DocumentFormat::Json));
        assert!("toml".parse::<DocumentFormat>().is_err());
    }
}
