//! Widget source units and the shared schema/example module.
//!
//! A widget source is a file in the widgets directory whose module identity is
//! its file name up to the first `.`. It opens with a front-matter block that
//! carries the registration marker:
//!
//! ```text
//! ---
//! define_widget:
//!   schema: pokemonSchema
//!   exampleOutput: pokemonDemo
//! ---
//! <article>{{ name }}</article>
//! ```
//!
//! Identifiers are resolved against the shared module, a YAML or JSON file
//! with `schemas` (JSON Schema documents) and `examples` (literal values).

use crate::config::{ExtractorSettings, Settings};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Identifiers shared across widget sources.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharedModule {
    #[serde(default)]
    pub schemas: Map<String, Value>,
    #[serde(default)]
    pub examples: Map<String, Value>,
}

impl SharedModule {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Load, treating a missing or unreadable module as empty.
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!("Shared module unavailable, references will not resolve: {}", e);
                Self::default()
            }
        }
    }

    fn parse(path: &Path, content: &str) -> Result<Self, SourceError> {
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let parsed = if is_json {
            serde_json::from_str(content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(content).map_err(|e| e.to_string())
        };
        parsed.map_err(|reason| SourceError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn schema(&self, ident: &str) -> Option<&Value> {
        lookup(&self.schemas, ident)
    }

    pub fn example(&self, ident: &str) -> Option<&Value> {
        lookup(&self.examples, ident)
    }
}

/// `shared.pokemonDemo` resolves like `pokemonDemo`.
fn lookup<'a>(map: &'a Map<String, Value>, ident: &str) -> Option<&'a Value> {
    map.get(ident).or_else(|| {
        ident
            .rsplit_once('.')
            .and_then(|(_, last)| map.get(last))
    })
}

/// Tokens that identify a registration and its references.
#[derive(Debug, Clone)]
pub struct RegistrationKeys {
    pub marker: String,
    pub example_keys: Vec<String>,
    pub schema_keys: Vec<String>,
}

impl From<&ExtractorSettings> for RegistrationKeys {
    fn from(settings: &ExtractorSettings) -> Self {
        Self {
            marker: settings.marker.clone(),
            example_keys: settings.example_keys.clone(),
            schema_keys: settings.schema_keys.clone(),
        }
    }
}

impl Default for RegistrationKeys {
    fn default() -> Self {
        Self::from(&ExtractorSettings::default())
    }
}

/// A located widget source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub name: String,
    pub path: PathBuf,
}

/// Enumerate widget source files in `dir` with one of `extensions`, sorted
/// by path. The first file claims a module name; later duplicates are skipped.
pub fn discover_sources(dir: &Path, extensions: &[String]) -> Result<Vec<SourceUnit>, SourceError> {
    let pattern = format!("{}/*", glob::Pattern::escape(&dir.to_string_lossy()));
    let mut units: Vec<SourceUnit> = Vec::new();

    for entry in glob::glob(&pattern)? {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Failed to read glob entry: {}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let matches_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false);
        if !matches_extension {
            continue;
        }
        let Some(name) = module_name(&path) else {
            continue;
        };
        if units.iter().any(|unit| unit.name == name) {
            tracing::warn!(widget = %name, "Duplicate widget module, skipping {}", path.display());
            continue;
        }
        units.push(SourceUnit { name, path });
    }

    Ok(units)
}

pub fn discover_from_settings(settings: &Settings) -> Result<Vec<SourceUnit>, SourceError> {
    discover_sources(&settings.widgets.dir, &settings.widgets.extensions)
}

fn module_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name.split('.').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// A parsed widget source: its registration header and template body.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSource {
    pub schema_ref: Option<String>,
    pub example_ref: Option<String>,
    pub body: String,
}

impl WidgetSource {
    /// Parse the front-matter registration block. Returns `Ok(None)` when the
    /// source carries no registration marker.
    pub fn parse(text: &str, keys: &RegistrationKeys) -> Result<Option<Self>, String> {
        let Some((front_matter, body)) = split_front_matter(text) else {
            return Ok(None);
        };

        let header: serde_yaml::Value =
            serde_yaml::from_str(front_matter).map_err(|e| format!("invalid front matter: {}", e))?;
        let Some(registration) = header.get(keys.marker.as_str()) else {
            return Ok(None);
        };

        let reference = |candidates: &[String]| -> Result<Option<String>, String> {
            for key in candidates {
                match registration.get(key.as_str()) {
                    Some(serde_yaml::Value::String(ident)) => return Ok(Some(ident.clone())),
                    Some(other) => {
                        return Err(format!("'{}' must name an identifier, found {:?}", key, other))
                    }
                    None => {}
                }
            }
            Ok(None)
        };

        Ok(Some(Self {
            schema_ref: reference(&keys.schema_keys)?,
            example_ref: reference(&keys.example_keys)?,
            body: body.to_string(),
        }))
    }
}

/// Split `---` fenced front matter from the rest of the text.
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n'))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front_matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front_matter, body));
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_front_matter_registration() {
        let text = "---\ndefine_widget:\n  schema: pokemonSchema\n  exampleOutput: pokemonDemo\n---\n<p>{{ name }}</p>\n";
        let source = WidgetSource::parse(text, &RegistrationKeys::default())
            .unwrap()
            .unwrap();

        assert_eq!(source.schema_ref.as_deref(), Some("pokemonSchema"));
        assert_eq!(source.example_ref.as_deref(), Some("pokemonDemo"));
        assert_eq!(source.body, "<p>{{ name }}</p>\n");
    }

    #[test]
    fn test_parse_without_marker_is_not_a_widget() {
        let keys = RegistrationKeys::default();
        assert_eq!(WidgetSource::parse("<p>plain partial</p>", &keys).unwrap(), None);
        assert_eq!(WidgetSource::parse("---\ntitle: x\n---\nbody", &keys).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_non_identifier_reference() {
        let text = "---\ndefine_widget:\n  schema: [1, 2]\n---\n";
        assert!(WidgetSource::parse(text, &RegistrationKeys::default()).is_err());
    }

    #[test]
    fn test_shared_module_lookup_accepts_qualified_identifiers() {
        let module: SharedModule = serde_yaml::from_str(
            "examples:\n  demoData:\n    a: 1\nschemas:\n  demoSchema:\n    type: string\n",
        )
        .unwrap();

        assert_eq!(module.example("demoData"), Some(&serde_json::json!({ "a": 1 })));
        assert_eq!(module.example("shared.demoData"), Some(&serde_json::json!({ "a": 1 })));
        assert!(module.schema("demoSchema").is_some());
        assert!(module.schema("missing").is_none());
    }

    #[test]
    fn test_discover_sources_filters_extensions_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("weather.html"), "").unwrap();
        fs::write(dir.path().join("pokemon.html"), "").unwrap();
        fs::write(dir.path().join("pokemon.tera"), "").unwrap();
        fs::write(dir.path().join("shared.yaml"), "").unwrap();
        fs::create_dir(dir.path().join("nested.html")).unwrap();

        let units = discover_sources(dir.path(), &["html".to_string(), "tera".to_string()]).unwrap();
        let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["pokemon", "weather"]);
        assert!(units[0].path.ends_with("pokemon.html"));
    }
}
