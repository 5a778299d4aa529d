//! Build-time extraction of widget example payloads.
//!
//! Works on source text only: widget modules are never compiled or rendered
//! here. For each source unit carrying the registration marker, the lines of
//! the registration block are scanned for an example reference, then a schema
//! reference. Example references resolve verbatim against the shared module;
//! schema references are generated directly over the JSON Schema document.
//! Units that resolve neither are logged and left out of the map.

use crate::adapters::mock_generator::MockGenerator;
use crate::adapters::widget_source::{
    discover_sources, RegistrationKeys, SharedModule, SourceError, SourceUnit,
};
use crate::config::Settings;
use crate::domain::{MetadataEntry, MetadataMap};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize widget metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Source(#[from] SourceError),
}

/// A reference found in a registration block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Example(String),
    Schema(String),
}

pub struct MetadataExtractor {
    widgets_dir: PathBuf,
    extensions: Vec<String>,
    shared_path: PathBuf,
    output: PathBuf,
    keys: RegistrationKeys,
    generator: MockGenerator,
}

impl MetadataExtractor {
    pub fn new(settings: &Settings) -> Self {
        Self {
            widgets_dir: settings.widgets.dir.clone(),
            extensions: settings.widgets.extensions.clone(),
            shared_path: settings.widgets.shared.clone(),
            output: settings.extractor.output.clone(),
            keys: RegistrationKeys::from(&settings.extractor),
            generator: MockGenerator::new(settings.generator),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the metadata map without writing it.
    pub fn extract(&self) -> Result<MetadataMap, ExtractError> {
        let shared = SharedModule::load_or_empty(&self.shared_path);
        let units = discover_sources(&self.widgets_dir, &self.extensions)?;

        let mut map = MetadataMap::new();
        for unit in &units {
            if let Some(example_output) = self.extract_unit(unit, &shared) {
                map.insert(MetadataEntry {
                    name: unit.name.clone(),
                    example_output,
                });
            }
        }

        info!(
            "Extracted metadata for {} of {} source unit(s)",
            map.len(),
            units.len()
        );
        Ok(map)
    }

    /// Extract and write the map to the configured output in one step.
    pub fn run(&self) -> Result<MetadataMap, ExtractError> {
        let map = self.extract()?;
        write_atomic(&self.output, &map)?;
        info!("Wrote widget metadata to {}", self.output.display());
        Ok(map)
    }

    fn extract_unit(&self, unit: &SourceUnit, shared: &SharedModule) -> Option<Value> {
        let text = match std::fs::read_to_string(&unit.path) {
            Ok(text) => text,
            Err(e) => {
                warn!(widget = %unit.name, "Skipping unreadable source: {}", e);
                return None;
            }
        };

        if !text.contains(self.keys.marker.as_str()) {
            debug!(widget = %unit.name, "No registration marker, skipping");
            return None;
        }

        match find_reference(&text, &self.keys) {
            Some(Reference::Example(ident)) => match shared.example(&ident) {
                Some(example) => Some(example.clone()),
                None => {
                    warn!(widget = %unit.name, "Example '{}' not found in shared module, omitting", ident);
                    None
                }
            },
            Some(Reference::Schema(ident)) => match shared.schema(&ident) {
                Some(schema) => {
                    debug!(widget = %unit.name, "No example reference, generating from schema '{}'", ident);
                    Some(self.generator.generate(schema))
                }
                None => {
                    warn!(widget = %unit.name, "Schema '{}' not found in shared module, omitting", ident);
                    None
                }
            },
            None => {
                warn!(widget = %unit.name, "No example or schema reference, omitting");
                None
            }
        }
    }
}

const COMMENT_PREFIXES: &[&str] = &["//", "#", "/*", "*", "<!--", "{#"];

fn is_comment(line: &str) -> bool {
    let line = line.trim_start();
    COMMENT_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
}

/// Find the reference bound to the registration: the lines from the first
/// non-comment line naming the marker up to the closing `---` fence. An
/// example reference anywhere in the block wins over a schema reference.
pub fn find_reference(text: &str, keys: &RegistrationKeys) -> Option<Reference> {
    let block: Vec<&str> = text
        .lines()
        .filter(|line| !is_comment(line))
        .skip_while(|line| find_key(line, &keys.marker).is_none())
        .take_while(|line| line.trim_end() != "---")
        .collect();

    let scan = |candidates: &[String]| {
        block.iter().find_map(|line| {
            candidates
                .iter()
                .find_map(|key| find_key(line, key).and_then(|rest| identifier_after_colon(rest)))
        })
    };

    scan(&keys.example_keys)
        .map(Reference::Example)
        .or_else(|| scan(&keys.schema_keys).map(Reference::Schema))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Return the text following a whole-word occurrence of `key` in `line`.
fn find_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let mut from = 0;
    while let Some(pos) = line[from..].find(key) {
        let start = from + pos;
        let end = start + key.len();
        let before_ok = line[..start].chars().next_back().map_or(true, |c| !is_ident_char(c));
        let after_ok = line[end..].chars().next().map_or(true, |c| !is_ident_char(c));
        if before_ok && after_ok {
            return Some(&line[end..]);
        }
        from = end;
    }
    None
}

/// Parse `\s*:\s*['"]?ident` where `ident` may be dotted.
fn identifier_after_colon(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix(':')
        .or_else(|| rest.strip_prefix("\":"))
        .or_else(|| rest.strip_prefix("':"))?;
    let rest = rest.trim_start().trim_start_matches(['"', '\'']);
    let ident: String = rest
        .chars()
        .take_while(|&c| is_ident_char(c) || c == '.')
        .collect();
    let ident = ident.trim_matches('.');
    let starts_like_ident = ident.chars().next().map_or(false, |c| !c.is_ascii_digit());
    (starts_like_ident && !ident.is_empty()).then(|| ident.to_string())
}

/// Serialize `map` to a sibling temp file, then rename it over `path`.
fn write_atomic(path: &Path, map: &MetadataMap) -> Result<(), ExtractError> {
    let io_err = |source| ExtractError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(map)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(io_err)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "widget-metadata.json".to_string());
    let tmp = dir.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let written = std::fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(&json)?;
        file.write_all(b"\n")?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|_| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(e));
    }
    Ok(())
}
