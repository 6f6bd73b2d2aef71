//! # Base Configuration File Loading
//!
//! Loads the base property file from a plain path or a `file:` URI.
//!
//! Supports automatic format detection based on file extension. Nested
//! TOML/YAML/JSON documents are flattened into dotted keys so every format
//! produces the same flat [`PropertySet`].

use crate::properties::{PropertySet, PropertySource};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration file loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Malformed configuration location {location:?}: {reason}")]
    Malformed { location: String, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse properties at line {line}: {reason}")]
    PropertiesParse { line: usize, reason: String },

    #[error("Failed to parse TOML: {0}")]
    TomlParse(String),

    #[error("Failed to parse YAML: {0}")]
    YamlParse(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(String),

    #[error("Config file has no extension")]
    NoExtension,

    #[error("Unsupported config file format: {0}")]
    UnsupportedFormat(String),
}

/// Resolve a configuration location into a local path.
///
/// Accepts a plain filesystem path or a `file:` URI. Any other URI scheme,
/// a `file:` URI pointing at a remote host, or an empty location is
/// malformed.
pub fn resolve_location(location: &str) -> Result<PathBuf, ConfigFileError> {
    let trimmed = location.trim();
    if trimmed.is_empty() {
        return Err(ConfigFileError::Malformed {
            location: location.to_string(),
            reason: "location is empty".to_string(),
        });
    }

    if !(trimmed.starts_with("file:") || trimmed.contains("://")) {
        return Ok(PathBuf::from(trimmed));
    }

    // `file:relative` would otherwise be rooted at `/`
    if trimmed.starts_with("file:") && !trimmed.starts_with("file://") {
        return Err(ConfigFileError::Malformed {
            location: location.to_string(),
            reason: "file URI must start with file://".to_string(),
        });
    }

    let url = Url::parse(trimmed).map_err(|e| ConfigFileError::Malformed {
        location: location.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "file" {
        return Err(ConfigFileError::Malformed {
            location: location.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    url.to_file_path().map_err(|()| ConfigFileError::Malformed {
        location: location.to_string(),
        reason: "URI does not name a local file".to_string(),
    })
}

/// Load properties from a file with auto-detection.
///
/// # M-CANONICAL-DOCS
///
/// ## Supported Formats
/// - `.properties`: `key=value`, `key: value` or `key value` lines
/// - `.toml`: TOML, tables flattened to dotted keys
/// - `.yaml` / `.yml`: YAML, mappings flattened to dotted keys
/// - `.json`: JSON, objects flattened to dotted keys
///
/// ## Usage
/// ```rust,no_run
/// use platform_config::load_from_file;
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let props = load_from_file(Path::new("killbill.properties"))?;
///     println!("dao.url = {:?}", props.get("dao.url"));
///     Ok(())
/// }
/// ```
///
/// Every loaded entry carries [`PropertySource::File`].
pub fn load_from_file(path: &Path) -> Result<PropertySet, ConfigFileError> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or(ConfigFileError::NoExtension)?;

    let format = match extension.to_lowercase().as_str() {
        "properties" => Format::Properties,
        "toml" => Format::Toml,
        "yaml" | "yml" => Format::Yaml,
        "json" => Format::Json,
        other => return Err(ConfigFileError::UnsupportedFormat(other.to_string())),
    };

    let contents = read_file(path)?;
    let pairs = match format {
        Format::Properties => parse_properties(&contents)?,
        Format::Toml => {
            let table: toml::Table =
                toml::from_str(&contents).map_err(|e| ConfigFileError::TomlParse(e.to_string()))?;
            flatten_document(toml_to_json(toml::Value::Table(table)))
                .map_err(ConfigFileError::TomlParse)?
        }
        Format::Yaml => {
            let value: serde_json::Value = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigFileError::YamlParse(e.to_string()))?;
            flatten_document(value).map_err(ConfigFileError::YamlParse)?
        }
        Format::Json => {
            let value: serde_json::Value = serde_json::from_str(&contents)
                .map_err(|e| ConfigFileError::JsonParse(e.to_string()))?;
            flatten_document(value).map_err(ConfigFileError::JsonParse)?
        }
    };

    let mut props = PropertySet::with_capacity(pairs.len());
    props.extend(pairs, PropertySource::File);

    tracing::debug!(
        "Loaded {} properties from {}",
        props.len(),
        path.display()
    );

    Ok(props)
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Properties,
    Toml,
    Yaml,
    Json,
}

fn read_file(path: &Path) -> Result<String, ConfigFileError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigFileError::FileNotFound(path.display().to_string()))
        }
        Err(e) => Err(ConfigFileError::Io(e)),
    }
}

/// Parse Java-properties style text into ordered key/value pairs.
pub fn parse_properties(contents: &str) -> Result<Vec<(String, String)>, ConfigFileError> {
    let mut pairs = Vec::new();
    let mut lines = contents.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line_no = index + 1;
        let first = raw.trim_start();
        if first.is_empty() || first.starts_with('#') || first.starts_with('!') {
            continue;
        }

        let mut logical = first.to_string();
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let (key, value) = split_key_value(&logical);
        let key = unescape(key, line_no)?;
        let value = unescape(value, line_no)?;
        pairs.push((key, value));
    }

    Ok(pairs)
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start_matches([' ', '\t', '\x0c']);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches([' ', '\t', '\x0c']);
    }

    (key, rest.trim_end())
}

fn unescape(raw: &str, line: usize) -> Result<String, ConfigFileError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ConfigFileError::PropertiesParse {
                        line,
                        reason: format!("invalid unicode escape \\u{}", hex),
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}

/// Convert a TOML value, rendering datetimes as their TOML text.
fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => i.into(),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map_or_else(|| serde_json::Value::String(f.to_string()), serde_json::Value::Number),
        toml::Value::Boolean(b) => b.into(),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(items) => items.into_iter().map(toml_to_json).collect(),
        toml::Value::Table(table) => table
            .into_iter()
            .map(|(key, child)| (key, toml_to_json(child)))
            .collect(),
    }
}

/// Flatten a structured document into dotted keys.
fn flatten_document(value: serde_json::Value) -> Result<Vec<(String, String)>, String> {
    match value {
        serde_json::Value::Null => Ok(Vec::new()),
        serde_json::Value::Object(map) => {
            let mut pairs = Vec::new();
            for (key, child) in map {
                flatten_into(&key, child, &mut pairs);
            }
            Ok(pairs)
        }
        other => Err(format!(
            "top-level document must be a mapping, found {}",
            type_name(&other)
        )),
    }
}

fn flatten_into(prefix: &str, value: serde_json::Value, out: &mut Vec<(String, String)>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                flatten_into(&format!("{}.{}", prefix, key), child, out);
            }
        }
        serde_json::Value::Null => {}
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .map(scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.push((prefix.to_string(), joined));
        }
        scalar => out.push((prefix.to_string(), scalar_to_string(&scalar))),
    }
}

fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "mapping",
    }
}
