// Copyright 2026 Oxide Computer Company

//! Loading of staged API description documents
//!
//! [`SpecLoader`] turns a staged file into a typed [`OpenAPI`] document.
//! [`OpenApiLoader`] accepts JSON or YAML, checks that every reference in the
//! document points at something, and (when enabled) inlines references to
//! other files.  A document that cannot be fully loaded is an error: nothing
//! is ever skipped or replaced with a default.

use crate::config::ConfigLoader;
use camino::Utf8Path;
use camino::Utf8PathBuf;
use openapiv3::OpenAPI;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Loads a document from a file on the local filesystem.
///
/// Loading is synchronous; callers run it on tokio's blocking pool.
pub trait SpecLoader: Send + Sync {
    fn load(&self, path: &Utf8Path) -> Result<OpenAPI, LoadError>;
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("read {path:?}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("document is empty")]
    Empty,
    #[error("{path:?} is not UTF-8 text")]
    NotUtf8 { path: Utf8PathBuf },
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[source] serde_yaml::Error),
    #[error("document is not a mapping")]
    NotAMapping,
    #[error("missing \"openapi\" version field")]
    MissingVersion,
    #[error("unsupported OpenAPI version {0:?}")]
    UnsupportedVersion(String),
    #[error("unresolvable reference {reference:?} in {path:?}")]
    UnresolvedReference { path: Utf8PathBuf, reference: String },
    #[error("reference cycle through {0:?}")]
    ReferenceCycle(String),
    #[error("reference to another file {0:?} is not allowed")]
    ExternalReference(String),
    #[error("remote reference {0:?} is not supported")]
    RemoteReference(String),
    #[error("invalid OpenAPI document: {0}")]
    Structure(#[source] serde_json::Error),
}

/// Loader for OpenAPI 3.x documents.
#[derive(Clone, Debug)]
pub struct OpenApiLoader {
    allow_external_refs: bool,
}

impl OpenApiLoader {
    /// Returns a loader that inlines references to other files, resolved
    /// relative to the referring file.
    pub fn new() -> OpenApiLoader {
        OpenApiLoader { allow_external_refs: true }
    }

    /// Returns a loader that rejects references to other files.
    pub fn local_refs_only() -> OpenApiLoader {
        OpenApiLoader { allow_external_refs: false }
    }

    pub fn from_config(config: &ConfigLoader) -> OpenApiLoader {
        OpenApiLoader { allow_external_refs: config.allow_external_refs }
    }
}

impl Default for OpenApiLoader {
    fn default() -> Self {
        OpenApiLoader::new()
    }
}

impl SpecLoader for OpenApiLoader {
    fn load(&self, path: &Utf8Path) -> Result<OpenAPI, LoadError> {
        let mut document = read_document(path)?;
        let Some(object) = document.as_object() else {
            return Err(LoadError::NotAMapping);
        };
        match object.get("openapi") {
            None => return Err(LoadError::MissingVersion),
            Some(Value::String(version)) if version.starts_with("3.") => (),
            Some(Value::String(version)) => {
                return Err(LoadError::UnsupportedVersion(version.clone()));
            }
            Some(other) => {
                return Err(LoadError::UnsupportedVersion(other.to_string()));
            }
        }

        let snapshot = document.clone();
        let mut resolver = Resolver {
            allow_external_refs: self.allow_external_refs,
            documents: BTreeMap::new(),
            stack: Vec::new(),
        };
        resolver.walk(&mut document, path, Some(&snapshot), false)?;
        serde_json::from_value(document).map_err(LoadError::Structure)
    }
}

fn read_document(path: &Utf8Path) -> Result<Value, LoadError> {
    let bytes = std::fs::read(path)
        .map_err(|source| LoadError::Io { path: path.to_owned(), source })?;
    let text = String::from_utf8(bytes)
        .map_err(|_| LoadError::NotUtf8 { path: path.to_owned() })?;
    parse_document(&text)
}

/// Parses JSON or YAML text into its JSON value.
fn parse_document(text: &str) -> Result<Value, LoadError> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Err(LoadError::Empty);
    }
    if trimmed.starts_with('{') {
        serde_json::from_str(text).map_err(LoadError::Json)
    } else {
        match serde_yaml::from_str(text).map_err(LoadError::Yaml)? {
            Value::Null => Err(LoadError::Empty),
            value => Ok(value),
        }
    }
}

enum Reference<'r> {
    /// `#/...` within the same file
    Local(&'r str),
    /// `other.yaml#/...`
    External { file: &'r str, fragment: &'r str },
    /// `https://...`
    Remote,
}

impl<'r> Reference<'r> {
    fn parse(reference: &'r str) -> Reference<'r> {
        if let Some(fragment) = reference.strip_prefix('#') {
            return Reference::Local(fragment);
        }
        if reference.contains("://") {
            return Reference::Remote;
        }
        match reference.split_once('#') {
            Some((file, fragment)) => Reference::External { file, fragment },
            None => Reference::External { file: reference, fragment: "" },
        }
    }
}

/// Looks up a JSON pointer fragment (possibly percent-encoded) in `document`.
fn lookup<'v>(document: &'v Value, fragment: &str) -> Option<&'v Value> {
    let pointer =
        percent_encoding::percent_decode_str(fragment).decode_utf8().ok()?;
    document.pointer(&pointer)
}

/// Keys of objects that map user-chosen names (paths, component names,
/// property names, media types and so on) to further objects.  A key within
/// such a map is never a keyword.
const NAME_MAPS: &[&str] = &[
    "callbacks",
    "content",
    "definitions",
    "dependentSchemas",
    "encoding",
    "examples",
    "headers",
    "links",
    "parameters",
    "pathItems",
    "paths",
    "patternProperties",
    "properties",
    "requestBodies",
    "responses",
    "schemas",
    "securitySchemes",
    "variables",
    "webhooks",
    "$defs",
];

/// Whether the value under `key` is literal data, in which a `$ref` member
/// is just data.
fn is_literal(key: &str, value: &Value) -> bool {
    match key {
        "const" | "default" | "enum" | "example" | "value" => true,
        // A schema's `examples` is a list of values; anywhere else it maps
        // names to Example objects.
        "examples" => value.is_array(),
        _ => key.starts_with("x-"),
    }
}

struct Resolver {
    allow_external_refs: bool,
    /// Other files read so far, by path
    documents: BTreeMap<Utf8PathBuf, Value>,
    /// References being inlined, outermost first
    stack: Vec<String>,
}

impl Resolver {
    /// Checks or inlines every reference within `value`, which came from
    /// `file`.  `root` is the top-level document when `value` belongs to it;
    /// references local to the top-level document are kept (they may be
    /// recursive), while those local to any other file are inlined.
    /// `names` is set when the keys of `value` are names rather than
    /// keywords.
    fn walk(
        &mut self,
        value: &mut Value,
        file: &Utf8Path,
        root: Option<&Value>,
        names: bool,
    ) -> Result<(), LoadError> {
        let reference = if names {
            None
        } else {
            value.get("$ref").and_then(Value::as_str).map(str::to_string)
        };
        if let Some(reference) = reference {
            let unresolved = || LoadError::UnresolvedReference {
                path: file.to_owned(),
                reference: reference.clone(),
            };
            match Reference::parse(&reference) {
                Reference::Remote => {
                    return Err(LoadError::RemoteReference(reference.clone()));
                }
                Reference::Local(fragment) => match root {
                    Some(root) => {
                        lookup(root, fragment).ok_or_else(unresolved)?;
                    }
                    None => *value = self.inline(file, fragment)?,
                },
                Reference::External { .. } if !self.allow_external_refs => {
                    return Err(LoadError::ExternalReference(reference.clone()));
                }
                Reference::External { file: other, fragment } => {
                    let other = Utf8Path::new(other);
                    let target = if other.is_absolute() {
                        other.to_owned()
                    } else {
                        file.parent().unwrap_or(Utf8Path::new("")).join(other)
                    };
                    // One file reached through different paths must be
                    // keyed the same for cycle detection.
                    let target = target.canonicalize_utf8().map_err(
                        |source| LoadError::Io { path: target.clone(), source },
                    )?;
                    *value = self.inline(&target, fragment)?;
                }
            }
            return Ok(());
        }

        match value {
            Value::Object(map) if names => {
                for item in map.values_mut() {
                    self.walk(item, file, root, false)?;
                }
            }
            Value::Object(map) => {
                for (key, item) in map.iter_mut() {
                    if is_literal(key, item) {
                        continue;
                    }
                    let names =
                        item.is_object() && NAME_MAPS.contains(&key.as_str());
                    self.walk(item, file, root, names)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.walk(item, file, root, false)?;
                }
            }
            _ => (),
        }
        Ok(())
    }

    /// Returns the value at `fragment` within `file`, with its own
    /// references inlined.
    fn inline(
        &mut self,
        file: &Utf8Path,
        fragment: &str,
    ) -> Result<Value, LoadError> {
        let key = format!("{}#{}", file, fragment);
        if self.stack.contains(&key) {
            return Err(LoadError::ReferenceCycle(key));
        }

        if !self.documents.contains_key(file) {
            let document = read_document(file)?;
            self.documents.insert(file.to_owned(), document);
        }
        let mut target = self
            .documents
            .get(file)
            .and_then(|document| lookup(document, fragment))
            .cloned()
            .ok_or_else(|| LoadError::UnresolvedReference {
                path: file.to_owned(),
                reference: format!("#{}", fragment),
            })?;

        self.stack.push(key);
        let result = self.walk(&mut target, file, None, false);
        self.stack.pop();
        result.map(|()| target)
    }
}
