// Copyright 2026 Oxide Computer Company

//! Structural comparison of JSON schemas
//!
//! Schemas are compared in their JSON form so that references can be
//! followed with JSON pointers into the whole document.  Whether a change
//! breaks clients depends on which way data flows: a new required property
//! breaks senders of a request body but not readers of a response, and the
//! reverse holds for a removed property.

use super::report::Change;
use super::report::ChangeKind;
use super::report::ChangeLevel;
use super::report::ChangeSubject;
use super::CompareError;
use super::ComparisonConfig;
use super::Site;
use crate::upload::DocumentRole;
use serde_json::Value;
use std::collections::BTreeSet;

/// Limit on the length of a chain of references that point at references.
const MAX_REFERENCE_HOPS: usize = 64;

/// Which way data described by a schema flows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Direction {
    /// Sent by the client
    Request,
    /// Sent by the server
    Response,
}

impl Direction {
    /// Level of a change that widens what may be sent: breaking only for
    /// data the client reads.
    fn widened(self) -> ChangeLevel {
        match self {
            Direction::Request => ChangeLevel::NonBreaking,
            Direction::Response => ChangeLevel::Breaking,
        }
    }

    /// Level of a change that narrows what may be sent: breaking only for
    /// data the client sends.
    fn narrowed(self) -> ChangeLevel {
        match self {
            Direction::Request => ChangeLevel::Breaking,
            Direction::Response => ChangeLevel::NonBreaking,
        }
    }
}

type RefPair = (Option<String>, Option<String>);

pub(crate) struct SchemaDiff<'a> {
    pub(crate) base: &'a Value,
    pub(crate) revision: &'a Value,
    pub(crate) config: &'a ComparisonConfig,
    pub(crate) direction: Direction,
}

impl<'a> SchemaDiff<'a> {
    /// Appends to `changes` every difference between the schemas `base` and
    /// `revision`, reported at `site`.
    pub(crate) fn diff(
        &self,
        site: &Site,
        base: &Value,
        revision: &Value,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let mut stack = Vec::new();
        self.diff_at(site, "", base, revision, &mut stack, changes)
    }

    fn diff_at(
        &self,
        site: &Site,
        property: &str,
        base: &Value,
        revision: &Value,
        stack: &mut Vec<RefPair>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let pair = (reference_of(base), reference_of(revision));
        if pair == (None, None) {
            return self.diff_resolved(
                site, property, base, revision, stack, changes,
            );
        }

        // A recursive schema revisits the same pair of references; the
        // first visit already covers everything below it.
        if stack.contains(&pair) {
            return Ok(());
        }
        stack.push(pair);
        let result =
            self.diff_resolved(site, property, base, revision, stack, changes);
        stack.pop();
        result
    }

    fn diff_resolved(
        &self,
        site: &Site,
        property: &str,
        base: &Value,
        revision: &Value,
        stack: &mut Vec<RefPair>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let base = resolve(self.base, DocumentRole::Base, base)?;
        let revision =
            resolve(self.revision, DocumentRole::Revision, revision)?;
        let name = (!property.is_empty()).then(|| property.to_string());

        let base_type = type_of(base);
        let revision_type = type_of(revision);
        if base_type != revision_type {
            changes.push(site.change(
                ChangeSubject::Type,
                name,
                ChangeKind::Modified,
                ChangeLevel::Breaking,
                Some(format!(
                    "{} -> {}",
                    base_type.as_deref().unwrap_or("any"),
                    revision_type.as_deref().unwrap_or("any"),
                )),
            ));
            return Ok(());
        }

        let format = kind_of(base.get("format"), revision.get("format"));
        if let Some(kind) = format {
            changes.push(site.change(
                ChangeSubject::Format,
                name.clone(),
                kind,
                ChangeLevel::Breaking,
                Some(format!(
                    "{} -> {}",
                    str_of(base, "format").unwrap_or("none"),
                    str_of(revision, "format").unwrap_or("none"),
                )),
            ));
        }

        self.diff_enum(site, &name, base, revision, changes);

        if !self.config.exclude_description {
            if let Some(kind) =
                kind_of(base.get("description"), revision.get("description"))
            {
                changes.push(site.change(
                    ChangeSubject::Description,
                    name.clone(),
                    kind,
                    ChangeLevel::NonBreaking,
                    None,
                ));
            }
        }

        if !self.config.exclude_examples {
            if let Some(kind) =
                kind_of(base.get("example"), revision.get("example"))
            {
                changes.push(site.change(
                    ChangeSubject::Example,
                    name.clone(),
                    kind,
                    ChangeLevel::NonBreaking,
                    None,
                ));
            }
        }

        self.diff_properties(site, property, base, revision, stack, changes)?;

        if let (Some(base_items), Some(revision_items)) =
            (base.get("items"), revision.get("items"))
        {
            let items = format!("{}[]", property);
            self.diff_at(
                site,
                &items,
                base_items,
                revision_items,
                stack,
                changes,
            )?;
        }

        for keyword in ["allOf", "anyOf", "oneOf"] {
            self.diff_composition(
                site, property, keyword, base, revision, stack, changes,
            )?;
        }

        Ok(())
    }

    fn diff_enum(
        &self,
        site: &Site,
        name: &Option<String>,
        base: &Value,
        revision: &Value,
        changes: &mut Vec<Change>,
    ) {
        let base_values = base.get("enum").and_then(Value::as_array);
        let revision_values = revision.get("enum").and_then(Value::as_array);
        match (base_values, revision_values) {
            (None, None) => (),
            (None, Some(_)) => changes.push(site.change(
                ChangeSubject::Enum,
                name.clone(),
                ChangeKind::Added,
                self.direction.narrowed(),
                Some(String::from("values restricted")),
            )),
            (Some(_), None) => changes.push(site.change(
                ChangeSubject::Enum,
                name.clone(),
                ChangeKind::Deleted,
                self.direction.widened(),
                Some(String::from("values no longer restricted")),
            )),
            (Some(base_values), Some(revision_values)) => {
                for value in revision_values {
                    if !base_values.contains(value) {
                        changes.push(site.change(
                            ChangeSubject::Enum,
                            name.clone(),
                            ChangeKind::Added,
                            self.direction.widened(),
                            Some(value.to_string()),
                        ));
                    }
                }
                for value in base_values {
                    if !revision_values.contains(value) {
                        changes.push(site.change(
                            ChangeSubject::Enum,
                            name.clone(),
                            ChangeKind::Deleted,
                            self.direction.narrowed(),
                            Some(value.to_string()),
                        ));
                    }
                }
            }
        }
    }

    fn diff_properties(
        &self,
        site: &Site,
        property: &str,
        base: &Value,
        revision: &Value,
        stack: &mut Vec<RefPair>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let empty = serde_json::Map::new();
        let base_properties =
            base.get("properties").and_then(Value::as_object).unwrap_or(&empty);
        let revision_properties = revision
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let base_required = required_of(base);
        let revision_required = required_of(revision);

        let names: BTreeSet<&String> =
            base_properties.keys().chain(revision_properties.keys()).collect();
        for name in names {
            let child = if property.is_empty() {
                name.clone()
            } else {
                format!("{}.{}", property, name)
            };
            let required = revision_required.contains(name.as_str());
            match (base_properties.get(name), revision_properties.get(name)) {
                (None, None) => (),
                (None, Some(_)) => {
                    let level = match self.direction {
                        Direction::Request if required => ChangeLevel::Breaking,
                        _ => ChangeLevel::NonBreaking,
                    };
                    changes.push(site.change(
                        ChangeSubject::Property,
                        Some(child),
                        ChangeKind::Added,
                        level,
                        required.then(|| String::from("required")),
                    ));
                }
                (Some(_), None) => {
                    changes.push(site.change(
                        ChangeSubject::Property,
                        Some(child),
                        ChangeKind::Deleted,
                        self.direction.widened(),
                        None,
                    ));
                }
                (Some(base_schema), Some(revision_schema)) => {
                    let was_required = base_required.contains(name.as_str());
                    if was_required != required {
                        let (level, detail) = if required {
                            (self.direction.narrowed(), "now required")
                        } else {
                            (self.direction.widened(), "no longer required")
                        };
                        changes.push(site.change(
                            ChangeSubject::Required,
                            Some(child.clone()),
                            ChangeKind::Modified,
                            level,
                            Some(String::from(detail)),
                        ));
                    }
                    self.diff_at(
                        site,
                        &child,
                        base_schema,
                        revision_schema,
                        stack,
                        changes,
                    )?;
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn diff_composition(
        &self,
        site: &Site,
        property: &str,
        keyword: &str,
        base: &Value,
        revision: &Value,
        stack: &mut Vec<RefPair>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let name = if property.is_empty() {
            keyword.to_string()
        } else {
            format!("{}.{}", property, keyword)
        };
        let base_schemas = base.get(keyword).and_then(Value::as_array);
        let revision_schemas = revision.get(keyword).and_then(Value::as_array);
        match (base_schemas, revision_schemas) {
            (None, None) => Ok(()),
            (None, Some(_)) | (Some(_), None) => {
                let kind = if base_schemas.is_none() {
                    ChangeKind::Added
                } else {
                    ChangeKind::Deleted
                };
                changes.push(site.change(
                    ChangeSubject::Schema,
                    Some(name),
                    kind,
                    ChangeLevel::Breaking,
                    None,
                ));
                Ok(())
            }
            (Some(base_schemas), Some(revision_schemas)) => {
                if base_schemas.len() != revision_schemas.len() {
                    changes.push(site.change(
                        ChangeSubject::Schema,
                        Some(name.clone()),
                        ChangeKind::Modified,
                        ChangeLevel::Breaking,
                        Some(format!(
                            "{} subschemas -> {}",
                            base_schemas.len(),
                            revision_schemas.len()
                        )),
                    ));
                }
                for (i, (base_schema, revision_schema)) in
                    base_schemas.iter().zip(revision_schemas).enumerate()
                {
                    let child = format!("{}[{}]", name, i);
                    self.diff_at(
                        site,
                        &child,
                        base_schema,
                        revision_schema,
                        stack,
                        changes,
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn reference_of(schema: &Value) -> Option<String> {
    schema.get("$ref").and_then(Value::as_str).map(str::to_string)
}

/// Follows `schema` through local references within `document` until it
/// reaches something that is not a reference.
pub(crate) fn resolve<'v>(
    document: &'v Value,
    role: DocumentRole,
    schema: &'v Value,
) -> Result<&'v Value, CompareError> {
    let mut current = schema;
    for _ in 0..MAX_REFERENCE_HOPS {
        let Some(reference) = current.get("$ref").and_then(Value::as_str)
        else {
            return Ok(current);
        };
        current = lookup(document, reference).ok_or_else(|| {
            CompareError::UnresolvedReference {
                role,
                reference: reference.to_string(),
            }
        })?;
    }
    Err(CompareError::ReferenceCycle {
        role,
        reference: reference_of(schema).unwrap_or_default(),
    })
}

/// Looks up a local reference (`#/...`) in `document`.
fn lookup<'v>(document: &'v Value, reference: &str) -> Option<&'v Value> {
    let fragment = reference.strip_prefix('#')?;
    let pointer =
        percent_encoding::percent_decode_str(fragment).decode_utf8().ok()?;
    document.pointer(&pointer)
}

fn type_of(schema: &Value) -> Option<String> {
    match schema.get("type")? {
        Value::String(t) => Some(t.clone()),
        Value::Array(types) => Some(
            types
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("|"),
        ),
        _ => None,
    }
}

fn str_of<'v>(schema: &'v Value, key: &str) -> Option<&'v str> {
    schema.get(key).and_then(Value::as_str)
}

fn required_of(schema: &Value) -> BTreeSet<&str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Classifies the difference between an optional value in each document.
pub(crate) fn kind_of<T: PartialEq>(
    base: Option<T>,
    revision: Option<T>,
) -> Option<ChangeKind> {
    match (base, revision) {
        (None, None) => None,
        (None, Some(_)) => Some(ChangeKind::Added),
        (Some(_), None) => Some(ChangeKind::Deleted),
        (Some(b), Some(r)) => (b != r).then_some(ChangeKind::Modified),
    }
}
