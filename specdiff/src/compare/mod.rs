// Copyright 2026 Oxide Computer Company

//! Comparison of two OpenAPI documents
//!
//! [`ComparisonEngine`] is the seam between the request pipeline and the
//! comparison logic.  [`OpenApiComparator`] is the implementation the server
//! uses: it walks both documents path by path and operation by operation,
//! and classifies each difference as breaking or not from the point of view
//! of an existing client.

mod config;
pub mod report;
mod schema;

pub use config::ComparisonConfig;
pub use report::DiffReport;

use crate::upload::DocumentRole;
use chrono::Days;
use chrono::NaiveDate;
use chrono::Utc;
use indexmap::IndexMap;
use openapiv3::Components;
use openapiv3::MediaType;
use openapiv3::OpenAPI;
use openapiv3::Operation;
use openapiv3::Parameter;
use openapiv3::ParameterData;
use openapiv3::ParameterSchemaOrContent;
use openapiv3::PathItem;
use openapiv3::ReferenceOr;
use openapiv3::StatusCode;
use regex::Regex;
use report::Change;
use report::ChangeKind;
use report::ChangeLevel;
use report::ChangeSubject;
use report::InfoDiff;
use report::ValueDiff;
use schema::kind_of;
use schema::Direction;
use schema::SchemaDiff;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use thiserror::Error;

/// Extension carrying the date (`YYYY-MM-DD`) after which a deprecated
/// operation may be removed.
pub const SUNSET_EXTENSION: &str = "x-sunset";

/// Compares two loaded documents.
///
/// Implementations run on tokio's blocking pool and must not depend on
/// anything but their arguments (and, for sunset checks, the date).
pub trait ComparisonEngine: Send + Sync {
    fn compare(
        &self,
        config: &ComparisonConfig,
        base: &OpenAPI,
        revision: &OpenAPI,
    ) -> Result<DiffReport, CompareError>;
}

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("invalid {option} regex {pattern:?}: {source}")]
    InvalidRegex {
        option: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("{role} document: unresolvable reference {reference:?}")]
    UnresolvedReference { role: DocumentRole, reference: String },
    #[error("{role} document: reference cycle through {reference:?}")]
    ReferenceCycle { role: DocumentRole, reference: String },
    #[error("{role} document: paths collide at {path:?} after normalization")]
    DuplicatePath { role: DocumentRole, path: String },
    #[error("{role} document: {source}")]
    Serialize {
        role: DocumentRole,
        #[source]
        source: serde_json::Error,
    },
}

/// Where in the documents a change was found.
#[derive(Clone, Debug)]
pub(crate) struct Site {
    path: String,
    method: Option<&'static str>,
    location: Option<String>,
}

impl Site {
    pub(crate) fn new(path: &str) -> Site {
        Site { path: path.to_string(), method: None, location: None }
    }

    fn operation(&self, method: &'static str) -> Site {
        Site { method: Some(method), ..self.clone() }
    }

    /// Returns a site nested within this one, e.g. "response 200" within
    /// an operation, or "response 200 application/json" within that.
    fn within(&self, location: &str) -> Site {
        let location = match &self.location {
            Some(outer) => format!("{} {}", outer, location),
            None => location.to_string(),
        };
        Site { location: Some(location), ..self.clone() }
    }

    pub(crate) fn change(
        &self,
        subject: ChangeSubject,
        name: Option<String>,
        kind: ChangeKind,
        level: ChangeLevel,
        detail: Option<String>,
    ) -> Change {
        Change {
            path: self.path.clone(),
            method: self.method.map(str::to_string),
            location: self.location.clone(),
            subject,
            name,
            kind,
            level,
            detail,
        }
    }
}

/// Structural comparator for OpenAPI 3.x documents.
#[derive(Clone, Debug, Default)]
pub struct OpenApiComparator {
    today: Option<NaiveDate>,
}

impl OpenApiComparator {
    /// Returns a comparator that checks sunset dates against the current
    /// (UTC) date.
    pub fn new() -> OpenApiComparator {
        OpenApiComparator::default()
    }

    /// Returns a comparator that checks sunset dates against `today`.
    pub fn with_today(today: NaiveDate) -> OpenApiComparator {
        OpenApiComparator { today: Some(today) }
    }
}

impl ComparisonEngine for OpenApiComparator {
    fn compare(
        &self,
        config: &ComparisonConfig,
        base: &OpenAPI,
        revision: &OpenAPI,
    ) -> Result<DiffReport, CompareError> {
        let filters = Filters {
            path: config.path_filter_regex()?,
            extension: config.filter_extension_regex()?,
        };
        let differ = Differ {
            config,
            filters,
            today: self.today.unwrap_or_else(|| Utc::now().date_naive()),
            base: Document::new(DocumentRole::Base, base)?,
            revision: Document::new(DocumentRole::Revision, revision)?,
        };

        let mut changes = Vec::new();
        differ.diff_paths(&mut changes)?;
        let info = if config.breaking_only {
            changes.retain(|change| change.level == ChangeLevel::Breaking);
            None
        } else {
            Some(differ.diff_info())
        };
        Ok(DiffReport::new(info, changes))
    }
}

struct Filters {
    path: Option<Regex>,
    extension: Option<Regex>,
}

impl Filters {
    fn includes_path(&self, path: &str) -> bool {
        self.path.as_ref().map_or(true, |re| re.is_match(path))
    }

    fn excludes(&self, extensions: &IndexMap<String, Value>) -> bool {
        self.extension
            .as_ref()
            .map_or(false, |re| extensions.keys().any(|name| re.is_match(name)))
    }
}

/// Path items keyed by their normalized path.
type PathMap<'a> = BTreeMap<String, &'a PathItem>;

/// Effective parameters of an operation keyed by location and name.
type ParameterMap<'a> = BTreeMap<(&'static str, String), &'a ParameterData>;

/// One side of the comparison: the typed document plus its JSON form, in
/// which schema references are followed.
struct Document<'a> {
    role: DocumentRole,
    api: &'a OpenAPI,
    json: Value,
}

impl<'a> Document<'a> {
    fn new(
        role: DocumentRole,
        api: &'a OpenAPI,
    ) -> Result<Document<'a>, CompareError> {
        let json = to_json(role, api)?;
        Ok(Document { role, api, json })
    }

    /// Follows a reference to one of the `components` maps.
    fn resolve<T>(
        &self,
        item: &'a ReferenceOr<T>,
        prefix: &str,
        lookup: fn(&'a Components) -> &'a IndexMap<String, ReferenceOr<T>>,
    ) -> Result<&'a T, CompareError> {
        let mut current = item;
        let mut seen = BTreeSet::new();
        loop {
            let reference = match current {
                ReferenceOr::Item(item) => return Ok(item),
                ReferenceOr::Reference { reference } => reference,
            };
            if !seen.insert(reference.as_str()) {
                return Err(CompareError::ReferenceCycle {
                    role: self.role,
                    reference: reference.clone(),
                });
            }
            current = reference
                .strip_prefix(prefix)
                .zip(self.api.components.as_ref())
                .and_then(|(name, components)| lookup(components).get(name))
                .ok_or_else(|| CompareError::UnresolvedReference {
                    role: self.role,
                    reference: reference.clone(),
                })?;
        }
    }

    /// Returns the document's paths after normalization, and the set of
    /// (normalized) paths excluded by an extension.
    fn paths(
        &self,
        config: &ComparisonConfig,
        filters: &Filters,
    ) -> Result<(PathMap<'a>, BTreeSet<String>), CompareError> {
        let mut paths = BTreeMap::new();
        let mut excluded = BTreeSet::new();
        for (path, item) in &self.api.paths.paths {
            let item = match item {
                ReferenceOr::Item(item) => item,
                ReferenceOr::Reference { reference } => {
                    return Err(CompareError::UnresolvedReference {
                        role: self.role,
                        reference: reference.clone(),
                    });
                }
            };
            let path = config.normalize_path(self.role, path);
            if !filters.includes_path(&path) {
                continue;
            }
            if filters.excludes(&item.extensions) {
                excluded.insert(path);
                continue;
            }
            if paths.insert(path.clone(), item).is_some() {
                return Err(CompareError::DuplicatePath {
                    role: self.role,
                    path,
                });
            }
        }
        Ok((paths, excluded))
    }

    /// Returns the parameters in effect for `operation`, keyed by location
    /// and name.  Operation-level parameters override path-level ones.
    fn parameters(
        &self,
        item: &'a PathItem,
        operation: &'a Operation,
    ) -> Result<ParameterMap<'a>, CompareError> {
        let mut parameters = BTreeMap::new();
        for parameter in item.parameters.iter().chain(&operation.parameters) {
            let parameter = self.resolve(
                parameter,
                "#/components/parameters/",
                |components| &components.parameters,
            )?;
            let (location, data) = parameter_parts(parameter);
            parameters.insert((location, data.name.clone()), data);
        }
        Ok(parameters)
    }
}

fn to_json<T: Serialize>(
    role: DocumentRole,
    value: &T,
) -> Result<Value, CompareError> {
    serde_json::to_value(value)
        .map_err(|source| CompareError::Serialize { role, source })
}

fn parameter_parts(parameter: &Parameter) -> (&'static str, &ParameterData) {
    match parameter {
        Parameter::Query { parameter_data, .. } => ("query", parameter_data),
        Parameter::Header { parameter_data, .. } => ("header", parameter_data),
        Parameter::Path { parameter_data, .. } => ("path", parameter_data),
        Parameter::Cookie { parameter_data, .. } => ("cookie", parameter_data),
    }
}

const METHODS: [&str; 8] =
    ["GET", "PUT", "POST", "DELETE", "OPTIONS", "HEAD", "PATCH", "TRACE"];

/// Operations of a path item, in [`METHODS`] order.
fn operations(item: &PathItem) -> Vec<(&'static str, &Operation)> {
    [
        ("GET", &item.get),
        ("PUT", &item.put),
        ("POST", &item.post),
        ("DELETE", &item.delete),
        ("OPTIONS", &item.options),
        ("HEAD", &item.head),
        ("PATCH", &item.patch),
        ("TRACE", &item.trace),
    ]
    .into_iter()
    .filter_map(|(method, operation)| {
        operation.as_ref().map(|operation| (method, operation))
    })
    .collect()
}

fn sunset(operation: &Operation) -> Option<NaiveDate> {
    operation
        .extensions
        .get(SUNSET_EXTENSION)
        .and_then(Value::as_str)
        .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
}

fn status_label(status: &StatusCode) -> String {
    match status {
        StatusCode::Code(code) => code.to_string(),
        StatusCode::Range(range) => format!("{}XX", range),
    }
}

struct Differ<'a> {
    config: &'a ComparisonConfig,
    filters: Filters,
    today: NaiveDate,
    base: Document<'a>,
    revision: Document<'a>,
}

impl<'a> Differ<'a> {
    fn diff_info(&self) -> InfoDiff {
        let base = &self.base.api.info;
        let revision = &self.revision.api.info;
        InfoDiff {
            title: ValueDiff::between(
                Some(base.title.as_str()),
                Some(revision.title.as_str()),
            ),
            version: ValueDiff::between(
                Some(base.version.as_str()),
                Some(revision.version.as_str()),
            ),
            description: if self.config.exclude_description {
                None
            } else {
                ValueDiff::between(
                    base.description.as_deref(),
                    revision.description.as_deref(),
                )
            },
        }
    }

    fn diff_paths(
        &self,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let (base_paths, base_excluded) =
            self.base.paths(self.config, &self.filters)?;
        let (revision_paths, revision_excluded) =
            self.revision.paths(self.config, &self.filters)?;

        let paths: BTreeSet<&String> =
            base_paths.keys().chain(revision_paths.keys()).collect();
        for path in paths {
            if base_excluded.contains(path) || revision_excluded.contains(path)
            {
                continue;
            }
            let site = Site::new(path);
            match (base_paths.get(path), revision_paths.get(path)) {
                (None, None) => (),
                (None, Some(_)) => changes.push(site.change(
                    ChangeSubject::Path,
                    None,
                    ChangeKind::Added,
                    ChangeLevel::NonBreaking,
                    None,
                )),
                (Some(item), None) => {
                    let level = if operations(item).iter().all(|(_, op)| {
                        self.removal_level(op) == ChangeLevel::NonBreaking
                    }) {
                        ChangeLevel::NonBreaking
                    } else {
                        ChangeLevel::Breaking
                    };
                    changes.push(site.change(
                        ChangeSubject::Path,
                        None,
                        ChangeKind::Deleted,
                        level,
                        None,
                    ));
                }
                (Some(base), Some(revision)) => {
                    self.diff_path_item(&site, base, revision, changes)?;
                }
            }
        }
        Ok(())
    }

    fn diff_path_item(
        &self,
        site: &Site,
        base: &'a PathItem,
        revision: &'a PathItem,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let base_operations = operations(base);
        let revision_operations = operations(revision);
        let find = |operations: &[(&'static str, &'a Operation)], method| {
            operations
                .iter()
                .find(|(m, _)| *m == method)
                .map(|(_, operation)| *operation)
        };

        for method in METHODS {
            let base_operation = find(&base_operations, method);
            let revision_operation = find(&revision_operations, method);
            let excluded = base_operation
                .into_iter()
                .chain(revision_operation)
                .any(|operation| self.filters.excludes(&operation.extensions));
            if excluded {
                continue;
            }

            let site = site.operation(method);
            match (base_operation, revision_operation) {
                (None, None) => (),
                (None, Some(_)) => changes.push(site.change(
                    ChangeSubject::Operation,
                    None,
                    ChangeKind::Added,
                    ChangeLevel::NonBreaking,
                    None,
                )),
                (Some(operation), None) => changes.push(site.change(
                    ChangeSubject::Operation,
                    None,
                    ChangeKind::Deleted,
                    self.removal_level(operation),
                    None,
                )),
                (Some(base_operation), Some(revision_operation)) => {
                    self.diff_operation(
                        &site,
                        (base, base_operation),
                        (revision, revision_operation),
                        changes,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Level of removing `operation`: it must have been deprecated, and past
    /// its sunset date when a grace period is configured.
    fn removal_level(&self, operation: &Operation) -> ChangeLevel {
        if !operation.deprecated {
            return ChangeLevel::Breaking;
        }
        if self.config.deprecation_days == 0 {
            return ChangeLevel::NonBreaking;
        }
        match sunset(operation) {
            Some(date) if date <= self.today => ChangeLevel::NonBreaking,
            _ => ChangeLevel::Breaking,
        }
    }

    /// Level of newly deprecating `operation`: with a grace period, its
    /// sunset date must be at least that far away.
    fn deprecation_level(&self, operation: &Operation) -> ChangeLevel {
        let days = self.config.deprecation_days;
        if days == 0 {
            return ChangeLevel::NonBreaking;
        }
        let earliest = self.today.checked_add_days(Days::new(u64::from(days)));
        match (sunset(operation), earliest) {
            (Some(date), Some(earliest)) if date >= earliest => {
                ChangeLevel::NonBreaking
            }
            _ => ChangeLevel::Breaking,
        }
    }

    fn diff_operation(
        &self,
        site: &Site,
        (base_item, base): (&'a PathItem, &'a Operation),
        (revision_item, revision): (&'a PathItem, &'a Operation),
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        match (base.deprecated, revision.deprecated) {
            (false, true) => changes.push(site.change(
                ChangeSubject::Deprecation,
                None,
                ChangeKind::Added,
                self.deprecation_level(revision),
                sunset(revision).map(|date| format!("sunset {}", date)),
            )),
            (true, false) => changes.push(site.change(
                ChangeSubject::Deprecation,
                None,
                ChangeKind::Deleted,
                ChangeLevel::NonBreaking,
                None,
            )),
            _ => (),
        }

        if !self.config.exclude_description {
            self.diff_text(
                site,
                ChangeSubject::Summary,
                base.summary.as_deref(),
                revision.summary.as_deref(),
                changes,
            );
            self.diff_text(
                site,
                ChangeSubject::Description,
                base.description.as_deref(),
                revision.description.as_deref(),
                changes,
            );
        }

        self.diff_parameters(
            site,
            self.base.parameters(base_item, base)?,
            self.revision.parameters(revision_item, revision)?,
            changes,
        )?;
        self.diff_request_body(site, base, revision, changes)?;
        self.diff_responses(site, base, revision, changes)
    }

    fn diff_text(
        &self,
        site: &Site,
        subject: ChangeSubject,
        base: Option<&str>,
        revision: Option<&str>,
        changes: &mut Vec<Change>,
    ) {
        if let Some(kind) = kind_of(base, revision) {
            changes.push(site.change(
                subject,
                None,
                kind,
                ChangeLevel::NonBreaking,
                None,
            ));
        }
    }

    fn diff_example(
        &self,
        site: &Site,
        base: Option<&Value>,
        revision: Option<&Value>,
        changes: &mut Vec<Change>,
    ) {
        if self.config.exclude_examples {
            return;
        }
        if let Some(kind) = kind_of(base, revision) {
            changes.push(site.change(
                ChangeSubject::Example,
                None,
                kind,
                ChangeLevel::NonBreaking,
                None,
            ));
        }
    }

    fn diff_parameters(
        &self,
        site: &Site,
        base: BTreeMap<(&'static str, String), &'a ParameterData>,
        revision: BTreeMap<(&'static str, String), &'a ParameterData>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let keys: BTreeSet<&(&'static str, String)> =
            base.keys().chain(revision.keys()).collect();
        for key in keys {
            let (location, name) = key;
            match (base.get(key), revision.get(key)) {
                (None, None) => (),
                (None, Some(parameter)) => {
                    let level = if parameter.required {
                        ChangeLevel::Breaking
                    } else {
                        ChangeLevel::NonBreaking
                    };
                    changes.push(site.within(location).change(
                        ChangeSubject::Parameter,
                        Some(name.clone()),
                        ChangeKind::Added,
                        level,
                        parameter.required.then(|| String::from("required")),
                    ));
                }
                (Some(_), None) => changes.push(site.within(location).change(
                    ChangeSubject::Parameter,
                    Some(name.clone()),
                    ChangeKind::Deleted,
                    ChangeLevel::NonBreaking,
                    None,
                )),
                (Some(base), Some(revision)) => {
                    let site = site
                        .within(&format!("{} parameter {}", location, name));
                    self.diff_parameter(&site, base, revision, changes)?;
                }
            }
        }
        Ok(())
    }

    fn diff_parameter(
        &self,
        site: &Site,
        base: &ParameterData,
        revision: &ParameterData,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        self.diff_required(site, base.required, revision.required, changes);
        if !self.config.exclude_description {
            self.diff_text(
                site,
                ChangeSubject::Description,
                base.description.as_deref(),
                revision.description.as_deref(),
                changes,
            );
        }
        self.diff_example(
            site,
            base.example.as_ref(),
            revision.example.as_ref(),
            changes,
        );

        match (&base.format, &revision.format) {
            (
                ParameterSchemaOrContent::Schema(base),
                ParameterSchemaOrContent::Schema(revision),
            ) => self.diff_schema(
                site,
                Direction::Request,
                base,
                revision,
                changes,
            ),
            (
                ParameterSchemaOrContent::Content(base),
                ParameterSchemaOrContent::Content(revision),
            ) => self.diff_content(
                site,
                Direction::Request,
                base,
                revision,
                changes,
            ),
            _ => {
                changes.push(site.change(
                    ChangeSubject::Schema,
                    None,
                    ChangeKind::Modified,
                    ChangeLevel::Breaking,
                    Some(String::from("switched between schema and content")),
                ));
                Ok(())
            }
        }
    }

    /// Records a change to whether something the client sends is required.
    fn diff_required(
        &self,
        site: &Site,
        base: bool,
        revision: bool,
        changes: &mut Vec<Change>,
    ) {
        let (level, detail) = match (base, revision) {
            (false, true) => (ChangeLevel::Breaking, "now required"),
            (true, false) => (ChangeLevel::NonBreaking, "no longer required"),
            _ => return,
        };
        changes.push(site.change(
            ChangeSubject::Required,
            None,
            ChangeKind::Modified,
            level,
            Some(String::from(detail)),
        ));
    }

    fn diff_request_body(
        &self,
        site: &Site,
        base: &'a Operation,
        revision: &'a Operation,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let base_body = base
            .request_body
            .as_ref()
            .map(|body| {
                self.base.resolve(body, "#/components/requestBodies/", |c| {
                    &c.request_bodies
                })
            })
            .transpose()?;
        let revision_body = revision
            .request_body
            .as_ref()
            .map(|body| {
                self.revision.resolve(body, "#/components/requestBodies/", |c| {
                    &c.request_bodies
                })
            })
            .transpose()?;

        match (base_body, revision_body) {
            (None, None) => Ok(()),
            (None, Some(body)) => {
                let level = if body.required {
                    ChangeLevel::Breaking
                } else {
                    ChangeLevel::NonBreaking
                };
                changes.push(site.change(
                    ChangeSubject::RequestBody,
                    None,
                    ChangeKind::Added,
                    level,
                    body.required.then(|| String::from("required")),
                ));
                Ok(())
            }
            (Some(_), None) => {
                changes.push(site.change(
                    ChangeSubject::RequestBody,
                    None,
                    ChangeKind::Deleted,
                    ChangeLevel::Breaking,
                    None,
                ));
                Ok(())
            }
            (Some(base), Some(revision)) => {
                let site = site.within("request body");
                self.diff_required(
                    &site,
                    base.required,
                    revision.required,
                    changes,
                );
                if !self.config.exclude_description {
                    self.diff_text(
                        &site,
                        ChangeSubject::Description,
                        base.description.as_deref(),
                        revision.description.as_deref(),
                        changes,
                    );
                }
                self.diff_content(
                    &site,
                    Direction::Request,
                    &base.content,
                    &revision.content,
                    changes,
                )
            }
        }
    }

    fn diff_responses(
        &self,
        site: &Site,
        base: &'a Operation,
        revision: &'a Operation,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let labelled = |operation: &'a Operation| {
            let mut responses: BTreeMap<String, _> = operation
                .responses
                .responses
                .iter()
                .map(|(status, response)| (status_label(status), response))
                .collect();
            if let Some(default) = &operation.responses.default {
                responses.insert(String::from("default"), default);
            }
            responses
        };
        let base_responses = labelled(base);
        let revision_responses = labelled(revision);

        let labels: BTreeSet<&String> =
            base_responses.keys().chain(revision_responses.keys()).collect();
        for label in labels {
            match (base_responses.get(label), revision_responses.get(label)) {
                (None, None) => (),
                (None, Some(_)) => changes.push(site.change(
                    ChangeSubject::Response,
                    Some(label.clone()),
                    ChangeKind::Added,
                    ChangeLevel::NonBreaking,
                    None,
                )),
                (Some(_), None) => changes.push(site.change(
                    ChangeSubject::Response,
                    Some(label.clone()),
                    ChangeKind::Deleted,
                    ChangeLevel::Breaking,
                    None,
                )),
                (Some(base), Some(revision)) => {
                    let base = self.base.resolve(
                        base,
                        "#/components/responses/",
                        |c| &c.responses,
                    )?;
                    let revision = self.revision.resolve(
                        revision,
                        "#/components/responses/",
                        |c| &c.responses,
                    )?;
                    let site = site.within(&format!("response {}", label));
                    if !self.config.exclude_description {
                        self.diff_text(
                            &site,
                            ChangeSubject::Description,
                            Some(base.description.as_str()),
                            Some(revision.description.as_str()),
                            changes,
                        );
                    }
                    self.diff_content(
                        &site,
                        Direction::Response,
                        &base.content,
                        &revision.content,
                        changes,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn diff_content(
        &self,
        site: &Site,
        direction: Direction,
        base: &IndexMap<String, MediaType>,
        revision: &IndexMap<String, MediaType>,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let media_types: BTreeSet<&String> =
            base.keys().chain(revision.keys()).collect();
        for media_type in media_types {
            match (base.get(media_type), revision.get(media_type)) {
                (None, None) => (),
                (None, Some(_)) => changes.push(site.change(
                    ChangeSubject::MediaType,
                    Some(media_type.clone()),
                    ChangeKind::Added,
                    ChangeLevel::NonBreaking,
                    None,
                )),
                (Some(_), None) => changes.push(site.change(
                    ChangeSubject::MediaType,
                    Some(media_type.clone()),
                    ChangeKind::Deleted,
                    ChangeLevel::Breaking,
                    None,
                )),
                (Some(base), Some(revision)) => {
                    let site = site.within(media_type);
                    self.diff_example(
                        &site,
                        base.example.as_ref(),
                        revision.example.as_ref(),
                        changes,
                    );
                    match (&base.schema, &revision.schema) {
                        (None, None) => (),
                        (Some(base), Some(revision)) => self.diff_schema(
                            &site, direction, base, revision, changes,
                        )?,
                        (None, Some(_)) => changes.push(site.change(
                            ChangeSubject::Schema,
                            None,
                            ChangeKind::Added,
                            match direction {
                                Direction::Request => ChangeLevel::Breaking,
                                Direction::Response => ChangeLevel::NonBreaking,
                            },
                            None,
                        )),
                        (Some(_), None) => changes.push(site.change(
                            ChangeSubject::Schema,
                            None,
                            ChangeKind::Deleted,
                            match direction {
                                Direction::Request => ChangeLevel::NonBreaking,
                                Direction::Response => ChangeLevel::Breaking,
                            },
                            None,
                        )),
                    }
                }
            }
        }
        Ok(())
    }

    fn diff_schema<T: Serialize>(
        &self,
        site: &Site,
        direction: Direction,
        base: &T,
        revision: &T,
        changes: &mut Vec<Change>,
    ) -> Result<(), CompareError> {
        let base = to_json(self.base.role, base)?;
        let revision = to_json(self.revision.role, revision)?;
        SchemaDiff {
            base: &self.base.json,
            revision: &self.revision.json,
            config: self.config,
            direction,
        }
        .diff(site, &base, &revision, changes)
    }
}
