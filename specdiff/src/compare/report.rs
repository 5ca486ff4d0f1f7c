// Copyright 2026 Oxide Computer Company

//! Structure of a diff report

use serde::Deserialize;
use serde::Serialize;

/// Differences between a base and a revision document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct DiffReport {
    /// Changes to the document's `info` section.  Absent when nothing
    /// changed, or when only breaking changes were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<InfoDiff>,
    /// Changes to paths, operations and their schemas, in document order
    /// (paths sorted, then methods, then the parts of each operation).
    #[serde(default)]
    pub changes: Vec<Change>,
    pub summary: DiffSummary,
}

impl DiffReport {
    pub fn new(info: Option<InfoDiff>, changes: Vec<Change>) -> DiffReport {
        let info = info.filter(|info| !info.is_empty());
        let breaking = changes
            .iter()
            .filter(|change| change.level == ChangeLevel::Breaking)
            .count();
        let summary =
            DiffSummary { breaking, non_breaking: changes.len() - breaking };
        DiffReport { info, changes, summary }
    }

    /// Returns true if the two documents are equivalent.
    pub fn is_empty(&self) -> bool {
        self.info.is_none() && self.changes.is_empty()
    }

    pub fn breaking_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes
            .iter()
            .filter(|change| change.level == ChangeLevel::Breaking)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct InfoDiff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<ValueDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ValueDiff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<ValueDiff>,
}

impl InfoDiff {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.version.is_none()
            && self.description.is_none()
    }
}

/// A scalar that differs between the two documents.  `None` means the
/// value is absent from that document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ValueDiff {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl ValueDiff {
    /// Returns a `ValueDiff` if `from` and `to` differ.
    pub fn between(from: Option<&str>, to: Option<&str>) -> Option<ValueDiff> {
        (from != to).then(|| ValueDiff {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        })
    }
}

/// One difference between the two documents.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Change {
    /// Path (after prefix normalization) the change belongs to
    pub path: String,
    /// Upper-case HTTP method, for changes within an operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Where in the operation the change is, e.g.
    /// "response 200 application/json" or "query parameter limit"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// What kind of thing changed
    pub subject: ChangeSubject,
    /// Name of the thing that changed: a parameter, status code, media type
    /// or (dotted) property path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub kind: ChangeKind,
    pub level: ChangeLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeSubject {
    Path,
    Operation,
    Parameter,
    RequestBody,
    Response,
    MediaType,
    Schema,
    Property,
    Required,
    Type,
    Format,
    Enum,
    Deprecation,
    Summary,
    Description,
    Example,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeLevel {
    /// Existing clients may stop working.
    Breaking,
    NonBreaking,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiffSummary {
    pub breaking: usize,
    pub non_breaking: usize,
}
