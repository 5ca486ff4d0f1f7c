// Copyright 2026 Oxide Computer Company

//! Flags controlling a comparison

use super::CompareError;
use crate::upload::DocumentRole;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

/// Flags controlling how two documents are compared.
///
/// Every field defaults to "off": nothing is excluded or filtered, paths are
/// compared as written, every change is reported and deprecated operations
/// may be removed without a grace period.  The server builds its
/// configurations once at start-up and never mutates them afterwards.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparisonConfig {
    /// Ignore changes to examples.
    pub exclude_examples: bool,
    /// Ignore changes to descriptions and summaries.
    pub exclude_description: bool,
    /// Regex; only paths matching it are compared.
    pub path_filter: Option<String>,
    /// Regex; paths and operations carrying an extension (`x-...`) whose
    /// name matches are left out of the comparison.
    pub filter_extension: Option<String>,
    /// Prefix added to every path of the base document.
    pub path_prefix_base: Option<String>,
    /// Prefix added to every path of the revision document.
    pub path_prefix_revision: Option<String>,
    /// Prefix stripped from every path of the base document (before
    /// `path_prefix_base` is added).
    pub path_strip_prefix_base: Option<String>,
    /// Prefix stripped from every path of the revision document (before
    /// `path_prefix_revision` is added).
    pub path_strip_prefix_revision: Option<String>,
    /// Report only breaking changes.
    pub breaking_only: bool,
    /// Minimum number of days between deprecating an operation and its
    /// sunset date.  With 0, a deprecated operation may be removed at any
    /// time.
    pub deprecation_days: u32,
}

impl ComparisonConfig {
    /// Returns a copy of this configuration that reports breaking changes
    /// only.
    pub fn with_breaking_only(&self) -> ComparisonConfig {
        ComparisonConfig { breaking_only: true, ..self.clone() }
    }

    /// Checks that the regex-valued options compile.
    pub fn validate(&self) -> Result<(), CompareError> {
        self.path_filter_regex()?;
        self.filter_extension_regex()?;
        Ok(())
    }

    pub(crate) fn path_filter_regex(
        &self,
    ) -> Result<Option<Regex>, CompareError> {
        compile("path_filter", self.path_filter.as_deref())
    }

    pub(crate) fn filter_extension_regex(
        &self,
    ) -> Result<Option<Regex>, CompareError> {
        compile("filter_extension", self.filter_extension.as_deref())
    }

    /// Rewrites a path of the given document according to the strip-prefix
    /// and prefix options for that document.
    pub(crate) fn normalize_path(
        &self,
        role: DocumentRole,
        path: &str,
    ) -> String {
        let (strip, prefix) = match role {
            DocumentRole::Base => {
                (&self.path_strip_prefix_base, &self.path_prefix_base)
            }
            DocumentRole::Revision => {
                (&self.path_strip_prefix_revision, &self.path_prefix_revision)
            }
        };
        let stripped = strip
            .as_deref()
            .and_then(|strip| path.strip_prefix(strip))
            .unwrap_or(path);
        match prefix {
            Some(prefix) => format!("{}{}", prefix, stripped),
            None => stripped.to_string(),
        }
    }
}

fn compile(
    option: &'static str,
    pattern: Option<&str>,
) -> Result<Option<Regex>, CompareError> {
    pattern
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| CompareError::InvalidRegex {
                option,
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()
}
