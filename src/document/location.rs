//! Location override resolution.
//!
//! # Responsibilities
//! - Compute a query path relative to a document's own path
//! - Pick the most specific override declared for that relative path
//! - Fall back to the document's own sections, then to its ancestors
//!
//! # Design Decisions
//! - Whole-segment prefix matching: `a` covers `a/b` but never `ab`
//! - Longest match wins; equal lengths resolve to the first declared
//! - Pure functions over immutable documents (no locking, no side effects)

use toml::Value;

use crate::document::model::{ConfigDocument, LocationOverride};
use crate::paths::VirtualPath;

/// Find the most specific override of `document` covering `query`.
///
/// `outside_application` is the flag produced by path resolution; when set,
/// overrides that opt out of child-application inheritance are skipped.
pub fn find_override<'a>(
    document: &'a ConfigDocument,
    query: &VirtualPath,
    outside_application: bool,
) -> Option<&'a LocationOverride> {
    let relative = query.relative_segments(document.path())?;

    let mut best: Option<(usize, &LocationOverride)> = None;
    for location in document.locations() {
        if outside_application && !location.inherit_in_child_applications() {
            continue;
        }
        let Some(depth) = covered_depth(location, &relative) else {
            continue;
        };
        // Strictly longer only, so the first declared wins a tie.
        if best.map_or(true, |(best_depth, _)| depth > best_depth) {
            best = Some((depth, location));
        }
    }

    best.map(|(_, location)| location)
}

/// True when some override of `document` covers `query`.
pub fn applies(document: &ConfigDocument, query: &VirtualPath, outside_application: bool) -> bool {
    find_override(document, query, outside_application).is_some()
}

/// True when an ancestor of `document` declares an override covering `query`.
pub fn ancestor_override_applies(document: &ConfigDocument, query: &VirtualPath, outside_application: bool) -> bool {
    document
        .ancestry()
        .skip(1)
        .any(|ancestor| applies(ancestor, query, outside_application))
}

fn covered_depth(location: &LocationOverride, relative: &[&str]) -> Option<usize> {
    let mut depth = 0;
    for segment in location.segments() {
        if relative.get(depth) != Some(&segment) {
            return None;
        }
        depth += 1;
    }
    Some(depth)
}

/// The source a section is read from: a document plus the override chosen
/// for the query, if any.
#[derive(Debug, Clone, Copy)]
pub struct Effective<'a> {
    pub document: &'a ConfigDocument,
    pub location: Option<&'a LocationOverride>,
}

impl<'a> Effective<'a> {
    pub fn new(document: &'a ConfigDocument, location: Option<&'a LocationOverride>) -> Self {
        Self { document, location }
    }

    /// Look up `name`: chosen override, then the document's own sections,
    /// then each ancestor (honoring the ancestor's overrides for `query`).
    pub fn section(&self, name: &str, query: &VirtualPath, outside_application: bool) -> Option<&'a Value> {
        if let Some(value) = self.location.and_then(|location| location.section(name)) {
            return Some(value);
        }
        if let Some(value) = self.document.section(name) {
            return Some(value);
        }

        self.document.ancestry().skip(1).find_map(|ancestor| {
            find_override(ancestor, query, outside_application)
                .and_then(|location| location.section(name))
                .or_else(|| ancestor.section(name))
        })
    }
}
