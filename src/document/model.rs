//! Configuration document model.
//!
//! A document is the parsed content of one per-directory file. Its top-level
//! tables are sections; the reserved `location` array declares overrides
//! scoped to sub-paths beneath the document's own directory:
//!
//! ```toml
//! [compilation]
//! debug = false
//!
//! [[location]]
//! path = "admin"
//! inherit_in_child_applications = true
//!
//! [location.authorization]
//! deny = ["?"]
//! ```
//!
//! Documents are immutable once built. A changed file produces a new
//! document; nothing is patched in place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use toml::{Table, Value};

use crate::document::store::StoreError;
use crate::paths::VirtualPath;

const LOCATION_KEY: &str = "location";
const LOCATION_PATH_KEY: &str = "path";
const LOCATION_INHERIT_KEY: &str = "inherit_in_child_applications";

/// A sub-path scoped set of section values.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationOverride {
    path: String,
    sections: Table,
    inherit_in_child_applications: bool,
}

impl LocationOverride {
    /// Create an override for `path`, relative to the declaring document.
    ///
    /// Leading and trailing slashes are ignored; an empty path covers the
    /// whole document.
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = VirtualPath::new(path.as_ref())
            .segments()
            .collect::<Vec<_>>()
            .join("/");
        Self {
            path,
            sections: Table::new(),
            inherit_in_child_applications: true,
        }
    }

    pub fn with_section(mut self, name: impl Into<String>, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    pub fn with_inherit_in_child_applications(mut self, inherit: bool) -> Self {
        self.inherit_in_child_applications = inherit;
        self
    }

    /// Declared sub-path, slash-separated, without leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Declared sub-path split into segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|segment| !segment.is_empty())
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> &Table {
        &self.sections
    }

    pub fn inherit_in_child_applications(&self) -> bool {
        self.inherit_in_child_applications
    }
}

/// Parsed content of one document file, independent of where it sits in the
/// hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentContent {
    sections: Table,
    locations: Vec<LocationOverride>,
}

impl DocumentContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, name: impl Into<String>, value: Value) -> Self {
        self.sections.insert(name.into(), value);
        self
    }

    pub fn with_location(mut self, location: LocationOverride) -> Self {
        self.locations.push(location);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> &Table {
        &self.sections
    }

    /// Overrides in declaration order.
    pub fn locations(&self) -> &[LocationOverride] {
        &self.locations
    }

    /// Parse document text.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Parse`] if the text is not valid TOML.
    /// - [`StoreError::Malformed`] if a section is not a table, or a
    ///   `location` entry lacks a string `path` or climbs out with `..`.
    pub fn parse(source: &Path, text: &str) -> Result<Self, StoreError> {
        let mut table: Table = text.parse().map_err(|e| StoreError::Parse {
            path: source.to_path_buf(),
            source: e,
        })?;

        let malformed = |reason: String| StoreError::Malformed {
            path: source.to_path_buf(),
            reason,
        };

        let mut content = Self::new();
        if let Some(locations) = table.remove(LOCATION_KEY) {
            let Value::Array(entries) = locations else {
                return Err(malformed("`location` must be an array of tables".into()));
            };
            for entry in entries {
                let Value::Table(mut entry) = entry else {
                    return Err(malformed("`location` entries must be tables".into()));
                };
                let path = match entry.remove(LOCATION_PATH_KEY) {
                    Some(Value::String(path)) => path,
                    _ => return Err(malformed("`location` entry requires a string `path`".into())),
                };
                if path.split(&['/', '\\'][..]).any(|segment| segment == "..") {
                    return Err(malformed(format!("location path `{path}` leaves its document")));
                }
                let inherit = match entry.remove(LOCATION_INHERIT_KEY) {
                    None => true,
                    Some(Value::Boolean(inherit)) => inherit,
                    Some(_) => {
                        return Err(malformed(format!(
                            "`{LOCATION_INHERIT_KEY}` must be a boolean"
                        )))
                    }
                };
                let mut location = LocationOverride::new(&path).with_inherit_in_child_applications(inherit);
                for (name, value) in entry {
                    if !value.is_table() {
                        return Err(malformed(format!(
                            "section `{name}` in location `{path}` must be a table"
                        )));
                    }
                    location = location.with_section(name, value);
                }
                content = content.with_location(location);
            }
        }

        for (name, value) in table {
            if !value.is_table() {
                return Err(malformed(format!("section `{name}` must be a table")));
            }
            content = content.with_section(name, value);
        }

        Ok(content)
    }

    /// Render back to document text.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        let mut table = self.sections.clone();
        if !self.locations.is_empty() {
            let locations = self
                .locations
                .iter()
                .map(|location| {
                    let mut entry = location.sections.clone();
                    entry.insert(LOCATION_PATH_KEY.into(), Value::String(location.path.clone()));
                    if !location.inherit_in_child_applications {
                        entry.insert(LOCATION_INHERIT_KEY.into(), Value::Boolean(false));
                    }
                    Value::Table(entry)
                })
                .collect();
            table.insert(LOCATION_KEY.into(), Value::Array(locations));
        }
        toml::to_string(&table)
    }
}

/// One configuration document placed in the hierarchy.
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: VirtualPath,
    location: PathBuf,
    content: Arc<DocumentContent>,
    parent: Option<Arc<ConfigDocument>>,
}

impl ConfigDocument {
    /// Place `content` at virtual `path`, stored in physical `location`.
    pub fn new(path: VirtualPath, location: impl Into<PathBuf>, content: Arc<DocumentContent>) -> Self {
        Self {
            path: path.trim_trailing_slash(),
            location: location.into(),
            content,
            parent: None,
        }
    }

    /// Link the next document up the hierarchy.
    pub fn with_parent(mut self, parent: Arc<ConfigDocument>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Virtual path the document governs.
    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    /// Physical directory the document was loaded from.
    pub fn location(&self) -> &Path {
        &self.location
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub fn parent(&self) -> Option<&Arc<ConfigDocument>> {
        self.parent.as_ref()
    }

    /// The document's own, non-scoped section.
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.content.section(name)
    }

    /// Overrides in declaration order.
    pub fn locations(&self) -> &[LocationOverride] {
        self.content.locations()
    }

    /// Iterate from this document up to the root of the hierarchy.
    pub fn ancestry(&self) -> impl Iterator<Item = &ConfigDocument> {
        std::iter::successors(Some(self), |doc| doc.parent.as_deref())
    }
}
