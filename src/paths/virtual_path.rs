//! Slash-delimited virtual paths.
//!
//! # Responsibilities
//! - Canonicalize raw path strings (collapse `//`, `.` and `..`)
//! - Remember whether the path denotes a directory (trailing slash)
//! - Answer ancestor/descendant questions on whole segments
//!
//! # Design Decisions
//! - Always rooted: a relative input is read as relative to `/`
//! - `..` never climbs above the root
//! - Prefix checks compare segments, so `/a` is not an ancestor of `/ab`

use serde::{Deserialize, Serialize};
use std::fmt;

/// An immutable, canonical virtual path such as `/app/admin/users`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The virtual root `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Canonicalize `raw` into a rooted virtual path.
    ///
    /// Backslashes are treated as separators. A trailing separator (or a
    /// trailing `.`/`..` segment) marks the result as a directory.
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim().replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();

        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Self::root();
        }

        let directory = raw.ends_with('/') || raw.ends_with("/.") || raw.ends_with("/..");
        let mut path = String::with_capacity(raw.len() + 1);
        for segment in &segments {
            path.push('/');
            path.push_str(segment);
        }
        if directory {
            path.push('/');
        }

        Self(path)
    }

    /// Borrow the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for `/`.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// True when the path denotes a directory (root, or trailing slash).
    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Iterate over the non-empty segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|segment| !segment.is_empty())
    }

    /// Number of segments; `/` has depth zero.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Same path without the trailing slash (root stays `/`).
    pub fn trim_trailing_slash(&self) -> Self {
        if self.is_root() || !self.is_directory() {
            return self.clone();
        }
        Self(self.0.trim_end_matches('/').to_string())
    }

    /// Same path marked as a directory.
    pub fn as_directory(&self) -> Self {
        if self.is_directory() {
            return self.clone();
        }
        Self(format!("{}/", self.0))
    }

    /// Parent directory, without trailing slash. `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let trimmed = self.0.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(index) => Some(Self(trimmed[..index].to_string())),
        }
    }

    /// The directory this path lives in, without trailing slash.
    ///
    /// A directory path is its own directory; a file path yields its parent.
    pub fn directory(&self) -> Self {
        if self.is_directory() {
            self.trim_trailing_slash()
        } else {
            self.parent().unwrap_or_else(Self::root)
        }
    }

    /// True when `ancestor` is this path or one of its ancestors.
    pub fn starts_with(&self, ancestor: &VirtualPath) -> bool {
        self.relative_segments(ancestor).is_some()
    }

    /// Segments of this path below `ancestor`, or `None` if `ancestor` does
    /// not contain this path. Equal paths yield an empty list.
    pub fn relative_segments<'a>(&'a self, ancestor: &VirtualPath) -> Option<Vec<&'a str>> {
        let mut own = self.segments();
        for expected in ancestor.segments() {
            if own.next()? != expected {
                return None;
            }
        }
        Some(own.collect())
    }

    /// Append a relative path; `..` segments are resolved against `self`.
    pub fn join(&self, relative: &str) -> Self {
        Self::new(&format!("{}/{}", self.trim_trailing_slash().0, relative))
    }
}

impl Default for VirtualPath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VirtualPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for VirtualPath {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<VirtualPath> for String {
    fn from(path: VirtualPath) -> Self {
        path.0
    }
}
