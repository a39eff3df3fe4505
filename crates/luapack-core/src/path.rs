//! Textual path normalization for the flattened module namespace.
//!
//! The bundle has no filesystem at run time, so every lookup works on
//! slash-delimited strings. Normalization here is purely textual: no
//! symlink awareness, no existence checks.

use std::fmt;

/// Collapse `.` and `..` segments in a slash-delimited path.
///
/// Folds left to right: `.` segments and empty segments are dropped, `..`
/// removes the previously accumulated segment (removing past the start is
/// a no-op, not an error), anything else is appended. Total and idempotent.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// A normalized, slash-delimited key identifying one source unit in the
/// flattened namespace.
///
/// Always free of leading/trailing slashes and `.`/`..` segments; the
/// constructor normalizes. Two paths are equal iff their string forms are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(String);

impl ModulePath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self(normalize(path.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The containing directory: everything before the last segment.
    /// Root-level modules have an empty directory.
    pub fn dir(&self) -> &str {
        self.0.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// The `<path>/init` key used by the directory/package convention.
    /// Routes through `new` so an empty path yields `init`, not `/init`.
    pub fn init_key(&self) -> ModulePath {
        ModulePath::new(format!("{}/init", self.0))
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModulePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ModulePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
