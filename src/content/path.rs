//! Repository-relative paths.
//!
//! Logical paths arrive from the request layer as raw strings. [`RelPath`]
//! normalizes them once — forward slashes, no leading slash, no empty or
//! dot segments — and refuses anything that could escape the repository root.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("illegal content path `{path}`: {reason}")]
pub struct PathError {
    pub path: String,
    pub reason: &'static str,
}

/// A normalized repository-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelPath(String);

impl RelPath {
    /// Normalize a raw logical path.
    ///
    /// Leading slashes are stripped (request paths usually carry one);
    /// backslashes are treated as separators; `.` segments collapse; `..`
    /// segments and empty results are rejected.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let reject = |reason| PathError {
            path: raw.to_string(),
            reason,
        };

        let mut segments = Vec::new();
        for segment in raw.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => return Err(reject("parent traversal is not allowed")),
                _ => segments.push(segment),
            }
        }
        if segments.is_empty() {
            return Err(reject("path resolves to the repository root"));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve this path under a filesystem root.
    pub fn under(&self, root: &Path) -> PathBuf {
        let mut resolved = root.to_path_buf();
        for segment in self.0.split('/') {
            resolved.push(segment);
        }
        resolved
    }

    /// Derive the companion configuration path: final extension stripped,
    /// `suffix` appended, resolved under `config_dir`.
    ///
    /// `news/today.html` with config dir `config` and suffix `xml` derives
    /// `config/news/today.xml`.
    pub fn config_path(&self, config_dir: &str, suffix: &str) -> RelPath {
        let stem = match self.0.rfind('/') {
            Some(slash) => match self.0[slash..].rfind('.') {
                Some(dot) => &self.0[..slash + dot],
                None => &self.0,
            },
            None => match self.0.rfind('.') {
                Some(dot) => &self.0[..dot],
                None => &self.0,
            },
        };
        RelPath(format!("{config_dir}/{stem}.{suffix}"))
    }
}

impl std::fmt::Display for RelPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
