use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile '{0}' not found")]
    NotFound(String),
    #[error("inheritance cycle at '{name}' (chain: {})", .chain.join(" -> "))]
    Cycle { name: String, chain: Vec<String> },
    #[error("profile '{0}' already exists")]
    DuplicateName(String),
    #[error("invalid profile name '{0}'")]
    InvalidName(String),
    #[error("refusing to overwrite existing file at {0:?}")]
    FileExists(PathBuf),
    #[error("profile '{name}' has children and cannot be deleted: {}", .children.join(", "))]
    HasChildren { name: String, children: Vec<String> },
    #[error("key '{0}' is reserved and cannot be edited directly")]
    ReservedKey(String),
    #[error("io error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error at {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

pub type ProfileResult<T> = std::result::Result<T, ProfileError>;

/// Non-fatal findings collected while scanning and building a vendor graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    Unreadable { path: PathBuf, message: String },
    MalformedJson { path: PathBuf, message: String },
    NotAnObject { path: PathBuf },
    MissingName { path: PathBuf },
    DuplicateName {
        name: String,
        path: PathBuf,
        kept: PathBuf,
    },
    MissingParent { child: String, parent: String },
    InheritanceCycle { name: String, chain: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Unreadable { path, message } => {
                write!(f, "unreadable file {:?}: {}", path, message)
            }
            Diagnostic::MalformedJson { path, message } => {
                write!(f, "malformed json in {:?}: {}", path, message)
            }
            Diagnostic::NotAnObject { path } => {
                write!(f, "document in {:?} is not a json object", path)
            }
            Diagnostic::MissingName { path } => {
                write!(f, "profile in {:?} has no name", path)
            }
            Diagnostic::DuplicateName { name, path, kept } => write!(
                f,
                "duplicate profile '{}' in {:?} (keeping {:?})",
                name, path, kept
            ),
            Diagnostic::MissingParent { child, parent } => {
                write!(f, "missing-parent({}, {})", child, parent)
            }
            Diagnostic::InheritanceCycle { name, chain } => {
                write!(f, "inheritance cycle at '{}': {}", name, chain.join(" -> "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_cycle_chain() {
        let err = ProfileError::Cycle {
            name: "A".into(),
            chain: vec!["A".into(), "B".into()],
        };
        assert_eq!(err.to_string(), "inheritance cycle at 'A' (chain: A -> B)");
    }

    #[test]
    fn formats_missing_parent_diagnostic() {
        let diagnostic = Diagnostic::MissingParent {
            child: "Leaf2".into(),
            parent: "Ghost".into(),
        };
        assert_eq!(diagnostic.to_string(), "missing-parent(Leaf2, Ghost)");
    }
}
