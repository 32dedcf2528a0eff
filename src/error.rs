//! Errors produced while configuring or resolving rules.

use crate::directive::InvalidDirectiveError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    InvalidDirective(#[from] InvalidDirectiveError),

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The package descriptor a rule pointed at has been dropped.
    #[error("rule is no longer attached to a package")]
    DetachedRule,

    /// Neither the rule nor its package defines a destination.
    #[error("no destination for rule with base {base:?} and no package default destination")]
    MissingDestination { base: String },

    /// A rule base that climbs above the build root.
    #[error("rule base {base:?} escapes the build root")]
    BaseOutsideBuildRoot { base: String },

    /// Payload paths are UTF-8; this source name is not.
    #[error("{}: file name is not valid UTF-8", path.display())]
    NonUtf8Path { path: PathBuf },
}

impl RuleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = RuleError> = std::result::Result<T, E>;
