//! Packaging directives attached to a rule (`%config`, `%doc`, `noreplace`...).
//!
//! Directives form a closed vocabulary. Raw strings from a manifest are
//! validated up front so a typo fails the rule's configuration instead of
//! silently producing a payload without the intended flag.

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A directive token that is not part of the recognized vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "invalid rule directive: {token:?} (expected one of: {expected})",
    expected = Directive::names().join(", ")
)]
pub struct InvalidDirectiveError {
    pub token: String,
}

/// A single packaging directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    Config,
    Doc,
    Icon,
    MissingOk,
    NoReplace,
    SpecFile,
    Ghost,
    License,
    Readme,
    Exclude,
    Unpatched,
    PubKey,
    Policy,
    /// Owns the rule's destination directory itself.
    Dir,
}

impl Directive {
    /// Every directive, in vocabulary order.
    pub const ALL: [Self; 14] = [
        Self::Config,
        Self::Doc,
        Self::Icon,
        Self::MissingOk,
        Self::NoReplace,
        Self::SpecFile,
        Self::Ghost,
        Self::License,
        Self::Readme,
        Self::Exclude,
        Self::Unpatched,
        Self::PubKey,
        Self::Policy,
        Self::Dir,
    ];

    /// Returns the manifest token for this directive.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Doc => "doc",
            Self::Icon => "icon",
            Self::MissingOk => "missingok",
            Self::NoReplace => "noreplace",
            Self::SpecFile => "specfile",
            Self::Ghost => "ghost",
            Self::License => "license",
            Self::Readme => "readme",
            Self::Exclude => "exclude",
            Self::Unpatched => "unpatched",
            Self::PubKey => "pubkey",
            Self::Policy => "policy",
            Self::Dir => "dir",
        }
    }

    /// Returns a one-line description (used by `--list-directives`).
    pub const fn description(self) -> &'static str {
        match self {
            Self::Config => "configuration file, preserved on upgrade when modified",
            Self::Doc => "documentation file",
            Self::Icon => "icon file",
            Self::MissingOk => "file may be absent on the installed system",
            Self::NoReplace => "never replace a modified file on upgrade",
            Self::SpecFile => "spec file of a source package",
            Self::Ghost => "owned by the package but not installed",
            Self::License => "license file",
            Self::Readme => "readme file",
            Self::Exclude => "excluded from the installed file list",
            Self::Unpatched => "placeholder, not patched by rpm",
            Self::PubKey => "public key file",
            Self::Policy => "policy file",
            Self::Dir => "own the destination directory itself",
        }
    }

    /// Returns all manifest tokens.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|d| d.name()).collect()
    }

    const fn flag(self) -> DirectiveSet {
        match self {
            Self::Config => DirectiveSet::CONFIG,
            Self::Doc => DirectiveSet::DOC,
            Self::Icon => DirectiveSet::ICON,
            Self::MissingOk => DirectiveSet::MISSINGOK,
            Self::NoReplace => DirectiveSet::NOREPLACE,
            Self::SpecFile => DirectiveSet::SPECFILE,
            Self::Ghost => DirectiveSet::GHOST,
            Self::License => DirectiveSet::LICENSE,
            Self::Readme => DirectiveSet::README,
            Self::Exclude => DirectiveSet::EXCLUDE,
            Self::Unpatched => DirectiveSet::UNPATCHED,
            Self::PubKey => DirectiveSet::PUBKEY,
            Self::Policy => DirectiveSet::POLICY,
            Self::Dir => DirectiveSet::DIR,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Directive {
    type Err = InvalidDirectiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| InvalidDirectiveError {
                token: s.to_string(),
            })
    }
}

bitflags! {
    /// A set of directives. Bits match RPM file-flag values, except
    /// `DIR` which only affects staging and never reaches the payload flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DirectiveSet: u32 {
        const CONFIG = 1 << 0;
        const DOC = 1 << 1;
        const ICON = 1 << 2;
        const MISSINGOK = 1 << 3;
        const NOREPLACE = 1 << 4;
        const SPECFILE = 1 << 5;
        const GHOST = 1 << 6;
        const LICENSE = 1 << 7;
        const README = 1 << 8;
        const EXCLUDE = 1 << 9;
        const UNPATCHED = 1 << 10;
        const PUBKEY = 1 << 11;
        const POLICY = 1 << 12;
        const DIR = 1 << 31;
    }
}

impl DirectiveSet {
    /// Validates raw tokens into a set. Fails on the first unknown token.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, InvalidDirectiveError> {
        tokens.iter().try_fold(Self::empty(), |set, token| {
            let directive: Directive = token.as_ref().parse()?;
            Ok(set | directive.flag())
        })
    }

    /// Returns whether the set holds the given directive.
    pub const fn has(self, directive: Directive) -> bool {
        self.contains(directive.flag())
    }

    /// Flags as written into the RPM header (`DIR` stripped).
    pub const fn rpm_file_flags(self) -> u32 {
        self.bits() & !Self::DIR.bits()
    }

    /// Directives in the set, in vocabulary order.
    pub fn directives(self) -> Vec<Directive> {
        Directive::ALL
            .iter()
            .copied()
            .filter(|d| self.has(*d))
            .collect()
    }
}

impl From<Directive> for DirectiveSet {
    fn from(directive: Directive) -> Self {
        directive.flag()
    }
}

impl fmt::Display for DirectiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.directives().iter().map(|d| d.name()).collect();
        f.write_str(&names.join(","))
    }
}
