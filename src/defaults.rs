//! Normalizers and fallback chains shared by the package descriptor and rules.

/// Separator used in payload paths. Payload paths are always POSIX.
pub const SEPARATOR: char = '/';

/// Appends a trailing separator unless one is already present.
pub fn ensure_trailing_separator(path: &str) -> String {
    if path.ends_with(SEPARATOR) {
        path.to_string()
    } else {
        format!("{path}{SEPARATOR}")
    }
}

/// Normalizes a rule base: unset or empty becomes `/`.
pub fn normalize_base(base: Option<&str>) -> String {
    match base {
        Some(b) if !b.is_empty() => ensure_trailing_separator(b),
        _ => SEPARATOR.to_string(),
    }
}

/// Normalizes a destination: unset or empty stays unset.
pub fn normalize_destination(destination: Option<&str>) -> Option<String> {
    destination
        .filter(|d| !d.is_empty())
        .map(ensure_trailing_separator)
}

/// Treats an empty name (owner or group) as unset.
pub fn normalize_name(name: Option<&str>) -> Option<String> {
    name.filter(|n| !n.is_empty()).map(ToString::to_string)
}

pub const fn mode_or(own: Option<u32>, default: u32) -> u32 {
    match own {
        Some(mode) => mode,
        None => default,
    }
}

pub fn name_or(own: Option<&str>, default: &str) -> String {
    own.filter(|n| !n.is_empty()).unwrap_or(default).to_string()
}

pub fn destination_or(own: Option<&str>, default: Option<&str>) -> Option<String> {
    own.or(default).map(ToString::to_string)
}
