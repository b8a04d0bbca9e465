//! Listing helpers shared by the store backends

use glob::Pattern;

/// Whether `name` is a direct child of the directory `prefix` (`a/b/` or empty).
///
/// Placeholder "directory" objects and anything nested deeper are excluded.
pub fn is_shallow(name: &str, prefix: &str) -> bool {
    if name.is_empty() || name == prefix {
        return false;
    }
    match name.strip_prefix(prefix) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

/// Match a file name against a filter.
///
/// Filters containing glob metacharacters are matched as globs against the
/// last path segment; anything else is a substring test on the whole name.
pub fn matches_filter(name: &str, filter: &str) -> bool {
    if filter.contains(['*', '?', '[']) {
        let file_name = name.rsplit('/').next().unwrap_or(name);
        return Pattern::new(filter)
            .map(|pattern| pattern.matches(file_name))
            .unwrap_or(false);
    }
    name.contains(filter)
}

/// Apply include/exclude filters; include takes precedence when both are set
pub fn apply_filters(names: Vec<String>, include: Option<&str>, exclude: Option<&str>) -> Vec<String> {
    match (include, exclude) {
        (Some(include), _) => names
            .into_iter()
            .filter(|n| matches_filter(n, include))
            .collect(),
        (None, Some(exclude)) => names
            .into_iter()
            .filter(|n| !matches_filter(n, exclude))
            .collect(),
        (None, None) => names,
    }
}
