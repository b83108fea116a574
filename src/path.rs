//! Remote path normalization and hierarchy tests.
//!
//! Every key that enters the index goes through [`normalize`], so the rest of
//! the crate can compare paths with plain string operations.

/// Path separator for remote folder paths.
pub const SEPARATOR: char = '/';

/// Root of every owner's namespace.
pub const ROOT: &str = "/";

/// Normalize a remote path: leading `/`, no repeated separators, no trailing
/// `/` except for the root itself.
///
/// ```
/// use foldersync::path::normalize;
///
/// assert_eq!(normalize("docs/"), "/docs");
/// assert_eq!(normalize("//docs//sub/"), "/docs/sub");
/// assert_eq!(normalize(""), "/");
/// ```
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.trim().split(SEPARATOR).filter(|s| !s.is_empty()) {
        out.push(SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push_str(ROOT);
    }
    out
}

/// Is `path` equal to `ancestor` or nested under it?
///
/// Both arguments must already be normalized. The check is separator-aware:
/// `/docs` covers `/docs/sub` but not `/documents`.
pub fn is_same_or_descendant(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return path.starts_with(SEPARATOR);
    }
    match path.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with(SEPARATOR),
        None => false,
    }
}

/// The prefix every strict descendant of `ancestor` starts with.
pub(crate) fn descendant_prefix(ancestor: &str) -> String {
    if ancestor == ROOT {
        ROOT.to_string()
    } else {
        format!("{ancestor}{SEPARATOR}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_and_duplicate_separators() {
        assert_eq!(normalize("/docs/"), "/docs");
        assert_eq!(normalize("docs"), "/docs");
        assert_eq!(normalize("/docs//sub///"), "/docs/sub");
        assert_eq!(normalize("  /docs  "), "/docs");
    }

    #[test]
    fn normalize_keeps_root() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize(""), "/");
    }

    #[test]
    fn descendant_check_is_separator_aware() {
        assert!(is_same_or_descendant("/docs", "/docs"));
        assert!(is_same_or_descendant("/docs/sub", "/docs"));
        assert!(is_same_or_descendant("/docs/sub/deeper", "/docs"));
        assert!(!is_same_or_descendant("/documents", "/docs"));
        assert!(!is_same_or_descendant("/doc", "/docs"));
        assert!(!is_same_or_descendant("/docs", "/docs/sub"));
    }

    #[test]
    fn root_covers_everything() {
        assert!(is_same_or_descendant("/", "/"));
        assert!(is_same_or_descendant("/anything/at/all", "/"));
    }

    #[test]
    fn descendant_prefix_ends_with_separator() {
        assert_eq!(descendant_prefix("/docs"), "/docs/");
        assert_eq!(descendant_prefix("/"), "/");
    }
}
