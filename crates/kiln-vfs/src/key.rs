//! `/`-separated virtual path keys used by the record-store and memory backends.

/// Key of a backend root.
pub const ROOT: &str = "/";

/// Key of child `name` under `parent`.
pub fn join(parent: &str, name: &str) -> String {
    if parent == ROOT {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Last segment of `key` (empty for the root).
pub fn name_of(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or_default()
}

/// True when `candidate` sits exactly one segment below `parent`.
pub fn is_direct_child(parent: &str, candidate: &str) -> bool {
    match child_suffix(parent, candidate) {
        Some(rest) => !rest.is_empty() && !rest.contains('/'),
        None => false,
    }
}

/// True when `candidate` is `parent` itself or any key below it.
pub fn is_within(parent: &str, candidate: &str) -> bool {
    candidate == parent || child_suffix(parent, candidate).is_some_and(|rest| !rest.is_empty())
}

/// Segments from `parent` down to `candidate`.
///
/// Matching is per segment, so `/ab` is not below `/a`.
pub fn relative_segments(parent: &str, candidate: &str) -> Option<Vec<String>> {
    if parent == candidate {
        return Some(Vec::new());
    }
    let rest = child_suffix(parent, candidate)?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.split('/').map(str::to_string).collect())
}

fn child_suffix<'a>(parent: &str, candidate: &'a str) -> Option<&'a str> {
    if parent == ROOT {
        return candidate.strip_prefix('/');
    }
    candidate.strip_prefix(parent)?.strip_prefix('/')
}
