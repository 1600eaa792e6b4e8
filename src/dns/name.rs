//! Owner-name utilities. Names are stored canonically lowercased with no
//! trailing dot; the root is the empty string.

/// Canonicalize a domain name: ASCII lowercase, no trailing dot.
pub fn normalize(name: &str) -> String {
    name.trim_end_matches('.').to_lowercase()
}

/// Labels of a name in presentation order (`www.example.com` -> `[www, example, com]`).
/// The root name has no labels.
pub fn labels(name: &str) -> Vec<&str> {
    if name.is_empty() {
        Vec::new()
    } else {
        name.split('.').collect()
    }
}

pub fn label_count(name: &str) -> usize {
    if name.is_empty() {
        0
    } else {
        name.split('.').count()
    }
}

/// Parent of a name (strip the leftmost label). The root has no parent.
pub fn parent(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    match name.split_once('.') {
        Some((_, rest)) => Some(rest.to_string()),
        None => Some(String::new()), // TLD -> root
    }
}

/// True if `name` is a strict subdomain of `ancestor` (proper label boundary,
/// never equal). Both arguments must already be canonical.
pub fn is_subdomain_of(name: &str, ancestor: &str) -> bool {
    if ancestor.is_empty() {
        return !name.is_empty();
    }
    if name.len() <= ancestor.len() || !name.ends_with(ancestor) {
        return false;
    }
    // Ensure the match sits on a label boundary
    name.as_bytes()[name.len() - ancestor.len() - 1] == b'.'
}

/// Wire-format length of a name in octets (length byte per label plus the
/// terminating root byte). DNS names may not exceed 255 octets.
pub fn wire_length(name: &str) -> usize {
    if name.is_empty() {
        return 1;
    }
    name.split('.').map(|label| label.len() + 1).sum::<usize>() + 1
}

pub fn is_valid(name: &str) -> bool {
    if wire_length(name) > 255 {
        return false;
    }
    labels(name).iter().all(|label| !label.is_empty() && label.len() <= 63)
        || name.is_empty()
}

/// DNAME substitution: replace the `owner` suffix of `name` with `target`.
/// Returns `None` when the result is not a valid DNS name (oversize), which
/// callers surface as YXDOMAIN.
pub fn substitute_suffix(name: &str, owner: &str, target: &str) -> Option<String> {
    debug_assert!(is_subdomain_of(name, owner));
    let prefix = if owner.is_empty() {
        name
    } else {
        &name[..name.len() - owner.len() - 1]
    };
    let substituted = if target.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, target)
    };
    if is_valid(&substituted) {
        Some(substituted)
    } else {
        None
    }
}
