//! npm package name rules.

/// Longest name the npm registry accepts
pub const MAX_NAME_LENGTH: usize = 214;

/// Split `@scope/name` into `(Some("scope"), "name")`
pub fn split_scope(name: &str) -> (Option<&str>, &str) {
    match name.strip_prefix('@').and_then(|rest| rest.split_once('/')) {
        Some((scope, bare)) => (Some(scope), bare),
        None => (None, name),
    }
}

/// Check a package name against the npm naming rules
pub fn is_valid_package_name(name: &str) -> bool {
    validate_package_name(name).is_ok()
}

/// Validate a package name, returning the rule it breaks
pub fn validate_package_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name must not be empty");
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err("name must be at most 214 characters");
    }
    if name.trim() != name {
        return Err("name must not have leading or trailing whitespace");
    }
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("name must be lowercase");
    }

    let (scope, bare) = split_scope(name);
    if name.starts_with('@') && scope.is_none() {
        return Err("scoped name must look like @scope/name");
    }
    if let Some(scope) = scope {
        if scope.is_empty() || !scope.chars().all(is_url_safe) {
            return Err("scope contains invalid characters");
        }
    }

    if bare.is_empty() {
        return Err("name must not be empty");
    }
    if bare.starts_with('.') || bare.starts_with('_') {
        return Err("name must not start with '.' or '_'");
    }
    if !bare.chars().all(is_url_safe) {
        return Err("name contains characters that are not URL-safe");
    }
    if matches!(bare, "node_modules" | "favicon.ico") {
        return Err("name is blacklisted");
    }

    Ok(())
}

fn is_url_safe(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_' | '~')
}
