//! File extension normalization.

/// Normalizes an extension to its dotted form: `"js"` and `".js"` both
/// become `".js"`.
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_missing_dot() {
        assert_eq!(normalize_extension("js"), ".js");
    }

    #[test]
    fn keeps_existing_dot() {
        assert_eq!(normalize_extension(".css"), ".css");
    }
}
