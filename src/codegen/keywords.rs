//! Rust reserved-word handling for identifiers this tool mints itself:
//! query names (used as function and module names) and recovered parameter
//! names (used as struct field names in generated call-site code).
//!
//! The list itself is just the language's own reserved and
//! reserved-for-future-use word list.

const STRICT: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "Self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "async", "await", "dyn",
];

const RESERVED: &[&str] = &[
    "abstract", "become", "box", "do", "final", "macro", "override", "priv", "typeof", "unsized",
    "virtual", "yield", "try",
];

/// Keywords that cannot be escaped with `r#` and must never be produced as-is.
const UNESCAPABLE: &[&str] = &["self", "Self", "super", "crate"];

pub fn is_reserved(ident: &str) -> bool {
    STRICT.contains(&ident) || RESERVED.contains(&ident)
}

/// Turn a reserved word into a usable Rust identifier: `r#`-escape it, unless
/// it's one of the handful of keywords that escaping doesn't work for, in
/// which case fall back to an `_`-suffixed form.
pub fn escape(ident: &str) -> String {
    if UNESCAPABLE.contains(&ident) {
        format!("{ident}_")
    } else {
        format!("r#{ident}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_keywords_are_reserved() {
        assert!(is_reserved("type"));
        assert!(is_reserved("match"));
        assert!(is_reserved("async"));
    }

    #[test]
    fn ordinary_identifiers_are_not_reserved() {
        assert!(!is_reserved("user_id"));
        assert!(!is_reserved("find_user"));
    }

    #[test]
    fn escape_uses_raw_identifier_form() {
        assert_eq!(escape("type"), "r#type");
    }

    #[test]
    fn escape_falls_back_for_unescapable_keywords() {
        assert_eq!(escape("self"), "self_");
        assert_eq!(escape("crate"), "crate_");
    }
}
