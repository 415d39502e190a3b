use crate::error::{FsError, Result};

/// Replace the single occurrence of `search` in `content`.
///
/// Zero or several occurrences are refused without touching anything, which
/// pushes callers to quote enough surrounding text for a unique match.
pub fn replace_unique(content: &str, search: &str, replace: &str) -> Result<String> {
    if search.is_empty() {
        return Err(FsError::EmptyEdit);
    }

    let occurrences = content.matches(search).count();
    if occurrences != 1 {
        return Err(FsError::AmbiguousEdit { occurrences });
    }

    Ok(content.replacen(search, replace, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_occurrence_is_replaced() {
        let content = "line1\nsearch\nline2";
        let result = replace_unique(content, "search", "replaced").unwrap();
        assert_eq!(result, "line1\nreplaced\nline2");
    }

    #[test]
    fn test_fails_on_multiple_occurrences() {
        let content = "line1\nsearch\nline2\nsearch\nline3";
        let err = replace_unique(content, "search", "replaced").unwrap_err();
        assert!(matches!(err, FsError::AmbiguousEdit { occurrences: 2 }));
        assert!(err.to_string().contains("2 times"));
    }

    #[test]
    fn test_fails_when_missing() {
        let err = replace_unique("abc", "xyz", "q").unwrap_err();
        assert!(matches!(err, FsError::AmbiguousEdit { occurrences: 0 }));
    }

    #[test]
    fn test_surrounding_context_disambiguates() {
        let content = "fn a() {\n    x();\n}\nfn b() {\n    x();\n}\n";
        assert!(replace_unique(content, "    x();\n", "    y();\n").is_err());

        let result = replace_unique(content, "fn b() {\n    x();", "fn b() {\n    y();").unwrap();
        assert_eq!(result, "fn a() {\n    x();\n}\nfn b() {\n    y();\n}\n");
    }

    #[test]
    fn test_empty_search_is_rejected() {
        assert!(matches!(
            replace_unique("abc", "", "x"),
            Err(FsError::EmptyEdit)
        ));
    }

    #[test]
    fn test_whitespace_is_significant() {
        let err = replace_unique("a  b", "a b", "c").unwrap_err();
        assert!(matches!(err, FsError::AmbiguousEdit { occurrences: 0 }));
    }
}
