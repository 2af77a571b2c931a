//! Canonical forms for contact identifiers.
//!
//! Only case and the space/hyphen separators are folded. Parentheses, a leading
//! `+` and any other punctuation survive, so `+1 555` and `1555` stay distinct.

/// Lowercases an email address. Absent or empty input yields `None`.
pub(crate) fn normalize_email(raw: Option<&str>) -> Option<String> {
    match raw {
        Some(email) if !email.is_empty() => Some(email.to_lowercase()),
        _ => None,
    }
}

/// Strips spaces and hyphens from a phone number, then lowercases it.
/// Absent input, or input made only of separators, yields `None`.
pub(crate) fn normalize_phone(raw: Option<&str>) -> Option<String> {
    let stripped: String = raw?.chars().filter(|c| *c != ' ' && *c != '-').collect();
    if stripped.is_empty() {
        return None;
    }
    Some(stripped.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_folds_case() {
        assert_eq!(
            normalize_email(Some("A@B.com")),
            normalize_email(Some("a@b.com"))
        );
        assert_eq!(normalize_email(Some("Jane@Shop.COM")).unwrap(), "jane@shop.com");
    }

    #[test]
    fn test_normalize_phone_strips_separators() {
        assert_eq!(
            normalize_phone(Some("98-765 432-10")),
            normalize_phone(Some("9876543210"))
        );
        assert_eq!(normalize_phone(Some(" 555 - 01 ")).unwrap(), "55501");
    }

    #[test]
    fn test_normalize_phone_keeps_other_punctuation() {
        assert_eq!(normalize_phone(Some("+1 (555) 010")).unwrap(), "+1(555)010");
        assert_ne!(
            normalize_phone(Some("+15550100")),
            normalize_phone(Some("15550100"))
        );
        assert_eq!(normalize_phone(Some("555-EXT")).unwrap(), "555ext");
    }

    #[test]
    fn test_normalize_absent_and_empty() {
        assert_eq!(normalize_email(None), None);
        assert_eq!(normalize_email(Some("")), None);
        assert_eq!(normalize_phone(None), None);
        assert_eq!(normalize_phone(Some("")), None);
        assert_eq!(normalize_phone(Some(" - ")), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["A@B.com", "MiXeD.Case@Example.org", "", "ÉMILE@exemple.fr"] {
            let once = normalize_email(Some(raw));
            assert_eq!(normalize_email(once.as_deref()), once);
        }
        for raw in ["98-765 432-10", "+1 (555) 010-0000", "", "- -", "ABC-def"] {
            let once = normalize_phone(Some(raw));
            assert_eq!(normalize_phone(once.as_deref()), once);
        }
    }
}
