/// Trims and lower-cases an email so it can be used as the waitlist key.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Accepts the `local@domain.tld` shape: one `@`, no whitespace, and a dot
/// inside the domain with at least one character on each side.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(idx, c)| c == '.' && idx > 0 && idx + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_email("  ADA@X.com \n"), "ada@x.com");
    }

    #[test]
    fn accepts_basic_addresses() {
        assert!(is_valid_email("ada@x.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(is_valid_email("a@b.c"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "ada",
            "ada@",
            "@x.com",
            "ada@x",
            "ada@.com",
            "ada@x.",
            "ada@@x.com",
            "a@b@c.com",
            "ada lovelace@x.com",
        ] {
            assert!(!is_valid_email(bad), "{bad} should be rejected");
        }
    }
}
