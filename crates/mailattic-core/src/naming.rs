//! Store display-name conventions.
//!
//! Archive stores carry their account and year in the display name, in one
//! of two forms:
//!
//! ```text
//! andyw@glawster.com (2025)              address form
//! Andy Williams @ Glawster Mail (2020)   display form
//! ```
//!
//! [`StoreName::parse`] recovers the account identifier and year from
//! either form and falls back to the whole name, lower-cased, when a name
//! follows neither. Matching is prefix-based: trailing text after the
//! year does not disqualify a name.

/// Account identifier and optional year derived from a store display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreName {
    /// Normalized account identifier, lower-cased and trimmed.
    pub account: String,
    /// Four-digit year embedded in the name, if any.
    pub year: Option<i32>,
}

impl StoreName {
    /// Splits a display name into account and year.
    ///
    /// The address form is tried first, then the display form, then the
    /// fallback. The fallback never yields a year even when the name
    /// contains one; use [`year_of`] to probe for years independently.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        if let Some((account, year)) = rule_address(name) {
            return Self { account, year: Some(year) };
        }
        if let Some((account, year)) = rule_display(name) {
            return Self { account, year: Some(year) };
        }
        Self { account: name.trim().to_lowercase(), year: None }
    }
}

/// The first parenthesized four-digit year anywhere in `name`.
///
/// Exactly four digits qualify; `(607)` and `(20255)` do not.
#[must_use]
pub fn year_of(name: &str) -> Option<i32> {
    for (open, _) in name.match_indices('(') {
        let rest = &name[open + 1..];
        let Some(digits) = rest.get(..4) else { continue };
        if digits.bytes().all(|b| b.is_ascii_digit()) && rest[4..].starts_with(')') {
            return digits.parse().ok();
        }
    }
    None
}

/// Whether `name` is exactly an address-form archive name,
/// `local@domain (yyyy)`, with nothing before or after.
#[must_use]
pub fn is_archivable(name: &str) -> bool {
    let Some((local, rest)) = name.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.chars().any(char::is_whitespace) || rest.contains('@') {
        return false;
    }
    let domain_len = rest.find(|c: char| !is_domain_char(c)).unwrap_or(rest.len());
    if domain_len == 0 {
        return false;
    }
    let tail = &rest[domain_len..];
    tail.len() == " (0000)".len() && leading_paren_year(tail).is_some()
}

/// Lower-cases `name` and removes every whitespace character.
///
/// Comparisons between display names go through this so that spacing
/// differences between `a@b.com(2020)` and `a@b.com (2020)` do not matter.
#[must_use]
pub fn normalize(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_lowercase()
}

fn is_domain_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// Parses ` (dddd)` at the start of `rest`.
fn leading_paren_year(rest: &str) -> Option<i32> {
    let rest = rest.strip_prefix(" (")?;
    let digits = rest.get(..4)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) || !rest[4..].starts_with(')') {
        return None;
    }
    digits.parse().ok()
}

/// Address form: `local@domain (yyyy)`, the year directly after the
/// domain. The local part may itself contain `@`; the rightmost `@` that
/// completes the shape wins.
fn rule_address(name: &str) -> Option<(String, i32)> {
    for (at, _) in name.match_indices('@').rev() {
        if at == 0 {
            continue;
        }
        let after = &name[at + 1..];
        let domain_len = after.find(|c: char| !is_domain_char(c)).unwrap_or(after.len());
        if domain_len == 0 {
            continue;
        }
        let Some(year) = leading_paren_year(&after[domain_len..]) else {
            continue;
        };
        return Some((name[..at + 1 + domain_len].to_lowercase(), year));
    }
    None
}

/// Display form: `Display Name @ Anything (yyyy)`, with the `@` set off by
/// spaces. The account is everything before the first ` @ `; the year is
/// the first parenthesized one after it.
fn rule_display(name: &str) -> Option<(String, i32)> {
    let (display, rest) = name.split_once(" @ ")?;
    if display.is_empty() {
        return None;
    }
    let mut offset = 0;
    while let Some(pos) = rest[offset..].find(" (") {
        let start = offset + pos;
        if start >= 1
            && let Some(year) = leading_paren_year(&rest[start..])
        {
            return Some((display.trim().to_lowercase(), year));
        }
        offset = start + 1;
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_address_form() {
        let parsed = StoreName::parse("andyw@glawster.com (2025)");
        assert_eq!(parsed.account, "andyw@glawster.com");
        assert_eq!(parsed.year, Some(2025));
    }

    #[test]
    fn address_form_lowercases_account() {
        let parsed = StoreName::parse("AndyW@Glawster.COM (2025)");
        assert_eq!(parsed.account, "andyw@glawster.com");
    }

    #[test]
    fn parses_display_form() {
        let parsed = StoreName::parse("Andy Williams @ Glawster Archive (2020)");
        assert_eq!(parsed.account, "andy williams");
        assert_eq!(parsed.year, Some(2020));
    }

    #[test]
    fn display_form_takes_first_year() {
        let parsed = StoreName::parse("Andy @ Archive (2019) (2023)");
        assert_eq!(parsed.account, "andy");
        assert_eq!(parsed.year, Some(2019));
    }

    #[test]
    fn falls_back_to_whole_name() {
        let parsed = StoreName::parse("  Personal Folders ");
        assert_eq!(parsed.account, "personal folders");
        assert_eq!(parsed.year, None);
    }

    #[test]
    fn fallback_keeps_year_out_even_when_present() {
        // A year in a name that matches neither form stays out of the
        // account split; year_of still sees it.
        let parsed = StoreName::parse("Backup (2018)");
        assert_eq!(parsed.account, "backup (2018)");
        assert_eq!(parsed.year, None);
        assert_eq!(year_of("Backup (2018)"), Some(2018));
    }

    #[test]
    fn address_form_tolerates_trailing_text() {
        let parsed = StoreName::parse("a@b.com (2020) old copy");
        assert_eq!(parsed.account, "a@b.com");
        assert_eq!(parsed.year, Some(2020));
    }

    #[test]
    fn spaced_at_is_not_address_form() {
        let parsed = StoreName::parse("Andy @ Glawster (2025)");
        assert_eq!(parsed.account, "andy");
        assert_eq!(parsed.year, Some(2025));
    }

    #[test]
    fn rightmost_at_wins_in_address_form() {
        let parsed = StoreName::parse("odd@name x@y.org (2021)");
        assert_eq!(parsed.account, "odd@name x@y.org");
        assert_eq!(parsed.year, Some(2021));
    }

    #[test]
    fn year_of_requires_exactly_four_digits() {
        assert_eq!(year_of("box (607)"), None);
        assert_eq!(year_of("box (20255)"), None);
        assert_eq!(year_of("box (2025)"), Some(2025));
    }

    #[test]
    fn year_of_finds_first_match() {
        assert_eq!(year_of("a (1999) b (2005)"), Some(1999));
        assert_eq!(year_of("no year here"), None);
    }

    #[test]
    fn archivable_is_exact_shape_only() {
        assert!(is_archivable("andyw@glawster.com (2025)"));
        assert!(!is_archivable("andyw@glawster.com (2025) copy"));
        assert!(!is_archivable("andyw@glawster.com"));
        assert!(!is_archivable("Andy Williams @ Glawster (2025)"));
        assert!(!is_archivable("andy w@glawster.com (2025)"));
        assert!(!is_archivable("Personal Folders"));
    }

    #[test]
    fn normalize_drops_space_and_case() {
        assert_eq!(normalize("Andy W @ Glawster (2020)"), "andyw@glawster(2020)");
        assert_eq!(normalize("a@b.com (2020)"), normalize("A@B.Com(2020)"));
    }

    proptest! {
        #[test]
        fn composed_address_names_round_trip(
            local in "[a-z][a-z0-9]{0,7}",
            domain in "[a-z]{1,8}\\.[a-z]{2,3}",
            year in 1000..=9999i32,
        ) {
            let name = format!("{local}@{domain} ({year})");
            let parsed = StoreName::parse(&name);
            assert_eq!(parsed.account, format!("{local}@{domain}"));
            assert_eq!(parsed.year, Some(year));
            assert!(is_archivable(&name));
            assert_eq!(year_of(&name), Some(year));
        }

        #[test]
        fn parse_total_on_arbitrary_input(name in ".*") {
            let parsed = StoreName::parse(&name);
            if let Some(year) = parsed.year {
                assert!((0..=9999).contains(&year));
            }
        }

        #[test]
        fn normalize_is_idempotent(name in ".*") {
            let once = normalize(&name);
            assert_eq!(normalize(&once), once);
        }
    }
}
