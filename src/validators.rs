//! Normalizadores de entrada.
//!
//! Shared by the payload validation and the listado filter. All of them are
//! total: malformed input becomes `None` (or `false`), never an error, so a
//! junk query-string parameter degrades into "filter absent".

use rust_decimal::Decimal;
use std::str::FromStr;

pub fn is_non_empty(v: &str) -> bool {
    !v.trim().is_empty()
}

/// Trims and drops empty strings.
pub fn trimmed_or_null(v: Option<&str>) -> Option<String> {
    let t = v?.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Whole numbers only: `"3"`, `" 3 "` and `"3.0"` parse, `"3.5"` and `"x"`
/// do not.
pub fn to_int_or_null(v: Option<&str>) -> Option<i32> {
    let t = v?.trim();
    if t.is_empty() {
        return None;
    }
    if let Ok(n) = t.parse::<i32>() {
        return Some(n);
    }
    let f: f64 = t.parse().ok()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Monetary amounts; accepts a decimal comma.
pub fn to_decimal_or_null(v: Option<&str>) -> Option<Decimal> {
    let t = v?.trim();
    if t.is_empty() {
        return None;
    }
    Decimal::from_str(&t.replace(',', ".")).ok()
}

/// Trim plus a hard length cap, counted in characters.
pub fn clamp_string(v: &str, max: usize) -> String {
    v.trim().chars().take(max).collect()
}

/// Permissive, not RFC-complete: one `@`, a dotted domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let e = email.trim();
    if e.is_empty() || e.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = e.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .find('.')
        .is_some_and(|i| i > 0 && i < domain.len() - 1)
}

/// Shape check for `YYYY-MM-DD`. Calendar validity is checked where the
/// value is actually parsed.
pub fn is_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| matches!(i, 4 | 7) || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trimmed_or_null_drops_blank_input() {
        assert_eq!(trimmed_or_null(Some("  hola  ")), Some("hola".to_string()));
        assert_eq!(trimmed_or_null(Some("   ")), None);
        assert_eq!(trimmed_or_null(Some("")), None);
        assert_eq!(trimmed_or_null(None), None);
    }

    #[test]
    fn to_int_or_null_accepts_whole_numbers_only() {
        assert_eq!(to_int_or_null(Some("3")), Some(3));
        assert_eq!(to_int_or_null(Some(" 12 ")), Some(12));
        assert_eq!(to_int_or_null(Some("3.0")), Some(3));
        assert_eq!(to_int_or_null(Some("-7")), Some(-7));
        assert_eq!(to_int_or_null(Some("3.5")), None);
        assert_eq!(to_int_or_null(Some("abc")), None);
        assert_eq!(to_int_or_null(Some("")), None);
        assert_eq!(to_int_or_null(None), None);
    }

    #[test]
    fn to_decimal_or_null_accepts_comma_separator() {
        assert_eq!(
            to_decimal_or_null(Some("1234,56")),
            Some(Decimal::new(123_456, 2))
        );
        assert_eq!(
            to_decimal_or_null(Some("1234.56")),
            Some(Decimal::new(123_456, 2))
        );
        assert_eq!(to_decimal_or_null(Some("no")), None);
        assert_eq!(to_decimal_or_null(Some("   ")), None);
    }

    #[test]
    fn clamp_string_trims_then_caps() {
        assert_eq!(clamp_string("  hola  ", 10), "hola");
        assert_eq!(clamp_string("abcdef", 3), "abc");
        // counted in chars, not bytes
        assert_eq!(clamp_string("áéí", 2), "áé");
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ana@empresa.cl"));
        assert!(is_valid_email("  ana@empresa.cl  "));
        assert!(is_valid_email("a.b@x.y.z"));
        assert!(!is_valid_email("ana@empresa"));
        assert!(!is_valid_email("@empresa.cl"));
        assert!(!is_valid_email("ana@.cl"));
        assert!(!is_valid_email("ana@empresa."));
        assert!(!is_valid_email("ana@@empresa.cl"));
        assert!(!is_valid_email("ana maria@empresa.cl"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn iso_date_checks_shape_only() {
        assert!(is_iso_date("2024-01-31"));
        assert!(is_iso_date("2024-02-31")); // shape ok, calendar decided later
        assert!(!is_iso_date("2024-1-31"));
        assert!(!is_iso_date("31-01-2024"));
        assert!(!is_iso_date("2024-01-31T00:00:00"));
        assert!(!is_iso_date(""));
    }
}
