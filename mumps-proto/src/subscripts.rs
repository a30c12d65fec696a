// Splits the text between `(` and `)` in a global reference on commas
// that are outside matching quotes, then classifies each piece as a
// quoted string literal, a bare number, or a bare identifier -- per the
// subscript grammar. Quoted text keeps its string type even if it looks
// numeric (`"5"` stays a string subscript, bare `5` becomes an integer
// one); this is what lets callers write both `^G(5)` and `^G("5")` as
// distinct paths.

use memchr::memchr3;

use mumps_model::{Path, SubscriptElement};

/// Scans `s` for quote-aware top-level commas, i.e. commas that are not
/// inside a `'...'` or `"..."` span. Doubled quote characters inside a
/// span (`""`, `''`) are treated as an escaped literal quote, not a
/// terminator.
pub fn split_top_level(s: &str) -> Vec<String> {
    if s.is_empty() {
        return Vec::new();
    }
    let bytes = s.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0usize;
    while i < bytes.len() {
        match memchr3(b',', b'"', b'\'', &bytes[i..]) {
            None => break,
            Some(off) => {
                let pos = i + off;
                let c = bytes[pos];
                match quote {
                    Some(q) if c == q => {
                        if bytes.get(pos + 1) == Some(&q) {
                            i = pos + 2; // escaped quote, stays inside the span
                            continue;
                        }
                        quote = None;
                        i = pos + 1;
                    }
                    Some(_) => {
                        i = pos + 1; // a different quote char while inside a span
                    }
                    None => {
                        if c == b',' {
                            parts.push(s[start..pos].to_string());
                            start = pos + 1;
                            i = start;
                        } else {
                            quote = Some(c);
                            i = pos + 1;
                        }
                    }
                }
            }
        }
    }
    parts.push(s[start..].to_string());
    parts.into_iter().map(|p| p.trim().to_string()).collect()
}

/// Strips matching surrounding quotes and un-doubles escaped quote
/// characters, returning `None` if `raw` is not quoted.
fn strip_quotes(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let q = bytes[0];
    if (q != b'"' && q != b'\'') || bytes[bytes.len() - 1] != q {
        return None;
    }
    let inner = &raw[1..raw.len() - 1];
    let doubled = format!("{}{}", q as char, q as char);
    Some(inner.replace(&doubled, &(q as char).to_string()))
}

/// Renders a parsed `f64` subscript in its canonical textual form, the
/// representation floating subscripts are compared and stored by (§3:
/// "compared as strings of their canonical textual form").
fn canonical_float_text(f: f64) -> String {
    f.to_string()
}

/// Classifies one already-comma-split token into a `SubscriptElement`.
pub fn parse_subscript_token(raw: &str) -> SubscriptElement {
    if let Some(literal) = strip_quotes(raw) {
        // Quoted text always stays a string subscript, even if it looks
        // numeric -- `^G("5")` and `^G(5)` address different nodes.
        return SubscriptElement::from_str_literal(literal);
    }
    let trimmed = raw.trim();
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>() {
            // A float that round-trips to an integer (`5.0`) must land on
            // the same `Int` tag bare `5` does, so `^G(5)` and `^G(5.0)`
            // address the same node -- route through the same
            // canonicalization bare integers use rather than forcing a
            // string tag.
            return SubscriptElement::canonicalize(canonical_float_text(f));
        }
    }
    SubscriptElement::canonicalize(trimmed)
}

/// Parses the full contents of a `(...)` subscript list into a `Path`.
pub fn parse_path(inner: &str) -> Path {
    if inner.trim().is_empty() {
        return Path::root();
    }
    Path::from(
        split_top_level(inner)
            .into_iter()
            .map(|tok| parse_subscript_token(&tok))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_simple() {
        assert_eq!(split_top_level("1,\"a\",2"), vec!["1", "\"a\"", "2"]);
    }

    #[test]
    fn test_split_comma_inside_quotes() {
        assert_eq!(split_top_level("\"a,b\",2"), vec!["\"a,b\"", "2"]);
    }

    #[test]
    fn test_split_escaped_quote() {
        assert_eq!(split_top_level("\"a\"\"b\""), vec!["\"a\"\"b\""]);
    }

    #[test]
    fn test_parse_subscript_token_quoted_numeric_stays_string() {
        assert_eq!(
            parse_subscript_token("\"5\""),
            SubscriptElement::from_str_literal("5".to_string())
        );
    }

    #[test]
    fn test_parse_subscript_token_bare_integer() {
        assert_eq!(parse_subscript_token("5"), SubscriptElement::Int(5));
    }

    #[test]
    fn test_parse_subscript_token_bare_identifier() {
        assert_eq!(
            parse_subscript_token("name"),
            SubscriptElement::from_str_literal("name".to_string())
        );
    }

    #[test]
    fn test_parse_subscript_token_integral_float_matches_bare_int() {
        assert_eq!(parse_subscript_token("5.0"), SubscriptElement::Int(5));
        assert_eq!(parse_subscript_token("5.0"), parse_subscript_token("5"));
    }

    #[test]
    fn test_parse_subscript_token_non_integral_float_stays_string() {
        assert_eq!(
            parse_subscript_token("1.5"),
            SubscriptElement::from_str_literal("1.5".to_string())
        );
    }

    #[test]
    fn test_parse_path_multi() {
        let p = parse_path("1,\"a\"");
        assert_eq!(
            p.elements(),
            &[SubscriptElement::Int(1), SubscriptElement::from_str_literal("a".to_string())]
        );
    }
}
