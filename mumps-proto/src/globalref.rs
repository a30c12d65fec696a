/// Splits `^Name(inner)` or bare `^Name` into its global name and the raw
/// text between the parens (empty when there are none). Returns `None`
/// when `s` does not start with `^`.
pub fn split_global_ref(s: &str) -> Option<(String, String)> {
    let s = s.trim();
    if !s.starts_with('^') {
        return None;
    }
    match s.find('(') {
        Some(open) if s.ends_with(')') => {
            let name = s[..open].trim().to_string();
            let inner = s[open + 1..s.len() - 1].to_string();
            Some((name, inner))
        }
        Some(_) => None,
        None => Some((s.to_string(), String::new())),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bare_global() {
        assert_eq!(split_global_ref("^G"), Some(("^G".to_string(), String::new())));
    }

    #[test]
    fn test_global_with_subscripts() {
        assert_eq!(
            split_global_ref("^G(1,\"a\")"),
            Some(("^G".to_string(), "1,\"a\"".to_string()))
        );
    }

    #[test]
    fn test_not_a_global_ref() {
        assert_eq!(split_global_ref("foo"), None);
    }
}
