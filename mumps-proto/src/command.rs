use mumps_base::{err, Result};
use mumps_model::Path;

use crate::expr::{parse_value_expr, parse_value_expr_list, ValueExpr};
use crate::globalref::split_global_ref;
use crate::subscripts::parse_path;

#[derive(Clone, Debug, PartialEq)]
pub enum AssignTarget {
    Global { global: String, path: Path },
    Local(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ZWriteTarget {
    All,
    Filter(String),
    Global { global: String, path: Path },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Set { target: AssignTarget, expr: ValueExpr },
    Get { global: String, path: Path },
    Kill { global: String, path: Path },
    Query { global: String, path: Path, depth: usize },
    Write { exprs: Vec<ValueExpr> },
    ZWrite(ZWriteTarget),
    FastSearch(String),
    ExactSearch { query: String, global: Option<String> },
    SimSearch { query: String, global: Option<String>, top_k: Option<usize> },
    BeginTransaction,
    Commit,
    Rollback,
    Stats,
    Help,
    Exit,
    Error(String),
}

/// Splits a leading `^Name[(subscripts)]` off the front of `s`, returning
/// the global name, its parsed path, and whatever text follows.
fn take_global_ref(s: &str) -> Result<(String, Path, &str)> {
    let s = s.trim_start();
    if !s.starts_with('^') {
        return Err(err(format!("expected a global reference, found: {s}")));
    }
    let (head, rest) = match s.find('(') {
        Some(open) => {
            let close = s[open..]
                .find(')')
                .ok_or_else(|| err("unterminated subscript list"))?
                + open;
            (&s[..=close], &s[close + 1..])
        }
        None => match s.find(char::is_whitespace) {
            Some(ws) => (&s[..ws], &s[ws..]),
            None => (s, ""),
        },
    };
    let (global, subscript_text) =
        split_global_ref(head).ok_or_else(|| err(format!("malformed global reference: {head}")))?;
    Ok((global, parse_path(&subscript_text), rest.trim()))
}

/// Finds the first `=` that is outside quotes and at paren depth zero --
/// the assignment separator in `SET target=expr`.
fn find_top_level_eq(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0i32;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) if c == q => {
                if bytes.get(i + 1) == Some(&q) {
                    i += 2;
                    continue;
                }
                quote = None;
            }
            Some(_) => {}
            None => match c {
                b'"' | b'\'' => quote = Some(c),
                b'(' => depth += 1,
                b')' => depth -= 1,
                b'=' if depth == 0 => return Some(i),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

fn parse_set(args: &str) -> Result<Command> {
    let eq = find_top_level_eq(args).ok_or_else(|| err("SET requires target=value"))?;
    let (target_text, expr_text) = (args[..eq].trim(), args[eq + 1..].trim());
    let target = if target_text.starts_with('^') {
        let (global, path, rest) = take_global_ref(target_text)?;
        if !rest.is_empty() {
            return Err(err(format!("unexpected trailing text in SET target: {rest}")));
        }
        AssignTarget::Global { global, path }
    } else {
        if target_text.is_empty() {
            return Err(err("SET requires a target"));
        }
        AssignTarget::Local(target_text.to_string())
    };
    Ok(Command::Set {
        target,
        expr: parse_value_expr(expr_text)?,
    })
}

fn parse_query(args: &str) -> Result<Command> {
    let (global, path, rest) = take_global_ref(args)?;
    let mut depth = 1usize;
    let mut tokens = rest.split_whitespace();
    if let Some(kw) = tokens.next() {
        if kw.eq_ignore_ascii_case("depth") {
            let n = tokens
                .next()
                .ok_or_else(|| err("DEPTH requires a number"))?;
            depth = n
                .parse::<usize>()
                .map_err(|_| err(format!("invalid DEPTH value: {n}")))?;
        } else {
            return Err(err(format!("unexpected token after QUERY target: {kw}")));
        }
    }
    Ok(Command::Query { global, path, depth })
}

fn parse_zwrite(args: &str) -> Result<Command> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return Ok(Command::ZWrite(ZWriteTarget::All));
    }
    if trimmed.starts_with('^') {
        let (global, path, rest) = take_global_ref(trimmed)?;
        if !rest.is_empty() {
            return Err(err(format!("unexpected trailing text after ZWRITE target: {rest}")));
        }
        return Ok(Command::ZWrite(ZWriteTarget::Global { global, path }));
    }
    Ok(Command::ZWrite(ZWriteTarget::Filter(trimmed.to_string())))
}

fn parse_exact_search(args: &str) -> Result<Command> {
    let mut words: Vec<&str> = args.split_whitespace().collect();
    let mut global = None;
    if words.len() >= 2 && words[words.len() - 2].eq_ignore_ascii_case("in") {
        global = Some(words[words.len() - 1].to_string());
        words.truncate(words.len() - 2);
    }
    if words.is_empty() {
        return Err(err("EXACTSEARCH requires a query"));
    }
    Ok(Command::ExactSearch {
        query: words.join(" "),
        global,
    })
}

fn parse_sim_search(args: &str) -> Result<Command> {
    let mut words: Vec<&str> = args.split_whitespace().collect();
    let mut top_k = None;
    if words.len() >= 2 && words[words.len() - 2].eq_ignore_ascii_case("top") {
        top_k = Some(
            words[words.len() - 1]
                .parse::<usize>()
                .map_err(|_| err("invalid TOP value"))?,
        );
        words.truncate(words.len() - 2);
    }
    let mut global = None;
    if words.len() >= 2 && words[words.len() - 2].eq_ignore_ascii_case("in") {
        global = Some(words[words.len() - 1].to_string());
        words.truncate(words.len() - 2);
    }
    if words.is_empty() {
        return Err(err("SIMSEARCH requires a query"));
    }
    Ok(Command::SimSearch {
        query: words.join(" "),
        global,
        top_k,
    })
}

/// Parses one logical input line into a `Command`. The verb is matched
/// case-insensitively; the remainder of the line keeps its original
/// case, since string literals and identifiers inside it are
/// case-sensitive.
pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Err(err("empty command"));
    }
    let (verb, rest) = match line.find(char::is_whitespace) {
        Some(ws) => (&line[..ws], line[ws..].trim()),
        None => (line, ""),
    };
    let verb_upper = verb.to_ascii_uppercase();
    match verb_upper.as_str() {
        "SET" => parse_set(rest),
        "GET" => {
            let (global, path, rest) = take_global_ref(rest)?;
            if !rest.is_empty() {
                return Err(err(format!("unexpected trailing text after GET target: {rest}")));
            }
            Ok(Command::Get { global, path })
        }
        "KILL" => {
            let (global, path, rest) = take_global_ref(rest)?;
            if !rest.is_empty() {
                return Err(err(format!("unexpected trailing text after KILL target: {rest}")));
            }
            Ok(Command::Kill { global, path })
        }
        "QUERY" => parse_query(rest),
        "WRITE" => Ok(Command::Write {
            exprs: parse_value_expr_list(rest)?,
        }),
        "ZW" | "ZWRITE" => parse_zwrite(rest),
        "FSEARCH" | "FAST_SEARCH" => {
            if rest.is_empty() {
                return Err(err("FSEARCH requires a value"));
            }
            Ok(Command::FastSearch(rest.to_string()))
        }
        "EXACTSEARCH" => parse_exact_search(rest),
        "SIMSEARCH" => parse_sim_search(rest),
        "TSTART" => Ok(Command::BeginTransaction),
        "COMMIT" => Ok(Command::Commit),
        "ROLLBACK" => Ok(Command::Rollback),
        "STATS" | "$S" => Ok(Command::Stats),
        "HELP" => Ok(Command::Help),
        "EXIT" => Ok(Command::Exit),
        other => Err(err(format!("unrecognized command: {other}"))),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use mumps_model::{SubscriptElement, Value};

    #[test]
    fn test_parse_set_global() {
        match parse_line("SET ^G(1,\"a\")=5").unwrap() {
            Command::Set { target, expr } => {
                assert_eq!(
                    target,
                    AssignTarget::Global {
                        global: "^G".to_string(),
                        path: Path(vec![
                            SubscriptElement::Int(1),
                            SubscriptElement::from_str_literal("a".to_string())
                        ])
                    }
                );
                assert_eq!(expr, ValueExpr::Literal(Value::from(5i64)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_set_local() {
        match parse_line("SET x=\"hello\"").unwrap() {
            Command::Set { target, .. } => assert_eq!(target, AssignTarget::Local("x".to_string())),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_get() {
        match parse_line("GET ^G(1,\"a\")").unwrap() {
            Command::Get { global, .. } => assert_eq!(global, "^G"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_kill() {
        match parse_line("KILL ^G(1)").unwrap() {
            Command::Kill { global, .. } => assert_eq!(global, "^G"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_default_depth() {
        match parse_line("QUERY ^G").unwrap() {
            Command::Query { depth, .. } => assert_eq!(depth, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_with_depth() {
        match parse_line("QUERY ^G DEPTH 2").unwrap() {
            Command::Query { depth, .. } => assert_eq!(depth, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_write_list() {
        match parse_line("WRITE \"x=\",^G(1)").unwrap() {
            Command::Write { exprs } => assert_eq!(exprs.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_zwrite_bare() {
        assert_eq!(parse_line("ZW").unwrap(), Command::ZWrite(ZWriteTarget::All));
    }

    #[test]
    fn test_parse_zwrite_global() {
        match parse_line("ZW ^G").unwrap() {
            Command::ZWrite(ZWriteTarget::Global { global, .. }) => assert_eq!(global, "^G"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_exact_search_with_in() {
        match parse_line("EXACTSEARCH foo IN ^G").unwrap() {
            Command::ExactSearch { query, global } => {
                assert_eq!(query, "foo");
                assert_eq!(global, Some("^G".to_string()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_sim_search_with_top() {
        match parse_line("SIMSEARCH foo TOP 5").unwrap() {
            Command::SimSearch { query, top_k, .. } => {
                assert_eq!(query, "foo");
                assert_eq!(top_k, Some(5));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_transactional_verbs() {
        assert_eq!(parse_line("TSTART").unwrap(), Command::BeginTransaction);
        assert_eq!(parse_line("COMMIT").unwrap(), Command::Commit);
        assert_eq!(parse_line("ROLLBACK").unwrap(), Command::Rollback);
    }

    #[test]
    fn test_parse_stats_alias() {
        assert_eq!(parse_line("$S").unwrap(), Command::Stats);
        assert_eq!(parse_line("STATS").unwrap(), Command::Stats);
    }

    #[test]
    fn test_parse_verb_case_insensitive() {
        assert_eq!(parse_line("help").unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_unrecognized_verb() {
        assert!(parse_line("BOGUS").is_err());
    }

    #[test]
    fn test_parse_empty_line() {
        assert!(parse_line("").is_err());
    }
}
