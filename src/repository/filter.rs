//! The query filter DSL shared by every `query`/`count` repository method.
//!
//! Grammar: semicolon-separated tokens, each either a joiner (`and`, `or`,
//! `not`, case-insensitive) or a single `field<op>value` predicate, e.g.
//! `id>=1;or;username=someName;and;startedAt!=null`. Adjacent predicates
//! with no explicit joiner between them are implicitly ANDed.
//!
//! The operator-check order below is load-bearing: several operators are
//! textual prefixes of others (`!=` vs `!->`, `>=` vs `>`), so checking in
//! the wrong order silently misparses a filter.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Le,
    Ge,
    Ne,
    Eq,
    NotIn,
    In,
    Gt,
    Lt,
    NotLike,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joiner {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: String,
    pub op: Op,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Token {
    Predicate(Predicate),
    Joiner(Joiner),
}

/// Operators in the exact order the reference server checks them: each
/// entry's operator text, the `Op`, and whether it takes a comma-separated
/// list of values (`->`/`!->`) rather than a single value.
const OPERATORS: &[(&str, Op)] = &[
    ("<=", Op::Le),
    (">=", Op::Ge),
    ("!=", Op::Ne),
    ("=", Op::Eq),
    ("!->", Op::NotIn),
    ("->", Op::In),
    (">", Op::Gt),
    ("<", Op::Lt),
    ("!~", Op::NotLike),
    ("~", Op::Like),
];

pub fn parse(filter: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    if filter.is_empty() {
        return tokens;
    }
    for part in filter.split(';') {
        let lower = part.to_ascii_lowercase();
        match lower.as_str() {
            "and" => {
                tokens.push(Token::Joiner(Joiner::And));
                continue;
            }
            "or" => {
                tokens.push(Token::Joiner(Joiner::Or));
                continue;
            }
            "not" => {
                tokens.push(Token::Joiner(Joiner::Not));
                continue;
            }
            _ => {}
        }

        let mut matched = false;
        for (text, op) in OPERATORS {
            if let Some(idx) = part.find(text) {
                let field = part[..idx].to_string();
                let value = part[idx + text.len()..].to_string();
                tokens.push(Token::Predicate(Predicate { field, op: *op, value }));
                matched = true;
                break;
            }
        }
        if !matched && !part.is_empty() {
            // Doesn't match any known operator: ignored, matching the
            // reference parser's fallthrough for an unrecognized clause.
        }
    }
    tokens
}

fn is_null_literal(value: &str) -> bool {
    value.eq_ignore_ascii_case("null")
}

fn compare(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

fn like_matches(value: &str, pattern: &str) -> bool {
    let mut regex_str = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => regex_str.push_str(".*"),
            '_' => regex_str.push('.'),
            _ => regex_str.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex_str.push('$');
    regex::Regex::new(&regex_str).map(|re| re.is_match(value)).unwrap_or(false)
}

/// Evaluates a single predicate against a (possibly absent) field value.
/// Absent values propagate as non-matching ("false"), same as SQL's
/// three-valued NULL comparisons, except for explicit null/not-null checks.
pub fn eval_predicate(pred: &Predicate, value: Option<&str>) -> bool {
    match pred.op {
        Op::Eq => {
            if is_null_literal(&pred.value) {
                value.is_none()
            } else {
                value == Some(pred.value.as_str())
            }
        }
        Op::Ne => {
            if is_null_literal(&pred.value) {
                value.is_some()
            } else {
                match value {
                    None => true,
                    Some(v) => v != pred.value,
                }
            }
        }
        Op::Le => value.map(|v| compare(v, &pred.value) != Ordering::Greater).unwrap_or(false),
        Op::Ge => value.map(|v| compare(v, &pred.value) != Ordering::Less).unwrap_or(false),
        Op::Gt => value.map(|v| compare(v, &pred.value) == Ordering::Greater).unwrap_or(false),
        Op::Lt => value.map(|v| compare(v, &pred.value) == Ordering::Less).unwrap_or(false),
        Op::In => value
            .map(|v| pred.value.split(',').any(|elem| elem == v))
            .unwrap_or(false),
        Op::NotIn => value
            .map(|v| !pred.value.split(',').any(|elem| elem == v))
            .unwrap_or(false),
        Op::Like => value.map(|v| like_matches(v, &pred.value)).unwrap_or(false),
        Op::NotLike => value.map(|v| !like_matches(v, &pred.value)).unwrap_or(false),
    }
}

/// Evaluates a full token stream, with `and`/`not` binding tighter than
/// `or` — the same precedence a hand-built SQL `WHERE` clause gives them.
/// Splitting on `or` first and AND-folding each side is what makes
/// `a;and;b;or;c;and;d` mean `(a AND b) OR (c AND d)` rather than folding
/// strictly left to right.
pub fn evaluate(tokens: &[Token], lookup: impl Fn(&str) -> Option<String>) -> bool {
    let mut start = 0;
    let mut matched_any_group = false;
    let mut saw_group = false;
    for (i, token) in tokens.iter().enumerate() {
        if matches!(token, Token::Joiner(Joiner::Or)) {
            saw_group = true;
            if evaluate_and_group(&tokens[start..i], &lookup) {
                matched_any_group = true;
            }
            start = i + 1;
        }
    }
    if evaluate_and_group(&tokens[start..], &lookup) {
        matched_any_group = true;
    }
    let _ = saw_group;
    matched_any_group
}

/// Folds a slice containing no top-level `or` joiner: each predicate is
/// ANDed into the running result, negated first if immediately preceded
/// by `not`.
fn evaluate_and_group(tokens: &[Token], lookup: &impl Fn(&str) -> Option<String>) -> bool {
    let mut result = true;
    let mut negate_next = false;
    for token in tokens {
        match token {
            Token::Joiner(Joiner::Not) => negate_next = true,
            Token::Joiner(_) => {}
            Token::Predicate(p) => {
                let value = lookup(&p.field);
                let mut v = eval_predicate(p, value.as_deref());
                if negate_next {
                    v = !v;
                    negate_next = false;
                }
                result = result && v;
            }
        }
    }
    result
}

/// Parses a `sort` query parameter (`-field` for descending) against a
/// default field used when none is given.
pub fn parse_sort(sort: &str, default: &str) -> (String, bool) {
    let sort = if sort.is_empty() { default } else { sort };
    if let Some(field) = sort.strip_prefix('-') {
        (field.to_string(), true)
    } else {
        (sort.to_string(), false)
    }
}

/// Sorts `rows` in place by a field extracted via `key`, descending when
/// `desc`, with rows missing the field always sorted last.
pub fn sort_by_key<T>(rows: &mut [T], desc: bool, key: impl Fn(&T) -> Option<String>) {
    rows.sort_by(|a, b| {
        let ka = key(a);
        let kb = key(b);
        match (ka, kb) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = compare(&x, &y);
                if desc { ord.reverse() } else { ord }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |field: &str| pairs.iter().find(|(k, _)| *k == field).map(|(_, v)| v.to_string())
    }

    #[test]
    fn operator_order_disambiguates_prefixes() {
        let tokens = parse("id!=5");
        match &tokens[0] {
            Token::Predicate(p) => assert_eq!(p.op, Op::Ne),
            _ => panic!("expected predicate"),
        }
        let tokens = parse("tag!->a,b");
        match &tokens[0] {
            Token::Predicate(p) => {
                assert_eq!(p.op, Op::NotIn);
                assert_eq!(p.value, "a,b");
            }
            _ => panic!("expected predicate"),
        }
    }

    #[test]
    fn implicit_and_between_adjacent_predicates() {
        let tokens = parse("id>=1;username=bob");
        let row = lookup_from(&[("id", "2"), ("username", "bob")]);
        assert!(evaluate(&tokens, row));
        let row = lookup_from(&[("id", "2"), ("username", "alice")]);
        assert!(!evaluate(&tokens, row));
    }

    #[test]
    fn explicit_or_joiner() {
        let tokens = parse("id=1;or;id=2");
        let row = lookup_from(&[("id", "2")]);
        assert!(evaluate(&tokens, row));
    }

    #[test]
    fn null_equality_checks() {
        let tokens = parse("endedAt=null");
        assert!(evaluate(&tokens, |_| None));
        assert!(!evaluate(&tokens, |_| Some("2024-01-01".to_string())));

        let tokens = parse("endedAt!=null");
        assert!(!evaluate(&tokens, |_| None));
        assert!(evaluate(&tokens, |_| Some("2024-01-01".to_string())));
    }

    #[test]
    fn sort_descending_puts_nulls_last() {
        let mut rows = vec![("a", Some("3")), ("b", None), ("c", Some("1"))];
        sort_by_key(&mut rows, true, |(_, v)| v.map(|s| s.to_string()));
        assert_eq!(rows[0].0, "a");
        assert_eq!(rows[2].0, "b");
    }
}
