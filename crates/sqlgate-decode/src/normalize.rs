//! Cosmetic cleanup and canonical comparison forms for SQL strings.

use std::sync::LazyLock;

use regex::Regex;

/// Keywords re-capitalized by [`clean`].
pub const KEYWORDS: [&str; 30] = [
    "SELECT", "FROM", "WHERE", "GROUP", "BY", "HAVING", "ORDER", "LIMIT", "JOIN", "INNER", "LEFT",
    "RIGHT", "OUTER", "ON", "AS", "AND", "OR", "NOT", "IN", "LIKE", "BETWEEN", "IS", "NULL",
    "COUNT", "SUM", "AVG", "MIN", "MAX", "DISTINCT", "ALL",
];

static KEYWORD: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let alternation = KEYWORDS.join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).ok()
});

/// Keywords written like function calls, `COUNT(*)`.
const CALL_KEYWORDS: [&str; 5] = ["COUNT", "SUM", "AVG", "MIN", "MAX"];

static WORD_PAREN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(\w+)\s*\(").ok());
static COMMA: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s*,\s*").ok());
static OPEN_PAREN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\(\s+").ok());
static CLOSE_PAREN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+\)").ok());
static OPERATOR: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\s*(<=|>=|!=|<>|[,()=<>])\s*").ok());

/// Tidy a freshly generated candidate.
///
/// Collapses whitespace, upper-cases [`KEYWORDS`] outside string literals,
/// and writes `a, b`, `(x)` around commas and parentheses. Literal contents
/// are left as generated.
pub fn clean(sql: &str) -> String {
    if sql.is_empty() {
        return String::new();
    }

    let collapsed = collapse_whitespace(sql);
    let mut out = String::with_capacity(collapsed.len());
    for (is_literal, segment) in split_literals(&collapsed) {
        if is_literal {
            out.push_str(segment);
        } else {
            out.push_str(&tidy_code(segment));
        }
    }

    collapse_whitespace(&out)
}

/// Canonical form used for exact-match comparison.
///
/// Lower-cases everything, collapses whitespace, turns `"` into `'` and drops
/// spaces around `, ( ) = < > <= >= != <>`. Idempotent.
pub fn normalize(sql: &str) -> String {
    if sql.is_empty() {
        return String::new();
    }

    let lowered = collapse_whitespace(&sql.to_lowercase()).replace('"', "'");
    let stripped = match OPERATOR.as_ref() {
        Some(re) => re.replace_all(&lowered, "$1").into_owned(),
        None => lowered,
    };
    stripped.trim().to_string()
}

/// Whether two queries are equal after [`normalize`].
pub fn exact_match(predicted: &str, gold: &str) -> bool {
    normalize(predicted) == normalize(gold)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn tidy_code(code: &str) -> String {
    let mut code = match KEYWORD.as_ref() {
        Some(re) => re
            .replace_all(code, |caps: &regex::Captures<'_>| caps[0].to_uppercase())
            .into_owned(),
        None => code.to_string(),
    };
    if let Some(re) = WORD_PAREN.as_ref() {
        code = re.replace_all(&code, attach_paren).into_owned();
    }
    if let Some(re) = COMMA.as_ref() {
        code = re.replace_all(&code, ", ").into_owned();
    }
    if let Some(re) = OPEN_PAREN.as_ref() {
        code = re.replace_all(&code, "(").into_owned();
    }
    if let Some(re) = CLOSE_PAREN.as_ref() {
        code = re.replace_all(&code, ")").into_owned();
    }
    code
}

/// Function names and identifiers take `(` directly; clause keywords such
/// as `IN` or `FROM` keep one space before it.
fn attach_paren(caps: &regex::Captures<'_>) -> String {
    let word = &caps[1];
    let is_keyword = |k: &&str| k.eq_ignore_ascii_case(word);
    if KEYWORDS.iter().any(is_keyword) && !CALL_KEYWORDS.iter().any(is_keyword) {
        format!("{word} (")
    } else {
        format!("{word}(")
    }
}

/// Split `sql` into `(is_literal, text)` runs. Quoted runs keep their quotes;
/// a doubled quote inside a literal does not close it, and an unterminated
/// literal runs to the end.
fn split_literals(sql: &str) -> Vec<(bool, &str)> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut chars = sql.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '\'' && ch != '"' {
            continue;
        }
        if idx > start {
            segments.push((false, &sql[start..idx]));
        }

        let quote = ch;
        let mut end = sql.len();
        while let Some((inner_idx, inner)) = chars.next() {
            if inner != quote {
                continue;
            }
            if chars.peek().is_some_and(|(_, next)| *next == quote) {
                chars.next();
                continue;
            }
            end = inner_idx + inner.len_utf8();
            break;
        }

        segments.push((true, &sql[idx..end]));
        start = end;
    }

    if start < sql.len() {
        segments.push((false, &sql[start..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_capitalizes_keywords_and_collapses_space() {
        assert_eq!(
            clean("select  name ,age from   student where age > 3"),
            "SELECT name, age FROM student WHERE age > 3"
        );
    }

    #[test]
    fn clean_tightens_parentheses() {
        assert_eq!(
            clean("select count( * ) from t group by a order by count ( * ) desc"),
            "SELECT COUNT(*) FROM t GROUP BY a ORDER BY COUNT(*) desc"
        );
    }

    #[test]
    fn clean_gives_one_spelling_for_calls_and_clause_parens() {
        assert_eq!(clean("select count (*) from t"), clean("select count(*) from t"));
        assert_eq!(clean("select lower (name) from t"), "SELECT lower(name) FROM t");
        assert_eq!(
            clean("select a from t where b in(1,2) and c not in (select d from u)"),
            "SELECT a FROM t WHERE b IN (1, 2) AND c NOT IN (SELECT d FROM u)"
        );
        assert_eq!(
            clean("select max ( x ) from(select x from t)"),
            "SELECT MAX(x) FROM (SELECT x FROM t)"
        );
    }

    #[test]
    fn clean_leaves_literals_alone() {
        assert_eq!(
            clean("select a from t where b = 'all in , one'"),
            "SELECT a FROM t WHERE b = 'all in , one'"
        );
        assert_eq!(
            clean("select a from t where b = 'it''s' and c = 1"),
            "SELECT a FROM t WHERE b = 'it''s' AND c = 1"
        );
    }

    #[test]
    fn clean_does_not_touch_identifier_substrings() {
        assert_eq!(clean("select fromage, inner_id from t"), "SELECT fromage, inner_id FROM t");
    }

    #[test]
    fn clean_handles_unterminated_literal() {
        assert_eq!(clean("select a from t where b = 'open"), "SELECT a FROM t WHERE b = 'open");
    }

    #[test]
    fn empty_input_is_returned_unchanged() {
        assert_eq!(clean(""), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn normalize_ignores_case_and_spacing() {
        assert_eq!(normalize("SELECT * FROM T"), normalize("select  *   from t"));
        assert_eq!(normalize("SELECT * FROM T"), "select * from t");
    }

    #[test]
    fn normalize_strips_space_around_operators_and_unifies_quotes() {
        assert_eq!(
            normalize("SELECT a , b FROM t WHERE c <= 3 AND d = \"x\" AND e < > 1"),
            "select a,b from t where c<=3 and d='x' and e<>1"
        );
        assert_eq!(normalize("count ( * )"), "count(*)");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "SELECT  a , b FROM t WHERE x >= 1",
            "  select count( * ) from \"T\"  ",
            "SELECT a FROM t WHERE b != 'q' OR c <> 2",
            "select\ta\nfrom t",
            "",
            "   ",
            "(( ))",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "{sample:?}");
        }
    }

    #[test]
    fn exact_match_compares_normalized_forms() {
        assert!(exact_match("SELECT name FROM student", "select name  from STUDENT"));
        assert!(!exact_match("SELECT name FROM student", "SELECT age FROM student"));
    }
}
