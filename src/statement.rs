//! Preparing user-typed SQL for execution
//!
//! Ad-hoc SQL arrives as one blob of text. Before it reaches the session it
//! is stripped of comments and split into single statements using the
//! `sqlparser` tokenizer, so `;`, `--` and `/*` inside string literals and
//! quoted identifiers are left alone.

use crate::logging::log_debug;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, Tokenizer, Whitespace};

/// Keywords that start a statement which changes the schema
const SCHEMA_KEYWORDS: [&str; 3] = ["CREATE", "DROP", "ALTER"];

/// True when the statement starts with CREATE, DROP or ALTER.
///
/// This is a prefix heuristic, not a parse: comments must already be
/// stripped, and anything else that happens to begin with one of these
/// words is also reported as schema changing.
pub fn is_schema_changing(sql: &str) -> bool {
    let head = sql.trim_start();
    SCHEMA_KEYWORDS.iter().any(|keyword| {
        head.get(..keyword.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
    })
}

/// Remove `--` and `/* */` comments, keeping everything else verbatim
pub fn strip_comments(sql: &str) -> String {
    match located_tokens(sql) {
        Some(tokens) => {
            let mut out = String::with_capacity(sql.len());
            for (token, text) in tokens {
                match comment_replacement(&token) {
                    Some(replacement) => out.push_str(replacement),
                    None => out.push_str(text),
                }
            }
            out
        }
        None => sql.to_string(),
    }
}

/// Split into trimmed, comment-free, non-empty statements.
///
/// Text the tokenizer rejects (an unterminated literal, say) is returned as
/// one statement so the engine can report the real error.
pub fn split_statements(sql: &str) -> Vec<String> {
    let Some(tokens) = located_tokens(sql) else {
        log_debug("Tokenizer rejected query text, passing it through unsplit");
        let trimmed = sql.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    };

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut boundary = Boundary::default();
    for (token, text) in tokens {
        if token == Token::SemiColon && !boundary.in_trigger_body {
            push_statement(&mut statements, &mut current);
            boundary = Boundary::default();
            continue;
        }
        boundary.observe(&token);
        match comment_replacement(&token) {
            Some(replacement) => current.push_str(replacement),
            None => current.push_str(text),
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

/// Keyword state of the statement being collected.
///
/// A `CREATE TRIGGER` body holds `;`-terminated statements between `BEGIN`
/// and its closing `END`; those semicolons do not end the trigger. `CASE`
/// expressions inside the body have their own `END`.
#[derive(Debug, Default)]
struct Boundary {
    leading: Vec<Keyword>,
    in_trigger_body: bool,
    case_depth: usize,
}

impl Boundary {
    fn observe(&mut self, token: &Token) {
        let Token::Word(word) = token else {
            return;
        };
        if self.leading.len() < 3 {
            self.leading.push(word.keyword);
        }
        if !self.is_trigger() {
            return;
        }
        match word.keyword {
            Keyword::BEGIN => self.in_trigger_body = true,
            Keyword::CASE => self.case_depth += 1,
            Keyword::END if self.case_depth > 0 => self.case_depth -= 1,
            Keyword::END => self.in_trigger_body = false,
            _ => {}
        }
    }

    /// `CREATE [TEMP | TEMPORARY] TRIGGER`
    fn is_trigger(&self) -> bool {
        match self.leading.as_slice() {
            [Keyword::CREATE, Keyword::TRIGGER, ..] => true,
            [Keyword::CREATE, Keyword::TEMP | Keyword::TEMPORARY, Keyword::TRIGGER] => true,
            _ => false,
        }
    }
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

fn comment_replacement(token: &Token) -> Option<&'static str> {
    match token {
        Token::Whitespace(Whitespace::SingleLineComment { .. }) => Some("\n"),
        Token::Whitespace(Whitespace::MultiLineComment(_)) => Some(" "),
        _ => None,
    }
}

/// Tokenize and pair every token with its exact source text.
///
/// A token's text runs from its start to the start of the next token, which
/// covers the input completely because whitespace is tokenized too.
fn located_tokens(sql: &str) -> Option<Vec<(Token, &str)>> {
    let dialect = SQLiteDialect {};
    let tokens = match Tokenizer::new(&dialect, sql).tokenize_with_location() {
        Ok(tokens) => tokens,
        Err(e) => {
            log_debug(&format!("Failed to tokenize query: {}", e));
            return None;
        }
    };

    let line_starts = line_starts(sql);
    let starts: Vec<usize> = tokens
        .iter()
        .map(|t| byte_offset(sql, &line_starts, t.span.start))
        .collect();

    let mut located = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.into_iter().enumerate() {
        let start = starts[i];
        let end = starts.get(i + 1).copied().unwrap_or(sql.len());
        located.push((token.token, sql.get(start..end)?));
    }
    Some(located)
}

fn line_starts(sql: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
    starts
}

/// Convert a 1-based line/column (counted in chars) into a byte offset
fn byte_offset(sql: &str, line_starts: &[usize], location: Location) -> usize {
    let Some(&line_start) = line_starts.get((location.line as usize).saturating_sub(1)) else {
        return sql.len();
    };
    let column = (location.column as usize).saturating_sub(1);
    sql[line_start..]
        .char_indices()
        .nth(column)
        .map_or(sql.len(), |(i, _)| line_start + i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_changing_prefixes() {
        assert!(is_schema_changing("CREATE TABLE t(x)"));
        assert!(is_schema_changing("  DROP TABLE t"));
        assert!(is_schema_changing("alter table t add y"));
        assert!(is_schema_changing("\n\tCreate index i on t(x)"));
        assert!(!is_schema_changing("SELECT * FROM t"));
        assert!(!is_schema_changing("INSERT INTO t VALUES(1)"));
        assert!(!is_schema_changing("-- CREATE comment\nSELECT 1"));
        assert!(!is_schema_changing(""));
    }

    #[test]
    fn test_strip_comments() {
        let sql = "SELECT 1 -- trailing\n/* block */SELECT 2";
        assert_eq!(strip_comments(sql), "SELECT 1 \n SELECT 2");
    }

    #[test]
    fn test_strip_keeps_literals() {
        let sql = "SELECT '-- not a comment', \"/* nor this */\"";
        assert_eq!(strip_comments(sql), sql);
    }

    #[test]
    fn test_split_statements() {
        let sql = "CREATE TABLE t(x);\n INSERT INTO t VALUES (1);;  SELECT * FROM t;";
        assert_eq!(
            split_statements(sql),
            vec!["CREATE TABLE t(x)", "INSERT INTO t VALUES (1)", "SELECT * FROM t"]
        );
    }

    #[test]
    fn test_split_keeps_trigger_body_whole() {
        let trigger = "CREATE TRIGGER trg AFTER INSERT ON t BEGIN \
                       INSERT INTO log VALUES (CASE WHEN new.x > 0 THEN 'pos' ELSE 'neg' END); \
                       DELETE FROM t WHERE x IS NULL; END";
        let sql = format!("CREATE TABLE log(v); {}; SELECT 1", trigger);
        assert_eq!(
            split_statements(&sql),
            vec!["CREATE TABLE log(v)".to_string(), trigger.to_string(), "SELECT 1".to_string()]
        );

        let temp = "create temp trigger t2 before delete on t begin select 1; end";
        assert_eq!(split_statements(&format!("{};", temp)), vec![temp.to_string()]);
    }

    #[test]
    fn test_split_ignores_semicolons_in_literals() {
        let sql = "INSERT INTO t VALUES ('a;b'); SELECT 'it''s'";
        assert_eq!(
            split_statements(sql),
            vec!["INSERT INTO t VALUES ('a;b')", "SELECT 'it''s'"]
        );
    }

    #[test]
    fn test_split_drops_comment_only_statements() {
        let sql = "-- CREATE TABLE nope(x);\nSELECT 1; /* DROP TABLE t; */";
        let statements = split_statements(sql);
        assert_eq!(statements, vec!["SELECT 1"]);
        assert!(!statements.iter().any(|s| is_schema_changing(s)));
    }

    #[test]
    fn test_split_multibyte_text() {
        let sql = "SELECT 'héllo';\nSELECT 'wörld'";
        assert_eq!(split_statements(sql), vec!["SELECT 'héllo'", "SELECT 'wörld'"]);
    }

    #[test]
    fn test_unterminated_literal_passes_through() {
        assert_eq!(split_statements("  SELECT 'oops  "), vec!["SELECT 'oops"]);
        assert!(split_statements("   ").is_empty());
    }
}
