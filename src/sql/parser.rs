//! The annotated-`.sql` file parser: splits a file into named queries,
//! extracting doc comments, declared kind, and trimmed SQL body.
//!
//! A small hand-written line-oriented scanner, in the same style as the SASL
//! mechanism-list scan in `protocol::backend::auth`, rather than a
//! parser-combinator crate — this codebase never reaches for one for its
//! own wire-format parsing either.

use crate::codegen::keywords;
use crate::error::{Error, Result};
use crate::sql::model::{Kind, UntypedQuery};

const ANNOTATION_PREFIX: &str = "name:";

/// Parse every query out of one `.sql` file's raw text.
///
/// Falls back to single-query mode (one query per file, name derived from the
/// filename's stem) when no `-- name: ... :kind` annotation is present.
pub fn parse_file(file_path: &str, text: &str) -> Result<Vec<UntypedQuery>> {
    if find_first_annotation(text).is_none() {
        let stem = std::path::Path::new(file_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("query");
        let sql = trim_sql(text);
        if sql.is_empty() {
            return Err(Error::File {
                path: file_path.to_string(),
                message: "file contains no SQL statement".into(),
            });
        }
        return Ok(vec![UntypedQuery {
            name: escape_name(stem),
            file_path: file_path.to_string(),
            sql,
            doc_comment: None,
            declared_kind: None,
            line_offset: 0,
        }]);
    }

    let queries = parse_annotated(file_path, text)?;
    if queries.is_empty() {
        return Err(Error::File {
            path: file_path.to_string(),
            message: "file contains no non-empty query".into(),
        });
    }
    Ok(queries)
}

fn find_first_annotation(text: &str) -> Option<usize> {
    text.lines().position(|line| parse_annotation(line).is_some())
}

struct Annotation {
    name: String,
    kind: Option<Kind>,
}

/// Parse a `-- name: PascalName :kind` line, if `line` is one.
fn parse_annotation(line: &str) -> Option<Annotation> {
    let rest = line.trim().strip_prefix("--")?.trim();
    let rest = rest.strip_prefix(ANNOTATION_PREFIX)?.trim();

    let (name, kind) = match rest.split_once(':') {
        Some((name, kind)) => (name.trim(), Some(kind.trim())),
        None => (rest, None),
    };

    if name.is_empty() {
        return None;
    }

    let kind = match kind {
        Some(k) => Some(Kind::parse(k)?),
        None => None,
    };

    Some(Annotation { name: name.to_string(), kind })
}

fn parse_annotated(file_path: &str, text: &str) -> Result<Vec<UntypedQuery>> {
    struct Block {
        name: String,
        kind: Option<Kind>,
        line_offset: usize,
        doc_lines: Vec<String>,
        sql_lines: Vec<String>,
        seen_sql: bool,
    }

    let mut blocks = Vec::new();
    let mut current: Option<Block> = None;

    for (line_no, line) in text.lines().enumerate() {
        if let Some(annotation) = parse_annotation(line) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            current = Some(Block {
                name: annotation.name,
                kind: annotation.kind,
                line_offset: line_no,
                doc_lines: Vec::new(),
                sql_lines: Vec::new(),
                seen_sql: false,
            });
            continue;
        }

        let Some(block) = current.as_mut() else {
            // Lines before the first annotation are not part of any query.
            continue;
        };

        let trimmed = line.trim();
        if !block.seen_sql {
            if trimmed.is_empty() {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix("--") {
                block.doc_lines.push(comment.trim().to_string());
                continue;
            }
            block.seen_sql = true;
            block.sql_lines.push(line.to_string());
        } else {
            block.sql_lines.push(line.to_string());
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }

    let mut queries = Vec::with_capacity(blocks.len());
    for block in blocks {
        let sql = trim_sql(&block.sql_lines.join("\n"));
        if sql.is_empty() {
            continue;
        }
        let doc_comment = if block.doc_lines.is_empty() {
            None
        } else {
            Some(block.doc_lines.join("\n"))
        };
        queries.push(UntypedQuery {
            name: escape_name(&block.name),
            file_path: file_path.to_string(),
            sql,
            doc_comment,
            declared_kind: block.kind,
            line_offset: block.line_offset,
        });
    }
    Ok(queries)
}

fn trim_sql(sql: &str) -> String {
    sql.trim().trim_end_matches(';').trim().to_string()
}

fn escape_name(name: &str) -> String {
    if keywords::is_reserved(name) {
        keywords::escape(name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_query_fallback_uses_filename_stem() {
        let queries = parse_file("queries/list_users.sql", "SELECT id FROM users;").unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name, "list_users");
        assert_eq!(queries[0].sql, "SELECT id FROM users");
        assert_eq!(queries[0].declared_kind, None);
    }

    #[test]
    fn single_query_fallback_rejects_empty_file() {
        assert!(parse_file("q.sql", "   \n-- just a comment\n").is_err());
    }

    #[test]
    fn three_annotated_blocks_parse_in_file_order() {
        let text = "\
-- name: FindUserById :one
SELECT id, name FROM users WHERE id = $1;

-- name: ListUsers :many
SELECT id, name FROM users;

-- name: DeactivateUser :execrows
UPDATE users SET is_active = false WHERE id = $1;
";
        let queries = parse_file("users.sql", text).unwrap();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].name, "FindUserById");
        assert_eq!(queries[0].declared_kind, Some(Kind::One));
        assert_eq!(queries[0].sql, "SELECT id, name FROM users WHERE id = $1");
        assert_eq!(queries[1].name, "ListUsers");
        assert_eq!(queries[1].declared_kind, Some(Kind::Many));
        assert_eq!(queries[2].name, "DeactivateUser");
        assert_eq!(queries[2].declared_kind, Some(Kind::ExecRows));
    }

    #[test]
    fn doc_comment_lines_accumulate_before_sql() {
        let text = "\
-- name: FindUserById :one
-- Looks up a user by primary key.
-- Returns nothing if not found.
SELECT id FROM users WHERE id = $1;
";
        let queries = parse_file("users.sql", text).unwrap();
        assert_eq!(
            queries[0].doc_comment.as_deref(),
            Some("Looks up a user by primary key.\nReturns nothing if not found.")
        );
    }

    #[test]
    fn annotation_without_kind_leaves_kind_undeclared() {
        let text = "-- name: Adhoc\nSELECT 1;\n";
        let queries = parse_file("q.sql", text).unwrap();
        assert_eq!(queries[0].declared_kind, None);
    }
}
