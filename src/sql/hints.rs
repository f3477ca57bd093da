//! Hint tokenizer and parameter-name recovery.
//!
//! A small hand-rolled character scanner, in the same style as this crate's
//! wire-format readers — no SQL-parsing crate is pulled in, since both passes
//! only need to recognize a handful of local syntactic shapes, not parse SQL
//! in general.

const RESERVED_WORDS: &[&str] = &[
    "and", "or", "not", "is", "in", "like", "set", "where", "having", "on", "then", "when", "else",
    "null",
];

/// Quote bare `ident!`/`ident?` alias hints as `"ident!"`/`"ident?"`, so
/// PostgreSQL accepts them as (quoted) column aliases. String literals and
/// already-quoted identifiers are left untouched.
pub fn quote_alias_hints(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            '\'' => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if bytes.get(i + 1) == Some(&b'\'') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                out.push_str(&sql[start..i]);
            }
            '"' => {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'"' {
                        if bytes.get(i + 1) == Some(&b'"') {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                out.push_str(&sql[start..i]);
            }
            c if is_ident_start(c) => {
                let start = i;
                i += 1;
                while i < bytes.len() && is_ident_continue(bytes[i] as char) {
                    i += 1;
                }
                let ident = &sql[start..i];
                if matches!(bytes.get(i), Some(b'!') | Some(b'?')) {
                    let suffix = bytes[i] as char;
                    i += 1;
                    out.push('"');
                    out.push_str(ident);
                    out.push(suffix);
                    out.push('"');
                } else {
                    out.push_str(ident);
                }
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Recover a plausible name for each `$1..$param_count` placeholder.
///
/// Falls back to `param_N` (1-based) wherever no name could be recovered.
pub fn recover_param_names(sql: &str, param_count: u32) -> Vec<String> {
    let mut names: Vec<Option<String>> = vec![None; param_count as usize];

    recover_from_insert_values(sql, &mut names);
    recover_from_backward_scan(sql, &mut names);
    recover_from_limit_offset(sql, &mut names);

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| name.unwrap_or_else(|| format!("param_{}", i + 1)))
        .collect()
}

/// Positional match: `INSERT INTO t (a, b, c) VALUES ($1, $2, $3)`.
fn recover_from_insert_values(sql: &str, names: &mut [Option<String>]) {
    let lower = sql.to_ascii_lowercase();
    let Some(insert_pos) = lower.find("insert") else { return };
    let Some(columns_start) = sql[insert_pos..].find('(').map(|p| insert_pos + p + 1) else {
        return;
    };
    let Some(columns_end_rel) = sql[columns_start..].find(')') else { return };
    let columns_end = columns_start + columns_end_rel;
    let columns: Vec<&str> = sql[columns_start..columns_end]
        .split(',')
        .map(|s| s.trim().trim_matches('"'))
        .collect();
    if columns.len() > 64 {
        return;
    }

    let Some(values_pos) = lower[columns_end..].find("values").map(|p| columns_end + p) else {
        return;
    };

    for (placeholder_idx, col_name) in columns.iter().enumerate() {
        let placeholder = format!("${}", placeholder_idx + 1);
        if sql[values_pos..].contains(&placeholder) && placeholder_idx < names.len() {
            names[placeholder_idx] = Some(col_name.to_string());
        }
    }
}

/// Backward scan: from each `$N`, skip at most one binary operator token and
/// take the identifier before it, e.g. `email = $2` -> `email`.
fn recover_from_backward_scan(sql: &str, names: &mut [Option<String>]) {
    let bytes = sql.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut j = start;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j > start {
                if let Ok(idx) = sql[start..j].parse::<usize>() {
                    if idx >= 1 && idx <= names.len() && names[idx - 1].is_none() {
                        if let Some(name) = scan_identifier_before(sql, i) {
                            names[idx - 1] = Some(name);
                        }
                    }
                }
            }
            i = j;
        } else {
            i += 1;
        }
    }
}

fn scan_identifier_before(sql: &str, placeholder_start: usize) -> Option<String> {
    let bytes = sql.as_bytes();
    let mut i = placeholder_start;

    let skip_ws = |i: &mut usize| {
        while *i > 0 && (bytes[*i - 1] as char).is_whitespace() {
            *i -= 1;
        }
    };

    skip_ws(&mut i);
    // Skip at most one run of operator characters (=, <, >, !, <>, etc).
    let op_chars = "=<>!";
    let op_end = i;
    while i > 0 && op_chars.contains(bytes[i - 1] as char) {
        i -= 1;
    }
    if i == op_end {
        return None;
    }
    skip_ws(&mut i);

    let ident_end = i;
    while i > 0 && is_ident_continue(bytes[i - 1] as char) {
        i -= 1;
    }
    if i == ident_end {
        return None;
    }
    let ident = &sql[i..ident_end];
    if ident.is_empty() || ident.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    if RESERVED_WORDS.contains(&ident.to_ascii_lowercase().as_str()) {
        return None;
    }
    // Strip table-qualification, e.g. `users.id` -> `id`.
    let name = ident.rsplit('.').next().unwrap_or(ident);
    Some(name.to_string())
}

/// `LIMIT $N` / `OFFSET $N` fallback, for placeholders the scans above missed.
fn recover_from_limit_offset(sql: &str, names: &mut [Option<String>]) {
    let lower = sql.to_ascii_lowercase();
    for (keyword, name) in [("limit", "limit"), ("offset", "offset")] {
        let mut search_from = 0;
        while let Some(rel) = lower[search_from..].find(keyword) {
            let pos = search_from + rel;
            let after = pos + keyword.len();
            if let Some(idx) = parse_placeholder_after(sql, after) {
                if idx >= 1 && idx <= names.len() && names[idx - 1].is_none() {
                    names[idx - 1] = Some(name.to_string());
                }
            }
            search_from = after;
        }
    }
}

fn parse_placeholder_after(sql: &str, mut pos: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    while pos < bytes.len() && (bytes[pos] as char).is_whitespace() {
        pos += 1;
    }
    if bytes.get(pos) != Some(&b'$') {
        return None;
    }
    let start = pos + 1;
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    sql[start..end].parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_alias_hints_quotes_bare_suffixed_alias() {
        let out = quote_alias_hints("SELECT COUNT(*) AS total!, name FROM t");
        assert_eq!(out, "SELECT COUNT(*) AS \"total!\", name FROM t");
    }

    #[test]
    fn quote_alias_hints_leaves_string_literals_untouched() {
        let out = quote_alias_hints("SELECT 'hello!' FROM t");
        assert_eq!(out, "SELECT 'hello!' FROM t");
    }

    #[test]
    fn quote_alias_hints_leaves_already_quoted_identifiers_untouched() {
        let out = quote_alias_hints("SELECT \"total!\" FROM t");
        assert_eq!(out, "SELECT \"total!\" FROM t");
    }

    #[test]
    fn recover_param_names_backward_scan_for_update() {
        let names = recover_param_names("UPDATE users SET email = $2 WHERE id = $1", 2);
        assert_eq!(names, vec!["id".to_string(), "email".to_string()]);
    }

    #[test]
    fn recover_param_names_insert_values_positional() {
        let names = recover_param_names(
            "INSERT INTO users (name, email, bio) VALUES ($1, $2, $3)",
            3,
        );
        assert_eq!(
            names,
            vec!["name".to_string(), "email".to_string(), "bio".to_string()]
        );
    }

    #[test]
    fn recover_param_names_insert_values_stops_at_64_columns() {
        let columns: Vec<String> = (1..=65).map(|i| format!("c{i}")).collect();
        let placeholders: Vec<String> = (1..=65).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO t ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );
        let names = recover_param_names(&sql, 65);
        let expected: Vec<String> = (1..=65).map(|i| format!("param_{i}")).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn recover_param_names_limit_offset_fallback() {
        let names = recover_param_names("SELECT * FROM users LIMIT $1 OFFSET $2", 2);
        assert_eq!(names, vec!["limit".to_string(), "offset".to_string()]);
    }

    #[test]
    fn recover_param_names_defaults_to_param_n() {
        let names = recover_param_names("SELECT $1 + $2", 2);
        assert_eq!(names, vec!["param_1".to_string(), "param_2".to_string()]);
    }

    #[test]
    fn recover_param_names_rejects_reserved_keywords() {
        let names = recover_param_names("SELECT * FROM t WHERE active IS NOT $1", 1);
        assert_eq!(names, vec!["param_1".to_string()]);
    }
}
