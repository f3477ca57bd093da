//! Deterministic Rust code emission.
//!
//! The emitted call sites target the same synchronous, unencrypted,
//! single-connection world this crate's own wire client lives in: a plain
//! `postgres::Client`, no async runtime.
//!
//! The emitter is a pure function of its inputs: same [`TypedQuery`] list in,
//! byte-identical files out, which is what makes `pgcodegen check` possible.

use std::collections::BTreeMap;

use crate::codegen::keywords;
use crate::sql::hints::quote_alias_hints;
use crate::sql::model::{Kind, TypedQuery};
use crate::types::TargetType;

/// One file this emitter produced, relative to `--dest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    pub relative_path: String,
    pub contents: String,
}

const HEADER: &str = "// @generated by pgcodegen. DO NOT EDIT.\n";

/// Emit every output file for one run: one file per query group, a shared
/// `helper.rs` carrying enum definitions, and a `mod.rs` re-exporting both.
pub fn emit(queries: &[TypedQuery]) -> Vec<EmittedFile> {
    let mut groups: BTreeMap<String, Vec<&TypedQuery>> = BTreeMap::new();
    for query in queries {
        groups.entry(group_name(&query.file_path)).or_default().push(query);
    }

    let enums = collect_enums(queries);

    let mut files = Vec::with_capacity(groups.len() + 2);
    for (group, group_queries) in &groups {
        files.push(EmittedFile {
            relative_path: format!("{group}.rs"),
            contents: emit_group(group_queries, &enums),
        });
    }
    files.push(EmittedFile {
        relative_path: "helper.rs".to_string(),
        contents: emit_helper(&enums),
    });
    files.push(EmittedFile {
        relative_path: "mod.rs".to_string(),
        contents: emit_root(groups.keys()),
    });
    files
}

fn group_name(file_path: &str) -> String {
    let stem = std::path::Path::new(file_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("queries");
    let sanitized: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if keywords::is_reserved(&sanitized) {
        keywords::escape(&sanitized)
    } else {
        sanitized
    }
}

/// Every distinct enum type referenced by any parameter or column, deduped by
/// name, sorted for determinism.
fn collect_enums(queries: &[TypedQuery]) -> BTreeMap<String, Vec<String>> {
    let mut enums = BTreeMap::new();
    for query in queries {
        for ty in query.params.iter().map(|p| &p.ty).chain(query.columns.iter().map(|c| &c.ty)) {
            collect_enum(ty, &mut enums);
        }
    }
    enums
}

fn collect_enum(ty: &TargetType, enums: &mut BTreeMap<String, Vec<String>>) {
    match ty {
        TargetType::Enum { name, variants } => {
            enums.entry(name.clone()).or_insert_with(|| variants.clone());
        }
        TargetType::Array(inner) | TargetType::Optional(inner) => collect_enum(inner, enums),
        _ => {}
    }
}

fn emit_helper(enums: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from(HEADER);
    out.push_str("//! Enum types shared across generated query modules.\n\n");
    for (name, variants) in enums {
        out.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, postgres_types::ToSql, postgres_types::FromSql)]\n");
        out.push_str(&format!("pub enum {name} {{\n"));
        for variant in variants {
            out.push_str(&format!("    {},\n", rust_variant_name(variant)));
        }
        out.push_str("}\n\n");
    }
    out
}

fn emit_root<'a>(group_names: impl Iterator<Item = &'a String>) -> String {
    let mut out = String::from(HEADER);
    out.push_str("pub mod helper;\n");
    let names: Vec<&String> = group_names.collect();
    for name in &names {
        out.push_str(&format!("pub mod {name};\n"));
    }
    out.push('\n');
    for name in &names {
        out.push_str(&format!("pub use {name}::*;\n"));
    }
    out
}

fn emit_group(queries: &[&TypedQuery], enums: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::from(HEADER);
    out.push_str("use super::helper;\n\n");
    for query in queries {
        out.push_str(&emit_query(query, enums));
        out.push('\n');
    }
    out
}

fn emit_query(query: &TypedQuery, enums: &BTreeMap<String, Vec<String>>) -> String {
    let fn_name = to_snake_case(&query.name);
    let row_name = format!("{}Row", query.name);
    let sql = quote_alias_hints(&query.sql);

    let mut out = String::new();
    if let Some(doc) = &query.doc_comment {
        for line in doc.lines() {
            out.push_str(&format!("/// {line}\n"));
        }
    }

    if !query.columns.is_empty() {
        out.push_str("#[derive(Debug, Clone)]\n");
        out.push_str(&format!("pub struct {row_name} {{\n"));
        for column in &query.columns {
            let field = field_ident(&column.name);
            out.push_str(&format!("    pub {field}: {},\n", rust_type(&column.ty, column.nullable, enums)));
        }
        out.push_str("}\n\n");
    }

    let params: Vec<String> = query
        .params
        .iter()
        .map(|p| format!("{}: {}", field_ident(&p.name), rust_type(&p.ty, false, enums)))
        .collect();
    let param_list = params.join(", ");
    let bind_exprs: Vec<String> = query
        .params
        .iter()
        .map(|p| format!("&{}", field_ident(&p.name)))
        .collect();
    let bind_slice = bind_exprs.join(", ");

    let leading_comma = if param_list.is_empty() { "" } else { ", " };

    out.push_str(&format!(
        "pub const {}_SQL: &str = {:?};\n\n",
        fn_name.to_ascii_uppercase(),
        sql
    ));

    match query.kind {
        Kind::One => {
            out.push_str(&format!(
                "pub fn {fn_name}(client: &mut postgres::Client{leading_comma}{param_list}) -> Result<Option<{row_name}>, postgres::Error> {{\n"
            ));
            out.push_str(&format!(
                "    let row = client.query_opt({}_SQL, &[{bind_slice}])?;\n",
                fn_name.to_ascii_uppercase()
            ));
            out.push_str(&format!("    Ok(row.map(|row| {row_name} {{\n"));
            for (i, column) in query.columns.iter().enumerate() {
                out.push_str(&format!("        {}: row.get({i}),\n", field_ident(&column.name)));
            }
            out.push_str("    }))\n}\n");
        }
        Kind::Many => {
            out.push_str(&format!(
                "pub fn {fn_name}(client: &mut postgres::Client{leading_comma}{param_list}) -> Result<Vec<{row_name}>, postgres::Error> {{\n"
            ));
            out.push_str(&format!(
                "    let rows = client.query({}_SQL, &[{bind_slice}])?;\n",
                fn_name.to_ascii_uppercase()
            ));
            out.push_str(&format!("    Ok(rows.into_iter().map(|row| {row_name} {{\n"));
            for (i, column) in query.columns.iter().enumerate() {
                out.push_str(&format!("        {}: row.get({i}),\n", field_ident(&column.name)));
            }
            out.push_str("    }).collect())\n}\n");
        }
        Kind::Exec => {
            out.push_str(&format!(
                "pub fn {fn_name}(client: &mut postgres::Client{leading_comma}{param_list}) -> Result<(), postgres::Error> {{\n"
            ));
            out.push_str(&format!(
                "    client.execute({}_SQL, &[{bind_slice}])?;\n    Ok(())\n}}\n",
                fn_name.to_ascii_uppercase()
            ));
        }
        Kind::ExecRows => {
            out.push_str(&format!(
                "pub fn {fn_name}(client: &mut postgres::Client{leading_comma}{param_list}) -> Result<u64, postgres::Error> {{\n"
            ));
            out.push_str(&format!(
                "    client.execute({}_SQL, &[{bind_slice}])\n}}\n",
                fn_name.to_ascii_uppercase()
            ));
        }
    }

    out
}

fn rust_type(ty: &TargetType, nullable: bool, enums: &BTreeMap<String, Vec<String>>) -> String {
    let base = rust_type_inner(ty, enums);
    if nullable {
        format!("Option<{base}>")
    } else {
        base
    }
}

fn rust_type_inner(ty: &TargetType, enums: &BTreeMap<String, Vec<String>>) -> String {
    match ty {
        TargetType::Enum { name, .. } if enums.contains_key(name) => format!("helper::{name}"),
        TargetType::Array(inner) => format!("Vec<{}>", rust_type_inner(inner, enums)),
        TargetType::Optional(inner) => format!("Option<{}>", rust_type_inner(inner, enums)),
        other => other.rust_name(),
    }
}

fn field_ident(name: &str) -> String {
    let snake = to_snake_case(name);
    if keywords::is_reserved(&snake) {
        keywords::escape(&snake)
    } else {
        snake
    }
}

fn rust_variant_name(label: &str) -> String {
    let mut out = String::new();
    let mut capitalize_next = true;
    for c in label.chars() {
        if c.is_ascii_alphanumeric() {
            if capitalize_next {
                out.extend(c.to_uppercase());
                capitalize_next = false;
            } else {
                out.push(c);
            }
        } else {
            capitalize_next = true;
        }
    }
    if out.is_empty() {
        "Unnamed".to_string()
    } else {
        out
    }
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_lower = true;
        } else {
            out.push('_');
            prev_lower = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::model::{Column, Param};

    fn sample_query() -> TypedQuery {
        TypedQuery {
            name: "FindUserById".to_string(),
            file_path: "queries/users.sql".to_string(),
            sql: "SELECT id, name FROM users WHERE id = $1".to_string(),
            doc_comment: Some("Looks up a user by id.".to_string()),
            kind: Kind::One,
            params: vec![Param { index: 1, name: "id".to_string(), ty: TargetType::I32 }],
            columns: vec![
                Column { name: "id".to_string(), ty: TargetType::I32, nullable: false, table_oid: 100, column_attr: 1 },
                Column { name: "name".to_string(), ty: TargetType::String, nullable: true, table_oid: 100, column_attr: 2 },
            ],
        }
    }

    #[test]
    fn emit_is_deterministic() {
        let queries = vec![sample_query()];
        let a = emit(&queries);
        let b = emit(&queries);
        assert_eq!(a, b);
    }

    #[test]
    fn emit_produces_group_helper_and_root_files() {
        let queries = vec![sample_query()];
        let files = emit(&queries);
        let paths: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert!(paths.contains(&"users.rs"));
        assert!(paths.contains(&"helper.rs"));
        assert!(paths.contains(&"mod.rs"));
    }

    #[test]
    fn one_kind_emits_option_return_type() {
        let queries = vec![sample_query()];
        let files = emit(&queries);
        let group = files.iter().find(|f| f.relative_path == "users.rs").unwrap();
        assert!(group.contents.contains("Result<Option<FindUserByIdRow>, postgres::Error>"));
        assert!(group.contents.contains("pub name: Option<String>"));
        assert!(group.contents.contains("pub id: i32"));
    }

    #[test]
    fn enum_types_are_deduped_into_helper() {
        let mut q = sample_query();
        q.columns.push(Column {
            name: "status".to_string(),
            ty: TargetType::Enum {
                name: "UserStatus".to_string(),
                variants: vec!["active".to_string(), "banned".to_string()],
            },
            nullable: false,
            table_oid: 100,
            column_attr: 3,
        });
        let files = emit(std::slice::from_ref(&q));
        let helper = files.iter().find(|f| f.relative_path == "helper.rs").unwrap();
        assert!(helper.contents.contains("pub enum UserStatus"));
        assert!(helper.contents.contains("Active"));
        assert!(helper.contents.contains("Banned"));
    }
}
