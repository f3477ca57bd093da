//! The query data model: [`UntypedQuery`] as recovered from a `.sql` file,
//! [`TypedQuery`] once the introspector has resolved parameters and columns.
//!
//! Shaped directly from the data model this tool's annotated-`.sql` format
//! calls for.

use crate::types::TargetType;

/// The call shape an author declares (or this tool infers) for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Exactly zero or one row expected.
    One,
    /// Zero or more rows expected.
    Many,
    /// No result rows, no row count reported back.
    Exec,
    /// No result rows, but the number of affected rows is reported back.
    ExecRows,
}

impl Kind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "one" => Some(Kind::One),
            "many" => Some(Kind::Many),
            "exec" => Some(Kind::Exec),
            "execrows" => Some(Kind::ExecRows),
            _ => None,
        }
    }
}

/// One query as recovered from a `.sql` file, before introspection.
#[derive(Debug, Clone)]
pub struct UntypedQuery {
    pub name: String,
    pub file_path: String,
    pub sql: String,
    pub doc_comment: Option<String>,
    pub declared_kind: Option<Kind>,
    /// 0-based line the query's `name:` annotation (or file start) occurs at.
    pub line_offset: usize,
}

/// A query parameter, as recovered from context or a `param_N` fallback.
#[derive(Debug, Clone)]
pub struct Param {
    /// 1-based index, matching `$1..$N` in the SQL.
    pub index: u32,
    pub name: String,
    pub ty: TargetType,
}

/// A result-row column.
#[derive(Debug, Clone)]
pub struct Column {
    /// Name with any `!`/`?` hint suffix already stripped.
    pub name: String,
    pub ty: TargetType,
    pub nullable: bool,
    /// 0 means the column is a computed expression, not a direct table reference.
    pub table_oid: u32,
    /// `<= 0` means a computed expression.
    pub column_attr: i16,
}

/// A fully introspected query, ready for code emission.
#[derive(Debug, Clone)]
pub struct TypedQuery {
    pub name: String,
    pub file_path: String,
    pub sql: String,
    pub doc_comment: Option<String>,
    pub kind: Kind,
    pub params: Vec<Param>,
    pub columns: Vec<Column>,
}

impl TypedQuery {
    /// Determine the concrete kind: the declared kind if present,
    /// otherwise `many` when there are result columns, else `exec`.
    /// `execrows` with non-empty columns is accepted but the columns are
    /// dropped by the caller with a warning — see [`crate::introspect`].
    pub fn resolve_kind(declared: Option<Kind>, has_columns: bool) -> Kind {
        declared.unwrap_or(if has_columns { Kind::Many } else { Kind::Exec })
    }
}
