//! The introspector: drives one query's Parse/Describe/Sync round trip,
//! resolves parameter and column types against the catalog, and assembles a
//! [`TypedQuery`].
//!
//! Follows the same "collect until ReadyForQuery" request/response loop shape
//! as `conn::Connection`, generalized from decoding runtime values to
//! resolving target-language types instead.

use tracing::warn;

use crate::conn::Connection;
use crate::error::{Error, Result};
use crate::protocol::types::Oid;
use crate::sql::hints::{quote_alias_hints, recover_param_names};
use crate::sql::model::{Column, Kind, Param, TypedQuery, UntypedQuery};
use crate::types::registry::{array_element_oid, base_type, NullabilityCache, TypeCache};
use crate::types::TargetType;

/// Drives introspection for every query in a run, owning the connection and
/// the per-run type/nullability caches.
pub struct Introspector {
    conn: Connection,
    types: TypeCache,
    nullability: NullabilityCache,
}

impl Introspector {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            types: TypeCache::new(),
            nullability: NullabilityCache::new(),
        }
    }

    /// Introspect one query. A server-side `ErrorResponse` is returned as an
    /// `Err`; callers should keep processing the remaining queries in a file
    /// rather than aborting the whole run.
    pub fn introspect_query(&mut self, query: &UntypedQuery) -> Result<TypedQuery> {
        let rewritten = quote_alias_hints(&query.sql);
        let described = self.conn.describe_query(&rewritten)?;

        let param_names = recover_param_names(&query.sql, described.param_oids.len() as u32);
        let mut params = Vec::with_capacity(described.param_oids.len());
        for (i, oid) in described.param_oids.iter().enumerate() {
            let ty = self.resolve_type(*oid)?;
            params.push(Param {
                index: i as u32 + 1,
                name: param_names[i].clone(),
                ty,
            });
        }

        let mut columns = Vec::with_capacity(described.columns.len());
        for field in &described.columns {
            let base_ty = self.resolve_type(field.type_oid)?;
            let (name, nullable) = self.resolve_column_nullability(
                &field.name,
                base_ty.clone(),
                field.table_oid,
                field.column_id,
            )?;
            columns.push(Column {
                name,
                ty: base_ty,
                nullable,
                table_oid: field.table_oid,
                column_attr: field.column_id,
            });
        }

        let kind = match query.declared_kind {
            Some(Kind::ExecRows) if !columns.is_empty() => {
                warn!(
                    query = query.name,
                    "query declared :execrows but returns columns; dropping columns"
                );
                columns.clear();
                Kind::ExecRows
            }
            declared => TypedQuery::resolve_kind(declared, !columns.is_empty()),
        };

        Ok(TypedQuery {
            name: query.name.clone(),
            file_path: query.file_path.clone(),
            sql: query.sql.clone(),
            doc_comment: query.doc_comment.clone(),
            kind,
            params,
            columns,
        })
    }

    /// Determine nullability: hint suffix wins, else the
    /// `pg_attribute.attnotnull` catalog for a real table column, else assume
    /// nullable. Returns the field name with any hint suffix stripped.
    fn resolve_column_nullability(
        &mut self,
        field_name: &str,
        _ty: TargetType,
        table_oid: Oid,
        column_attr: i16,
    ) -> Result<(String, bool)> {
        if let Some(stripped) = field_name.strip_suffix('!') {
            return Ok((stripped.to_string(), false));
        }
        if let Some(stripped) = field_name.strip_suffix('?') {
            return Ok((stripped.to_string(), true));
        }

        if table_oid != 0 && column_attr > 0 {
            if let Some(not_null) = self.nullability.get(table_oid, column_attr) {
                return Ok((field_name.to_string(), !not_null));
            }
            let not_null = self.query_attnotnull(table_oid, column_attr)?;
            self.nullability.put(table_oid, column_attr, not_null);
            return Ok((field_name.to_string(), !not_null));
        }

        Ok((field_name.to_string(), true))
    }

    fn query_attnotnull(&mut self, table_oid: Oid, column_attr: i16) -> Result<bool> {
        let sql = format!(
            "SELECT attnotnull FROM pg_attribute WHERE attrelid = {table_oid} AND attnum = {column_attr}"
        );
        let result = self.conn.simple_query(&sql)?;
        let Some(row) = result.rows.first() else {
            return Ok(false);
        };
        let Some(Some(bytes)) = row.first() else {
            return Ok(false);
        };
        Ok(std::str::from_utf8(bytes).unwrap_or("f") == "t")
    }

    /// Resolve `type_oid` to a [`TargetType`], consulting the per-run cache
    /// first, then the built-in OID table, then the `pg_type`/`pg_enum`
    /// catalog for arrays, domains, and enums the built-in table doesn't know.
    fn resolve_type(&mut self, type_oid: Oid) -> Result<TargetType> {
        if let Some(ty) = self.types.get(type_oid) {
            return Ok(ty.clone());
        }
        if let Some(ty) = base_type(type_oid) {
            return Ok(self.types.put(type_oid, ty).clone());
        }
        if let Some(elem_oid) = array_element_oid(type_oid) {
            let elem = self.resolve_type(elem_oid)?;
            return Ok(self.types.put(type_oid, TargetType::Array(Box::new(elem))).clone());
        }

        let ty = self.resolve_type_from_catalog(type_oid)?;
        Ok(self.types.put(type_oid, ty).clone())
    }

    fn resolve_type_from_catalog(&mut self, type_oid: Oid) -> Result<TargetType> {
        let sql = format!(
            "SELECT typtype, typelem, typbasetype, typname FROM pg_type WHERE oid = {type_oid}"
        );
        let result = self.conn.simple_query(&sql)?;
        let Some(row) = result.rows.first() else {
            return Ok(TargetType::Unknown(type_oid));
        };

        let typtype = text_column(row, 0);
        let typelem: Oid = text_column(row, 1).and_then(|s| s.parse().ok()).unwrap_or(0);
        let typbasetype: Oid = text_column(row, 2).and_then(|s| s.parse().ok()).unwrap_or(0);
        let typname = text_column(row, 3).unwrap_or_default();

        match typtype.as_deref() {
            Some("e") => {
                let variants = self.query_enum_variants(type_oid)?;
                Ok(TargetType::Enum { name: typname, variants })
            }
            Some("d") if typbasetype != 0 => self.resolve_type(typbasetype),
            _ if typelem != 0 => {
                let elem = self.resolve_type(typelem)?;
                Ok(TargetType::Array(Box::new(elem)))
            }
            _ => Ok(TargetType::Unknown(type_oid)),
        }
    }

    fn query_enum_variants(&mut self, type_oid: Oid) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT enumlabel FROM pg_enum WHERE enumtypid = {type_oid} ORDER BY enumsortorder"
        );
        let result = self.conn.simple_query(&sql)?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| text_column(row, 0))
            .collect())
    }
}

fn text_column(row: &[Option<Vec<u8>>], index: usize) -> Option<String> {
    row.get(index)?
        .as_ref()
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// Introspect every query recovered from one `.sql` file, surfacing each
/// query's error independently so one broken query doesn't block the rest.
pub fn introspect_file(
    introspector: &mut Introspector,
    queries: Vec<UntypedQuery>,
) -> (Vec<TypedQuery>, Vec<Error>) {
    let mut typed = Vec::with_capacity(queries.len());
    let mut errors = Vec::new();
    for query in queries {
        match introspector.introspect_query(&query) {
            Ok(tq) => typed.push(tq),
            Err(err) => errors.push(err),
        }
    }
    (typed, errors)
}
