//! OID → [`TargetType`] mapping, plus per-run caches for catalog lookups.
//!
//! Built on the `protocol::types::oid` constants for the OID values; the caches
//! hold reusable *resolution results* rather than reusable buffers, since this
//! crate's hot path is asking the catalog about the same handful of types over
//! and over across query files.

use std::collections::HashMap;

use crate::protocol::types::{oid, Oid};
use crate::types::TargetType;

/// Map a built-in scalar OID to its target type. Returns `None` for OIDs this
/// table doesn't know about (arrays, enums, domains, and anything else the
/// caller must resolve through the catalog).
pub fn base_type(type_oid: Oid) -> Option<TargetType> {
    Some(match type_oid {
        oid::BOOL => TargetType::Bool,
        oid::INT2 => TargetType::I16,
        oid::INT4 => TargetType::I32,
        oid::INT8 => TargetType::I64,
        oid::FLOAT4 => TargetType::F32,
        oid::FLOAT8 => TargetType::F64,
        oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::NAME | oid::CHAR => TargetType::String,
        oid::BYTEA => TargetType::Bytes,
        oid::UUID => TargetType::Uuid,
        oid::DATE => TargetType::Date,
        oid::TIME | oid::TIMETZ => TargetType::Time,
        oid::TIMESTAMP | oid::TIMESTAMPTZ => TargetType::Timestamp,
        oid::JSON | oid::JSONB => TargetType::Json,
        oid::NUMERIC => TargetType::F64,
        oid::INTERVAL => TargetType::String,
        _ => return None,
    })
}

/// Element OID for the built-in array types PostgreSQL assigns a fixed OID to.
/// Array OIDs for user-defined types are discovered at `typarray` on `pg_type`
/// instead, so this table only needs to cover the built-ins above.
pub fn array_element_oid(array_type_oid: Oid) -> Option<Oid> {
    Some(match array_type_oid {
        1000 => oid::BOOL,
        1005 => oid::INT2,
        1007 => oid::INT4,
        1016 => oid::INT8,
        1021 => oid::FLOAT4,
        1022 => oid::FLOAT8,
        1009 => oid::TEXT,
        1015 => oid::VARCHAR,
        1014 => oid::BPCHAR,
        1001 => oid::BYTEA,
        2951 => oid::UUID,
        1182 => oid::DATE,
        1183 => oid::TIME,
        1185 => oid::TIMESTAMPTZ,
        1115 => oid::TIMESTAMP,
        199 => oid::JSON,
        3807 => oid::JSONB,
        1231 => oid::NUMERIC,
        _ => return None,
    })
}

/// Description of a PostgreSQL enum type, as read from `pg_type`/`pg_enum`.
#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub name: String,
    pub variants: Vec<String>,
}

/// Per-run cache of resolved non-builtin types, keyed by `pg_type.oid`.
///
/// A single invocation of this tool can process hundreds of queries that all
/// reference the same enum or domain; without this cache each would re-issue
/// the same `pg_enum` lookup and could in principle generate a second, subtly
/// different Rust enum for it.
#[derive(Debug, Default)]
pub struct TypeCache {
    resolved: HashMap<Oid, TargetType>,
}

impl TypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_oid: Oid) -> Option<&TargetType> {
        self.resolved.get(&type_oid)
    }

    pub fn put(&mut self, type_oid: Oid, target: TargetType) -> &TargetType {
        self.resolved.entry(type_oid).or_insert(target)
    }
}

/// Per-run cache of `pg_attribute.attnotnull`, keyed by `(table_oid, column_id)`.
#[derive(Debug, Default)]
pub struct NullabilityCache {
    not_null: HashMap<(Oid, i16), bool>,
}

impl NullabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table_oid: Oid, column_id: i16) -> Option<bool> {
        self.not_null.get(&(table_oid, column_id)).copied()
    }

    pub fn put(&mut self, table_oid: Oid, column_id: i16, not_null: bool) {
        self.not_null.insert((table_oid, column_id), not_null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_type_covers_common_scalars() {
        assert_eq!(base_type(oid::INT4), Some(TargetType::I32));
        assert_eq!(base_type(oid::TEXT), Some(TargetType::String));
        assert_eq!(base_type(oid::UUID), Some(TargetType::Uuid));
    }

    #[test]
    fn base_type_unknown_oid_is_none() {
        assert_eq!(base_type(999_999), None);
    }

    #[test]
    fn array_element_oid_maps_int4_array() {
        assert_eq!(array_element_oid(1007), Some(oid::INT4));
    }

    #[test]
    fn type_cache_put_is_idempotent_per_oid() {
        let mut cache = TypeCache::new();
        cache.put(20000, TargetType::I32);
        cache.put(20000, TargetType::String);
        assert_eq!(cache.get(20000), Some(&TargetType::I32));
    }

    #[test]
    fn nullability_cache_roundtrip() {
        let mut cache = NullabilityCache::new();
        assert_eq!(cache.get(16000, 1), None);
        cache.put(16000, 1, true);
        assert_eq!(cache.get(16000, 1), Some(true));
    }
}
