//! Target-language type resolution for introspected columns and parameters.
//!
//! This crate never decodes a row at runtime — it only decides what Rust type
//! a column or parameter OID should be rendered as in generated code.

pub mod registry;

use crate::protocol::types::Oid;

/// A Rust type a query parameter or result column should be rendered as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetType {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    String,
    Bytes,
    Uuid,
    Date,
    Time,
    Timestamp,
    Json,
    /// `Vec<T>` for a PostgreSQL array type.
    Array(Box<TargetType>),
    /// `Option<T>` wrapper, applied once nullability is resolved.
    Optional(Box<TargetType>),
    /// A PostgreSQL enum type: variants are emitted as a matching Rust enum.
    Enum { name: String, variants: Vec<String> },
    /// An OID this crate has no mapping for; falls back to `String` at emission
    /// time, with the OID kept around so the emitter can log what happened.
    Unknown(Oid),
}

impl TargetType {
    /// Wrap `self` in `Optional` unless it already is one.
    pub fn into_optional(self) -> Self {
        match self {
            TargetType::Optional(_) => self,
            other => TargetType::Optional(Box::new(other)),
        }
    }

    /// The OID table's Rust-facing name, for code generation.
    pub fn rust_name(&self) -> String {
        match self {
            TargetType::Bool => "bool".to_string(),
            TargetType::I16 => "i16".to_string(),
            TargetType::I32 => "i32".to_string(),
            TargetType::I64 => "i64".to_string(),
            TargetType::F32 => "f32".to_string(),
            TargetType::F64 => "f64".to_string(),
            TargetType::String => "String".to_string(),
            TargetType::Bytes => "Vec<u8>".to_string(),
            TargetType::Uuid => "uuid::Uuid".to_string(),
            TargetType::Date => "chrono::NaiveDate".to_string(),
            TargetType::Time => "chrono::NaiveTime".to_string(),
            TargetType::Timestamp => "chrono::NaiveDateTime".to_string(),
            TargetType::Json => "serde_json::Value".to_string(),
            TargetType::Array(inner) => format!("Vec<{}>", inner.rust_name()),
            TargetType::Optional(inner) => format!("Option<{}>", inner.rust_name()),
            TargetType::Enum { name, .. } => name.clone(),
            TargetType::Unknown(_) => "String".to_string(),
        }
    }
}
