//! Compile-time typed call-site generator for annotated `.sql` files.
//!
//! Given a directory of `.sql` files carrying `-- name: ... :kind` annotations and a
//! live PostgreSQL connection, this crate introspects each query over the wire
//! protocol (Parse/Describe/Sync, no execution) and emits a deterministic Rust
//! module of typed call sites for it.
//!
//! # Example
//!
//! ```no_run
//! use pgcodegen::config::DatabaseUrl;
//! use pgcodegen::conn::Connection;
//! use pgcodegen::introspect::{introspect_file, Introspector};
//! use pgcodegen::sql;
//!
//! fn main() -> pgcodegen::Result<()> {
//!     let url = DatabaseUrl::resolve(None)?;
//!     let conn = Connection::connect(&url)?;
//!     let mut introspector = Introspector::new(conn);
//!
//!     let text = std::fs::read_to_string("queries/users.sql").unwrap();
//!     let queries = sql::parse_file("queries/users.sql", &text)?;
//!     let (typed, errors) = introspect_file(&mut introspector, queries);
//!     println!("{} queries introspected, {} failed", typed.len(), errors.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod codegen;
pub mod conn;
pub mod config;
pub mod discovery;
pub mod error;
pub mod introspect;
pub mod protocol;
pub mod sql;
pub mod types;

pub use error::{Error, Result};
