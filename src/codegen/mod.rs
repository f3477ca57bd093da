//! Deterministic code emission and the target-language keyword table it
//! shares with the SQL parser's name handling.

pub mod emitter;
pub mod keywords;

pub use emitter::{emit, EmittedFile};
