//! Client-side authentication: SCRAM-SHA-256 and MD5 password hashing.
//!
//! The dispatch between cleartext/MD5/SCRAM based on the server's
//! AuthenticationMessage lives in [`crate::conn::Connection::start_up`],
//! driven inline in the connection's startup state rather than through a
//! separate dispatcher type.

pub mod md5;
pub mod scram;
