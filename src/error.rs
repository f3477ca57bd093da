//! Crate-wide error type.

use thiserror::Error as ThisError;

/// Result type for pgcodegen operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Parsed fields of a PostgreSQL ErrorResponse/NoticeResponse message.
#[derive(Debug, Clone, Default)]
pub struct ErrorFields {
    pub severity: Option<String>,
    pub severity_non_localized: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub detail: Option<String>,
    pub hint: Option<String>,
    pub position: Option<u32>,
    pub internal_position: Option<u32>,
    pub internal_query: Option<String>,
    pub where_: Option<String>,
    pub schema: Option<String>,
    pub table: Option<String>,
    pub column: Option<String>,
    pub data_type: Option<String>,
    pub constraint: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub routine: Option<String>,
}

impl ErrorFields {
    /// SQLSTATE error code, or empty string if absent.
    pub fn code(&self) -> &str {
        self.code.as_deref().unwrap_or_default()
    }

    /// Primary error message, or empty string if absent.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Non-localized severity, falling back to the localized one.
    pub fn severity(&self) -> &str {
        self.severity_non_localized
            .as_deref()
            .or(self.severity.as_deref())
            .unwrap_or_default()
    }

    /// Detailed error explanation, if the server sent one.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} (SQLSTATE {})", self.severity(), self.message(), self.code())?;
        if let Some(detail) = self.detail() {
            write!(f, "\nDETAIL: {detail}")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {hint}")?;
        }
        Ok(())
    }
}

/// Crate-wide error type.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Could not establish or maintain the TCP connection to the server.
    #[error("connection error: {0}")]
    Connection(String),

    /// Authentication with the server failed (bad password, unsupported mechanism, ...).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Malformed or unexpected wire-protocol data.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server returned an ErrorResponse while describing a query.
    #[error("{file}: query {query:?}: {message}")]
    Query {
        file: String,
        query: String,
        message: String,
        detail: Option<String>,
    },

    /// Reading or parsing an annotated `.sql` file failed.
    #[error("{path}: {message}")]
    File { path: String, message: String },

    /// Invalid configuration (malformed `DATABASE_URL`, missing source directory, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error not otherwise classified above.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a [`Error::Query`] from a server [`ErrorFields`] plus the offending query.
    pub fn from_server(file: impl Into<String>, query: impl Into<String>, fields: &ErrorFields) -> Self {
        Error::Query {
            file: file.into(),
            query: query.into(),
            message: fields.message().to_string(),
            detail: fields.detail().map(str::to_string),
        }
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized> From<zerocopy::error::CastError<Src, Dst>>
    for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}
