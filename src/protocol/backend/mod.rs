//! PostgreSQL backend (server → client) messages.

pub mod auth;
pub mod error;
pub mod extended;
pub mod query;

pub use auth::{AuthenticationMessage, BackendKeyData, ParameterStatus, ReadyForQuery};
pub use error::{ErrorResponse, NoticeResponse};
pub use extended::{CloseComplete, NoData, ParameterDescription, ParseComplete};
pub use query::{DataRow, RowDescription};

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// NotificationResponse
    pub const NOTIFICATION_RESPONSE: u8 = b'A';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// NegotiateProtocolVersion
    pub const NEGOTIATE_PROTOCOL_VERSION: u8 = b'v';
}

/// Raw message from the PostgreSQL server.
///
/// Thin wrapper around the message type byte and payload; individual message
/// types are parsed on demand from it.
#[derive(Debug, Clone, Copy)]
pub struct RawMessage<'a> {
    /// Message type byte
    pub type_byte: u8,
    /// Message payload (after length field)
    pub payload: &'a [u8],
}

impl<'a> RawMessage<'a> {
    /// Create a new RawMessage.
    pub fn new(type_byte: u8, payload: &'a [u8]) -> Self {
        Self { type_byte, payload }
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        self.type_byte == msg_type::ERROR_RESPONSE
    }

    /// Check if this is a notice response.
    pub fn is_notice(&self) -> bool {
        self.type_byte == msg_type::NOTICE_RESPONSE
    }

    /// Check if this is a parameter status message.
    pub fn is_parameter_status(&self) -> bool {
        self.type_byte == msg_type::PARAMETER_STATUS
    }

    /// Check if this is an async message (can arrive at any time).
    pub fn is_async(&self) -> bool {
        Self::is_async_type(self.type_byte)
    }

    /// Check if a type byte represents an async message (can arrive at any time).
    pub fn is_async_type(type_byte: u8) -> bool {
        matches!(
            type_byte,
            msg_type::NOTICE_RESPONSE
                | msg_type::NOTIFICATION_RESPONSE
                | msg_type::PARAMETER_STATUS
        )
    }
}

/// Read one frame off the front of `buf`.
///
/// Returns `Ok(Some((RawMessage, consumed)))` when a full message is present,
/// `Ok(None)` when more bytes are needed, or an error on a malformed length.
pub fn read_message(buf: &[u8]) -> crate::error::Result<Option<(RawMessage<'_>, usize)>> {
    if buf.is_empty() {
        return Ok(None);
    }
    let type_byte = buf[0];
    if buf.len() < 5 {
        return Ok(None);
    }
    let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
    if len < 4 {
        return Err(crate::error::Error::Protocol(format!(
            "read_message: invalid length {len}"
        )));
    }
    let total = 1 + len as usize;
    if buf.len() < total {
        return Ok(None);
    }
    let payload = &buf[5..total];
    Ok(Some((RawMessage::new(type_byte, payload), total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_message_needs_more_data_on_short_header() {
        assert!(read_message(&[]).unwrap().is_none());
        assert!(read_message(&[b'Z', 0, 0]).unwrap().is_none());
    }

    #[test]
    fn read_message_needs_more_data_on_short_payload() {
        // type byte + length=9 (5 payload bytes) but only 2 supplied
        let buf = [b'Z', 0, 0, 0, 9, 1, 2];
        assert!(read_message(&buf).unwrap().is_none());
    }

    #[test]
    fn read_message_parses_complete_frame() {
        let buf = [b'Z', 0, 0, 0, 5, b'I'];
        let (msg, consumed) = read_message(&buf).unwrap().unwrap();
        assert_eq!(consumed, 6);
        assert_eq!(msg.type_byte, b'Z');
        assert_eq!(msg.payload, &[b'I']);
    }
}
