//! Authentication response messages.
//!
//! The SCRAM-SHA-256 and MD5 password math live in [`crate::auth`]; this module only
//! encodes the wire messages that carry their output.

use crate::protocol::codec::MessageBuilder;

/// Write a PasswordMessage (cleartext or MD5 hashed password).
pub fn write_password(buf: &mut Vec<u8>, password: &str) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
    msg.write_cstr(password);
    msg.finish();
}

/// Write a SASLInitialResponse message.
///
/// mechanism: SASL mechanism name (e.g., "SCRAM-SHA-256")
/// initial_response: Client-first-message for SCRAM
pub fn write_sasl_initial_response(buf: &mut Vec<u8>, mechanism: &str, initial_response: &[u8]) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
    msg.write_cstr(mechanism);
    msg.write_i32(initial_response.len() as i32);
    msg.write_bytes(initial_response);
    msg.finish();
}

/// Write a SASLResponse message.
///
/// response: Client-final-message for SCRAM
pub fn write_sasl_response(buf: &mut Vec<u8>, response: &[u8]) {
    let mut msg = MessageBuilder::new(buf, super::msg_type::PASSWORD);
    msg.write_bytes(response);
    msg.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_message() {
        let mut buf = Vec::new();
        write_password(&mut buf, "secret");

        assert_eq!(buf[0], b'p');
        assert!(buf.ends_with(&[0]));
    }

    #[test]
    fn test_sasl_initial_response() {
        let mut buf = Vec::new();
        write_sasl_initial_response(&mut buf, "SCRAM-SHA-256", b"n,,n=,r=abc");

        assert_eq!(buf[0], b'p');
        let (name, rest) = crate::protocol::codec::read_cstr(&buf[5..]).unwrap();
        assert_eq!(name, "SCRAM-SHA-256");
        let (ir_len, rest) = crate::protocol::codec::read_i32(rest).unwrap();
        assert_eq!(ir_len as usize, rest.len());
    }
}
