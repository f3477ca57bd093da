//! MD5 password authentication (`AuthenticationMD5Password`).

use md5::{Digest, Md5};

/// Compute a PostgreSQL MD5 password hash: `"md5" + md5(md5(password + username) + salt)`.
pub fn md5_password(username: &str, password: &str, salt: &[u8; 4]) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(username.as_bytes());
    let inner_hex = format!("{:x}", hasher.finalize());

    let mut hasher = Md5::new();
    hasher.update(inner_hex.as_bytes());
    hasher.update(salt);
    format!("md5{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_password_has_expected_shape() {
        let result = md5_password("postgres", "password", &[0x01, 0x02, 0x03, 0x04]);
        assert!(result.starts_with("md5"));
        assert_eq!(result.len(), 35);
    }

    #[test]
    fn md5_password_is_deterministic() {
        let a = md5_password("alice", "hunter2", &[9, 8, 7, 6]);
        let b = md5_password("alice", "hunter2", &[9, 8, 7, 6]);
        assert_eq!(a, b);
    }
}
