//! services/api/src/adapters/token_cipher.rs
//!
//! Symmetric authenticated encryption for refresh tokens at rest (Fernet).

use crate::config::ConfigError;
use fernet::Fernet;
use idea_farm_core::ports::{PortError, PortResult};
use secrecy::SecretString;

/// Encrypts and decrypts offline-access tokens with the process-wide key.
pub struct TokenCipher {
    fernet: Fernet,
}

impl TokenCipher {
    /// Builds the cipher from a url-safe base64 Fernet key.
    ///
    /// A malformed key is a configuration error: the service must not start without it.
    pub fn new(key: &str) -> Result<Self, ConfigError> {
        let fernet = Fernet::new(key.trim()).ok_or_else(|| {
            ConfigError::InvalidValue(
                "FERNET_KEY".to_string(),
                "expected a 32-byte url-safe base64 key".to_string(),
            )
        })?;
        Ok(Self { fernet })
    }

    pub fn encrypt(&self, token: &str) -> String {
        self.fernet.encrypt(token.as_bytes())
    }

    /// Fails on tampered or foreign ciphertext rather than returning wrong plaintext.
    pub fn decrypt(&self, ciphertext: &str) -> PortResult<SecretString> {
        let bytes = self
            .fernet
            .decrypt(ciphertext.trim())
            .map_err(|_| PortError::Unexpected("token decryption failed".to_string()))?;
        let token = String::from_utf8(bytes)
            .map_err(|_| PortError::Unexpected("decrypted token is not UTF-8".to_string()))?;
        Ok(SecretString::from(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn cipher() -> TokenCipher {
        TokenCipher::new(&Fernet::generate_key()).unwrap()
    }

    #[test]
    fn round_trips_tokens() {
        let cipher = cipher();
        for token in ["1//0gAbCdEf", "", "ünïcödé-token"] {
            let ciphertext = cipher.encrypt(token);
            assert_ne!(ciphertext, token);
            assert_eq!(cipher.decrypt(&ciphertext).unwrap().expose_secret(), token);
        }
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = cipher();
        let ciphertext = cipher.encrypt("1//refresh-token");
        let mut bytes = ciphertext.into_bytes();
        let middle = bytes.len() / 2;
        bytes[middle] = if bytes[middle] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn ciphertext_from_another_key_is_rejected() {
        let ciphertext = cipher().encrypt("1//refresh-token");
        assert!(cipher().decrypt(&ciphertext).is_err());
    }

    #[test]
    fn malformed_key_is_a_config_error() {
        assert!(matches!(
            TokenCipher::new("not-a-key"),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }
}
