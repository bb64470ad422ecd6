//! Snowflake key-pair authentication
//!
//! The SQL API accepts a self-signed RS256 JWT whose issuer names the
//! account, the user, and the SHA-256 fingerprint of the user's registered
//! public key:
//!
//! ```text
//! iss = <ACCOUNT>.<USER>.SHA256:<base64(sha256(public key DER))>
//! sub = <ACCOUNT>.<USER>
//! ```

use crate::{Error, Result};
use base64::Engine as _;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Token lifetime; Snowflake rejects anything over one hour
const TOKEN_LIFETIME_SECS: u64 = 59 * 60;

#[derive(Debug, Serialize)]
struct KeyPairClaims {
    iss: String,
    sub: String,
    iat: u64,
    exp: u64,
}

/// Signs SQL API tokens for one account and user
pub struct KeyPairAuth {
    qualified_user: String,
    fingerprint: String,
    encoding_key: EncodingKey,
}

impl fmt::Debug for KeyPairAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPairAuth")
            .field("qualified_user", &self.qualified_user)
            .field("fingerprint", &self.fingerprint)
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

/// Account part of the issuer: uppercased, region and cloud suffixes dropped
fn account_identifier(account: &str) -> String {
    account
        .split('.')
        .next()
        .unwrap_or(account)
        .to_uppercase()
}

impl KeyPairAuth {
    /// Build from a PEM-encoded PKCS#8 private key
    pub fn from_pem(account: &str, user: &str, private_key_pem: &str) -> Result<Self> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_key_pem)
            .map_err(|e| Error::Auth(format!("Failed to parse private key: {}", e)))?;
        let public_der = RsaPublicKey::from(&private_key)
            .to_public_key_der()
            .map_err(|e| Error::Auth(format!("Failed to encode public key: {}", e)))?;

        let digest = Sha256::digest(public_der.as_bytes());
        let fingerprint = format!(
            "SHA256:{}",
            base64::engine::general_purpose::STANDARD.encode(digest)
        );

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| Error::Auth(format!("Failed to load signing key: {}", e)))?;

        Ok(Self {
            qualified_user: format!("{}.{}", account_identifier(account), user.to_uppercase()),
            fingerprint,
            encoding_key,
        })
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `ACCOUNT.USER`
    pub fn qualified_user(&self) -> &str {
        &self.qualified_user
    }

    /// Sign a fresh token
    pub fn token(&self) -> Result<String> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Internal(format!("System clock before epoch: {}", e)))?
            .as_secs();

        let claims = KeyPairClaims {
            iss: format!("{}.{}", self.qualified_user, self.fingerprint),
            sub: self.qualified_user.clone(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Auth(format!("Failed to sign token: {}", e)))
    }
}
