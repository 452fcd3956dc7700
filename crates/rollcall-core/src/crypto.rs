//! # Credentials
//!
//! Password hashing and bearer-token signing.
//!
//! - Passwords: PBKDF2-HMAC-SHA256 (32-byte key) with a random 16-byte
//!   salt. Stored as `pbkdf2-sha256$<iterations>$<salt>$<hash>`, base64.
//! - Tokens: `v1.<payload>.<signature>` where the payload is base64url JSON
//!   claims and the signature is HMAC-SHA256 over the payload part.
//!
//! Comparisons of secrets are constant time.

use crate::error::{PortalError, Result};
use crate::model::UserId;
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Work factor for new password hashes.
pub const HASH_ITERATIONS: u32 = 10_000;

const HASH_SCHEME: &str = "pbkdf2-sha256";
const TOKEN_VERSION: &str = "v1";
const MAX_TOKEN_LEN: usize = 1024;

fn mac_for(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|e| PortalError::Crypto(e.to_string()))
}

// =============================================================================
// PASSWORDS
// =============================================================================

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Hash `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String> {
    hash_password_with(password, HASH_ITERATIONS)
}

/// Hash with an explicit work factor.
pub fn hash_password_with(password: &str, iterations: u32) -> Result<String> {
    let iterations = iterations.max(1);
    let salt: [u8; 16] = rand::random();
    let hash = derive(password, &salt, iterations);
    Ok(format!(
        "{HASH_SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(hash)
    ))
}

/// Check `password` against a stored hash. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    if scheme != HASH_SCHEME {
        return false;
    }
    let (Ok(iterations), Ok(salt), Ok(expected)) = (
        iterations.parse::<u32>(),
        STANDARD_NO_PAD.decode(salt),
        STANDARD_NO_PAD.decode(hash),
    ) else {
        return false;
    };
    derive(password, &salt, iterations.max(1))
        .as_slice()
        .ct_eq(expected.as_slice())
        .into()
}

// =============================================================================
// TOKENS
// =============================================================================

/// What a bearer token asserts. The role is not carried; it is read from
/// the user record on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Session id.
    pub sid: u64,
    /// Account id.
    pub uid: UserId,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// A signer with a random secret. Tokens die with the process.
    #[must_use]
    pub fn random() -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(secret.to_vec())
    }

    pub fn sign(&self, claims: &Claims) -> Result<String> {
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let mut mac = mac_for(&self.secret)?;
        mac.update(payload.as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{TOKEN_VERSION}.{payload}.{sig}"))
    }

    /// Check the signature and decode the claims. Expiry is left to the caller.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let invalid = || PortalError::unauthorized("Invalid token");
        if token.len() > MAX_TOKEN_LEN {
            return Err(invalid());
        }
        let mut parts = token.split('.');
        let (Some(TOKEN_VERSION), Some(payload), Some(sig), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| invalid())?;
        let mut mac = mac_for(&self.secret)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| invalid())?;

        let bytes = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_and_rejects() {
        let stored = hash_password_with("correct horse", 50).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$50$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("battery staple", &stored));
    }

    #[test]
    fn derive_matches_known_pbkdf2_vector() {
        // PBKDF2-HMAC-SHA256, "password" / "salt", one iteration
        let key = derive("password", b"salt", 1);
        let hex: String = key.iter().map(|b| format!("{b:02x}")).collect();
        assert_eq!(hex, "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b");

        let stored = format!(
            "pbkdf2-sha256$1${}${}",
            STANDARD_NO_PAD.encode(b"salt"),
            STANDARD_NO_PAD.encode(key)
        );
        assert!(verify_password("password", &stored));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password_with("pw", 10).unwrap();
        let b = hash_password_with("pw", 10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "bcrypt$10$abc$def"));
        assert!(!verify_password("x", "pbkdf2-sha256$ten$abc$def"));
    }

    #[test]
    fn token_round_trip() {
        let signer = TokenSigner::new(b"secret".to_vec());
        let claims = Claims {
            sid: 3,
            uid: UserId(9),
            exp: 1_700_000_000,
        };
        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let claims = Claims {
            sid: 1,
            uid: UserId(1),
            exp: 0,
        };
        let token = TokenSigner::new(b"a".to_vec()).sign(&claims).unwrap();
        let err = TokenSigner::new(b"b".to_vec()).verify(&token);
        assert!(matches!(err, Err(PortalError::Unauthorized(_))));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let signer = TokenSigner::random();
        let token = signer
            .sign(&Claims {
                sid: 1,
                uid: UserId(1),
                exp: 0,
            })
            .unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"sid":1,"uid":2,"exp":0}"#);
        let parts: Vec<&str> = token.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(signer.verify(&forged).is_err());
        assert!(signer.verify("garbage").is_err());
    }
}
