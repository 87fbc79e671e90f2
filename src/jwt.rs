//! JWT token issuance and verification.
//!
//! Access and refresh tokens share one claims shape and one codec; they differ
//! only in lifetime. Tokens are HS512-signed compact JWS strings.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::signing::SigningKey;

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 3 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 3 * 24 * 60 * 60;

/// Longest lifetime the CLI accepts for either token: 1 year
pub const MAX_TOKEN_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Claims embedded in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Login identifier
    #[serde(rename = "sub")]
    pub subject: String,
    /// Member identifier
    #[serde(rename = "memberId")]
    pub member_id: i64,
    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: u64,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: u64,
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Claims signed into the token
    pub claims: Claims,
    /// Token duration in seconds
    pub duration: u64,
}

/// Why a token could not be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// Signature does not match the claims under the current key
    Signature,
    /// Not a decodable token
    Malformed,
}

/// Outcome of checking a token. Expiry is an ordinary outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Valid(Claims),
    Expired(Claims),
    Invalid(InvalidReason),
}

/// Stateless token codec holding the process signing key.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(key: &SigningKey) -> Self {
        let mut validation = Validation::new(Algorithm::HS512);
        // Expiry is checked by hand so it can be told apart from tampering.
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(key.bytes()),
            decoding_key: DecodingKey::from_secret(key.bytes()),
            validation,
        }
    }

    /// Issue a token for `subject` valid for `ttl` seconds from now.
    pub fn issue(&self, subject: &str, member_id: i64, ttl: u64) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, member_id, ttl, now_secs()?)
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject: &str,
        member_id: i64,
        ttl: u64,
        now: u64,
    ) -> Result<IssuedToken, TokenError> {
        if subject.is_empty() {
            return Err(TokenError::EmptySubject);
        }
        if ttl == 0 {
            return Err(TokenError::ZeroTtl);
        }
        let expires_at = now.checked_add(ttl).ok_or(TokenError::TtlOverflow)?;

        let claims = Claims {
            subject: subject.to_string(),
            member_id,
            issued_at: now,
            expires_at,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS512), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        tracing::debug!(subject = %subject, ttl, "Issued token");

        Ok(IssuedToken {
            token,
            claims,
            duration: ttl,
        })
    }

    /// Check signature and expiry, returning the outcome as a value.
    pub fn check(&self, token: &str) -> Result<Verification, TokenError> {
        Ok(self.check_at(token, now_secs()?))
    }

    pub fn check_at(&self, token: &str, now: u64) -> Verification {
        match self.inspect(token) {
            Ok(claims) if now > claims.expires_at => Verification::Expired(claims),
            Ok(claims) => Verification::Valid(claims),
            Err(TokenError::InvalidSignature) => Verification::Invalid(InvalidReason::Signature),
            Err(_) => Verification::Invalid(InvalidReason::Malformed),
        }
    }

    /// Verify a token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, now_secs()?)
    }

    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        match self.check_at(token, now) {
            Verification::Valid(claims) => Ok(claims),
            Verification::Expired(claims) => Err(TokenError::Expired {
                expired_at: claims.expires_at,
            }),
            Verification::Invalid(InvalidReason::Signature) => Err(TokenError::InvalidSignature),
            Verification::Invalid(InvalidReason::Malformed) => Err(TokenError::Malformed),
        }
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token).map(|claims| claims.subject)
    }

    pub fn extract_member_id(&self, token: &str) -> Result<i64, TokenError> {
        self.verify(token).map(|claims| claims.member_id)
    }

    /// Expiration timestamp of a signature-valid token, expired or not.
    pub fn expiration_of(&self, token: &str) -> Result<u64, TokenError> {
        self.inspect(token).map(|claims| claims.expires_at)
    }

    /// Decode a token checking only its signature, ignoring expiry.
    pub fn inspect(&self, token: &str) -> Result<Claims, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::Malformed);
        }

        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| classify_decode_error(token, &e))
    }
}

/// Map a decode failure onto the codec's taxonomy. A signature segment that
/// cannot be decoded, under a readable header and payload, is a tampered
/// signature rather than a malformed token.
fn classify_decode_error(token: &str, error: &jsonwebtoken::errors::Error) -> TokenError {
    match error.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::Base64(_) => {
            let readable = token
                .split('.')
                .take(2)
                .all(|segment| URL_SAFE_NO_PAD.decode(segment).is_ok());
            if readable {
                TokenError::InvalidSignature
            } else {
                TokenError::Malformed
            }
        }
        _ => TokenError::Malformed,
    }
}

/// Current Unix time in seconds.
pub(crate) fn now_secs() -> Result<u64, TokenError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::TimeError)?
        .as_secs())
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum TokenError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token was valid but its expiry has passed
    Expired { expired_at: u64 },
    /// Signature mismatch, wrong algorithm, or unreadable signature
    InvalidSignature,
    /// Not a decodable token
    Malformed,
    /// Subject must not be empty
    EmptySubject,
    /// Lifetime must be positive
    ZeroTtl,
    /// Expiry does not fit in a timestamp
    TtlOverflow,
    /// System time error
    TimeError,
}

impl TokenError {
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired { .. })
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::Expired { expired_at } => write!(f, "Token expired at {}", expired_at),
            TokenError::InvalidSignature => write!(f, "Invalid token signature"),
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::EmptySubject => write!(f, "Token subject must not be empty"),
            TokenError::ZeroTtl => write!(f, "Token lifetime must be positive"),
            TokenError::TtlOverflow => write!(f, "Token lifetime is too long"),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    const NOW: u64 = 1_700_000_000;

    fn make_codec(fill: u8) -> TokenCodec {
        let key = SigningKey::from_base64(&STANDARD.encode([fill; 64])).unwrap();
        TokenCodec::new(&key)
    }

    #[test]
    fn test_issue_and_verify() {
        let codec = make_codec(1);
        let issued = codec.issue("alice", 42, ACCESS_TOKEN_DURATION_SECS).unwrap();

        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims.subject, "alice");
        assert_eq!(claims.member_id, 42);
        assert_eq!(claims.expires_at - claims.issued_at, ACCESS_TOKEN_DURATION_SECS);
        assert_eq!(claims, issued.claims);
        assert_eq!(issued.duration, ACCESS_TOKEN_DURATION_SECS);
    }

    #[test]
    fn test_round_trip_various_lifetimes() {
        let codec = make_codec(1);
        for (subject, member_id, ttl) in [
            ("a", 0, 1),
            ("bob@example.com", -5, 60),
            ("사용자", i64::MAX, REFRESH_TOKEN_DURATION_SECS),
        ] {
            let issued = codec.issue_at(subject, member_id, ttl, NOW).unwrap();
            let claims = codec.verify_at(&issued.token, NOW).unwrap();
            assert_eq!(claims.subject, subject);
            assert_eq!(claims.member_id, member_id);
            assert_eq!(claims.expires_at - claims.issued_at, ttl);
        }
    }

    #[test]
    fn test_same_instant_same_token() {
        let codec = make_codec(1);
        let a = codec.issue_at("alice", 42, 900, NOW).unwrap();
        let b = codec.issue_at("alice", 42, 900, NOW).unwrap();
        assert_eq!(a.token, b.token);
    }

    #[test]
    fn test_expiration_boundary() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;

        assert!(codec.verify_at(&token, NOW + 899).is_ok());
        assert!(codec.verify_at(&token, NOW + 900).is_ok());

        let err = codec.verify_at(&token, NOW + 901).unwrap_err();
        assert!(matches!(err, TokenError::Expired { expired_at } if expired_at == NOW + 900));
        assert!(err.is_expired());
    }

    #[test]
    fn test_check_reports_expired_claims() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;

        match codec.check_at(&token, NOW + 1000) {
            Verification::Expired(claims) => assert_eq!(claims.member_id, 42),
            other => panic!("expected expired, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;
        let sig_start = token.rfind('.').unwrap() + 1;

        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();

            assert!(
                matches!(codec.verify_at(&tampered, NOW), Err(TokenError::InvalidSignature)),
                "tampering at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;
        let other = codec.issue_at("mallory", 1, 900, NOW).unwrap().token;

        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(matches!(
            codec.verify_at(&forged, NOW),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let token = make_codec(1).issue_at("alice", 42, 900, NOW).unwrap().token;
        assert!(matches!(
            make_codec(2).verify_at(&token, NOW),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_other_algorithm_rejected() {
        let secret = [1u8; 64];
        let claims = Claims {
            subject: "alice".to_string(),
            member_id: 42,
            issued_at: NOW,
            expires_at: NOW + 900,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&secret),
        )
        .unwrap();

        assert!(matches!(
            make_codec(1).verify_at(&token, NOW),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_malformed_tokens() {
        let codec = make_codec(1);
        for token in ["", "invalid-token", "a.b", "a.b.c.d", "!!!.???.***"] {
            assert!(
                matches!(codec.verify_at(token, NOW), Err(TokenError::Malformed)),
                "{:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_expiration_of_ignores_expiry() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;

        assert_eq!(codec.expiration_of(&token).unwrap(), NOW + 900);
        assert!(matches!(
            make_codec(2).expiration_of(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn test_projections() {
        let codec = make_codec(1);
        let token = codec.issue("alice", 42, 900).unwrap().token;
        assert_eq!(codec.extract_subject(&token).unwrap(), "alice");
        assert_eq!(codec.extract_member_id(&token).unwrap(), 42);

        let expired = codec.issue_at("alice", 42, 900, NOW).unwrap().token;
        assert!(codec.extract_subject(&expired).unwrap_err().is_expired());
        assert!(codec.extract_member_id(&expired).unwrap_err().is_expired());
    }

    #[test]
    fn test_invalid_issue_arguments() {
        let codec = make_codec(1);
        assert!(matches!(
            codec.issue_at("", 42, 900, NOW),
            Err(TokenError::EmptySubject)
        ));
        assert!(matches!(
            codec.issue_at("alice", 42, 0, NOW),
            Err(TokenError::ZeroTtl)
        ));
    }

    #[test]
    fn test_lifetime_overflow_rejected() {
        let codec = make_codec(1);
        assert!(matches!(
            codec.issue_at("alice", 1, u64::MAX, NOW),
            Err(TokenError::TtlOverflow)
        ));

        let issued = codec
            .issue_at("alice", 1, MAX_TOKEN_DURATION_SECS, NOW)
            .unwrap();
        assert!(issued.claims.expires_at > issued.claims.issued_at);
    }

    #[test]
    fn test_wire_claim_names() {
        let codec = make_codec(1);
        let token = codec.issue_at("alice", 42, 900, NOW).unwrap().token;
        let payload = token.split('.').nth(1).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert_eq!(json["sub"], "alice");
        assert_eq!(json["memberId"], 42);
        assert_eq!(json["iat"], NOW);
        assert_eq!(json["exp"], NOW + 900);
    }
}
