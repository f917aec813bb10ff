//! Signed bearer tokens (HS256 JWT).
//!
//! `verify` never errors: malformed input, a bad signature and an elapsed
//! expiry all come back as `None` and callers treat that as anonymous.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::password::sha256_hex;
use crate::domain::Role;

/// Token payload. `sub` is the user id in decimal, timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Session id, present when the token is bound to a session row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    /// The fields a caller chose, without the timestamps `issue` adds
    pub fn subject(&self) -> Option<TokenSubject> {
        Some(TokenSubject {
            user_id: self.user_id()?,
            email: self.email.clone(),
            role: self.role,
            session_id: self.sid.clone(),
        })
    }
}

/// What a token asserts about its bearer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub role: Option<Role>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.claims.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Sign a token for `subject`, valid for `ttl` from now
pub fn issue(
    subject: &TokenSubject,
    secret: &str,
    ttl: Duration,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    issue_at(subject, secret, ttl, Utc::now())
}

/// Sign a token as if issued at `issued_at`
pub fn issue_at(
    subject: &TokenSubject,
    secret: &str,
    ttl: Duration,
    issued_at: DateTime<Utc>,
) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
    let iat = issued_at.timestamp();
    let claims = Claims {
        sub: subject.user_id.to_string(),
        email: subject.email.clone(),
        role: subject.role,
        sid: subject.session_id.clone(),
        iat,
        exp: iat + ttl.num_seconds(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(IssuedToken { token, claims })
}

/// Check signature and expiry, returning the claims on success.
/// A token is dead from the second `exp` names onwards.
pub fn verify(token: &str, secret: &str) -> Option<Claims> {
    verify_at(token, secret, Utc::now())
}

/// `verify` as seen at `now`
pub fn verify_at(token: &str, secret: &str, now: DateTime<Utc>) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    match decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation) {
        // jsonwebtoken accepts exp == now; expiry here is exclusive
        Ok(data) if data.claims.exp <= now.timestamp() => {
            tracing::debug!("Rejected expired token");
            None
        }
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("Rejected expired token"),
                ErrorKind::InvalidSignature => tracing::debug!("Rejected token with bad signature"),
                other => tracing::debug!("Rejected malformed token: {:?}", other),
            }
            None
        }
    }
}

/// Fingerprint stored in place of the token itself
pub fn token_hash(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 42,
            email: "seeker@example.com".to_string(),
            role: Some(Role::JobSeeker),
            session_id: Some("abc123".to_string()),
        }
    }

    #[test]
    fn test_issue_then_verify_round_trips() {
        let issued = issue(&subject(), SECRET, Duration::hours(1)).unwrap();
        let claims = verify(&issued.token, SECRET).unwrap();

        assert_eq!(claims, issued.claims);
        assert_eq!(claims.subject(), Some(subject()));
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_round_trip_without_optional_fields() {
        let bare = TokenSubject {
            role: None,
            session_id: None,
            ..subject()
        };
        let issued = issue(&bare, SECRET, Duration::minutes(5)).unwrap();
        assert_eq!(verify(&issued.token, SECRET).unwrap().subject(), Some(bare));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issued = issue(&subject(), SECRET, Duration::hours(1)).unwrap();
        assert!(verify(&issued.token, "other-secret").is_none());
    }

    #[test]
    fn test_any_altered_character_is_rejected() {
        let issued = issue(&subject(), SECRET, Duration::hours(1)).unwrap();
        let original: Vec<char> = issued.token.chars().collect();

        for i in 0..original.len() {
            let mut altered = original.clone();
            altered[i] = if altered[i] == 'A' { 'B' } else { 'A' };
            let altered: String = altered.into_iter().collect();
            assert!(verify(&altered, SECRET).is_none(), "accepted token altered at {}", i);
        }
    }

    #[test]
    fn test_zero_ttl_token_expires() {
        let issued = issue_at(
            &subject(),
            SECRET,
            Duration::zero(),
            Utc::now() - Duration::seconds(1),
        )
        .unwrap();
        assert!(verify(&issued.token, SECRET).is_none());
    }

    #[test]
    fn test_zero_ttl_token_rejected_within_the_same_second() {
        let issued = issue(&subject(), SECRET, Duration::zero()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(300));
        assert!(verify(&issued.token, SECRET).is_none());
    }

    #[test]
    fn test_zero_ttl_token_rejected_at_issue_instant() {
        let issued_at = Utc::now();
        let issued = issue_at(&subject(), SECRET, Duration::zero(), issued_at).unwrap();
        assert!(verify_at(&issued.token, SECRET, issued_at).is_none());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let issued_at = Utc::now();
        let issued = issue_at(&subject(), SECRET, Duration::seconds(10), issued_at).unwrap();
        assert!(verify_at(&issued.token, SECRET, issued_at + Duration::seconds(9)).is_some());
        assert!(verify_at(&issued.token, SECRET, issued_at + Duration::seconds(10)).is_none());
    }

    #[test]
    fn test_token_is_valid_until_expiry() {
        let issued = issue_at(
            &subject(),
            SECRET,
            Duration::minutes(10),
            Utc::now() - Duration::minutes(9),
        )
        .unwrap();
        assert!(verify(&issued.token, SECRET).is_some());
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        for token in ["", "abc", "a.b.c", "....", "Bearer x.y.z"] {
            assert!(verify(token, SECRET).is_none());
        }
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let a = token_hash("x.y.z");
        assert_eq!(a, token_hash("x.y.z"));
        assert_ne!(a, token_hash("x.y.q"));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_expires_at_matches_claims() {
        let issued = issue(&subject(), SECRET, Duration::hours(2)).unwrap();
        assert_eq!(issued.expires_at().timestamp(), issued.claims.exp);
    }
}
