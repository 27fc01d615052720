use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AuthFailure;
use crate::config::Config;
use crate::models::session::Identity;
use crate::utils::crypto::{emails_match, verify_password};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub identity: Identity,
    pub expires_at: DateTime<Utc>,
}

/// The single-operator realm behind the moderation routes.
///
/// Sign-in checks the configured argon2 hash and issues an HS256 token.
/// Sign-out revokes the token id until the token would have expired anyway.
#[derive(Clone)]
pub struct OperatorRealm {
    email: String,
    password_hash: String,
    jwt_secret: String,
    ttl: Duration,
    revoked: Arc<Mutex<HashMap<String, usize>>>,
}

impl OperatorRealm {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        jwt_secret: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            jwt_secret: jwt_secret.into(),
            ttl,
            revoked: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.operator_email.clone(),
            config.operator_password_hash.clone(),
            config.jwt_secret.clone(),
            Duration::minutes(config.session_ttl_minutes),
        )
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken, AuthFailure> {
        if !emails_match(email, &self.email) {
            tracing::warn!("Sign-in attempt for unknown operator");
            return Err(AuthFailure::UserNotFound);
        }
        let ok = verify_password(password, &self.password_hash).map_err(|e| {
            tracing::error!(error = %e, "Operator password hash is malformed");
            AuthFailure::Internal("operator credential is misconfigured".to_string())
        })?;
        if !ok {
            tracing::warn!("Sign-in attempt with wrong password");
            return Err(AuthFailure::WrongPassword);
        }

        let expires_at = Utc::now() + self.ttl;
        let claims = Claims {
            sub: self.email.clone(),
            exp: expires_at.timestamp().max(0) as usize,
            jti: Uuid::new_v4().simple().to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthFailure::Internal(e.to_string()))?;

        tracing::info!(jti = %claims.jti, "Operator signed in");
        Ok(IssuedToken {
            token,
            identity: Identity {
                email: self.email.clone(),
            },
            expires_at,
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|_| AuthFailure::InvalidCredential)?;

        if self.lock_revoked().contains_key(&data.claims.jti) {
            return Err(AuthFailure::InvalidCredential);
        }
        Ok(data.claims)
    }

    pub fn revoke(&self, claims: &Claims) {
        let now = Utc::now().timestamp().max(0) as usize;
        let mut revoked = self.lock_revoked();
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti.clone(), claims.exp);
        tracing::info!(jti = %claims.jti, "Operator signed out");
    }

    fn lock_revoked(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.revoked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::hash_password;

    fn realm() -> OperatorRealm {
        OperatorRealm::new(
            "admin@example.com",
            hash_password("s3cret").unwrap(),
            "test_secret_key",
            Duration::minutes(5),
        )
    }

    #[test]
    fn sign_in_issues_verifiable_token() {
        let realm = realm();
        let issued = realm.sign_in("ADMIN@example.com", "s3cret").unwrap();
        assert_eq!(issued.identity.email, "admin@example.com");
        let claims = realm.verify(&issued.token).unwrap();
        assert_eq!(claims.sub, "admin@example.com");
    }

    #[test]
    fn credential_failures_are_distinguished_internally() {
        let realm = realm();
        assert_eq!(
            realm.sign_in("other@example.com", "s3cret").unwrap_err(),
            AuthFailure::UserNotFound
        );
        assert_eq!(
            realm.sign_in("admin@example.com", "nope").unwrap_err(),
            AuthFailure::WrongPassword
        );
    }

    #[test]
    fn revoked_token_no_longer_verifies() {
        let realm = realm();
        let issued = realm.sign_in("admin@example.com", "s3cret").unwrap();
        let claims = realm.verify(&issued.token).unwrap();
        realm.revoke(&claims);
        assert_eq!(
            realm.verify(&issued.token).unwrap_err(),
            AuthFailure::InvalidCredential
        );
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let other = OperatorRealm::new(
            "admin@example.com",
            hash_password("s3cret").unwrap(),
            "different",
            Duration::minutes(5),
        );
        let issued = other.sign_in("admin@example.com", "s3cret").unwrap();
        assert!(realm().verify(&issued.token).is_err());
    }
}
