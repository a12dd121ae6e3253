use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::database::schema::{Id, User, UserRole};
use crate::error::ApiError;

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, username: String, role: UserRole, lifetime_hours: i64) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(lifetime_hours)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            jti: uuid::Uuid::new_v4().to_string(),
            iat,
            exp,
        }
    }
}

/// Authenticated requester, attached to a request by the session filters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub username: String,
    pub role: UserRole,
    pub jti: String,
    pub exp: i64,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::Forbidden);
        }
        Ok(())
    }

    /// Author of the object, or an admin
    pub fn can_manage(&self, author_id: Id, own: ActionType, all: ActionType) -> bool {
        if own.authenticate(self) && author_id == self.user_id {
            return true;
        }
        all.authenticate(self)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            username: value.username,
            user_id: value.user_id,
            role: value.role,
            jti: value.jti,
            exp: value.exp,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("invalid signing key: {e}")))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(
        user.id,
        user.username.to_owned(),
        user.role,
        lifetime_hours,
    );

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("could not sign token: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::InvalidSession("Invalid token.".to_string()))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(ApiError::InvalidSession("Token expired.".to_string()));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Cook".to_string(),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let token = generate_jwt_session(&user(UserRole::Admin), "secret", 1).unwrap();
        let session: SessionData = verify_jwt_session(&token, "secret").unwrap().into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::Admin);
        assert!(!session.jti.is_empty());
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "secret", 1).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, "other"),
            Err(ApiError::InvalidSession(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "secret", -1).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, "secret"),
            Err(ApiError::InvalidSession(_))
        ));
    }

    #[test]
    fn tokens_are_unique_per_login() {
        let a = generate_jwt_session(&user(UserRole::User), "secret", 1).unwrap();
        let b = generate_jwt_session(&user(UserRole::User), "secret", 1).unwrap();
        assert_ne!(a, b);
    }
}
