use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::FoodgramError;
use crate::schema::{Uuid, UserRole};

use super::permissions::ActionType;

/// Claims of a session token. Tokens are issued by the authentication
/// service sharing the HMAC secret, this crate only verifies them.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Uuid, username: String, role: UserRole) -> Self {
        Self::with_lifetime(id, username, role, Duration::hours(1))
    }

    pub fn with_lifetime(id: Uuid, username: String, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();

        Self {
            user_id: id,
            username,
            role,
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub user_id: Uuid,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), FoodgramError> {
        if !action.authenticate(self) {
            return Err(FoodgramError::Forbidden(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }

    /// Owner-or-privileged check for objects owned by `owner_id`
    pub fn authenticate_owner(
        &self,
        owner_id: Uuid,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), FoodgramError> {
        self.authenticate(own)?;

        if owner_id == self.user_id {
            return Ok(());
        }
        self.authenticate(all)
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

#[derive(Clone)]
pub struct SessionKey(Hmac<Sha256>);

impl SessionKey {
    pub fn new(secret: &str) -> Result<Self, FoodgramError> {
        let key = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|e| FoodgramError::Internal(format!("Invalid session secret: {e}")))?;

        Ok(Self(key))
    }

    pub fn verify(&self, token: &str) -> Result<SessionData, FoodgramError> {
        let session: JwtSessionData = token
            .verify_with_key(&self.0)
            .map_err(|_| FoodgramError::Unauthorized(String::from("Invalid session; Invalid token")))?;

        if session.exp < Local::now().timestamp() {
            return Err(FoodgramError::Unauthorized(String::from(
                "Invalid session; Token expired",
            )));
        }

        Ok(session.into())
    }

    /// Verifies an `Authorization` header of the form `Token <jwt>` or `Bearer <jwt>`
    pub fn verify_header(&self, header: &str) -> Result<SessionData, FoodgramError> {
        let token = header
            .strip_prefix("Token ")
            .or_else(|| header.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                FoodgramError::Unauthorized(String::from("Invalid authorization header"))
            })?;

        self.verify(token)
    }
}
