use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::env;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts},
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::domain::account::{Actor, UserType};
use crate::domain::history::ClientInfo;
use crate::domain::DomainError;

pub const ACCESS_TOKEN_MINUTES: i64 = 60;
pub const REFRESH_TOKEN_DAYS: i64 = 7;

pub const ACCESS: &str = "access";
pub const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: String,
    pub token_type: String,
    pub exp: usize,
}

impl Claims {
    pub fn actor(&self) -> Result<Actor, DomainError> {
        let role: UserType = self
            .role
            .parse()
            .map_err(|_| DomainError::Unauthorized("Invalid token role".to_string()))?;
        Ok(Actor::new(self.sub.clone(), role))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| DomainError::Unauthorized("Missing Authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            DomainError::Unauthorized("Invalid Authorization header format".to_string())
        })?;

        let claims = decode_jwt(token)?;
        if claims.token_type != ACCESS {
            return Err(DomainError::Unauthorized(
                "Refresh tokens cannot be used for API calls".to_string(),
            ));
        }
        Ok(claims)
    }
}

/// Claims of an access token, resolved into an [`Actor`].
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = DomainError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Claims::from_request_parts(parts, state).await?.actor()
    }
}

/// Caller address and user agent; the socket address is only known when
/// the server was started with connect info.
#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = |name: &str| parts.headers.get(name).and_then(|h| h.to_str().ok());
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientInfo::from_parts(
            value("x-forwarded-for"),
            value("x-real-ip"),
            remote,
            value(header::USER_AGENT.as_str()),
        ))
    }
}

pub fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DomainError::Internal(e.to_string()))?
        .to_string();
    Ok(password_hash)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, DomainError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|e| DomainError::Internal(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    env::var("JWT_SECRET").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "secret".to_string()
        } else {
            panic!("JWT_SECRET environment variable must be set in production");
        }
    })
});

fn create_jwt(user_id: &str, role: UserType, token_type: &str, ttl: Duration) -> Result<String, DomainError> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| DomainError::Internal("token expiry out of range".to_string()))?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_owned(),
        role: role.as_str().to_owned(),
        token_type: token_type.to_owned(),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .map_err(|e| DomainError::Internal(e.to_string()))
}

pub fn create_access_token(user_id: &str, role: UserType) -> Result<String, DomainError> {
    create_jwt(user_id, role, ACCESS, Duration::minutes(ACCESS_TOKEN_MINUTES))
}

pub fn create_refresh_token(user_id: &str, role: UserType) -> Result<String, DomainError> {
    create_jwt(user_id, role, REFRESH, Duration::days(REFRESH_TOKEN_DAYS))
}

pub fn decode_jwt(token: &str) -> Result<Claims, DomainError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| DomainError::Unauthorized("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_carry_their_type() {
        let access = create_access_token("u1", UserType::Provider).unwrap();
        let claims = decode_jwt(&access).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.token_type, ACCESS);
        assert_eq!(claims.actor().unwrap().role, UserType::Provider);

        let refresh = create_refresh_token("u1", UserType::Provider).unwrap();
        assert_eq!(decode_jwt(&refresh).unwrap().token_type, REFRESH);
    }

    #[test]
    fn garbage_tokens_are_unauthorized() {
        assert!(matches!(decode_jwt("nope"), Err(DomainError::Unauthorized(_))));
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
