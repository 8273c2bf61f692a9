use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use vidacomdeus_common::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT Claims stored in the token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
}

/// Access/refresh pair returned by signup, login and refresh.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// JWT service for creating and verifying HS256 tokens.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let access_ttl = Duration::try_minutes(config.jwt_access_token_expire_minutes)
            .context("JWT_ACCESS_TOKEN_EXPIRE_MINUTES out of range")?;
        let refresh_ttl = Duration::try_days(config.jwt_refresh_token_expire_days)
            .context("JWT_REFRESH_TOKEN_EXPIRE_DAYS out of range")?;
        Ok(Self::new(&config.jwt_secret_key, access_ttl, refresh_ttl))
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn create_access_token(&self, user_id: Uuid) -> Result<String> {
        self.create_token(user_id, TokenType::Access, self.access_ttl)
    }

    pub fn create_refresh_token(&self, user_id: Uuid) -> Result<String> {
        self.create_token(user_id, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn create_pair(&self, user_id: Uuid) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: self.create_access_token(user_id)?,
            refresh_token: self.create_refresh_token(user_id)?,
            token_type: "bearer".to_string(),
        })
    }

    fn create_token(&self, user_id: Uuid, token_type: TokenType, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(ttl)
            .context("token lifetime overflows the clock")?;
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify signature and expiry, and that the token is of the expected kind.
    pub fn verify_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)?;

        if claims.token_type != expected {
            bail!("expected a {expected:?} token, got {:?}", claims.token_type);
        }
        Ok(claims)
    }
}

/// SHA-256 hex digest used to store refresh and reset tokens.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
