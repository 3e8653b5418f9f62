use std::fmt;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use clap::ValueEnum;
use ir_common::Identity;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;

use crate::config::ConfigError;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum AuthMode {
    /// Shared key plus identity headers set by a trusted gateway.
    ApiKey,
    /// Bearer token; the identity is taken from its claims.
    Jwt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum JwtAlgorithm {
    Hs256,
    Hs384,
    Hs512,
    Rs256,
    Es256,
    EdDsa,
}

impl JwtAlgorithm {
    fn algorithm(self) -> Algorithm {
        match self {
            JwtAlgorithm::Hs256 => Algorithm::HS256,
            JwtAlgorithm::Hs384 => Algorithm::HS384,
            JwtAlgorithm::Hs512 => Algorithm::HS512,
            JwtAlgorithm::Rs256 => Algorithm::RS256,
            JwtAlgorithm::Es256 => Algorithm::ES256,
            JwtAlgorithm::EdDsa => Algorithm::EdDSA,
        }
    }

    pub fn is_symmetric(self) -> bool {
        matches!(
            self,
            JwtAlgorithm::Hs256 | JwtAlgorithm::Hs384 | JwtAlgorithm::Hs512
        )
    }

    fn verifier(
        self,
        secret: Option<&str>,
        public_pem: Option<&str>,
    ) -> Result<JwtVerifier, ConfigError> {
        let key = if self.is_symmetric() {
            let secret = secret
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::MissingJwtSecret(self))?;
            DecodingKey::from_secret(secret.as_bytes())
        } else {
            let pem = public_pem
                .filter(|pem| !pem.trim().is_empty())
                .ok_or(ConfigError::MissingJwtPublicKey(self))?
                .as_bytes();
            let parsed = match self {
                JwtAlgorithm::Es256 => DecodingKey::from_ec_pem(pem),
                JwtAlgorithm::EdDsa => DecodingKey::from_ed_pem(pem),
                _ => DecodingKey::from_rsa_pem(pem),
            };
            parsed.map_err(|err| ConfigError::InvalidJwtPublicKey {
                algorithm: self,
                reason: err.to_string(),
            })?
        };

        Ok(JwtVerifier {
            algorithm: self,
            key,
            validation: Validation::new(self.algorithm()),
        })
    }
}

/// Decoding key parsed once at startup.
#[derive(Clone)]
pub struct JwtVerifier {
    algorithm: JwtAlgorithm,
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum AuthConfig {
    ApiKey { key: String },
    Jwt(JwtVerifier),
}

impl AuthConfig {
    pub fn build(
        mode: AuthMode,
        api_key: Option<String>,
        jwt_algorithm: JwtAlgorithm,
        jwt_secret: Option<&str>,
        jwt_public_key: Option<&str>,
    ) -> Result<Self, ConfigError> {
        match mode {
            AuthMode::ApiKey => api_key
                .filter(|key| !key.trim().is_empty())
                .map(|key| AuthConfig::ApiKey { key })
                .ok_or(ConfigError::MissingApiKey),
            AuthMode::Jwt => jwt_algorithm
                .verifier(jwt_secret, jwt_public_key)
                .map(AuthConfig::Jwt),
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            AuthConfig::ApiKey { .. } => AuthMode::ApiKey,
            AuthConfig::Jwt(_) => AuthMode::Jwt,
        }
    }
}

/// Identity of the caller, verified at the boundary.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: Identity,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match AuthConfig::from_ref(state) {
            AuthConfig::ApiKey { key } => identity_from_gateway(&parts.headers, &key)?,
            AuthConfig::Jwt(verifier) => identity_from_token(&parts.headers, &verifier)?,
        };

        if identity.id.is_empty() {
            return Err(ApiError::Unauthenticated("identity has no id"));
        }

        Ok(AuthUser { identity })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn identity_from_gateway(headers: &HeaderMap, expected_key: &str) -> Result<Identity, ApiError> {
    match header(headers, API_KEY_HEADER) {
        None => return Err(ApiError::Unauthenticated("missing X-API-Key")),
        Some(provided) if provided != expected_key => {
            return Err(ApiError::Unauthenticated("X-API-Key mismatch"));
        }
        Some(_) => {}
    }

    let id = header(headers, USER_ID_HEADER)
        .ok_or(ApiError::Unauthenticated("missing X-User-Id"))?;
    let email = header(headers, USER_EMAIL_HEADER).map(str::to_string);

    Ok(Identity::new(id, email))
}

fn identity_from_token(headers: &HeaderMap, verifier: &JwtVerifier) -> Result<Identity, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated("missing bearer token"))?;

    let claims = decode::<Claims>(token, &verifier.key, &verifier.validation)
        .map_err(|err| {
            tracing::debug!(error = %err, "bearer_token_rejected");
            ApiError::Unauthenticated("bearer token rejected")
        })?
        .claims;

    Ok(Identity::new(claims.sub, claims.email))
}
