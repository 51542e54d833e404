//! ID-token verification.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;

use uagen_common::IdentitySession;

use super::IdentityError;

/// Key set response from the provider's JWKS endpoint.
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

/// Claims carried by the provider's ID tokens.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    name: Option<String>,
}

/// Validates provider ID tokens against the provider's signing keys.
///
/// Keys are fetched lazily and cached; an unknown `kid` triggers one
/// refresh before the token is rejected, which covers provider key
/// rotation without restarting the service.
pub struct TokenVerifier {
    http_client: Client,
    jwks_url: String,
    issuer: String,
    audience: String,
    keys: Arc<RwLock<HashMap<String, DecodingKey>>>,
}

impl TokenVerifier {
    pub fn new(jwks_url: &str, issuer: &str, audience: &str) -> Self {
        TokenVerifier {
            http_client: Client::new(),
            jwks_url: jwks_url.to_string(),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            keys: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn refresh_keys(&self) -> Result<(), IdentityError> {
        tracing::debug!("fetching signing keys from {}", self.jwks_url);

        let response: JwksResponse = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| IdentityError::KeySetFetch(e.to_string()))?
            .json()
            .await
            .map_err(|e| IdentityError::KeySetFetch(e.to_string()))?;

        let mut keys = self.keys.write().await;
        keys.clear();
        for jwk in response.keys {
            if jwk.kty != "RSA" {
                continue;
            }
            if let (Some(n), Some(e)) = (&jwk.n, &jwk.e) {
                match DecodingKey::from_rsa_components(n, e) {
                    Ok(key) => {
                        keys.insert(jwk.kid.clone(), key);
                    }
                    Err(e) => {
                        tracing::warn!("skipping unparseable RSA key {}: {}", jwk.kid, e);
                    }
                }
            }
        }

        tracing::debug!("loaded {} signing keys", keys.len());
        Ok(())
    }

    async fn key_for(&self, kid: &str) -> Result<DecodingKey, IdentityError> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }
        // Unknown kid: the provider may have rotated keys since the last
        // fetch. Refresh once, then give up.
        self.refresh_keys().await?;
        self.keys
            .read()
            .await
            .get(kid)
            .cloned()
            .ok_or_else(|| IdentityError::KeyNotFound(kid.to_string()))
    }

    /// Verify an ID token and extract the session it describes.
    pub async fn verify(&self, token: &str) -> Result<IdentitySession, IdentityError> {
        let header =
            decode_header(token).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing kid in token header".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let token_data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        Ok(IdentitySession {
            uid: token_data.claims.sub,
            email: token_data.claims.email,
            email_verified: token_data.claims.email_verified,
            display_name: token_data.claims.name,
        })
    }

    /// Authenticate a request by validating its Bearer token.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<IdentitySession, IdentityError> {
        let token = bearer_token(headers)?;
        self.verify(token).await
    }
}

/// Extract the raw Bearer token from request headers.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, IdentityError> {
    let auth_header = headers
        .get("authorization")
        .ok_or(IdentityError::MissingHeader)?
        .to_str()
        .map_err(|_| IdentityError::InvalidFormat)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(IdentityError::InvalidFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn bearer_token_extracts_value() {
        let headers = headers_with_auth("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn bearer_token_rejects_missing_header() {
        let headers = HeaderMap::new();
        assert!(matches!(
            bearer_token(&headers),
            Err(IdentityError::MissingHeader)
        ));
    }

    #[test]
    fn bearer_token_rejects_basic_auth() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert!(matches!(
            bearer_token(&headers),
            Err(IdentityError::InvalidFormat)
        ));
    }

    #[tokio::test]
    async fn authenticate_rejects_garbage_token() {
        let verifier = TokenVerifier::new("http://localhost:1/jwks", "iss", "aud");
        let headers = headers_with_auth("Bearer not-a-jwt");
        assert!(matches!(
            verifier.authenticate(&headers).await,
            Err(IdentityError::InvalidToken(_))
        ));
    }
}
