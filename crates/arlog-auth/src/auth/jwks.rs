//! JWKS fetching, caching, and provider token verification

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use url::Url;

use super::claims::ProviderClaims;
use super::error::{AuthError, Result};
use crate::constants::PROVIDER_ALGORITHMS;

/// JSON Web Key
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    #[serde(default)]
    pub kid: Option<String>,
    pub kty: String,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub r#use: Option<String>,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
}

/// JSON Web Key Set
#[derive(Debug, Clone, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Immutable view of the cache. Replaced as a whole on refresh.
#[derive(Default)]
struct KeySnapshot {
    keys: HashMap<String, DecodingKey>,
    refreshed_at: Option<Instant>,
}

impl KeySnapshot {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.refreshed_at.is_some_and(|t| t.elapsed() < ttl)
    }
}

/// Provider signing keys with a coarse TTL over the whole set.
///
/// Concurrent callers that miss the cache may each fetch; the last swap wins.
pub struct JwksKeyStore {
    jwks_uri: Url,
    issuer: String,
    client_id: String,
    ttl: Duration,
    client: reqwest::Client,
    snapshot: ArcSwap<KeySnapshot>,
}

impl std::fmt::Debug for JwksKeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksKeyStore")
            .field("jwks_uri", &self.jwks_uri)
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .field("keys_count", &self.snapshot.load().keys.len())
            .finish_non_exhaustive()
    }
}

impl JwksKeyStore {
    pub fn new(
        jwks_uri: Url,
        issuer: impl Into<String>,
        client_id: impl Into<String>,
        ttl: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            jwks_uri,
            issuer: issuer.into(),
            client_id: client_id.into(),
            ttl,
            client,
            snapshot: ArcSwap::from_pointee(KeySnapshot::default()),
        }
    }

    /// Verify a provider-issued token and return its claims.
    pub async fn validate(&self, token: &str) -> Result<ProviderClaims> {
        let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
        let kid = header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(AuthError::MissingKid)?;

        let key = self.resolve_key(kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = PROVIDER_ALGORITHMS.to_vec();
        validation.leeway = 0;
        // aud and iss are checked below in a fixed order
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<ProviderClaims>(token, &key, &validation)?.claims;

        if !claims.aud.contains(&self.client_id) {
            return Err(AuthError::BadAudience);
        }
        if claims.iss != self.issuer {
            return Err(AuthError::BadIssuer);
        }

        Ok(claims)
    }

    async fn resolve_key(&self, kid: &str) -> Result<DecodingKey> {
        {
            let snapshot = self.snapshot.load();
            if snapshot.is_fresh(self.ttl)
                && let Some(key) = snapshot.keys.get(kid)
            {
                return Ok(key.clone());
            }
        }

        self.refresh().await?;

        self.snapshot
            .load()
            .keys
            .get(kid)
            .cloned()
            .ok_or_else(|| AuthError::KeyNotFound(kid.to_string()))
    }

    /// Fetch the full key set and swap it in. Returns the number of usable keys.
    pub async fn refresh(&self) -> Result<usize> {
        tracing::debug!(jwks_uri = %self.jwks_uri, "Refreshing JWKS");

        let result = self.fetch().await;

        #[cfg(feature = "metrics")]
        crate::observability::record_jwks_refresh(result.is_ok());

        let keys = result.inspect_err(|e| {
            tracing::warn!(jwks_uri = %self.jwks_uri, error = %e, "JWKS refresh failed");
        })?;

        let count = keys.len();
        self.snapshot.store(Arc::new(KeySnapshot {
            keys,
            refreshed_at: Some(Instant::now()),
        }));

        tracing::info!(keys_count = count, "JWKS refreshed successfully");
        Ok(count)
    }

    async fn fetch(&self) -> Result<HashMap<String, DecodingKey>> {
        let response = self.client.get(self.jwks_uri.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Provider {
                status: Some(status.as_u16()),
                detail: "JWKS endpoint returned an error".into(),
            });
        }

        let jwks: JwkSet = response
            .json()
            .await
            .map_err(|e| AuthError::JwksParse(e.to_string()))?;

        let mut keys = HashMap::with_capacity(jwks.keys.len());
        for jwk in &jwks.keys {
            match decode_jwk(jwk) {
                Ok(Some((kid, key))) => {
                    keys.insert(kid, key);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(kid = ?jwk.kid, error = %e, "Skipping undecodable JWKS key");
                }
            }
        }
        Ok(keys)
    }

    #[cfg(test)]
    pub(crate) fn keys_count(&self) -> usize {
        self.snapshot.load().keys.len()
    }
}

/// Build a decoding key from an RSA signing JWK. Other keys are skipped.
fn decode_jwk(jwk: &Jwk) -> Result<Option<(String, DecodingKey)>> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping unsupported key type");
        return Ok(None);
    }
    if jwk.r#use.as_deref().is_some_and(|u| u != "sig") {
        return Ok(None);
    }
    if let Some(alg) = jwk.alg.as_deref()
        && !matches!(alg, "RS256" | "RS384" | "RS512")
    {
        tracing::debug!(alg, "Skipping key with non-RSA algorithm");
        return Ok(None);
    }
    let Some(kid) = jwk.kid.clone() else {
        tracing::debug!("Skipping key without kid");
        return Ok(None);
    };

    let n = jwk
        .n
        .as_deref()
        .ok_or_else(|| AuthError::JwksParse(format!("missing 'n' in RSA key {kid}")))?;
    let e = jwk
        .e
        .as_deref()
        .ok_or_else(|| AuthError::JwksParse(format!("missing 'e' in RSA key {kid}")))?;

    let n = decode_component(n, "n", &kid)?;
    let e = decode_component(e, "e", &kid)?;

    Ok(Some((kid, DecodingKey::from_rsa_raw_components(&n, &e))))
}

/// Decode an unsigned big-endian integer published as base64url.
fn decode_component(value: &str, name: &str, kid: &str) -> Result<Vec<u8>> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value.trim_end_matches('='))
        .map_err(|err| AuthError::JwksParse(format!("invalid '{name}' in RSA key {kid}: {err}")))?;

    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    if start == bytes.len() {
        return Err(AuthError::JwksParse(format!(
            "empty '{name}' in RSA key {kid}"
        )));
    }
    Ok(bytes[start..].to_vec())
}
