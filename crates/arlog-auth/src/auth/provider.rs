//! Client for the identity provider's OAuth2 endpoints

use reqwest::header::ACCEPT;
use serde::Deserialize;
use url::Url;

use super::claims::ProviderClaims;
use super::config::{ProviderConfig, Secret};
use super::error::{AuthError, Result};
use super::identity::Identity;
use super::jwks::JwksKeyStore;
use crate::constants::{AUTH_SERVER_PATH, OIDC_SCOPES};

/// Fixed endpoint layout below `{base}/oauth2/default`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub issuer: String,
    pub authorize: Url,
    pub token: Url,
    pub userinfo: Url,
    pub keys: Url,
}

impl ProviderEndpoints {
    pub fn from_domain(domain: &str) -> Result<Self> {
        let domain = domain.trim().trim_end_matches('/');
        if domain.is_empty() {
            return Err(AuthError::Config("provider domain is empty".into()));
        }

        let base = if domain.contains("://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        };
        let issuer = format!("{base}/{AUTH_SERVER_PATH}");

        let endpoint = |name: &str| {
            Url::parse(&format!("{issuer}/v1/{name}"))
                .map_err(|e| AuthError::Config(format!("invalid provider domain {domain:?}: {e}")))
        };

        Ok(Self {
            authorize: endpoint("authorize")?,
            token: endpoint("token")?,
            userinfo: endpoint("userinfo")?,
            keys: endpoint("keys")?,
            issuer,
        })
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// User-info endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub uid: Option<String>,
}

impl UserInfo {
    pub fn into_identity(self) -> Result<Identity> {
        if self.sub.trim().is_empty() {
            return Err(AuthError::Provider {
                status: None,
                detail: "user info response has an empty subject".into(),
            });
        }
        let provider_user_id = self.uid.unwrap_or_else(|| self.sub.clone());
        Ok(Identity {
            sub: self.sub,
            email: self.email,
            name: self.name,
            groups: self.groups,
            provider_user_id,
        })
    }
}

/// OAuth2 client bound to one provider
pub struct ProviderClient {
    endpoints: ProviderEndpoints,
    client_id: String,
    client_secret: Secret,
    redirect_uri: Url,
    http: reqwest::Client,
    keys: JwksKeyStore,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("endpoints", &self.endpoints)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.client_id.trim().is_empty() {
            return Err(AuthError::Config("provider client id is empty".into()));
        }
        if config.client_secret.is_blank() {
            return Err(AuthError::Config("provider client secret is empty".into()));
        }

        let endpoints = ProviderEndpoints::from_domain(&config.domain)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {e}")))?;

        let keys = JwksKeyStore::new(
            endpoints.keys.clone(),
            endpoints.issuer.clone(),
            config.client_id.clone(),
            config.jwks_cache_ttl,
            http.clone(),
        );

        Ok(Self {
            endpoints,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            http,
            keys,
        })
    }

    pub const fn endpoints(&self) -> &ProviderEndpoints {
        &self.endpoints
    }

    /// Authorize URL the browser is sent to.
    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.endpoints.authorize.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", OIDC_SCOPES)
            .append_pair("redirect_uri", self.redirect_uri.as_str())
            .append_pair("state", state);
        url
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose()),
        ];

        let response = self
            .http
            .post(self.endpoints.token.clone())
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let response = check_status(response, "token exchange").await?;
        response.json().await.map_err(|e| AuthError::Provider {
            status: None,
            detail: format!("invalid token response: {e}"),
        })
    }

    pub async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http
            .get(self.endpoints.userinfo.clone())
            .header(ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = check_status(response, "user info").await?;
        response.json().await.map_err(|e| AuthError::Provider {
            status: None,
            detail: format!("invalid user info response: {e}"),
        })
    }

    /// Verify an ID token against the provider's published keys.
    pub async fn verify_id_token(&self, id_token: &str) -> Result<ProviderClaims> {
        self.keys.validate(id_token).await
    }
}

async fn check_status(response: reqwest::Response, call: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Provider {
        status: Some(status.as_u16()),
        detail: format!("{call} failed: {body}"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::test_support::{ACCESS_TOKEN, CLIENT_ID, CLIENT_SECRET, MockProvider};

    #[test]
    fn test_endpoints_from_bare_domain() {
        let endpoints = ProviderEndpoints::from_domain("example.okta.com").unwrap();
        assert_eq!(endpoints.issuer, "https://example.okta.com/oauth2/default");
        assert_eq!(
            endpoints.authorize.as_str(),
            "https://example.okta.com/oauth2/default/v1/authorize"
        );
        assert_eq!(
            endpoints.token.as_str(),
            "https://example.okta.com/oauth2/default/v1/token"
        );
        assert_eq!(
            endpoints.userinfo.as_str(),
            "https://example.okta.com/oauth2/default/v1/userinfo"
        );
        assert_eq!(
            endpoints.keys.as_str(),
            "https://example.okta.com/oauth2/default/v1/keys"
        );
    }

    #[test]
    fn test_endpoints_keep_explicit_scheme() {
        let endpoints = ProviderEndpoints::from_domain("http://127.0.0.1:8081/").unwrap();
        assert_eq!(endpoints.issuer, "http://127.0.0.1:8081/oauth2/default");
    }

    #[test]
    fn test_endpoints_reject_empty_domain() {
        assert!(matches!(
            ProviderEndpoints::from_domain("  "),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_client_requires_secret() {
        let mut config = ProviderConfig::new(
            "example.okta.com",
            CLIENT_ID,
            "",
            Url::parse("http://localhost:8080/auth/callback").unwrap(),
        );
        assert!(matches!(
            ProviderClient::new(&config),
            Err(AuthError::Config(_))
        ));
        config.client_secret = Secret::from(CLIENT_SECRET);
        assert!(ProviderClient::new(&config).is_ok());
    }

    #[test]
    fn test_client_endpoints_follow_domain() {
        let config = ProviderConfig::new(
            "https://login.example.com/",
            CLIENT_ID,
            CLIENT_SECRET,
            Url::parse("http://localhost:8080/auth/callback").unwrap(),
        );
        let client = ProviderClient::new(&config).unwrap();
        assert_eq!(
            client.endpoints().issuer,
            "https://login.example.com/oauth2/default"
        );
        assert_eq!(client.endpoints().keys.path(), "/oauth2/default/v1/keys");
    }

    #[test]
    fn test_authorization_url() {
        let config = ProviderConfig::new(
            "example.okta.com",
            CLIENT_ID,
            CLIENT_SECRET,
            Url::parse("http://localhost:8080/auth/callback").unwrap(),
        );
        let client = ProviderClient::new(&config).unwrap();
        let url = client.authorization_url("abc123");

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/oauth2/default/v1/authorize");
        assert_eq!(pairs["client_id"], CLIENT_ID);
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["scope"], "openid profile email groups");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8080/auth/callback");
        assert_eq!(pairs["state"], "abc123");
    }

    #[test]
    fn test_debug_hides_client_secret() {
        let config = ProviderConfig::new(
            "example.okta.com",
            CLIENT_ID,
            CLIENT_SECRET,
            Url::parse("http://localhost:8080/auth/callback").unwrap(),
        );
        let client = ProviderClient::new(&config).unwrap();
        assert!(!format!("{client:?}").contains(CLIENT_SECRET));
    }

    #[test]
    fn test_user_info_falls_back_to_sub() {
        let info: UserInfo = serde_json::from_str(r#"{"sub": "00u1", "email": "a@example.com"}"#)
            .unwrap();
        let identity = info.into_identity().unwrap();
        assert_eq!(identity.provider_user_id, "00u1");
        assert!(identity.groups.is_empty());
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let provider = MockProvider::start().await;
        let client = ProviderClient::new(&provider.provider_config()).unwrap();

        let tokens = client.exchange_code("auth-code-1").await.unwrap();
        assert_eq!(tokens.access_token, ACCESS_TOKEN);
        assert!(tokens.id_token.is_none());

        let form = provider.state.last_token_form.lock().clone();
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "auth-code-1");
        assert_eq!(form["client_id"], CLIENT_ID);
        assert_eq!(form["client_secret"], CLIENT_SECRET);
        assert_eq!(form["redirect_uri"], "http://localhost:8080/auth/callback");
    }

    #[tokio::test]
    async fn test_exchange_code_upstream_error_keeps_status() {
        let provider = MockProvider::start().await;
        *provider.state.token_status.lock() = reqwest::StatusCode::BAD_REQUEST;
        let client = ProviderClient::new(&provider.provider_config()).unwrap();

        let err = client.exchange_code("stale-code").await.unwrap_err();
        assert!(matches!(err, AuthError::Provider { status: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_fetch_user_info() {
        let provider = MockProvider::start().await;
        let client = ProviderClient::new(&provider.provider_config()).unwrap();

        let info = client.fetch_user_info(ACCESS_TOKEN).await.unwrap();
        assert_eq!(info.sub, "00u1alice");
        assert_eq!(info.groups, vec!["cosmos-team-okta-group"]);
        assert_eq!(provider.state.userinfo_requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_user_info_rejected_token() {
        let provider = MockProvider::start().await;
        let client = ProviderClient::new(&provider.provider_config()).unwrap();

        let err = client.fetch_user_info("wrong-token").await.unwrap_err();
        assert!(matches!(err, AuthError::Provider { status: Some(401), .. }));
    }
}
