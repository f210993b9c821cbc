//! OAuth2 authorization-code flow

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;
use url::Url;

use super::error::{AuthError, Result};
use super::identity::IdentitySource;
use super::session::SessionTokenService;
use crate::constants::{FRONTEND_CALLBACK_PATH, STATE_BYTES};

/// Query parameters the provider sends back to the callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Outcome of starting a login
#[derive(Debug, Clone)]
pub enum LoginStart {
    /// Send the browser to the provider; `state` goes into the state cookie.
    Provider { state: String, authorize_url: Url },
    /// Development bypass; the session token is already in `redirect`.
    Development { redirect: Url },
}

/// Drives login from the first redirect to the issued session token.
#[derive(Debug)]
pub struct OAuth2Flow {
    source: Arc<IdentitySource>,
    sessions: Arc<SessionTokenService>,
    frontend_callback: Url,
}

impl OAuth2Flow {
    pub fn new(
        source: Arc<IdentitySource>,
        sessions: Arc<SessionTokenService>,
        frontend_url: &Url,
    ) -> Self {
        let mut frontend_callback = frontend_url.clone();
        let path = format!(
            "{}{FRONTEND_CALLBACK_PATH}",
            frontend_url.path().trim_end_matches('/')
        );
        frontend_callback.set_path(&path);
        frontend_callback.set_query(None);

        Self {
            source,
            sessions,
            frontend_callback,
        }
    }

    pub fn initiate_login(&self) -> Result<LoginStart> {
        match self.source.as_ref() {
            IdentitySource::Provider(provider) => {
                let state = generate_state()?;
                let authorize_url = provider.authorization_url(&state);
                tracing::debug!("Redirecting to identity provider");
                Ok(LoginStart::Provider {
                    state,
                    authorize_url,
                })
            }
            IdentitySource::Development(identity) => {
                let token = self.sessions.issue(identity)?;
                tracing::warn!(sub = %identity.sub, "Development login, identity provider bypassed");
                Ok(LoginStart::Development {
                    redirect: self.session_redirect(&token),
                })
            }
        }
    }

    /// Complete the login. `stored_state` is the value read from the state cookie.
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
        stored_state: Option<&str>,
    ) -> Result<Url> {
        let result = self.complete(params, stored_state).await;

        #[cfg(feature = "metrics")]
        crate::observability::record_login(result.as_ref().map_or_else(AuthError::code, |_| "success"));

        result
    }

    async fn complete(&self, params: &CallbackParams, stored_state: Option<&str>) -> Result<Url> {
        if let Some(error) = &params.error {
            return Err(AuthError::ProviderDenied {
                error: error.clone(),
                description: params.error_description.clone(),
            });
        }

        let IdentitySource::Provider(provider) = self.source.as_ref() else {
            return Err(AuthError::NoProvider);
        };

        let presented = params.state.as_deref().unwrap_or_default();
        if presented.is_empty() || !states_match(presented, stored_state.unwrap_or_default()) {
            tracing::warn!(
                has_cookie = stored_state.is_some(),
                "Login state mismatch"
            );
            return Err(AuthError::Csrf);
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AuthError::Provider {
                status: None,
                detail: "callback is missing the authorization code".into(),
            })?;

        let tokens = provider.exchange_code(code).await?;
        let identity = provider
            .fetch_user_info(&tokens.access_token)
            .await?
            .into_identity()?;

        if let Some(id_token) = tokens.id_token.as_deref() {
            let claims = provider.verify_id_token(id_token).await?;
            if claims.sub != identity.sub {
                return Err(AuthError::Provider {
                    status: None,
                    detail: "ID token subject does not match user info".into(),
                });
            }
        }

        let token = self.sessions.issue(&identity)?;
        tracing::info!(
            sub = %identity.sub,
            groups = identity.groups.len(),
            ttl_secs = self.sessions.ttl().as_secs(),
            "Login completed"
        );
        Ok(self.session_redirect(&token))
    }

    fn session_redirect(&self, token: &str) -> Url {
        let mut url = self.frontend_callback.clone();
        url.query_pairs_mut().append_pair("token", token);
        url
    }
}

/// Random URL-safe state value
pub fn generate_state() -> Result<String> {
    let mut bytes = [0u8; STATE_BYTES];
    getrandom::fill(&mut bytes)
        .map_err(|e| AuthError::Internal(format!("entropy source unavailable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Compare without short-circuiting on the first differing byte.
fn states_match(presented: &str, stored: &str) -> bool {
    let (a, b) = (presented.as_bytes(), stored.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
