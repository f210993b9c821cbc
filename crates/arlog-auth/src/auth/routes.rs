//! Browser-facing login endpoints under `/auth`

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use time::Duration as TimeDuration;

use super::error::AuthError;
use super::flow::{CallbackParams, LoginStart, OAuth2Flow};
use crate::constants::{SESSION_COOKIE, STATE_COOKIE, STATE_COOKIE_MAX_AGE_SECS};

#[derive(Debug, Clone)]
struct LoginState {
    flow: Arc<OAuth2Flow>,
    secure_cookies: bool,
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    message: &'static str,
}

/// `/auth/login`, `/auth/callback` and `/auth/logout`.
///
/// `secure_cookies` sets the `Secure` attribute on every cookie written here.
pub fn router(flow: Arc<OAuth2Flow>, secure_cookies: bool) -> Router {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
        .with_state(LoginState {
            flow,
            secure_cookies,
        })
}

async fn login(
    State(state): State<LoginState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AuthError> {
    match state.flow.initiate_login()? {
        LoginStart::Provider {
            state: value,
            authorize_url,
        } => {
            let cookie = Cookie::build((STATE_COOKIE, value))
                .path("/")
                .http_only(true)
                .secure(state.secure_cookies)
                .same_site(SameSite::Lax)
                .max_age(TimeDuration::seconds(STATE_COOKIE_MAX_AGE_SECS));
            Ok((jar.add(cookie), Redirect::temporary(authorize_url.as_str())))
        }
        LoginStart::Development { redirect } => Ok((jar, Redirect::temporary(redirect.as_str()))),
    }
}

async fn callback(
    State(state): State<LoginState>,
    query: Result<Query<CallbackParams>, QueryRejection>,
    jar: CookieJar,
) -> Response {
    let stored = jar.get(STATE_COOKIE).map(|c| c.value().to_owned());
    let result = match query {
        Ok(Query(params)) => state.flow.handle_callback(&params, stored.as_deref()).await,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Malformed callback query");
            Err(AuthError::Csrf)
        }
    };

    // Single use: cleared whatever the outcome.
    let jar = jar.add(expired(STATE_COOKIE, state.secure_cookies));

    match result {
        Ok(redirect) => (jar, Redirect::temporary(redirect.as_str())).into_response(),
        Err(err) => (jar, err).into_response(),
    }
}

async fn logout(State(state): State<LoginState>, jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(expired(SESSION_COOKIE, state.secure_cookies));
    tracing::debug!("Session cookie cleared");
    (
        jar,
        Json(LogoutResponse {
            message: "Logged out successfully",
        }),
    )
}

fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(TimeDuration::ZERO)
        .build()
}
