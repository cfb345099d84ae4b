//! Per-request session handling: resolve the visitor's session from its
//! cookie, hand it to the handler, then persist it when modified.

use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use storefront_core::{Session, SessionId};
use tracing::{debug, info};

use crate::app::AppState;
use crate::error::ApiError;

pub struct SessionScope {
    session: Session,
    fresh: bool,
    correlation_id: String,
}

impl SessionScope {
    /// Loads the session named by the cookie. A missing cookie or an id the
    /// store does not know starts a new session under a generated id.
    pub async fn open(
        state: &AppState,
        headers: &HeaderMap,
        correlation_id: String,
    ) -> Result<Self, ApiError> {
        if let Some(raw_id) = cookie_value(headers, &state.session.cookie_name) {
            let id = SessionId(raw_id.to_string());
            let loaded = state
                .sessions
                .load(&id)
                .await
                .map_err(|error| ApiError::from_application(error, &correlation_id))?;
            if let Some(session) = loaded {
                return Ok(Self { session, fresh: false, correlation_id });
            }
            debug!(
                event_name = "session.unknown_cookie",
                correlation_id = %correlation_id,
                session_id = %id,
                "cookie names no stored session; starting a new one"
            );
        }

        let session = Session::new(SessionId::generate());
        info!(
            event_name = "session.created",
            correlation_id = %correlation_id,
            session_id = %session.id(),
            "new session started"
        );
        Ok(Self { session, fresh: true, correlation_id })
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Saves a modified session and turns `body` into the response, adding
    /// `Set-Cookie` for sessions created by this request.
    pub async fn finish(
        mut self,
        state: &AppState,
        body: impl IntoResponse,
    ) -> Result<Response, ApiError> {
        let mut saved = false;
        if self.session.is_modified() {
            let version = state
                .sessions
                .save(&self.session, state.session.concurrency)
                .await
                .map_err(|error| ApiError::from_application(error, &self.correlation_id))?;
            self.session.mark_saved(version);
            saved = true;
        }

        let mut response = body.into_response();
        if self.fresh && saved {
            let cookie = format!(
                "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
                state.session.cookie_name,
                self.session.id(),
                state.session.max_age_secs
            );
            let value = HeaderValue::from_str(&cookie).map_err(|error| {
                ApiError::internal(format!("invalid session cookie: {error}"), &self.correlation_id)
            })?;
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
        Ok(response)
    }
}

fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}
