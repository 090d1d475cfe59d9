use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::services::session::SessionId;

pub const SESSION_COOKIE: &str = "menu_sid";

/// The browser session a request belongs to, resolved by [`ensure_session`].
#[derive(Debug, Clone, Copy)]
pub struct Session(pub SessionId);

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|part| part.trim().strip_prefix(&prefix).map(str::to_string))
}

/// Middleware that attaches a session id to every request, issuing a fresh
/// `menu_sid` cookie when the browser has none (or an unreadable one).
pub async fn ensure_session(mut request: Request, next: Next) -> Response {
    let existing = get_cookie(request.headers(), SESSION_COOKIE)
        .and_then(|v| v.parse::<Uuid>().ok())
        .map(SessionId);

    let (session, is_new) = match existing {
        Some(id) => (id, false),
        None => (SessionId::new(), true),
    };
    request.extensions_mut().insert(Session(session));

    let mut response = next.run(request).await;
    if is_new {
        let cookie = format!("{SESSION_COOKIE}={session}; HttpOnly; SameSite=Lax; Path=/");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("could not build session cookie: {e}"),
        }
    }
    response
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .copied()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Session layer not installed"))
    }
}
