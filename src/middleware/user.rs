use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::AppState;

/// The user a request acts as. There is no login: every request resolves to
/// the seeded test user looked up at startup.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: i64,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser {
            user_id: state.test_user_id,
        })
    }
}
