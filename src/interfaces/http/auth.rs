use super::state::AppState;
use crate::domain::error::Result;
use crate::domain::user::UserIdentity;
use actix_web::http::header;
use actix_web::HttpRequest;

/// Token from `Authorization: Bearer <token>`, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn authenticate(req: &HttpRequest, state: &AppState) -> Result<UserIdentity> {
    state.identity.user_for_token(bearer_token(req)).await
}
