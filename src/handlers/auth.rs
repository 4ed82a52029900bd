use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::Role;
use crate::state::AppState;

pub const BUILTIN_ADMIN_ID: &str = "admin";

/// Identity and role of whoever made the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub role: Role,
}

impl Caller {
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub fn resolve_token(state: &AppState, token: &str) -> Result<Caller, AppError> {
    if token == state.config.admin_token {
        return Ok(Caller {
            user_id: BUILTIN_ADMIN_ID.to_string(),
            role: Role::Admin,
        });
    }

    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_token(&db, token)?
    };

    user.map(|u| Caller {
        user_id: u.id,
        role: u.role,
    })
    .ok_or(AppError::Unauthorized)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        resolve_token(state, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_role_gates() {
        let customer = Caller { user_id: "u".to_string(), role: Role::Customer };
        let staff = Caller { user_id: "s".to_string(), role: Role::Staff };
        assert!(customer.require_staff().is_err());
        assert!(staff.require_staff().is_ok());
        assert!(staff.require_admin().is_err());
    }
}
