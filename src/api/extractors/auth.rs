use axum::{
    extract::{FromRequestParts, FromRef},
    http::{header::AUTHORIZATION, request::Parts},
};
use crate::state::AppState;
use crate::domain::models::auth::{Claims, ADMIN_AUDIENCE};
use crate::error::AppError;
use std::sync::Arc;
use jsonwebtoken::{decode, Validation, Algorithm};
use tracing::{warn, Span};

/// A caller whose identity token carries the `isAdmin` claim.
pub struct AdminUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::PermissionDenied)?;

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_audience(&[ADMIN_AUDIENCE]);
        validation.set_issuer(&[app_state.config.auth_issuer.as_str()]);

        let token_data = decode::<Claims>(token.trim(), &app_state.jwt_decoding_key, &validation)
            .map_err(|e| {
                warn!("Rejected identity token: {}", e);
                AppError::PermissionDenied
            })?;

        if !token_data.claims.is_admin {
            warn!(caller_id = %token_data.claims.sub, "Caller lacks admin claim");
            return Err(AppError::PermissionDenied);
        }

        Span::current().record("caller_id", token_data.claims.sub.as_str());

        Ok(AdminUser { user_id: token_data.claims.sub })
    }
}
