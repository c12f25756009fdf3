//! Bearer secret authentication
//!
//! When a secret is configured every request must carry
//! `Authorization: Bearer <secret>`. An empty secret disables the check.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::controller::error::ControllerError;

/// Authentication state shared across requests
#[derive(Debug, Clone)]
pub struct AuthState {
    secret: Arc<str>,
}

impl AuthState {
    /// Create a new authentication state
    pub fn new(secret: &str) -> Self {
        Self { secret: Arc::from(secret) }
    }

    /// Whether requests need a token at all
    pub fn is_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Check an `Authorization` header value
    pub fn authorize(&self, header: Option<&str>) -> bool {
        if !self.is_enabled() {
            return true;
        }

        header
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| constant_time_compare(&self.secret, token))
            .unwrap_or(false)
    }
}

/// Constant-time string comparison to prevent timing attacks
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }

    result == 0
}

/// Authentication middleware
pub async fn auth_middleware(
    State(auth_state): State<AuthState>,
    req: Request,
    next: Next,
) -> Result<Response, ControllerError> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    if !auth_state.authorize(header) {
        log::warn!("Rejected unauthorized controller request to {}", req.uri().path());
        return Err(ControllerError::Unauthorized);
    }

    Ok(next.run(req).await)
}
