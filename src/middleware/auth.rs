use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{AuthPipeline, Credentials, Guard};
use crate::error::ApiError;

pub const PIN_HEADER: &str = "x-transaction-pin";
pub const PIN_QUERY_PARAM: &str = "transaction_pin";

/// State for one guarded route: the shared pipeline plus that route's policy
#[derive(Clone)]
pub struct GuardState {
    pub pipeline: Arc<AuthPipeline>,
    pub guard: Guard,
}

impl GuardState {
    pub fn new(pipeline: Arc<AuthPipeline>, guard: Guard) -> Self {
        Self { pipeline, guard }
    }
}

/// Runs the authorization pipeline and injects the resolved `Identity` into
/// request extensions. The handler never runs if any stage rejects.
pub async fn require(State(state): State<GuardState>, mut request: Request, next: Next) -> Response {
    let bearer = bearer_token(request.headers()).map(str::to_string);
    let pin = transaction_pin(&request);

    let credentials = Credentials {
        bearer: bearer.as_deref(),
        pin: pin.as_deref(),
    };

    match state.pipeline.evaluate(&credentials, state.guard).await {
        Ok(identity) => {
            tracing::debug!(user_id = %identity.id, role = %identity.role, "Request authorized");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request rejected: {:?}",
                e
            );
            ApiError::from(e).into_response()
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// Any other scheme, or no header at all, yields `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim())
}

/// PIN from the `X-Transaction-Pin` header, falling back to the query string
fn transaction_pin(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(PIN_HEADER).and_then(|v| v.to_str().ok()) {
        return Some(value.trim().to_string());
    }

    let query = request.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == PIN_QUERY_PARAM)
        .map(|(_, value)| value.trim().to_string())
}
