pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod storage;
pub mod validation;

use axum::{
    extract::DefaultBodyLimit,
    handler::Handler,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::auth::Guard;
use crate::config::{AppConfig, Environment};
use crate::handlers::{elevated, protected, public};
use crate::middleware::{GuardState, PIN_HEADER};
use crate::state::AppState;

/// Builds the full HTTP application around `state`.
///
/// GET and write methods share paths but not guards, so each guard is attached
/// to its handler rather than to a nested router.
pub fn app(state: AppState) -> Router {
    let pipeline = state.pipeline.clone();
    let guard = move |guard: Guard| from_fn_with_state(GuardState::new(pipeline.clone(), guard), middleware::require);

    let auth_routes = Router::new()
        .route("/api/auth/login", post(public::session::login))
        .route("/api/auth/me", get(protected::account::me.layer(guard(Guard::AUTHENTICATED))))
        .route("/api/auth/logout", post(protected::account::logout.layer(guard(Guard::AUTHENTICATED))))
        .route("/api/auth/pin", put(protected::account::set_pin.layer(guard(Guard::AUTHENTICATED))));

    let project_routes = Router::new()
        .route(
            "/api/projects",
            get(public::projects::list).post(elevated::projects::create.layer(guard(Guard::ADMIN))),
        )
        .route(
            "/api/projects/:id",
            get(public::projects::show)
                .post(elevated::projects::update.layer(guard(Guard::ADMIN)))
                .delete(elevated::projects::destroy.layer(guard(Guard::ADMIN_WITH_PIN))),
        );

    let skill_routes = Router::new()
        .route(
            "/api/skills",
            get(public::skills::list).post(elevated::skills::create.layer(guard(Guard::ADMIN))),
        )
        .route(
            "/api/skills/:id",
            put(elevated::skills::update.layer(guard(Guard::ADMIN)))
                .delete(elevated::skills::destroy.layer(guard(Guard::ADMIN_WITH_PIN))),
        );

    let contact_routes = Router::new().route(
        "/api/contact",
        post(public::contact::create).get(elevated::contact::list.layer(guard(Guard::ADMIN))),
    );

    let body_limit = state.config.api.max_request_size_bytes;
    let request_logging = state.config.api.enable_request_logging;
    let cors = cors_layer(&state.config);
    let uploads = ServeDir::new(&state.config.storage.upload_dir);

    let router = Router::new()
        // Public
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .merge(auth_routes)
        .merge(project_routes)
        .merge(skill_routes)
        .merge(contact_routes)
        .nest_service("/storage", uploads)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors);

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };
    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if !config.security.enable_cors {
        return CorsLayer::new();
    }
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(PIN_HEADER),
        ])
        .expose_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let mut config = AppConfig::development();
        config.security.jwt_secret = "router-test-secret".to_string();
        config.security.argon2_memory_kib = 1024;
        config.security.argon2_iterations = 1;
        app(AppState::in_memory(config).unwrap())
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn public_listing_needs_no_token() {
        let response = test_app()
            .oneshot(Request::get("/api/skills").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn guarded_write_on_shared_path_needs_token() {
        let request = Request::post("/api/skills")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Rust"}"#))
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "MISSING_TOKEN");
    }

    #[tokio::test]
    async fn delete_checks_token_before_pin() {
        let request = Request::delete("/api/projects/00000000-0000-0000-0000-000000000000")
            .header(PIN_HEADER, "1234")
            .body(Body::empty())
            .unwrap();
        let response = test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = test_app()
            .oneshot(Request::get("/api/nothing-here").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
