use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service info
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Portfolio API",
            "version": version,
            "description": "Portfolio site backend: projects, skills and contact messages",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/api/auth/login (public), /api/auth/me, /api/auth/logout, /api/auth/pin (authenticated)",
                "projects": "/api/projects[/:id] (GET public, writes admin, DELETE admin + PIN)",
                "skills": "/api/skills[/:id] (GET public, writes admin, DELETE admin + PIN)",
                "contact": "/api/contact (POST public, GET admin)",
                "storage": "/storage/* (public uploaded files)",
            }
        }
    }))
}

/// GET /health - 503 when the database can't be reached
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let Some(database) = &state.database else {
        return (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "memory"
                }
            })),
        );
    };

    match database.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
