//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        BatchCheckBody, BatchCheckPayload, CheckResponseBody, CheckResponsePayload, ErrorResponse,
        FormatPayload, FormatResponseBody, GradeProfileResponse, HealthResponse,
    },
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        handlers::list_grade_profiles,
        handlers::get_grade_profile,
        handlers::check_response,
        handlers::format_response,
        handlers::batch_check,
    ),
    components(
        schemas(
            GradeProfileResponse,
            CheckResponsePayload,
            CheckResponseBody,
            FormatPayload,
            FormatResponseBody,
            BatchCheckPayload,
            BatchCheckBody,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "STOP-TALK API", description = "Grade pacing and response validation for spoken social-skill coaching")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/health", get(handlers::health))
        .route("/grade-profiles", get(handlers::list_grade_profiles))
        .route("/grade-profiles/{grade}", get(handlers::get_grade_profile))
        .route("/responses/check", post(handlers::check_response))
        .route("/responses/format", post(handlers::format_response))
        .route("/responses/batch-check", post(handlers::batch_check))
        .route("/ws", get(ws_handler))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    // Create the final router that merges the stateful routes
    // with the stateless routes (like Swagger UI).
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use stoptalk_core::grade::GradeBand;
    use tower::ServiceExt;
    use tracing::Level;

    fn app() -> Router {
        create_router(Arc::new(AppState::new(Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            log_level: Level::INFO,
            default_grade: GradeBand::SixToEight,
            turn_signal_seed: Some(1),
            max_character_exchanges: 5,
        })))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_grade_profile_route() {
        let response = app()
            .oneshot(Request::get("/grade-profiles/11").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["gradeLabel"], "9-12");
        assert_eq!(body["maxWords"], 20);
    }

    #[tokio::test]
    async fn test_check_route() {
        let request = Request::post("/responses/check")
            .header("content-type", "application/json")
            .body(Body::from(
                r#"{"text":"What's your name? What do you like?","gradeLevel":"1"}"#,
            ))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["issues"],
            serde_json::json!(["MultipleQuestions", "MissingTurnSignal"])
        );
    }

    #[test]
    fn test_openapi_lists_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/grade-profiles/{grade}"));
        assert!(doc.paths.paths.contains_key("/responses/check"));
    }
}
