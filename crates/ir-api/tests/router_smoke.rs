use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn livez_healthy_and_profile_requires_auth() {
    let state = ir_api::test_state("test-key");
    let app = ir_api::create_router(state);

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);
    assert!(livez_response.headers().contains_key("x-request-id"));

    let unauthorized = app
        .oneshot(
            Request::builder()
                .uri("/api/profile/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_routes_return_json_not_found() {
    let app = ir_api::create_router(ir_api::test_state("test-key"));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/queue/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
