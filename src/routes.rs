use axum::{Router, middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        auth::auth_handler,
        certificates::certificates_handler,
        courses::courses_handler,
        health::health_check,
        learning_paths::learning_paths_handler,
        payments::{payments_handler, plans_handler},
        subscriptions::subscriptions_handler,
        users::users_handler,
    },
    middleware::auth,
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .route("/health", get(health_check))
        .nest("/auth", auth_handler())
        // Routers mixing public and protected routes apply auth per route
        .nest("/courses", courses_handler(app_state.clone()))
        .nest("/learning-paths", learning_paths_handler(app_state.clone()))
        .nest("/certificates", certificates_handler(app_state.clone()))
        .nest("/plans", plans_handler())
        // Fully protected routers
        .nest(
            "/users",
            users_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest(
            "/payments",
            payments_handler().layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .nest(
            "/subscriptions",
            subscriptions_handler()
                .layer(middleware::from_fn_with_state(app_state.clone(), auth)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, db::DBClient};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use tower::ServiceExt;

    // The pool never connects: every request below is answered before any query runs.
    fn test_router() -> Router {
        let config = Config::for_tests();
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database_url)
            .unwrap();
        create_router(AppState {
            env: Arc::new(config),
            db_client: DBClient::new(pool),
        })
    }

    fn router_with_pool(pool: sqlx::PgPool) -> Router {
        create_router(AppState {
            env: Arc::new(Config::for_tests()),
            db_client: DBClient::new(pool),
        })
    }

    fn bearer_for(user_id: uuid::Uuid) -> String {
        let config = Config::for_tests();
        let token =
            crate::utils::token::create_token(&user_id.to_string(), config.jwt_secret.as_bytes(), 60)
                .unwrap();
        format!("Bearer {}", token)
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "success");
    }

    #[tokio::test]
    async fn profile_requires_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["status"], "fail");
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/subscriptions")
                    .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_signed_with_another_key_is_rejected() {
        let token = crate::utils::token::create_token(
            &uuid::Uuid::new_v4().to_string(),
            b"some-other-secret",
            60,
        )
        .unwrap();

        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/api/users/me/progress")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_course_creation_requires_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/courses")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn payment_requires_token() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/payments")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"plan_id":1,"amount":9.99}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn registration_with_mismatched_passwords_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/register")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"username":"ada","email":"ada@example.com","password":"secret1","confirmPassword":"secret2"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], "fail");
    }

    #[tokio::test]
    async fn login_with_malformed_email_is_rejected() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"email":"not-an-email","password":"secret1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn token_of_deleted_user_is_rejected(pool: sqlx::PgPool) {
        let response = router_with_pool(pool)
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .header(header::AUTHORIZATION, bearer_for(uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn database_failure_during_auth_is_a_server_error(pool: sqlx::PgPool) {
        let router = router_with_pool(pool.clone());
        pool.close().await;

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/users/me")
                    .header(header::AUTHORIZATION, bearer_for(uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["status"], "fail");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn duplicate_email_is_a_conflict(pool: sqlx::PgPool) {
        let register = |username: &str| {
            Request::builder()
                .method("POST")
                .uri("/api/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"username":"{}","email":"ada@example.com","password":"secret12","confirmPassword":"secret12"}}"#,
                    username
                )))
                .unwrap()
        };

        let router = router_with_pool(pool);

        let first = router.clone().oneshot(register("ada")).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = router.oneshot(register("ada2")).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(second).await["status"], "fail");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn replayed_payment_request_returns_the_first_payment(pool: sqlx::PgPool) {
        let db = DBClient::new(pool.clone());
        let user = crate::db::fixtures::user(&db).await;
        let plan = crate::db::fixtures::plan(&pool, "Monthly").await;
        let router = router_with_pool(pool);

        let pay = |amount: &str| {
            Request::builder()
                .method("POST")
                .uri("/api/payments")
                .header(header::AUTHORIZATION, bearer_for(user.id))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"plan_id":{},"amount":{},"card_number":"4242424242424242","request_id":"checkout-1"}}"#,
                    plan.id, amount
                )))
                .unwrap()
        };

        let first = router.clone().oneshot(pay("9.99")).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let first = json_body(first).await;
        assert_eq!(first["status"], "completed");

        let second = router.clone().oneshot(pay("9.99")).await.unwrap();
        assert_eq!(second.status(), StatusCode::OK);
        let second = json_body(second).await;
        assert_eq!(second["payment_id"], first["payment_id"]);
        assert_eq!(second["subscription"]["id"], first["subscription"]["id"]);

        let oversized = router.oneshot(pay("1000000000")).await.unwrap();
        assert_eq!(oversized.status(), StatusCode::BAD_REQUEST);
    }
}
