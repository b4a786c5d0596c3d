use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest, UserResponse},
        error::AuthError,
        services::{authenticate, register_user},
        validation::{validate_login, validate_register},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

fn bad_json(rejection: JsonRejection) -> AuthError {
    warn!(error = %rejection.body_text(), "unreadable request body");
    AuthError::Validation(rejection.body_text())
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let Json(payload) = payload.map_err(bad_json)?;

    let input = validate_register(payload).map_err(|msg| {
        warn!(reason = %msg, "invalid registration payload");
        AuthError::Validation(msg)
    })?;

    let user = register_user(&state, input).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let Json(payload) = payload.map_err(bad_json)?;

    let input = validate_login(payload).map_err(|msg| {
        warn!(reason = %msg, "invalid login payload");
        AuthError::Validation(msg)
    })?;

    let user = authenticate(&state, input).await?;
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::{IntoResponse, Response};
    use serde_json::{json, Value};

    async fn into_parts(res: Response) -> (StatusCode, Value) {
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn post_register(state: &AppState, body: Value) -> (StatusCode, Value) {
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        let res = register(State(state.clone()), Ok(Json(req))).await.into_response();
        into_parts(res).await
    }

    async fn post_login(state: &AppState, body: Value) -> (StatusCode, Value) {
        let req: LoginRequest = serde_json::from_value(body).unwrap();
        let res = login(State(state.clone()), Ok(Json(req))).await.into_response();
        into_parts(res).await
    }

    fn alice() -> Value {
        json!({
            "email": "user@example.com",
            "username": "alice",
            "password": "Str0ngPass!",
        })
    }

    #[tokio::test]
    async fn register_returns_created_user_without_hash() {
        let state = AppState::fake();
        let (status, body) = post_register(&state, alice()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["email"], "user@example.com");
        assert_eq!(body["username"], "alice");
        assert_eq!(body["isAdmin"], false);
        assert!(body["token"].is_null());
        assert!(body.get("password").is_none());
        assert!(body.get("passwordHash").is_none());
        assert!(!body.to_string().contains("argon2"));
    }

    #[tokio::test]
    async fn register_validation_error_is_400_message() {
        let state = AppState::fake();
        let (status, body) = post_register(
            &state,
            json!({ "email": "user@example.com", "username": "alice" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "message": "\"password\" is required" }));
    }

    #[tokio::test]
    async fn register_twice_is_400_already_registered() {
        let state = AppState::fake();
        post_register(&state, alice()).await;
        let (status, body) = post_register(&state, alice()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "The user already registered before");
    }

    #[tokio::test]
    async fn login_returns_same_shape_as_register() {
        let state = AppState::fake();
        let (_, registered) = post_register(&state, alice()).await;
        let (status, body) = post_login(
            &state,
            json!({ "email": "USER@example.com", "password": "Str0ngPass!" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, registered);
    }

    #[tokio::test]
    async fn login_failures_are_identical() {
        let state = AppState::fake();
        post_register(&state, alice()).await;

        let unknown = post_login(
            &state,
            json!({ "email": "nobody@example.com", "password": "Str0ngPass!" }),
        )
        .await;
        let wrong = post_login(
            &state,
            json!({ "email": "user@example.com", "password": "wrongpass" }),
        )
        .await;

        assert_eq!(unknown.0, StatusCode::BAD_REQUEST);
        assert_eq!(unknown, wrong);
        assert_eq!(
            unknown.1["message"],
            "The user not registered before or wrong password"
        );
    }
}
