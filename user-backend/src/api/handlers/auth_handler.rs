// user-backend/src/api/handlers/auth_handler.rs
use crate::api::dto::auth_dto::{CreateUserRequest, LoginRequest};
use crate::api::AppState;
use crate::error::AppResult;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Router,
};
use tracing::info;

// --- 認証ハンドラー ---

/// ユーザー登録
pub async fn create_user_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    info!(username = %payload.username, "User registration attempt");

    let user = app_state.auth_service.create_user(payload).await?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// ログイン
pub async fn login_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    info!(username = %payload.username, "User login attempt");

    let response = app_state.auth_service.login(payload).await?;

    Ok(Json(response))
}

// --- ルーター ---

/// 認証ルーターを作成
pub fn auth_router(app_state: AppState) -> Router {
    Router::new()
        .route("/users/", post(create_user_handler))
        .route("/login/", post(login_handler))
        .with_state(app_state)
}
