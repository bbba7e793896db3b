// user-backend/src/api/dto/auth_dto.rs

use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- リクエストDTO ---

/// ユーザー登録リクエスト
///
/// 文字列以外の値もバリデーションで「文字列ではない」と報告するため、
/// 各項目は JSON 値のまま受け取る（欠落時は null）。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Value,

    #[serde(default)]
    pub password: Value,
}

/// ログインリクエスト
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// --- レスポンスDTO ---

/// ログインレスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub msg: String,
}
