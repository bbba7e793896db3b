// user-backend/src/service/auth_service.rs
use crate::api::dto::auth_dto::{CreateUserRequest, LoginRequest, LoginResponse};
use crate::domain::user_model::SafeUser;
use crate::error::{AppError, AppResult};
use crate::repository::user_repository::{CreateUser, UserRepository};
use crate::utils::password::PasswordManager;
use crate::utils::validation::{
    validate_password_not_equal, validate_password_value, validate_username_value,
    ValidationConfig, ValidationConfigCache, ValidationError,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const USERNAME_TAKEN: &str = "Username already exists";

/// 登録リクエストの各項目と項目間の関係をチェックし、保存する値を返す
fn validate_registration<'a>(
    config: &ValidationConfig,
    payload: &'a CreateUserRequest,
) -> Result<(&'a str, &'a str), ValidationError> {
    let username = validate_username_value(config, &payload.username)?;
    let password = validate_password_value(config, &payload.password)?;
    validate_password_not_equal(username, password)?;
    Ok((username, password))
}

/// 認証サービス
pub struct AuthService {
    user_repo: Arc<UserRepository>,
    password_manager: Arc<PasswordManager>,
    validation: Arc<ValidationConfigCache>,
}

impl AuthService {
    pub fn new(
        user_repo: Arc<UserRepository>,
        password_manager: Arc<PasswordManager>,
        validation: Arc<ValidationConfigCache>,
    ) -> Self {
        Self {
            user_repo,
            password_manager,
            validation,
        }
    }

    // --- ユーザー登録・ログイン ---

    /// ユーザー登録
    ///
    /// 形式チェック → 重複チェック → ハッシュ化 → 保存 の順に行う。
    pub async fn create_user(&self, payload: CreateUserRequest) -> AppResult<SafeUser> {
        let config = self.validation.get();

        let (username, password) = validate_registration(&config, &payload)
            .inspect_err(|e| warn!(reason = %e, "Registration rejected"))?;

        if self.user_repo.is_username_taken(username).await? {
            warn!(username = %username, "Registration attempt with existing username");
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }

        let password_hash = self.hash_in_background(password.to_string()).await?;

        let user = self
            .user_repo
            .create(CreateUser {
                username: username.to_string(),
                password_hash,
            })
            .await
            // 重複チェックと保存の間に同名で登録された場合
            .map_err(|e| AppError::from_unique_violation(e, USERNAME_TAKEN))?;

        info!(
            user_id = user.id,
            username = %user.username,
            "User registered successfully"
        );

        Ok(user.into())
    }

    /// ログイン（形式チェックは行わない）
    pub async fn login(&self, payload: LoginRequest) -> AppResult<LoginResponse> {
        let user = self
            .user_repo
            .find_by_username(&payload.username)
            .await?
            .ok_or_else(|| {
                warn!(username = %payload.username, "Login attempt for unknown user");
                AppError::NotFound("User does not exist, please register first".to_string())
            })?;

        let is_valid = self
            .verify_in_background(payload.password, user.password_hash.clone())
            .await
            .map_err(|e| {
                error!(user_id = user.id, error = %e, "Password verification failed");
                AppError::InternalServerError("Authentication failed".to_string())
            })?;

        if !is_valid {
            warn!(user_id = user.id, "Login attempt with incorrect password");
            return Err(AppError::Unauthorized(
                "Incorrect username or password".to_string(),
            ));
        }

        info!(user_id = user.id, username = %user.username, "User logged in successfully");

        Ok(LoginResponse {
            msg: "Login successful".to_string(),
        })
    }

    // --- ハッシュ処理（CPU負荷が高いためブロッキングスレッドで実行） ---

    async fn hash_in_background(&self, password: String) -> AppResult<String> {
        let manager = Arc::clone(&self.password_manager);
        let hash = tokio::task::spawn_blocking(move || manager.hash_password(&password))
            .await
            .map_err(|e| AppError::InternalServerError(format!("Hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_in_background(&self, password: String, hash: String) -> AppResult<bool> {
        let manager = Arc::clone(&self.password_manager);
        let is_valid = tokio::task::spawn_blocking(move || manager.verify_password(&password, &hash))
            .await
            .map_err(|e| {
                AppError::InternalServerError(format!("Verification task failed: {}", e))
            })??;
        Ok(is_valid)
    }
}
