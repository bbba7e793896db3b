// user-backend/src/utils/password.rs

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use std::env;
use thiserror::Error;

/// パスワード関連のエラー
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    HashingError(#[from] argon2::password_hash::Error),

    #[error("Argon2 parameter error: {0}")]
    Argon2Error(#[from] argon2::Error),
}

/// Argon2 設定
#[derive(Debug, Clone)]
pub struct Argon2Config {
    /// メモリコスト（KB）
    pub memory_cost: u32,
    /// 時間コスト（反復回数）
    pub time_cost: u32,
    /// 並列度
    pub parallelism: u32,
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64MB
            time_cost: 3,       // 3回反復
            parallelism: 4,     // 4並列
        }
    }
}

impl Argon2Config {
    /// 環境変数から設定を読み込み
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let memory_cost = env::var("ARGON2_MEMORY_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.memory_cost);

        let time_cost = env::var("ARGON2_TIME_COST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.time_cost);

        let parallelism = env::var("ARGON2_PARALLELISM")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.parallelism);

        Self {
            memory_cost,
            time_cost,
            parallelism,
        }
    }
}

/// パスワードハッシュマネージャー
///
/// 入力の形式チェックは `utils::validation` 側で済ませてから渡す。
pub struct PasswordManager {
    argon2: Argon2<'static>,
}

impl PasswordManager {
    /// 新しいPasswordManagerを作成
    pub fn new(config: Argon2Config) -> Result<Self, PasswordError> {
        let argon2 = Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2::Params::new(config.memory_cost, config.time_cost, config.parallelism, None)
                .map_err(PasswordError::Argon2Error)?,
        );

        Ok(Self { argon2 })
    }

    /// 環境変数から設定を読み込んでPasswordManagerを作成
    pub fn from_env() -> Result<Self, PasswordError> {
        Self::new(Argon2Config::from_env())
    }

    /// パスワードをハッシュ化（PHC 文字列形式）
    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordError::HashingError)?;

        Ok(password_hash.to_string())
    }

    /// パスワードを検証（不一致は Ok(false)、ハッシュ形式の誤りは Err）
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash).map_err(PasswordError::HashingError)?;

        match self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
        {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::HashingError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // テストを軽くするための最小パラメータ
    fn fast_manager() -> PasswordManager {
        PasswordManager::new(Argon2Config {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let manager = fast_manager();
        let hash = manager.hash_password("Correct-Horse-9").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(manager.verify_password("Correct-Horse-9", &hash).unwrap());
        assert!(!manager.verify_password("correct-horse-9", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let manager = fast_manager();
        let first = manager.hash_password("same-password").unwrap();
        let second = manager.hash_password("same-password").unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let manager = fast_manager();
        assert!(manager.verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_invalid_params_are_rejected() {
        let result = PasswordManager::new(Argon2Config {
            memory_cost: 1,
            time_cost: 0,
            parallelism: 1,
        });
        assert!(result.is_err());
    }
}
