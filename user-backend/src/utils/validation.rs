// user-backend/src/utils/validation.rs

//! ユーザー名・パスワードのバリデーション
//!
//! 各チェックは最初に見つかった違反だけを `ValidationError` として返します。
//! 比較はすべて `casefold` で大文字小文字を区別せずに行います。

pub mod config;

pub use config::{EnvSettings, SettingsSource, ValidationConfig, ValidationConfigCache};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

// Unicode の十進数字（Nd）すべてに一致する
static DIGIT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("Invalid digit regex"));

/// バリデーション違反（メッセージはそのままクライアントに返す）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// 大文字小文字を区別しない比較用の正規化（Unicode の完全ケースフォールディング）
///
/// `ß` は `ss` に、語末の `ς` は `σ` に畳み込まれる。
pub fn casefold(value: &str) -> String {
    caseless::default_case_fold_str(value)
}

// =============================================================================
// ユーザー名
// =============================================================================

/// JSON 値としてのユーザー名をバリデーション
pub fn validate_username_value<'a>(
    config: &ValidationConfig,
    value: &'a Value,
) -> Result<&'a str, ValidationError> {
    let candidate = value
        .as_str()
        .ok_or_else(|| ValidationError::new("username must be a string"))?;
    validate_username(config, candidate)
}

/// ユーザー名をバリデーションし、前後の空白を除いた値を返す（大文字小文字は保持）
pub fn validate_username<'a>(
    config: &ValidationConfig,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    let username = value.trim();
    if username.is_empty() {
        return Err(ValidationError::new("username must not be empty"));
    }

    let length = username.chars().count();
    if length < config.username_min_len || length > config.username_max_len {
        return Err(ValidationError::new(format!(
            "username must be between {} and {} characters",
            config.username_min_len, config.username_max_len
        )));
    }

    if !config.username_pattern.is_match(username) {
        return Err(ValidationError::new(config.username_charset_desc.clone()));
    }

    // 完全一致ではなく部分一致で拒否する（例: "admin2"）
    let normalized = casefold(username);
    if config
        .username_reserved
        .iter()
        .any(|reserved| !reserved.is_empty() && normalized.contains(reserved.as_str()))
    {
        return Err(ValidationError::new("username contains a reserved word"));
    }

    Ok(username)
}

// =============================================================================
// パスワード
// =============================================================================

/// JSON 値としてのパスワードをバリデーション
pub fn validate_password_value<'a>(
    config: &ValidationConfig,
    value: &'a Value,
) -> Result<&'a str, ValidationError> {
    let candidate = value
        .as_str()
        .ok_or_else(|| ValidationError::new("password must be a string"))?;
    validate_password(config, candidate)
}

/// パスワードをバリデーションし、入力をそのまま返す
///
/// 空判定のみ trim 後の値で行い、長さ・バイト数は元の値で数える。
/// バイト数の上限はハッシュ関数側の入力上限に合わせるためのもの。
pub fn validate_password<'a>(
    config: &ValidationConfig,
    value: &'a str,
) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("password must not be empty"));
    }

    let length = value.chars().count();
    if length < config.password_min_len || length > config.password_max_len {
        return Err(ValidationError::new(format!(
            "password must be between {} and {} characters",
            config.password_min_len, config.password_max_len
        )));
    }

    if value.len() > config.password_max_bytes {
        return Err(ValidationError::new(format!(
            "password is too long (exceeds {} bytes)",
            config.password_max_bytes
        )));
    }

    if config.weak_passwords.contains(&casefold(value)) {
        return Err(ValidationError::new("password is too simple"));
    }

    if config.password_require_complexity
        && password_class_count(value) < config.password_min_classes
    {
        return Err(ValidationError::new(
            "password has insufficient character variety: use a mix of uppercase letters, lowercase letters, digits and symbols",
        ));
    }

    Ok(value)
}

/// 大文字/小文字/数字/記号 のうち含まれている種類の数
///
/// 英字は ASCII のみ、数字は Unicode の十進数字すべてを数える。
/// 記号は ASCII 英数字以外なので、`١` のような数字は数字と記号の両方に数えられる。
fn password_class_count(password: &str) -> usize {
    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = DIGIT_REGEX.is_match(password);
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());

    [has_uppercase, has_lowercase, has_digit, has_symbol]
        .iter()
        .filter(|present| **present)
        .count()
}

// =============================================================================
// 項目間チェック
// =============================================================================

/// パスワードがユーザー名と同じでないこと（各項目のチェック通過後に呼ぶ）
pub fn validate_password_not_equal(username: &str, password: &str) -> Result<(), ValidationError> {
    if casefold(username) == casefold(password) {
        return Err(ValidationError::new(
            "password must not be the same as the username",
        ));
    }
    Ok(())
}

// =============================================================================
// テスト
// =============================================================================
