// user-backend/src/utils/validation/config.rs

//! バリデーション設定
//!
//! 名前付き設定値（環境変数など）からユーザー名・パスワード検証用の
//! 不変スナップショットを組み立てます。
//! 設定値の誤りはエラーにせず、既定値・下限値への丸めで吸収します。

use super::casefold;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// 設定キー
// =============================================================================

pub mod keys {
    pub const USERNAME_MIN_LEN: &str = "USERNAME_MIN_LEN";
    pub const USERNAME_MAX_LEN: &str = "USERNAME_MAX_LEN";
    pub const USERNAME_ALLOW_CJK: &str = "USERNAME_ALLOW_CJK";
    pub const USERNAME_PATTERN: &str = "USERNAME_PATTERN";
    pub const USERNAME_CHARSET_DESC: &str = "USERNAME_CHARSET_DESC";
    pub const USERNAME_RESERVED: &str = "USERNAME_RESERVED";
    pub const PASSWORD_MIN_LEN: &str = "PASSWORD_MIN_LEN";
    pub const PASSWORD_MAX_LEN: &str = "PASSWORD_MAX_LEN";
    pub const PASSWORD_MAX_BYTES: &str = "PASSWORD_MAX_BYTES";
    pub const PASSWORD_REQUIRE_COMPLEXITY: &str = "PASSWORD_REQUIRE_COMPLEXITY";
    pub const PASSWORD_MIN_CLASSES: &str = "PASSWORD_MIN_CLASSES";
    pub const WEAK_PASSWORDS: &str = "WEAK_PASSWORDS";
    pub const WEAK_PASSWORDS_FILE: &str = "WEAK_PASSWORDS_FILE";
}

// =============================================================================
// 既定値
// =============================================================================

/// 既定の予約語（部分一致で拒否）
pub const DEFAULT_RESERVED_USERNAMES: &[&str] = &[
    "admin",
    "root",
    "system",
    "support",
    "superuser",
    "administrator",
    "管理员",
];

/// 組み込みの弱いパスワード一覧
pub const DEFAULT_WEAK_PASSWORDS: &[&str] = &[
    "123456",
    "12345678",
    "123456789",
    "111111",
    "11111111",
    "000000",
    "00000000",
    "password",
    "password1",
    "qwerty",
    "qwerty123",
    "abc123",
    "letmein",
    "iloveyou",
    "admin",
];

pub const DEFAULT_USERNAME_MIN_LEN: usize = 4;
pub const DEFAULT_USERNAME_MAX_LEN: usize = 20;
pub const DEFAULT_PASSWORD_MIN_LEN: usize = 8;
pub const DEFAULT_PASSWORD_MAX_LEN: usize = 64;
pub const DEFAULT_PASSWORD_MAX_BYTES: usize = 72;
pub const DEFAULT_PASSWORD_MIN_CLASSES: usize = 3;

/// 文字種は 大文字/小文字/数字/記号 の4種類
pub const MAX_PASSWORD_CLASSES: usize = 4;

const ASCII_USERNAME_PATTERN: &str = r"^[A-Za-z0-9_]+$";
const CJK_USERNAME_PATTERN: &str = r"^[A-Za-z0-9_\x{4e00}-\x{9fff}]+$";

pub const ASCII_CHARSET_DESC: &str = "username may only contain letters, digits and underscores";
pub const CJK_CHARSET_DESC: &str =
    "username may only contain letters, digits, underscores and Chinese characters";

static ASCII_USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(ASCII_USERNAME_PATTERN).expect("Invalid username regex"));

static CJK_USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(CJK_USERNAME_PATTERN).expect("Invalid CJK username regex"));

// =============================================================================
// 設定値の取得元
// =============================================================================

/// 名前付き設定値の取得元
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

/// プロセス環境変数から読み込む（`.env` は起動時に dotenvy が読み込み済み）
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSettings;

impl SettingsSource for EnvSettings {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

// --- 読み取りヘルパー ---

/// 前後の空白を除去し、空文字は未設定として扱う
fn read_string(source: &dyn SettingsSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_bool(source: &dyn SettingsSource, key: &str, default: bool) -> bool {
    match source.get(key) {
        Some(raw) => matches!(
            raw.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

/// 整数として読み込み、解釈できなければ既定値、最後に下限で丸める
fn read_len(source: &dyn SettingsSource, key: &str, default: usize, minimum: usize) -> usize {
    let parsed = source
        .get(key)
        .and_then(|raw| raw.trim().parse::<i64>().ok());

    match parsed {
        Some(value) if value < minimum as i64 => minimum,
        Some(value) => usize::try_from(value).unwrap_or(usize::MAX),
        None => default.max(minimum),
    }
}

/// カンマ区切りリスト（空要素は除外）
fn read_list(source: &dyn SettingsSource, key: &str) -> Vec<String> {
    source
        .get(key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 1行1件。空行と `#` で始まる行は無視。読めないファイルは空集合として扱う
fn load_weak_passwords_from_file(path: &Path) -> HashSet<String> {
    match fs::read_to_string(path) {
        Ok(contents) => contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(casefold)
            .collect(),
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Weak password file could not be read, ignoring"
            );
            HashSet::new()
        }
    }
}

// =============================================================================
// ValidationConfig
// =============================================================================

/// バリデーション設定のスナップショット
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub username_min_len: usize,
    pub username_max_len: usize,
    /// 値全体に一致させる（アンカー付き）
    pub username_pattern: Regex,
    pub username_charset_desc: String,
    pub username_reserved: HashSet<String>,
    pub password_min_len: usize,
    pub password_max_len: usize,
    pub password_max_bytes: usize,
    pub password_require_complexity: bool,
    pub password_min_classes: usize,
    pub weak_passwords: HashSet<String>,
}

impl PartialEq for ValidationConfig {
    fn eq(&self, other: &Self) -> bool {
        self.username_min_len == other.username_min_len
            && self.username_max_len == other.username_max_len
            && self.username_pattern.as_str() == other.username_pattern.as_str()
            && self.username_charset_desc == other.username_charset_desc
            && self.username_reserved == other.username_reserved
            && self.password_min_len == other.password_min_len
            && self.password_max_len == other.password_max_len
            && self.password_max_bytes == other.password_max_bytes
            && self.password_require_complexity == other.password_require_complexity
            && self.password_min_classes == other.password_min_classes
            && self.weak_passwords == other.weak_passwords
    }
}

impl Eq for ValidationConfig {}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::from_source(&HashMap::new())
    }
}

impl ValidationConfig {
    /// 環境変数から設定を読み込み
    pub fn from_env() -> Self {
        Self::from_source(&EnvSettings)
    }

    /// 設定値の取得元から組み立てる（失敗しない）
    pub fn from_source(source: &dyn SettingsSource) -> Self {
        let username_min_len = read_len(source, keys::USERNAME_MIN_LEN, DEFAULT_USERNAME_MIN_LEN, 1);
        let username_max_len = read_len(
            source,
            keys::USERNAME_MAX_LEN,
            DEFAULT_USERNAME_MAX_LEN,
            username_min_len,
        );

        let allow_cjk = read_bool(source, keys::USERNAME_ALLOW_CJK, false);
        let pattern_override = read_string(source, keys::USERNAME_PATTERN);
        let charset_override = read_string(source, keys::USERNAME_CHARSET_DESC);

        let username_pattern = match &pattern_override {
            Some(pattern) => compile_full_match(pattern).unwrap_or_else(|| {
                warn!(
                    pattern = %pattern,
                    "USERNAME_PATTERN does not compile, falling back to the default pattern"
                );
                ASCII_USERNAME_REGEX.clone()
            }),
            None if allow_cjk => CJK_USERNAME_REGEX.clone(),
            None => ASCII_USERNAME_REGEX.clone(),
        };

        let username_charset_desc = match charset_override {
            Some(desc) => desc,
            None if allow_cjk && pattern_override.is_none() => CJK_CHARSET_DESC.to_string(),
            None => ASCII_CHARSET_DESC.to_string(),
        };

        let reserved_from_source: HashSet<String> = read_list(source, keys::USERNAME_RESERVED)
            .iter()
            .map(|item| casefold(item))
            .collect();
        let username_reserved = if reserved_from_source.is_empty() {
            DEFAULT_RESERVED_USERNAMES
                .iter()
                .map(|item| casefold(item))
                .collect()
        } else {
            reserved_from_source
        };

        let password_min_len = read_len(source, keys::PASSWORD_MIN_LEN, DEFAULT_PASSWORD_MIN_LEN, 1);
        let password_max_len = read_len(
            source,
            keys::PASSWORD_MAX_LEN,
            DEFAULT_PASSWORD_MAX_LEN,
            password_min_len,
        );
        let password_max_bytes =
            read_len(source, keys::PASSWORD_MAX_BYTES, DEFAULT_PASSWORD_MAX_BYTES, 1);
        let password_require_complexity =
            read_bool(source, keys::PASSWORD_REQUIRE_COMPLEXITY, false);
        let password_min_classes = read_len(
            source,
            keys::PASSWORD_MIN_CLASSES,
            DEFAULT_PASSWORD_MIN_CLASSES,
            1,
        )
        .min(MAX_PASSWORD_CLASSES);

        let mut weak_passwords: HashSet<String> = DEFAULT_WEAK_PASSWORDS
            .iter()
            .map(|item| casefold(item))
            .collect();
        weak_passwords.extend(
            read_list(source, keys::WEAK_PASSWORDS)
                .iter()
                .map(|item| casefold(item)),
        );
        if let Some(path) = read_string(source, keys::WEAK_PASSWORDS_FILE) {
            weak_passwords.extend(load_weak_passwords_from_file(Path::new(&path)));
        }

        let config = Self {
            username_min_len,
            username_max_len,
            username_pattern,
            username_charset_desc,
            username_reserved,
            password_min_len,
            password_max_len,
            password_max_bytes,
            password_require_complexity,
            password_min_classes,
            weak_passwords,
        };

        debug!(
            username_min_len = config.username_min_len,
            username_max_len = config.username_max_len,
            username_pattern = %config.username_pattern.as_str(),
            reserved_count = config.username_reserved.len(),
            password_min_len = config.password_min_len,
            password_max_len = config.password_max_len,
            password_max_bytes = config.password_max_bytes,
            password_require_complexity = config.password_require_complexity,
            password_min_classes = config.password_min_classes,
            weak_password_count = config.weak_passwords.len(),
            "Validation config built"
        );

        config
    }
}

/// 上書きパターンを値全体への一致として組み立てる
fn compile_full_match(pattern: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{})$", pattern)).ok()
}

// =============================================================================
// ValidationConfigCache
// =============================================================================

/// 一度だけ組み立てて使い回す設定キャッシュ
///
/// 取得元の変更は自動では反映されない。`invalidate` / `reload` で明示的に再構築する。
pub struct ValidationConfigCache {
    source: Arc<dyn SettingsSource>,
    slot: RwLock<Option<Arc<ValidationConfig>>>,
}

impl fmt::Debug for ValidationConfigCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationConfigCache")
            .field("cached", &self.is_cached())
            .finish()
    }
}

impl ValidationConfigCache {
    pub fn new(source: impl SettingsSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            slot: RwLock::new(None),
        }
    }

    /// 環境変数を取得元とするキャッシュ
    pub fn from_env() -> Self {
        Self::new(EnvSettings)
    }

    /// キャッシュ済みの設定を返す。未構築なら構築する
    pub fn get(&self) -> Arc<ValidationConfig> {
        {
            let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(config) = slot.as_ref() {
                return Arc::clone(config);
            }
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        // 書き込みロック待ちの間に他のスレッドが構築済みの場合はそれを使う
        if let Some(config) = slot.as_ref() {
            return Arc::clone(config);
        }

        let config = Arc::new(ValidationConfig::from_source(self.source.as_ref()));
        *slot = Some(Arc::clone(&config));
        config
    }

    /// キャッシュを破棄する。次回の `get` で再構築される
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = None;
    }

    /// 取得元から再構築して差し替える
    pub fn reload(&self) -> Arc<ValidationConfig> {
        let config = Arc::new(ValidationConfig::from_source(self.source.as_ref()));
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&config));
        info!("Validation config reloaded");
        config
    }

    pub fn is_cached(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

// =============================================================================
// テスト
// =============================================================================
