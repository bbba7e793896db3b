// tests/common/mod.rs
#![allow(dead_code)]

pub mod db;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use tower::ServiceExt;
use user_backend::{
    api::{build_router, AppState},
    config::AppConfig,
    repository::user_repository::UserRepository,
    service::auth_service::AuthService,
    utils::{
        password::{Argon2Config, PasswordManager},
        validation::ValidationConfigCache,
    },
};

// テスト環境の初期化を一度だけ実行
static INIT: Once = Once::new();

/// テスト環境を初期化
pub fn init_test_env() {
    INIT.call_once(|| {
        // テスト用のログ設定
        let _ = tracing_subscriber::fmt()
            .with_env_filter("user_backend=debug,tower_http=debug")
            .with_test_writer()
            .try_init();
    });
}

/// 設定キーと値の組からバリデーション設定キャッシュを作る
pub fn validation_cache(pairs: &[(&str, &str)]) -> Arc<ValidationConfigCache> {
    let settings: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Arc::new(ValidationConfigCache::new(settings))
}

/// DB 未接続のアプリ（DB に到達する前のバリデーション経路を確認する）
pub fn setup_app(pairs: &[(&str, &str)]) -> Router {
    build_app(DatabaseConnection::default(), pairs)
}

/// テスト用 Postgres に接続したアプリ
pub fn setup_db_app(db: &db::TestDatabase, pairs: &[(&str, &str)]) -> Router {
    build_app(db.connection.clone(), pairs)
}

/// テストを軽くするための最小パラメータ
pub fn fast_password_manager() -> PasswordManager {
    PasswordManager::new(Argon2Config {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
    })
    .unwrap()
}

fn build_app(connection: DatabaseConnection, pairs: &[(&str, &str)]) -> Router {
    init_test_env();

    let auth_service = Arc::new(AuthService::new(
        Arc::new(UserRepository::new(connection)),
        Arc::new(fast_password_manager()),
        validation_cache(pairs),
    ));

    build_router(AppState {
        auth_service,
        config: Arc::new(AppConfig::for_testing()),
    })
}

/// JSON を POST してステータスとボディを返す
pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .uri(uri)
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

    (status, json)
}
