// tests/registration_flow_tests.rs
//
// 実際の Postgres（testcontainers）に対する登録・ログインの一連の流れ

mod common;

use axum::http::StatusCode;
use common::db::TestDatabase;
use serde_json::json;
use user_backend::{
    db::schema_exists,
    error::AppError,
    repository::user_repository::{CreateUser, UserRepository},
};

#[tokio::test]
async fn test_register_returns_created_user() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);

    let (status, body) = common::post_json(
        &app,
        "/users/",
        json!({ "username": "alice_w", "password": "Wonderland-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_number());
    assert_eq!(body["username"], "alice_w");

    // ハッシュやパスワードはレスポンスに含めない
    let fields = body.as_object().unwrap();
    assert_eq!(fields.len(), 2);
    assert!(!fields.contains_key("password_hash"));
}

#[tokio::test]
async fn test_register_stores_trimmed_username() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);

    let (status, body) = common::post_json(
        &app,
        "/users/",
        json!({ "username": "  Alice_W \t", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "Alice_W");

    let repo = UserRepository::new(db.connection.clone());
    let stored = repo.find_by_username("Alice_W").await.unwrap().unwrap();
    assert_eq!(stored.id, body["id"].as_i64().unwrap() as i32);
    assert!(stored.password_hash.starts_with("$argon2id$"));
    assert!(repo.find_by_username("  Alice_W \t").await.unwrap().is_none());
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);
    let (first, _) = common::post_json(
        &app,
        "/users/",
        json!({ "username": "alice_w", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(first, StatusCode::CREATED);

    // 前後の空白は除かれてから比較される
    let (status, body) = common::post_json(
        &app,
        "/users/",
        json!({ "username": " alice_w ", "password": "Other-Secret-7" }),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_type"], "conflict");
    assert_eq!(body["message"], "Username already exists");
}

#[tokio::test]
async fn test_concurrent_insert_maps_to_conflict() {
    // 重複チェックをすり抜けた挿入は一意制約で弾かれる
    let db = TestDatabase::new().await;
    let repo = UserRepository::new(db.connection.clone());
    let manager = common::fast_password_manager();

    let new_user = || CreateUser {
        username: "race_user".to_string(),
        password_hash: manager.hash_password("Wonderland-42").unwrap(),
    };

    repo.create(new_user()).await.unwrap();
    let err = repo.create(new_user()).await.unwrap_err();

    match AppError::from_unique_violation(err, "Username already exists") {
        AppError::Conflict(message) => assert_eq!(message, "Username already exists"),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_unknown_user_not_found() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);

    let (status, body) = common::post_json(
        &app,
        "/login/",
        json!({ "username": "nobody_here", "password": "Wonderland-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User does not exist, please register first");
}

#[tokio::test]
async fn test_login_wrong_password_unauthorized() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);

    let (created, _) = common::post_json(
        &app,
        "/users/",
        json!({ "username": "alice_w", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(created, StatusCode::CREATED);

    let (status, body) = common::post_json(
        &app,
        "/login/",
        json!({ "username": "alice_w", "password": "wonderland-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Incorrect username or password");
}

#[tokio::test]
async fn test_register_then_login_succeeds() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[]);

    let (created, _) = common::post_json(
        &app,
        "/users/",
        json!({ "username": " alice_w ", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(created, StatusCode::CREATED);

    let (status, body) = common::post_json(
        &app,
        "/login/",
        json!({ "username": "alice_w", "password": "Wonderland-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "msg": "Login successful" }));

    // ログインでは trim しないため、空白付きの名前は別ユーザー扱い
    let (status, _) = common::post_json(
        &app,
        "/login/",
        json!({ "username": " alice_w ", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_long_username_within_configured_limit_is_stored() {
    let db = TestDatabase::new().await;
    let app = common::setup_db_app(&db, &[("USERNAME_MAX_LEN", "400")]);
    let username = "u".repeat(300);

    let (status, body) = common::post_json(
        &app,
        "/users/",
        json!({ "username": username, "password": "Wonderland-42" }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"].as_str().unwrap().len(), 300);
}

#[tokio::test]
async fn test_flow_on_dedicated_schema() {
    let db = TestDatabase::with_schema("tenant_a").await;
    assert!(schema_exists(&db.connection, "tenant_a").await.unwrap());
    assert_eq!(db.config.db_schema.as_deref(), Some("tenant_a"));

    let app = common::setup_db_app(&db, &[]);

    // プール内のどの接続でも search_path が効いていること
    for name in ["tenant_one", "tenant_two", "tenant_three"] {
        let (status, _) = common::post_json(
            &app,
            "/users/",
            json!({ "username": name, "password": "Wonderland-42" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = common::post_json(
        &app,
        "/login/",
        json!({ "username": "tenant_two", "password": "Wonderland-42" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
