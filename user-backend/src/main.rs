// user-backend/src/main.rs
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use user_backend::api::{build_router, AppState};
use user_backend::config::AppConfig;
use user_backend::db::connect_and_migrate;
use user_backend::repository::user_repository::UserRepository;
use user_backend::service::auth_service::AuthService;
use user_backend::utils::password::PasswordManager;
use user_backend::utils::validation::ValidationConfigCache;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 設定を読み込む（.env もここで読み込まれる）
    let app_config = AppConfig::from_env()?;

    // トレーシングの設定
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_backend=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Starting User Backend server...");
    tracing::info!(
        environment = %app_config.environment,
        production = app_config.is_production(),
        "Configuration loaded"
    );

    // データベース接続とマイグレーション
    let db_pool = connect_and_migrate(&app_config).await?;
    tracing::info!("Database pool created successfully.");

    // バリデーション設定は起動時に一度だけ構築し、以降は使い回す
    let validation = Arc::new(ValidationConfigCache::from_env());
    let validation_config = validation.get();
    tracing::info!(
        username_len = ?(validation_config.username_min_len, validation_config.username_max_len),
        password_len = ?(validation_config.password_min_len, validation_config.password_max_len),
        password_require_complexity = validation_config.password_require_complexity,
        "Validation config ready"
    );

    let user_repo = Arc::new(UserRepository::new(db_pool.clone()));
    let password_manager = Arc::new(PasswordManager::from_env()?);
    let auth_service = Arc::new(AuthService::new(
        user_repo,
        password_manager,
        Arc::clone(&validation),
    ));

    #[cfg(unix)]
    spawn_reload_on_hangup(validation);

    let server_addr = app_config.server_addr();
    let app_state = AppState {
        auth_service,
        config: Arc::new(app_config),
    };

    // ルーターの設定
    let app_router = build_router(app_state);

    // サーバーの起動
    tracing::info!("Router configured. Server listening on {}", server_addr);

    let listener = TcpListener::bind(&server_addr).await?;
    axum::serve(listener, app_router.into_make_service()).await?;

    Ok(())
}

/// SIGHUP を受けたら .env を読み直してバリデーション設定を再構築する
#[cfg(unix)]
fn spawn_reload_on_hangup(validation: Arc<ValidationConfigCache>) {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut hangup = match signal(SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGHUP handler");
                return;
            }
        };

        while hangup.recv().await.is_some() {
            dotenvy::dotenv_override().ok();
            let config = validation.reload();
            tracing::info!(
                username_max_len = config.username_max_len,
                weak_password_count = config.weak_passwords.len(),
                "Validation config reloaded on SIGHUP"
            );
        }
    });
}
