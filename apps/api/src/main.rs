//! # LeaveFlow API サーバー
//!
//! ## 起動方法
//!
//! ```bash
//! cargo run -p leaveflow-api
//! ```
//!
//! 環境変数の一覧は [`leaveflow_api::config`] を参照。

use std::{net::SocketAddr, sync::Arc};

use leaveflow_api::{
    app_builder::{AppDeps, build_app},
    config::AppConfig,
    live::EventHub,
};
use leaveflow_domain::clock::SystemClock;
use leaveflow_infra::{
    Argon2PasswordChecker,
    RedisSessionManager,
    db::{self, PgTransactionManager},
    repository::{
        PostgresAuditLogRepository,
        PostgresLeaveRequestRepository,
        PostgresRosterRepository,
        PostgresUserRepository,
    },
};
use leaveflow_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(TracingConfig::from_env("leaveflow-api"));
    let _tracing_guard = tracing::info_span!("app", service = "leaveflow-api").entered();

    let config = AppConfig::from_env().expect("設定の読み込みに失敗しました");

    tracing::info!("API サーバーを起動します: {}:{}", config.host, config.port);

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("データベースへの接続に失敗しました");
    db::run_migrations(&pool)
        .await
        .expect("マイグレーションの実行に失敗しました");

    let session_manager = RedisSessionManager::new(&config.redis_url)
        .await
        .expect("Redis への接続に失敗しました");

    let app = build_app(AppDeps {
        user_repo:        Arc::new(PostgresUserRepository::new(pool.clone())),
        leave_repo:       Arc::new(PostgresLeaveRequestRepository::new(pool.clone())),
        roster_repo:      Arc::new(PostgresRosterRepository::new(pool.clone())),
        audit_log_repo:   Arc::new(PostgresAuditLogRepository::new(pool.clone())),
        tx_manager:       Arc::new(PgTransactionManager::new(pool)),
        session_manager:  Arc::new(session_manager),
        password_checker: Arc::new(Argon2PasswordChecker::new()),
        clock:            Arc::new(SystemClock),
        hub:              EventHub::new(config.live_event_capacity),
        policy:           config.leave_policy(),
        secure_cookie:    config.is_production(),
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("アドレスのパースに失敗しました");

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("API サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
