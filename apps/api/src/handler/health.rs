//! # ヘルスチェックハンドラ
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（PostgreSQL と Redis の接続状態を確認）
//!
//! レスポンス型は [`leaveflow_shared::HealthResponse`] / [`leaveflow_shared::ReadinessResponse`] を参照。

use std::{future::Future, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use leaveflow_infra::{InfraError, SessionManager, db::TransactionManager};
use leaveflow_shared::{CheckStatus, HealthResponse, ReadinessResponse};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// ヘルスチェックエンドポイント
///
/// 依存サービスへの接続は確認せず、プロセスの稼働のみを返す。
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION")))
}

/// Readiness Check 用の State
pub struct ReadinessState {
    pub tx_manager:      Arc<dyn TransactionManager>,
    pub session_manager: Arc<dyn SessionManager>,
}

/// Readiness Check エンドポイント
///
/// PostgreSQL と Redis を並行チェックする。
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let (database, redis) = tokio::join!(
        check("database", state.tx_manager.ping()),
        check("redis", state.session_manager.ping()),
    );

    let response = ReadinessResponse::from_checks([("database", database), ("redis", redis)]);
    let http_status = if response.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (http_status, Json(response))
}

/// 疎通確認をタイムアウト付きで実行する
async fn check(
    name: &'static str,
    ping: impl Future<Output = Result<(), InfraError>>,
) -> CheckStatus {
    match tokio::time::timeout(CHECK_TIMEOUT, ping).await {
        Ok(Ok(())) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(check = name, error = %e, "readiness check failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!(check = name, "readiness check timed out");
            CheckStatus::Error
        }
    }
}
