//! # API エラーハンドリング
//!
//! HTTP API のエラー定義と、axum レスポンスへの変換を行う。
//!
//! ## エラーの階層
//!
//! ```text
//! ドメイン層エラー (DomainError) ─┐
//! インフラ層エラー (InfraError) ──┼─▶ ApiError ─▶ RFC 9457 ErrorResponse
//! ```
//!
//! ユースケース層とハンドラ層は同じ `ApiError` を返す。
//! 内部エラーの詳細はログにのみ出力し、クライアントには固定メッセージを返す。

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use leaveflow_domain::DomainError;
use leaveflow_infra::{InfraError, InfraErrorKind, SessionData, SessionManager};
use leaveflow_shared::{ErrorResponse, error_response::ProblemKind, event_log::error};
use thiserror::Error;

/// セッション Cookie 名
pub const SESSION_COOKIE_NAME: &str = "session_id";

/// API 層で発生するエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// リソースが見つからない（404）
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト（400）
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 未認証（401）
    #[error("認証エラー: {0}")]
    Unauthorized(String),

    /// 権限不足（403）
    #[error("権限がありません: {0}")]
    Forbidden(String),

    /// 競合（409）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 内部エラー（500）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::BadRequest(msg),
            DomainError::NotFound { entity_type, id } => {
                Self::NotFound(format!("{entity_type} が見つかりません: {id}"))
            }
            DomainError::Conflict(msg) => Self::Conflict(msg),
            DomainError::Forbidden(msg) => Self::Forbidden(msg),
        }
    }
}

impl From<InfraError> for ApiError {
    fn from(err: InfraError) -> Self {
        match err.kind() {
            InfraErrorKind::Conflict { entity, .. } => Self::Conflict(format!(
                "{entity} は既に更新されています。最新の情報を取得してください。"
            )),
            InfraErrorKind::InvalidInput(msg) => Self::BadRequest(msg.clone()),
            _ => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::DATABASE,
                    span_trace = %err.span_trace(),
                    "インフラ層でエラーが発生: {}",
                    err
                );
                Self::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::NotFound(msg) => ErrorResponse::of(ProblemKind::NotFound, msg),
            ApiError::BadRequest(msg) => ErrorResponse::of(ProblemKind::BadRequest, msg),
            ApiError::Unauthorized(msg) => ErrorResponse::of(ProblemKind::Unauthorized, msg),
            ApiError::Forbidden(msg) => ErrorResponse::of(ProblemKind::Forbidden, msg),
            ApiError::Conflict(msg) => ErrorResponse::of(ProblemKind::Conflict, msg),
            ApiError::Internal(msg) => {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::INTERNAL,
                    "内部エラー: {}",
                    msg
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

/// Cookie からセッションを取得する
///
/// Cookie が無い、またはセッションが失効している場合は 401 を返す。
pub async fn get_session(
    session_manager: &dyn SessionManager,
    jar: &CookieJar,
) -> Result<(String, SessionData), ApiError> {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("ログインが必要です".to_string()))?;

    match session_manager.get(&session_id).await {
        Ok(Some(data)) => Ok((session_id, data)),
        Ok(None) => Err(ApiError::Unauthorized(
            "セッションが無効です。再度ログインしてください".to_string(),
        )),
        Err(e) => {
            tracing::error!(
                error.category = error::category::INFRASTRUCTURE,
                error.kind = error::kind::SESSION,
                "セッション取得で内部エラー: {}",
                e
            );
            Err(ApiError::Internal("セッションの取得に失敗しました".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    async fn body_of(response: Response) -> ErrorResponse {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[rstest]
    #[case(ApiError::NotFound("x".into()), StatusCode::NOT_FOUND)]
    #[case(ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST)]
    #[case(ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    #[case(ApiError::Conflict("x".into()), StatusCode::CONFLICT)]
    #[case(ApiError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[tokio::test]
    async fn test_各エラーが対応するステータスに変換される(
        #[case] error: ApiError,
        #[case] expected: StatusCode,
    ) {
        let response = error.into_response();

        assert_eq!(response.status(), expected);
        assert_eq!(body_of(response).await.status, expected.as_u16());
    }

    #[tokio::test]
    async fn test_内部エラーの詳細はクライアントに返さない() {
        let response = ApiError::Internal("connection refused".to_string()).into_response();

        let body = body_of(response).await;

        assert_eq!(body, ErrorResponse::internal_error());
    }

    #[test]
    fn test_ドメインエラーの変換() {
        assert!(matches!(
            ApiError::from(DomainError::Validation("x".into())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(DomainError::Forbidden("x".into())),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from(DomainError::NotFound {
                entity_type: "User",
                id:          "u-1".to_string(),
            }),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_インフラエラーの変換() {
        assert!(matches!(
            ApiError::from(InfraError::conflict("LeaveRequest", "lr-1")),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(InfraError::invalid_input("不正なカーソルです")),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(InfraError::unexpected("boom")),
            ApiError::Internal(_)
        ));
    }
}
