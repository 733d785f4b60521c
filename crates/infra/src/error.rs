//! # インフラ層エラー
//!
//! PostgreSQL・Redis とのやり取りで起きた失敗を [`InfraError`] に集約する。
//! 種別は [`InfraErrorKind`] で表し、生成時点の [`SpanTrace`] を一緒に持つため、
//! API 層で 500 を返すときに「どの申請のどの操作で失敗したか」をログに残せる。

use std::fmt;

use leaveflow_domain::DomainError;
use thiserror::Error;
use tracing_error::SpanTrace;

/// 失敗の種別
#[derive(Debug, Error)]
pub enum InfraErrorKind {
    #[error("データベースエラー: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis エラー: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("シリアライズエラー: {0}")]
    Serialization(#[from] serde_json::Error),

    /// バージョン不一致、または一意制約違反
    #[error("競合が発生しました: {entity}(id={id})")]
    Conflict { entity: String, id: String },

    /// 原因がクライアント入力にあるもの（壊れたカーソル等）
    #[error("入力エラー: {0}")]
    InvalidInput(String),

    /// 保存済みの行がドメインの不変条件を満たさない等
    #[error("予期しないエラー: {0}")]
    Unexpected(String),
}

/// 種別とスパン情報の組
pub struct InfraError {
    kind:       InfraErrorKind,
    span_trace: SpanTrace,
}

impl InfraError {
    fn capture(kind: InfraErrorKind) -> Self {
        Self {
            kind,
            span_trace: SpanTrace::capture(),
        }
    }

    pub fn conflict(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::Conflict {
            entity: entity.into(),
            id:     id.into(),
        })
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::InvalidInput(message.into()))
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::capture(InfraErrorKind::Unexpected(message.into()))
    }

    pub fn kind(&self) -> &InfraErrorKind {
        &self.kind
    }

    /// 生成時点のスパン階層（`ErrorLayer` 未登録なら空）
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// 競合なら `(entity, id)`
    pub fn as_conflict(&self) -> Option<(&str, &str)> {
        if let InfraErrorKind::Conflict { entity, id } = &self.kind {
            Some((entity.as_str(), id.as_str()))
        } else {
            None
        }
    }

    pub fn as_invalid_input(&self) -> Option<&str> {
        if let InfraErrorKind::InvalidInput(message) = &self.kind {
            Some(message.as_str())
        } else {
            None
        }
    }
}

impl fmt::Display for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}

impl fmt::Debug for InfraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}\n{}", self.kind, self.span_trace)
    }
}

impl std::error::Error for InfraError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        std::error::Error::source(&self.kind)
    }
}

impl From<sqlx::Error> for InfraError {
    fn from(source: sqlx::Error) -> Self {
        Self::capture(source.into())
    }
}

impl From<redis::RedisError> for InfraError {
    fn from(source: redis::RedisError) -> Self {
        Self::capture(source.into())
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(source: serde_json::Error) -> Self {
        Self::capture(source.into())
    }
}

/// 行からドメインモデルを復元できなかった
impl From<DomainError> for InfraError {
    fn from(source: DomainError) -> Self {
        Self::unexpected(format!("不正なデータ: {source}"))
    }
}
