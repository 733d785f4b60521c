//! # AuditLogRepository
//!
//! 監査ログの永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **追記のみ**: 監査ログは INSERT のみで、更新・削除は行わない
//! - **時系列ソート**: `(created_at DESC, id DESC)` で新しい順に並べる
//! - **カーソルページネーション**: 前ページ末尾の `{created_at}#{id}` を URL セーフな
//!   base64（パディングなし）にした不透明な文字列をカーソルとして返す

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64};
use chrono::{DateTime, Utc};
use leaveflow_domain::{
    audit_log::{AuditAction, AuditLog, AuditResult},
    user::UserId,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::InfraError;

/// 監査ログのフィルタ条件
#[derive(Debug, Default, Clone)]
pub struct AuditLogFilter {
    pub from:     Option<DateTime<Utc>>,
    pub to:       Option<DateTime<Utc>>,
    pub actor_id: Option<UserId>,
    pub actions:  Option<Vec<AuditAction>>,
    pub result:   Option<AuditResult>,
}

impl AuditLogFilter {
    /// フィルタ条件に一致するか（インメモリ実装用）
    pub fn matches(&self, log: &AuditLog) -> bool {
        self.from.is_none_or(|from| log.created_at >= from)
            && self.to.is_none_or(|to| log.created_at <= to)
            && self.actor_id.as_ref().is_none_or(|id| &log.actor_id == id)
            && self
                .actions
                .as_ref()
                .is_none_or(|actions| actions.contains(&log.action))
            && self.result.is_none_or(|result| log.result == result)
    }
}

/// 監査ログのページ
#[derive(Debug)]
pub struct AuditLogPage {
    pub items:       Vec<AuditLog>,
    pub next_cursor: Option<String>,
}

/// キーセットページネーションの位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditLogCursor {
    pub created_at: DateTime<Utc>,
    pub id:         Uuid,
}

impl AuditLogCursor {
    pub fn of(log: &AuditLog) -> Self {
        Self {
            created_at: log.created_at,
            id:         log.id,
        }
    }

    /// 不透明なカーソル文字列にエンコードする
    pub fn encode(&self) -> String {
        BASE64.encode(format!("{}#{}", self.created_at.to_rfc3339(), self.id))
    }

    /// カーソル文字列をデコードする
    ///
    /// 不正な文字列は `InvalidInput` を返す。
    pub fn decode(cursor: &str) -> Result<Self, InfraError> {
        let invalid = || InfraError::invalid_input("不正なカーソルです");

        let bytes = BASE64.decode(cursor).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        let (timestamp, id) = text.rsplit_once('#').ok_or_else(invalid)?;

        let created_at = DateTime::parse_from_rfc3339(timestamp)
            .map_err(|_| invalid())?
            .with_timezone(&Utc);
        let id = Uuid::parse_str(id).map_err(|_| invalid())?;

        Ok(Self { created_at, id })
    }

    /// このカーソルより古いエントリか（`(created_at, id)` の降順で後ろ）
    pub fn is_after(&self, log: &AuditLog) -> bool {
        (log.created_at, log.id) < (self.created_at, self.id)
    }
}

/// 監査ログリポジトリトレイト
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// 監査ログを記録する
    async fn record(&self, log: &AuditLog) -> Result<(), InfraError>;

    /// 監査ログを新しい順で検索する
    async fn find(
        &self,
        cursor: Option<&str>,
        limit: u32,
        filter: &AuditLogFilter,
    ) -> Result<AuditLogPage, InfraError>;
}

#[derive(sqlx::FromRow)]
struct AuditLogRow {
    id: Uuid,
    actor_id: Uuid,
    actor_name: String,
    action: String,
    result: String,
    resource_type: String,
    resource_id: String,
    detail: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuditLogRow> for AuditLog {
    type Error = InfraError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        Ok(AuditLog {
            id: row.id,
            actor_id: UserId::from_uuid(row.actor_id),
            actor_name: row.actor_name,
            action: row.action.parse::<AuditAction>()?,
            result: row.result.parse::<AuditResult>()?,
            resource_type: row.resource_type,
            resource_id: row.resource_id,
            detail: row.detail,
            created_at: row.created_at,
        })
    }
}

/// 取得件数より 1 件多く読み、次ページの有無を判定する
pub(crate) fn into_page(mut items: Vec<AuditLog>, limit: usize) -> AuditLogPage {
    let next_cursor = if items.len() > limit {
        items.truncate(limit);
        items.last().map(|log| AuditLogCursor::of(log).encode())
    } else {
        None
    };
    AuditLogPage { items, next_cursor }
}

/// PostgreSQL 実装の AuditLogRepository
#[derive(Debug, Clone)]
pub struct PostgresAuditLogRepository {
    pool: PgPool,
}

impl PostgresAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PostgresAuditLogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(action = %log.action))]
    async fn record(&self, log: &AuditLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (
                id, actor_id, actor_name, action, result, resource_type, resource_id,
                detail, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id)
        .bind(log.actor_id.as_uuid())
        .bind(&log.actor_name)
        .bind(log.action.as_str())
        .bind(log.result.as_str())
        .bind(&log.resource_type)
        .bind(&log.resource_id)
        .bind(&log.detail)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(limit))]
    async fn find(
        &self,
        cursor: Option<&str>,
        limit: u32,
        filter: &AuditLogFilter,
    ) -> Result<AuditLogPage, InfraError> {
        let cursor = cursor.map(AuditLogCursor::decode).transpose()?;

        let mut query = QueryBuilder::<Postgres>::new(
            r#"
            SELECT id, actor_id, actor_name, action, result, resource_type, resource_id,
                   detail, created_at
            FROM audit_logs
            WHERE TRUE
            "#,
        );
        if let Some(from) = filter.from {
            query.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            query.push(" AND created_at <= ").push_bind(to);
        }
        if let Some(actor_id) = &filter.actor_id {
            query.push(" AND actor_id = ").push_bind(*actor_id.as_uuid());
        }
        if let Some(actions) = &filter.actions {
            let actions: Vec<String> = actions.iter().map(|a| a.as_str().to_string()).collect();
            query.push(" AND action = ANY(").push_bind(actions).push(")");
        }
        if let Some(result) = filter.result {
            query.push(" AND result = ").push_bind(result.as_str());
        }
        if let Some(cursor) = cursor {
            query
                .push(" AND (created_at, id) < (")
                .push_bind(cursor.created_at)
                .push(", ")
                .push_bind(cursor.id)
                .push(")");
        }
        query
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(limit) + 1);

        let rows = query
            .build_query_as::<AuditLogRow>()
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(AuditLog::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_page(items, limit as usize))
    }
}
