//! # 監査ログ閲覧 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/admin/audit-logs` - 監査ログ一覧（カーソルベースページネーション）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use leaveflow_domain::{
    audit_log::{AuditAction, AuditLog, AuditResult},
    user::UserId,
};
use leaveflow_infra::repository::AuditLogFilter;
use leaveflow_shared::PaginatedResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiError,
    usecase::{AuditLogQuery, AuditLogUseCaseImpl},
};

/// 監査ログ閲覧 API の共有状態
pub struct AuditLogState {
    pub usecase: AuditLogUseCaseImpl,
}

/// 監査ログ一覧クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ListAuditLogsQuery {
    /// カーソル（次ページ取得用、opaque 文字列）
    pub cursor:   Option<String>,
    /// 取得件数（デフォルト 50、最大 100）
    pub limit:    Option<i64>,
    /// 開始日時（RFC 3339）
    pub from:     Option<String>,
    /// 終了日時（RFC 3339）
    pub to:       Option<String>,
    pub actor_id: Option<Uuid>,
    /// アクションでフィルタ（カンマ区切りで複数指定可）
    pub action:   Option<String>,
    /// 結果でフィルタ（success / failure）
    pub result:   Option<String>,
}

/// 監査ログ一覧の要素データ
#[derive(Debug, Serialize)]
pub struct AuditLogItemData {
    pub id:            String,
    pub actor_id:      String,
    pub actor_name:    String,
    pub action:        String,
    pub result:        String,
    pub resource_type: String,
    pub resource_id:   String,
    pub detail:        Option<serde_json::Value>,
    pub created_at:    String,
}

impl From<AuditLog> for AuditLogItemData {
    fn from(log: AuditLog) -> Self {
        Self {
            id:            log.id.to_string(),
            actor_id:      log.actor_id.as_uuid().to_string(),
            actor_name:    log.actor_name,
            action:        log.action.to_string(),
            result:        log.result.to_string(),
            resource_type: log.resource_type,
            resource_id:   log.resource_id,
            detail:        log.detail,
            created_at:    log.created_at.to_rfc3339(),
        }
    }
}

impl ListAuditLogsQuery {
    /// クエリパラメータを検索条件に変換する
    ///
    /// 形式が不正な値は無視せず 400 にする。
    fn into_query(self) -> Result<AuditLogQuery, ApiError> {
        let actions = self
            .action
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .unique()
                    .map(str::parse::<AuditAction>)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(AuditLogQuery {
            cursor: self.cursor,
            limit:  self.limit,
            filter: AuditLogFilter {
                from: parse_datetime("from", self.from.as_deref())?,
                to: parse_datetime("to", self.to.as_deref())?,
                actor_id: self.actor_id.map(UserId::from_uuid),
                actions,
                result: self
                    .result
                    .as_deref()
                    .map(str::parse::<AuditResult>)
                    .transpose()?,
            },
        })
    }
}

fn parse_datetime(name: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    ApiError::BadRequest(format!("{name} は RFC 3339 形式で指定してください"))
                })
        })
        .transpose()
}

/// GET /api/v1/admin/audit-logs
///
/// 監査ログ一覧を取得する（新しい順）。
#[tracing::instrument(skip_all)]
pub async fn list_audit_logs(
    State(state): State<Arc<AuditLogState>>,
    Query(query): Query<ListAuditLogsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state.usecase.list(&query.into_query()?).await?;

    let response: PaginatedResponse<AuditLogItemData> =
        PaginatedResponse::from_page(page.items, page.next_cursor);
    Ok((StatusCode::OK, Json(response)))
}
