//! # 監査ログ閲覧ユースケース
//!
//! 管理者向けに監査ログを新しい順でカーソルページネーションして返す。

use std::sync::Arc;

use leaveflow_infra::repository::{AuditLogFilter, AuditLogPage, AuditLogRepository};

use crate::error::ApiError;

/// 1 ページの既定件数
pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// 1 ページの最大件数
pub const MAX_PAGE_SIZE: u32 = 100;

/// 監査ログの検索条件
#[derive(Debug, Default)]
pub struct AuditLogQuery {
    pub cursor: Option<String>,
    pub limit:  Option<i64>,
    pub filter: AuditLogFilter,
}

impl AuditLogQuery {
    /// 件数を 1..=100 に丸める（未指定は 50）
    pub fn page_size(&self) -> u32 {
        self.limit
            .map(|l| l.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

pub struct AuditLogUseCaseImpl {
    audit_log_repo: Arc<dyn AuditLogRepository>,
}

impl AuditLogUseCaseImpl {
    pub fn new(audit_log_repo: Arc<dyn AuditLogRepository>) -> Self {
        Self { audit_log_repo }
    }

    /// 監査ログを検索する
    ///
    /// 不正なカーソルは 400 を返す。
    pub async fn list(&self, query: &AuditLogQuery) -> Result<AuditLogPage, ApiError> {
        if let (Some(from), Some(to)) = (query.filter.from, query.filter.to)
            && from > to
        {
            return Err(ApiError::BadRequest(
                "from は to 以前の日時を指定してください".to_string(),
            ));
        }

        Ok(self
            .audit_log_repo
            .find(query.cursor.as_deref(), query.page_size(), &query.filter)
            .await?)
    }
}
