//! ユースケース層の共通ヘルパー
//!
//! リポジトリ呼び出し結果の変換、トランザクション操作、監査ログの記録など、
//! 複数のユースケースで繰り返されるパターンを共通化する。

use leaveflow_domain::{
    audit_log::AuditLog,
    user::{User, UserId},
};
use leaveflow_infra::{
    InfraError,
    db::{TransactionManager, TxContext},
    repository::{AuditLogRepository, UserRepository},
};
use leaveflow_shared::event_log::error;

use crate::error::ApiError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, ApiError>` に変換する
///
/// ```ignore
/// let request = self.deps.leave_repo.find_by_id(&id).await.or_not_found("休暇申請")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `ApiError::NotFound`、`InfraError` の場合は `ApiError::Internal` を返す
    fn or_not_found(self, entity_name: &str) -> Result<T, ApiError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::Internal(format!("{}の取得に失敗: {}", entity_name, e)))?
            .ok_or_else(|| ApiError::NotFound(format!("{}が見つかりません", entity_name)))
    }
}

/// トランザクションを開始する
pub(crate) async fn begin_tx(tx_manager: &dyn TransactionManager) -> Result<TxContext, ApiError> {
    tx_manager
        .begin()
        .await
        .map_err(|e| ApiError::Internal(format!("トランザクション開始に失敗: {}", e)))
}

/// トランザクションをコミットする
pub(crate) async fn commit_tx(tx: TxContext) -> Result<(), ApiError> {
    tx.commit()
        .await
        .map_err(|e| ApiError::Internal(format!("トランザクションコミットに失敗: {}", e)))
}

/// 操作者を最新の状態で取得する
///
/// セッションのロールはログイン時点のスナップショットのため、
/// 権限判定には DB 上のユーザーを使う。無効化済みのユーザーは操作できない。
pub(crate) async fn load_active_actor(
    user_repo: &dyn UserRepository,
    actor_id: &UserId,
) -> Result<User, ApiError> {
    let actor = user_repo
        .find_by_id(actor_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("ユーザーが存在しません".to_string()))?;

    if !actor.is_active() {
        return Err(ApiError::Forbidden(
            "無効化されたユーザーは操作できません".to_string(),
        ));
    }
    Ok(actor)
}

/// 監査ログを記録する
///
/// 業務操作はコミット済みのため、失敗してもエラーにせずログに残す。
pub(crate) async fn record_audit(repo: &dyn AuditLogRepository, log: AuditLog) {
    if let Err(e) = repo.record(&log).await {
        tracing::error!(
            error.category = error::category::INFRASTRUCTURE,
            error.kind = error::kind::AUDIT_LOG,
            audit.action = %log.action,
            audit.resource_id = %log.resource_id,
            "監査ログ記録に失敗: {}",
            e
        );
    }
}
