//! # ドメインエラー
//!
//! 休暇申請や利用者の業務ルールに反したときに返すエラー。
//! API 層がそれぞれを 400 / 404 / 409 / 403 に対応付ける。
//!
//! ```rust
//! use leaveflow_domain::DomainError;
//!
//! fn require_reason(reason: &str) -> Result<(), DomainError> {
//!     if reason.trim().is_empty() {
//!         return Err(DomainError::Validation("申請理由を入力してください".to_string()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_reason("  ").is_err());
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// 入力値の誤り、または今の状態では許されない遷移
    #[error("入力が不正です: {0}")]
    Validation(String),

    #[error("{entity_type}が見つかりません: {id}")]
    NotFound {
        entity_type: &'static str,
        id:          String,
    },

    /// 期間の重複、または他の承認者が先に更新した
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// 本人確認はできているが、この承認段階・部署の担当ではない
    #[error("権限がありません: {0}")]
    Forbidden(String),
}
