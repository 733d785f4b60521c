//! # リポジトリ実装
//!
//! 各リポジトリはトレイトと PostgreSQL 実装の組で提供する。
//! ユースケース層はトレイトにのみ依存し、テストではインメモリ実装に差し替える。
//!
//! 書き込みメソッドは [`TxContext`](crate::db::TxContext) を要求する。

pub mod audit_log_repository;
pub mod leave_request_repository;
pub mod roster_repository;
pub mod user_repository;

pub use audit_log_repository::{
    AuditLogCursor,
    AuditLogFilter,
    AuditLogPage,
    AuditLogRepository,
    PostgresAuditLogRepository,
};
pub use leave_request_repository::{
    LeaveRequestFilter,
    LeaveRequestRepository,
    PostgresLeaveRequestRepository,
};
pub use roster_repository::{PostgresRosterRepository, RosterRepository};
pub use user_repository::{PostgresUserRepository, UserRepository};

/// 一意制約違反を競合エラーに変換する
pub(crate) fn map_unique_violation(
    entity: &str,
    id: impl Into<String>,
) -> impl FnOnce(sqlx::Error) -> crate::InfraError {
    let entity = entity.to_string();
    let id = id.into();
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            crate::InfraError::conflict(entity, id)
        }
        _ => e.into(),
    }
}
