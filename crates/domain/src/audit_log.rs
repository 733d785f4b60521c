//! # 監査ログ
//!
//! 誰が・いつ・どのリソースに何をしたかを残す追記専用の記録。
//! 休暇申請の状態遷移（申請・推薦・却下・取消）と管理者操作が対象で、
//! 管理者は `(created_at, id)` の新しい順に閲覧する。
//!
//! アクションは `leave.recommend` のような `リソース.操作` 形式で保存・検索する。

use chrono::{DateTime, Utc};
use strum::{EnumIter, IntoStaticStr};
use uuid::Uuid;

use crate::user::UserId;

/// 監査対象のアクション
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumIter, strum::Display)]
pub enum AuditAction {
    #[strum(serialize = "user.create")]
    UserCreate,
    #[strum(serialize = "user.update")]
    UserUpdate,
    #[strum(serialize = "user.activate")]
    UserActivate,
    #[strum(serialize = "user.deactivate")]
    UserDeactivate,
    #[strum(serialize = "leave.submit")]
    LeaveSubmit,
    #[strum(serialize = "leave.recommend")]
    LeaveRecommend,
    #[strum(serialize = "leave.reject")]
    LeaveReject,
    #[strum(serialize = "leave.cancel")]
    LeaveCancel,
    #[strum(serialize = "roster.create")]
    RosterCreate,
    #[strum(serialize = "roster.delete")]
    RosterDelete,
}

/// 操作の成否
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumIter, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuditResult {
    Success,
    Failure,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

impl_from_str_by_name!(AuditAction, "監査アクション");
impl_from_str_by_name!(AuditResult, "監査結果");

/// 1 件の監査記録（作成後は変更しない）
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: UserId,
    pub actor_name: String,
    pub action: AuditAction,
    pub result: AuditResult,
    pub resource_type: String,
    pub resource_id: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl AuditLog {
    /// 成功した操作を記録する（`id` は時刻順に並ぶ UUID v7）
    pub fn new_success(
        actor_id: UserId,
        actor_name: impl Into<String>,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
        detail: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            actor_id,
            actor_name: actor_name.into(),
            action,
            result: AuditResult::Success,
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
            detail,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    use super::*;
    use crate::DomainError;

    #[rstest]
    #[case(AuditAction::LeaveRecommend, "leave.recommend")]
    #[case(AuditAction::RosterDelete, "roster.delete")]
    #[case(AuditAction::UserDeactivate, "user.deactivate")]
    fn test_アクションはリソース_操作の形式で表す(#[case] action: AuditAction, #[case] expected: &str) {
        assert_eq!(action.as_str(), expected);
        assert_eq!(action.to_string(), expected);
    }

    #[test]
    fn test_全アクションが保存した文字列から復元できる() {
        for action in AuditAction::iter() {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
    }

    #[rstest]
    #[case("role.create")]
    #[case("LeaveSubmit")]
    #[case("")]
    fn test_不明なアクションは拒否される(#[case] input: &str) {
        assert!(matches!(input.parse::<AuditAction>(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_結果は小文字で表す() {
        assert_eq!(AuditResult::Failure.as_str(), "failure");
        assert_eq!("success".parse::<AuditResult>().unwrap(), AuditResult::Success);
        assert!("SUCCESS".parse::<AuditResult>().is_err());
    }

    #[test]
    fn test_new_successは成功結果とuuid_v7のidを持つ() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let sut = AuditLog::new_success(
            UserId::new(),
            "管理者",
            AuditAction::RosterCreate,
            "roster_entry",
            "entry-1",
            None,
            now,
        );

        assert_eq!(sut.result, AuditResult::Success);
        assert_eq!(sut.created_at, now);
        assert_eq!(sut.id.get_version_num(), 7);
    }
}
