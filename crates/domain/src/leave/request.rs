//! # 休暇申請エンティティ
//!
//! 状態遷移は ADT（代数的データ型）で表現し、不正な状態を型レベルで防止する。
//! 全体ステータスは [`LeaveRequestState`] から導出し、別フラグとしては保持しない。
//!
//! ## 不変条件
//!
//! - 推薦記録は承認チェーンの先頭から順に並び、同じ段階は 2 度現れない
//! - `Pending(stage)` ではそれより前の段階がすべて `Recommended`
//! - `Approved` では 3 段階すべてが `Recommended`
//! - `Rejected(stage)` では最後の推薦記録がその段階の `Rejected`
//! - 遷移のたびに `version` が 1 増える

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

use super::{
    period::LeavePeriod,
    stage::{ApprovalStage, Decision, Recommendation, validate_chain_prefix},
};
use crate::{
    DomainError,
    user::{User, UserId},
    value_objects::{DepartmentName, LeaveReason, ReliefOfficer, Version},
};

define_uuid_id! {
    /// 休暇申請 ID
    pub struct LeaveRequestId;
}

/// 休暇種別
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    /// 短期休暇（年次休暇の残日数を消費しない）
    Short,
    /// 年次休暇
    Annual,
}

impl_from_str_by_name!(LeaveType, "休暇種別");

/// 休暇申請ステータス（ADT から導出される表示・永続化用の値）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveRequestStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl_from_str_by_name!(LeaveRequestStatus, "休暇申請ステータス");

/// 休暇申請の状態（ADT ベースステートマシン）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveRequestState {
    /// 承認待ち
    Pending(PendingState),
    /// 承認完了
    Approved(ApprovedState),
    /// 却下
    Rejected(RejectedState),
    /// 申請者による取り消し
    Cancelled(CancelledState),
}

/// Pending 状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingState {
    /// 判断待ちの段階
    pub current_stage: ApprovalStage,
}

/// Approved 状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovedState {
    pub approved_at: DateTime<Utc>,
}

/// Rejected 状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedState {
    /// 却下された段階
    pub stage:       ApprovalStage,
    pub rejected_at: DateTime<Utc>,
}

/// Cancelled 状態の固有フィールド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelledState {
    /// 取り消し時点で判断待ちだった段階
    pub stage:        ApprovalStage,
    pub cancelled_at: DateTime<Utc>,
}

/// 休暇申請エンティティ
///
/// 共通フィールドを外側に、状態固有フィールドを `state` enum に分離する。
///
/// ## 楽観的ロック
///
/// 更新操作時はリクエストの version と DB の version を比較し、
/// 一致しない場合は競合エラー（409 Conflict）を返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRequest {
    id: LeaveRequestId,
    employee_id: UserId,
    employee_name: String,
    department: DepartmentName,
    leave_type: LeaveType,
    period: LeavePeriod,
    reason: LeaveReason,
    relief_officer: Option<ReliefOfficer>,
    recommendations: Vec<Recommendation>,
    version: Version,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    state: LeaveRequestState,
}

/// 休暇申請の新規作成パラメータ
pub struct NewLeaveRequest {
    pub id:             LeaveRequestId,
    pub employee_id:    UserId,
    pub employee_name:  String,
    pub department:     DepartmentName,
    pub leave_type:     LeaveType,
    pub period:         LeavePeriod,
    pub reason:         LeaveReason,
    pub relief_officer: Option<ReliefOfficer>,
    pub now:            DateTime<Utc>,
}

/// 休暇申請の DB 復元パラメータ
///
/// DB スキーマのフラット構造を表現する。`from_db()` で不変条件を検証して ADT に変換する。
pub struct LeaveRequestRecord {
    pub id:              LeaveRequestId,
    pub employee_id:     UserId,
    pub employee_name:   String,
    pub department:      DepartmentName,
    pub leave_type:      LeaveType,
    pub period:          LeavePeriod,
    pub reason:          LeaveReason,
    pub relief_officer:  Option<ReliefOfficer>,
    pub status:          LeaveRequestStatus,
    pub current_stage:   Option<ApprovalStage>,
    pub recommendations: Vec<Recommendation>,
    pub version:         Version,
    pub decided_at:      Option<DateTime<Utc>>,
    pub created_at:      DateTime<Utc>,
    pub updated_at:      DateTime<Utc>,
}

impl LeaveRequest {
    /// 新しい休暇申請を作成する
    ///
    /// 申請は作成と同時に提出され、`Pending(Director)` から始まる。
    pub fn new(params: NewLeaveRequest) -> Self {
        Self {
            id: params.id,
            employee_id: params.employee_id,
            employee_name: params.employee_name,
            department: params.department,
            leave_type: params.leave_type,
            period: params.period,
            reason: params.reason,
            relief_officer: params.relief_officer,
            recommendations: Vec::new(),
            version: Version::initial(),
            created_at: params.now,
            updated_at: params.now,
            state: LeaveRequestState::Pending(PendingState {
                current_stage: ApprovalStage::first(),
            }),
        }
    }

    /// 既存のデータから復元する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: 推薦記録と状態の組み合わせが不変条件に違反する場合
    pub fn from_db(record: LeaveRequestRecord) -> Result<Self, DomainError> {
        validate_chain_prefix(&record.recommendations)?;

        let recs = &record.recommendations;
        let all_recommended = recs.iter().all(|r| r.decision == Decision::Recommended);

        let state = match record.status {
            LeaveRequestStatus::Pending => {
                let current_stage = record.current_stage.ok_or_else(|| {
                    DomainError::Validation(
                        "Pending の休暇申請には current_stage が必要です".to_string(),
                    )
                })?;
                if !all_recommended || recs.len() != current_stage.index() {
                    return Err(DomainError::Validation(format!(
                        "Pending({current_stage}) の推薦記録が不正です（件数: {}）",
                        recs.len()
                    )));
                }
                LeaveRequestState::Pending(PendingState { current_stage })
            }
            LeaveRequestStatus::Approved => {
                if !all_recommended || recs.len() != ApprovalStage::CHAIN.len() {
                    return Err(DomainError::Validation(
                        "Approved の休暇申請は全段階の推薦が必要です".to_string(),
                    ));
                }
                let approved_at = record.decided_at.ok_or_else(|| {
                    DomainError::Validation(
                        "Approved の休暇申請には decided_at が必要です".to_string(),
                    )
                })?;
                LeaveRequestState::Approved(ApprovedState { approved_at })
            }
            LeaveRequestStatus::Rejected => {
                let last = recs
                    .last()
                    .filter(|r| r.decision == Decision::Rejected)
                    .ok_or_else(|| {
                        DomainError::Validation(
                            "Rejected の休暇申請は最後の推薦記録が却下である必要があります"
                                .to_string(),
                        )
                    })?;
                let rejected_at = record.decided_at.ok_or_else(|| {
                    DomainError::Validation(
                        "Rejected の休暇申請には decided_at が必要です".to_string(),
                    )
                })?;
                LeaveRequestState::Rejected(RejectedState {
                    stage: last.stage,
                    rejected_at,
                })
            }
            LeaveRequestStatus::Cancelled => {
                let stage = record.current_stage.ok_or_else(|| {
                    DomainError::Validation(
                        "Cancelled の休暇申請には current_stage が必要です".to_string(),
                    )
                })?;
                if !all_recommended || recs.len() != stage.index() {
                    return Err(DomainError::Validation(format!(
                        "Cancelled({stage}) の推薦記録が不正です（件数: {}）",
                        recs.len()
                    )));
                }
                let cancelled_at = record.decided_at.ok_or_else(|| {
                    DomainError::Validation(
                        "Cancelled の休暇申請には decided_at が必要です".to_string(),
                    )
                })?;
                LeaveRequestState::Cancelled(CancelledState {
                    stage,
                    cancelled_at,
                })
            }
        };

        Ok(Self {
            id: record.id,
            employee_id: record.employee_id,
            employee_name: record.employee_name,
            department: record.department,
            leave_type: record.leave_type,
            period: record.period,
            reason: record.reason,
            relief_officer: record.relief_officer,
            recommendations: record.recommendations,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state,
        })
    }

    // Getter メソッド

    pub fn id(&self) -> &LeaveRequestId {
        &self.id
    }

    pub fn employee_id(&self) -> &UserId {
        &self.employee_id
    }

    pub fn employee_name(&self) -> &str {
        &self.employee_name
    }

    pub fn department(&self) -> &DepartmentName {
        &self.department
    }

    pub fn leave_type(&self) -> LeaveType {
        self.leave_type
    }

    pub fn period(&self) -> &LeavePeriod {
        &self.period
    }

    pub fn reason(&self) -> &LeaveReason {
        &self.reason
    }

    pub fn relief_officer(&self) -> Option<&ReliefOfficer> {
        self.relief_officer.as_ref()
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 状態への直接アクセス（パターンマッチ用）
    pub fn state(&self) -> &LeaveRequestState {
        &self.state
    }

    pub fn status(&self) -> LeaveRequestStatus {
        match &self.state {
            LeaveRequestState::Pending(_) => LeaveRequestStatus::Pending,
            LeaveRequestState::Approved(_) => LeaveRequestStatus::Approved,
            LeaveRequestState::Rejected(_) => LeaveRequestStatus::Rejected,
            LeaveRequestState::Cancelled(_) => LeaveRequestStatus::Cancelled,
        }
    }

    /// 判断待ちの段階（Pending 以外は `None`）
    pub fn current_stage(&self) -> Option<ApprovalStage> {
        match &self.state {
            LeaveRequestState::Pending(s) => Some(s.current_stage),
            _ => None,
        }
    }

    /// 永続化用の段階（Pending と Cancelled で保持する）
    pub fn stored_stage(&self) -> Option<ApprovalStage> {
        match &self.state {
            LeaveRequestState::Pending(s) => Some(s.current_stage),
            LeaveRequestState::Cancelled(s) => Some(s.stage),
            LeaveRequestState::Approved(_) | LeaveRequestState::Rejected(_) => None,
        }
    }

    /// 確定日時（承認・却下・取り消し）
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            LeaveRequestState::Pending(_) => None,
            LeaveRequestState::Approved(s) => Some(s.approved_at),
            LeaveRequestState::Rejected(s) => Some(s.rejected_at),
            LeaveRequestState::Cancelled(s) => Some(s.cancelled_at),
        }
    }

    /// 残日数を消費（予約）している申請か
    ///
    /// 承認済みは消費、承認待ちは予約として扱う。
    pub fn holds_days(&self) -> bool {
        matches!(
            self.state,
            LeaveRequestState::Pending(_) | LeaveRequestState::Approved(_)
        )
    }

    // ビジネスロジックメソッド

    /// 承認者として現在の段階を判断できるか検証する
    ///
    /// # Errors
    ///
    /// - `DomainError::Validation`: Pending 以外の状態
    /// - `DomainError::Forbidden`: 本人の申請、ロール不一致、部署不一致、無効ユーザー
    pub fn ensure_can_decide(&self, actor: &User) -> Result<ApprovalStage, DomainError> {
        let LeaveRequestState::Pending(pending) = &self.state else {
            return Err(DomainError::Validation(format!(
                "承認待ちの休暇申請のみ判断できます（現在: {}）",
                self.status()
            )));
        };
        let stage = pending.current_stage;

        if !actor.is_active() {
            return Err(DomainError::Forbidden(
                "無効化されたユーザーは判断できません".to_string(),
            ));
        }
        if actor.id() == &self.employee_id {
            return Err(DomainError::Forbidden(
                "自分の休暇申請は判断できません".to_string(),
            ));
        }
        if actor.role() != stage.required_role() {
            return Err(DomainError::Forbidden(format!(
                "この休暇申請は {stage} の判断待ちです"
            )));
        }
        if stage.requires_same_department() && actor.department() != &self.department {
            return Err(DomainError::Forbidden(
                "他部署の休暇申請は判断できません".to_string(),
            ));
        }

        Ok(stage)
    }

    /// 現在の段階を推薦した新しいインスタンスを返す
    ///
    /// 最終段（HrDirector）の推薦で `Approved` に遷移する。
    pub fn recommended(
        self,
        actor: &User,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let stage = self.ensure_can_decide(actor)?;

        let mut recommendations = self.recommendations;
        recommendations.push(Recommendation {
            stage,
            approver_id: actor.id().clone(),
            approver_name: actor.name().as_str().to_string(),
            decision: Decision::Recommended,
            comment: normalize_comment(comment),
            decided_at: now,
        });

        let state = match stage.next() {
            Some(next) => LeaveRequestState::Pending(PendingState {
                current_stage: next,
            }),
            None => LeaveRequestState::Approved(ApprovedState { approved_at: now }),
        };

        Ok(Self {
            recommendations,
            state,
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }

    /// 現在の段階で却下した新しいインスタンスを返す
    ///
    /// 却下にはコメントが必須。どの段階で却下しても申請は終了する。
    pub fn rejected(
        self,
        actor: &User,
        comment: String,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let stage = self.ensure_can_decide(actor)?;

        let Some(comment) = normalize_comment(Some(comment)) else {
            return Err(DomainError::Validation(
                "却下にはコメントが必要です".to_string(),
            ));
        };

        let mut recommendations = self.recommendations;
        recommendations.push(Recommendation {
            stage,
            approver_id: actor.id().clone(),
            approver_name: actor.name().as_str().to_string(),
            decision: Decision::Rejected,
            comment: Some(comment),
            decided_at: now,
        });

        Ok(Self {
            recommendations,
            state: LeaveRequestState::Rejected(RejectedState {
                stage,
                rejected_at: now,
            }),
            version: self.version.next(),
            updated_at: now,
            ..self
        })
    }

    /// 申請者が取り消した新しいインスタンスを返す
    ///
    /// 取り消しは承認待ちの間のみ可能。
    pub fn cancelled(self, actor_id: &UserId, now: DateTime<Utc>) -> Result<Self, DomainError> {
        if actor_id != &self.employee_id {
            return Err(DomainError::Forbidden(
                "休暇申請を取り消せるのは申請者のみです".to_string(),
            ));
        }

        match self.state {
            LeaveRequestState::Pending(pending) => Ok(Self {
                state: LeaveRequestState::Cancelled(CancelledState {
                    stage:        pending.current_stage,
                    cancelled_at: now,
                }),
                version: self.version.next(),
                updated_at: now,
                ..self
            }),
            _ => Err(DomainError::Validation(format!(
                "取り消しは承認待ちの間のみ可能です（現在: {}）",
                self.status()
            ))),
        }
    }

    /// ユーザーがこの申請を閲覧できるか
    ///
    /// 申請者本人、管理者、判断済みの承認者、現在判断できる承認者が閲覧できる。
    pub fn is_visible_to(&self, viewer: &User) -> bool {
        viewer.id() == &self.employee_id
            || viewer.is_admin()
            || self
                .recommendations
                .iter()
                .any(|r| &r.approver_id == viewer.id())
            || self.ensure_can_decide(viewer).is_ok()
    }
}

fn normalize_comment(comment: Option<String>) -> Option<String> {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::{
        user::{Email, NewUser, UserRole},
        value_objects::{AnnualEntitlement, UserName},
    };

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn user(role: UserRole, department: &str) -> User {
        User::new(NewUser {
            id: UserId::new(),
            email: Email::new(format!("{role}@example.com")).unwrap(),
            name: UserName::new(format!("{role} user")).unwrap(),
            department: DepartmentName::new(department).unwrap(),
            role,
            annual_entitlement: AnnualEntitlement::default(),
            now: at(0),
        })
    }

    #[fixture]
    fn employee() -> User {
        user(UserRole::Employee, "Engineering")
    }

    #[fixture]
    fn pending(employee: User) -> LeaveRequest {
        request_by(&employee)
    }

    fn request_by(employee: &User) -> LeaveRequest {
        LeaveRequest::new(NewLeaveRequest {
            id:             LeaveRequestId::new(),
            employee_id:    employee.id().clone(),
            employee_name:  employee.name().as_str().to_string(),
            department:     employee.department().clone(),
            leave_type:     LeaveType::Annual,
            period:         LeavePeriod::new(
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            )
            .unwrap(),
            reason:         LeaveReason::new("家族旅行").unwrap(),
            relief_officer: None,
            now:            at(0),
        })
    }

    fn record_of(request: &LeaveRequest) -> LeaveRequestRecord {
        LeaveRequestRecord {
            id:              request.id().clone(),
            employee_id:     request.employee_id().clone(),
            employee_name:   request.employee_name().to_string(),
            department:      request.department().clone(),
            leave_type:      request.leave_type(),
            period:          *request.period(),
            reason:          request.reason().clone(),
            relief_officer:  request.relief_officer().cloned(),
            status:          request.status(),
            current_stage:   request.stored_stage(),
            recommendations: request.recommendations().to_vec(),
            version:         request.version(),
            decided_at:      request.decided_at(),
            created_at:      request.created_at(),
            updated_at:      request.updated_at(),
        }
    }

    #[rstest]
    fn test_新規申請は部長の判断待ちから始まる(pending: LeaveRequest) {
        assert_eq!(pending.status(), LeaveRequestStatus::Pending);
        assert_eq!(pending.current_stage(), Some(ApprovalStage::Director));
        assert_eq!(pending.version(), Version::initial());
        assert!(pending.recommendations().is_empty());
    }

    #[rstest]
    fn test_3段階の推薦で承認完了になる(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let head = user(UserRole::DepartmentalHead, "Engineering");
        let hr = user(UserRole::HrDirector, "Human Resources");

        let step1 = pending.recommended(&director, None, at(10)).unwrap();
        assert_eq!(step1.current_stage(), Some(ApprovalStage::DepartmentalHead));

        let step2 = step1
            .recommended(&head, Some("問題なし".to_string()), at(20))
            .unwrap();
        assert_eq!(step2.current_stage(), Some(ApprovalStage::HrDirector));

        let sut = step2.recommended(&hr, None, at(30)).unwrap();

        assert_eq!(
            sut.state(),
            &LeaveRequestState::Approved(ApprovedState { approved_at: at(30) })
        );
        assert_eq!(sut.version().as_u32(), 4);
        assert_eq!(
            sut.recommendations()
                .iter()
                .map(|r| r.stage)
                .collect::<Vec<_>>(),
            ApprovalStage::CHAIN.to_vec()
        );
        assert_eq!(sut.recommendations()[1].comment.as_deref(), Some("問題なし"));
    }

    #[rstest]
    fn test_途中の段階で却下すると申請は終了する(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let head = user(UserRole::DepartmentalHead, "Engineering");

        let sut = pending
            .recommended(&director, None, at(10))
            .unwrap()
            .rejected(&head, "繁忙期のため".to_string(), at(20))
            .unwrap();

        assert_eq!(
            sut.state(),
            &LeaveRequestState::Rejected(RejectedState {
                stage:       ApprovalStage::DepartmentalHead,
                rejected_at: at(20),
            })
        );
        assert_eq!(sut.current_stage(), None);
        assert!(!sut.holds_days());
    }

    #[rstest]
    fn test_却下にはコメントが必要(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");

        let result = pending.rejected(&director, "   ".to_string(), at(10));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    #[case(UserRole::DepartmentalHead, "Engineering")]
    #[case(UserRole::HrDirector, "Engineering")]
    #[case(UserRole::Admin, "Engineering")]
    #[case(UserRole::Employee, "Engineering")]
    #[case(UserRole::Director, "Sales")]
    fn test_段階のロールと部署が一致しない承認者は判断できない(
        pending: LeaveRequest,
        #[case] role: UserRole,
        #[case] department: &str,
    ) {
        let actor = user(role, department);

        let result = pending.recommended(&actor, None, at(10));

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[rstest]
    fn test_人事部長は他部署の申請も判断できる(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let head = user(UserRole::DepartmentalHead, "Engineering");
        let hr = user(UserRole::HrDirector, "Human Resources");

        let at_hr = pending
            .recommended(&director, None, at(10))
            .unwrap()
            .recommended(&head, None, at(20))
            .unwrap();

        assert_eq!(at_hr.ensure_can_decide(&hr).unwrap(), ApprovalStage::HrDirector);
    }

    #[rstest]
    fn test_自分の申請は判断できない(employee: User) {
        let director = employee.with_profile(
            crate::user::UserProfileChanges {
                role: Some(UserRole::Director),
                ..Default::default()
            },
            at(1),
        );
        let own = LeaveRequest::new(NewLeaveRequest {
            id:             LeaveRequestId::new(),
            employee_id:    director.id().clone(),
            employee_name:  "self".to_string(),
            department:     director.department().clone(),
            leave_type:     LeaveType::Short,
            period:         LeavePeriod::new(
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            )
            .unwrap(),
            reason:         LeaveReason::new("通院").unwrap(),
            relief_officer: None,
            now:            at(2),
        });

        let result = own.recommended(&director, None, at(10));

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[rstest]
    fn test_承認完了後は判断できない(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let head = user(UserRole::DepartmentalHead, "Engineering");
        let hr = user(UserRole::HrDirector, "HR");
        let approved = pending
            .recommended(&director, None, at(10))
            .unwrap()
            .recommended(&head, None, at(20))
            .unwrap()
            .recommended(&hr, None, at(30))
            .unwrap();

        let result = approved.rejected(&hr, "やはり却下".to_string(), at(40));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    fn test_申請者は承認待ちの間に取り消せる(employee: User) {
        let pending = request_by(&employee);

        let sut = pending.cancelled(employee.id(), at(5)).unwrap();

        assert_eq!(sut.status(), LeaveRequestStatus::Cancelled);
        assert_eq!(sut.decided_at(), Some(at(5)));
        assert_eq!(sut.version().as_u32(), 2);
    }

    #[rstest]
    fn test_申請者以外は取り消せない(pending: LeaveRequest) {
        let other = user(UserRole::Admin, "Engineering");

        let result = pending.cancelled(other.id(), at(5));

        assert!(matches!(result, Err(DomainError::Forbidden(_))));
    }

    #[rstest]
    fn test_却下後は取り消せない(employee: User) {
        let pending = request_by(&employee);
        let director = user(UserRole::Director, "Engineering");
        let rejected = pending
            .rejected(&director, "人員不足".to_string(), at(10))
            .unwrap();

        let result = rejected.cancelled(employee.id(), at(20));

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[rstest]
    fn test_閲覧権限(employee: User) {
        let pending = request_by(&employee);
        let director = user(UserRole::Director, "Engineering");
        let other_director = user(UserRole::Director, "Sales");
        let head = user(UserRole::DepartmentalHead, "Engineering");
        let admin = user(UserRole::Admin, "IT");
        let colleague = user(UserRole::Employee, "Engineering");

        assert!(pending.is_visible_to(&employee));
        assert!(pending.is_visible_to(&director));
        assert!(pending.is_visible_to(&admin));
        assert!(!pending.is_visible_to(&other_director));
        assert!(!pending.is_visible_to(&head));
        assert!(!pending.is_visible_to(&colleague));

        // 判断済みの承認者は後からも閲覧できる
        let advanced = pending.recommended(&director, None, at(10)).unwrap();
        assert!(advanced.is_visible_to(&director));
        assert!(advanced.is_visible_to(&head));
    }

    // from_db の不変条件検証

    #[rstest]
    fn test_from_dbは各状態を往復できる(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let advanced = pending.clone().recommended(&director, None, at(10)).unwrap();
        let rejected = pending
            .clone()
            .rejected(&director, "不可".to_string(), at(10))
            .unwrap();
        let cancelled = advanced.clone().cancelled(pending.employee_id(), at(20)).unwrap();

        for request in [pending, advanced, rejected, cancelled] {
            let restored = LeaveRequest::from_db(record_of(&request)).unwrap();
            assert_eq!(restored, request);
        }
    }

    #[rstest]
    fn test_from_dbは推薦記録と段階の不一致を拒否する(pending: LeaveRequest) {
        let mut record = record_of(&pending);
        record.current_stage = Some(ApprovalStage::HrDirector);

        assert!(LeaveRequest::from_db(record).is_err());
    }

    #[rstest]
    fn test_from_dbは推薦不足のapprovedを拒否する(pending: LeaveRequest) {
        let mut record = record_of(&pending);
        record.status = LeaveRequestStatus::Approved;
        record.current_stage = None;
        record.decided_at = Some(at(10));

        assert!(LeaveRequest::from_db(record).is_err());
    }

    #[rstest]
    fn test_from_dbは却下記録のないrejectedを拒否する(pending: LeaveRequest) {
        let director = user(UserRole::Director, "Engineering");
        let advanced = pending.recommended(&director, None, at(10)).unwrap();
        let mut record = record_of(&advanced);
        record.status = LeaveRequestStatus::Rejected;
        record.current_stage = None;
        record.decided_at = Some(at(20));

        assert!(LeaveRequest::from_db(record).is_err());
    }
}
