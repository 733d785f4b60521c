//! # 休暇申請ユースケース
//!
//! 休暇申請の提出・承認チェーン上の判断・取り消し・照会を扱う。
//!
//! 状態遷移のルールは [`LeaveRequest`] が持ち、このユースケースは
//! 「読み込み → 遷移 → 楽観的ロック付き保存 → 監査ログ → 配信」の順序だけを担う。
//! 一般ユーザー向けと管理者向けのルートはどちらもこのユースケースを経由する。

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use leaveflow_domain::{
    audit_log::{AuditAction, AuditLog},
    clock::Clock,
    leave::{
        AnnualLeaveBalance,
        ApprovalStage,
        LeavePeriod,
        LeavePolicy,
        LeaveRequest,
        LeaveRequestId,
        LeaveRequestStatus,
        LeaveType,
        NewLeaveRequest,
    },
    user::{User, UserId},
    value_objects::{LeaveReason, ReliefOfficer, Version},
};
use leaveflow_infra::{
    db::TransactionManager,
    repository::{AuditLogRepository, LeaveRequestFilter, LeaveRequestRepository, UserRepository},
};
use leaveflow_shared::{event_log::event, log_business_event};
use serde_json::json;

use super::helpers::{FindResultExt, begin_tx, commit_tx, load_active_actor, record_audit};
use crate::{
    error::ApiError,
    live::{EventHub, LeaveEventPayload, LiveEvent},
};

const RESOURCE_TYPE: &str = "leave_request";

/// 休暇申請の提出入力
#[derive(Debug, Clone)]
pub struct SubmitLeaveInput {
    pub leave_type:     LeaveType,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
    pub reason:         String,
    pub relief_officer: Option<String>,
}

/// 休暇申請ユースケースの依存
pub struct LeaveDeps {
    pub user_repo:      Arc<dyn UserRepository>,
    pub leave_repo:     Arc<dyn LeaveRequestRepository>,
    pub tx_manager:     Arc<dyn TransactionManager>,
    pub audit_log_repo: Arc<dyn AuditLogRepository>,
    pub hub:            EventHub,
    pub policy:         LeavePolicy,
    pub clock:          Arc<dyn Clock>,
}

/// 承認チェーン上の判断
enum Judgement {
    Recommend(Option<String>),
    Reject(String),
}

/// 休暇申請ユースケース
pub struct LeaveUseCaseImpl {
    deps: LeaveDeps,
}

impl LeaveUseCaseImpl {
    pub fn new(deps: LeaveDeps) -> Self {
        Self { deps }
    }

    /// 休暇を申請する
    ///
    /// ## 処理フロー
    ///
    /// 1. 申請ポリシー（過去日付・営業日数・短期休暇の上限）を検証
    /// 2. トランザクションを開始し、申請者の行をロック
    /// 3. 承認待ち・承認済みの自分の申請と期間が重ならないことを確認
    /// 4. 年次休暇は期間にかかる各年の残日数に収まることを確認
    /// 5. `Pending(director)` として保存・コミットし、監査ログと `leave_submitted` を発行
    ///
    /// 2〜5 は同じトランザクション内で行うため、同じ申請者の同時提出は直列化され、
    /// 重複や残日数超過の申請が両方とも保存されることはない。
    pub async fn submit(
        &self,
        actor_id: &UserId,
        input: SubmitLeaveInput,
    ) -> Result<LeaveRequest, ApiError> {
        let actor = load_active_actor(self.deps.user_repo.as_ref(), actor_id).await?;

        let period = LeavePeriod::new(input.start_date, input.end_date)?;
        let reason = LeaveReason::new(input.reason)?;
        let relief_officer = input
            .relief_officer
            .filter(|r| !r.trim().is_empty())
            .map(ReliefOfficer::new)
            .transpose()?;

        self.deps
            .policy
            .validate_submission(input.leave_type, &period, self.deps.clock.today())?;

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps.user_repo.lock_for_update(&mut tx, actor.id()).await?;
        let existing = self
            .deps
            .leave_repo
            .find_by_employee_in_tx(&mut tx, actor.id())
            .await?;

        if existing
            .iter()
            .any(|r| r.holds_days() && r.period().overlaps(&period))
        {
            return Err(ApiError::Conflict(
                "既存の休暇申請と期間が重複しています".to_string(),
            ));
        }

        if input.leave_type == LeaveType::Annual {
            for year in period.years() {
                AnnualLeaveBalance::compute(year, actor.annual_entitlement(), &existing)
                    .ensure_fits(&period)?;
            }
        }

        let request = LeaveRequest::new(NewLeaveRequest {
            id: LeaveRequestId::new(),
            employee_id: actor.id().clone(),
            employee_name: actor.name().as_str().to_string(),
            department: actor.department().clone(),
            leave_type: input.leave_type,
            period,
            reason,
            relief_officer,
            now: self.deps.clock.now(),
        });

        self.deps.leave_repo.insert(&mut tx, &request).await?;
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::LEAVE,
            event.action = event::action::LEAVE_SUBMITTED,
            event.entity_type = event::entity_type::LEAVE_REQUEST,
            event.entity_id = %request.id(),
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            leave_type = %request.leave_type(),
            working_days = request.period().working_days(),
            "休暇申請を受け付けました"
        );

        self.after_transition(
            &actor,
            &request,
            AuditAction::LeaveSubmit,
            json!({
                "leave_type": request.leave_type(),
                "start_date": request.period().start(),
                "end_date": request.period().end(),
                "working_days": request.period().working_days(),
            }),
            LiveEvent::LeaveSubmitted(LeaveEventPayload::of(&request)),
        )
        .await;

        Ok(request)
    }

    /// 現在の段階を推薦する
    ///
    /// 最終段（HrDirector）の推薦で承認済みになる。
    pub async fn recommend(
        &self,
        actor_id: &UserId,
        id: &LeaveRequestId,
        version: Version,
        comment: Option<String>,
    ) -> Result<LeaveRequest, ApiError> {
        self.decide(actor_id, id, version, Judgement::Recommend(comment))
            .await
    }

    /// 現在の段階で却下する（コメント必須）
    pub async fn reject(
        &self,
        actor_id: &UserId,
        id: &LeaveRequestId,
        version: Version,
        comment: String,
    ) -> Result<LeaveRequest, ApiError> {
        self.decide(actor_id, id, version, Judgement::Reject(comment))
            .await
    }

    /// 申請者が承認待ちの申請を取り消す
    pub async fn cancel(
        &self,
        actor_id: &UserId,
        id: &LeaveRequestId,
        version: Version,
    ) -> Result<LeaveRequest, ApiError> {
        let actor = load_active_actor(self.deps.user_repo.as_ref(), actor_id).await?;
        let request = self.load_for_update(id, version).await?;
        let stage = request.current_stage();

        let cancelled = request.cancelled(actor.id(), self.deps.clock.now())?;
        self.save(&cancelled, version).await?;

        log_business_event!(
            event.category = event::category::LEAVE,
            event.action = event::action::LEAVE_CANCELLED,
            event.entity_type = event::entity_type::LEAVE_REQUEST,
            event.entity_id = %cancelled.id(),
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            "休暇申請を取り消しました"
        );

        self.after_transition(
            &actor,
            &cancelled,
            AuditAction::LeaveCancel,
            json!({ "stage": stage, "version": cancelled.version().as_u32() }),
            LiveEvent::LeaveUpdated(LeaveEventPayload::of(&cancelled)),
        )
        .await;

        Ok(cancelled)
    }

    /// 休暇申請を取得する
    ///
    /// 閲覧権限がない場合は存在を明かさず 404 を返す。
    pub async fn get(
        &self,
        actor_id: &UserId,
        id: &LeaveRequestId,
    ) -> Result<LeaveRequest, ApiError> {
        let actor = load_active_actor(self.deps.user_repo.as_ref(), actor_id).await?;
        let request = self
            .deps
            .leave_repo
            .find_by_id(id)
            .await
            .or_not_found("休暇申請")?;

        if !request.is_visible_to(&actor) {
            return Err(ApiError::NotFound("休暇申請が見つかりません".to_string()));
        }
        Ok(request)
    }

    /// 自分の申請を新しい順で取得する
    pub async fn list_mine(
        &self,
        actor_id: &UserId,
        status: Option<LeaveRequestStatus>,
    ) -> Result<Vec<LeaveRequest>, ApiError> {
        Ok(self
            .deps
            .leave_repo
            .find_by_employee(actor_id, status)
            .await?)
    }

    /// 自分が判断すべき承認待ちの申請を古い順で取得する
    ///
    /// 承認者ロールでなければ空のリストを返す。
    pub async fn list_pending_approvals(
        &self,
        actor_id: &UserId,
    ) -> Result<Vec<LeaveRequest>, ApiError> {
        let actor = load_active_actor(self.deps.user_repo.as_ref(), actor_id).await?;
        let Some(stage) = ApprovalStage::for_role(actor.role()) else {
            return Ok(Vec::new());
        };

        let department = stage
            .requires_same_department()
            .then(|| actor.department());
        let requests = self
            .deps
            .leave_repo
            .find_pending_by_stage(stage, department)
            .await?;

        Ok(requests
            .into_iter()
            .filter(|r| r.employee_id() != actor.id())
            .collect())
    }

    /// 年次休暇の残日数を取得する（年の指定がなければ今年）
    pub async fn balance(
        &self,
        actor_id: &UserId,
        year: Option<i32>,
    ) -> Result<AnnualLeaveBalance, ApiError> {
        let actor = self
            .deps
            .user_repo
            .find_by_id(actor_id)
            .await
            .or_not_found("ユーザー")?;
        let year = year.unwrap_or_else(|| self.deps.clock.today().year());
        let requests = self
            .deps
            .leave_repo
            .find_by_employee(actor.id(), None)
            .await?;

        Ok(AnnualLeaveBalance::compute(
            year,
            actor.annual_entitlement(),
            &requests,
        ))
    }

    /// 全申請を新しい順で取得する（管理者向け）
    pub async fn list_all(&self, filter: &LeaveRequestFilter) -> Result<Vec<LeaveRequest>, ApiError> {
        Ok(self.deps.leave_repo.find_all(filter).await?)
    }

    async fn decide(
        &self,
        actor_id: &UserId,
        id: &LeaveRequestId,
        version: Version,
        judgement: Judgement,
    ) -> Result<LeaveRequest, ApiError> {
        let actor = load_active_actor(self.deps.user_repo.as_ref(), actor_id).await?;
        let request = self.load_for_update(id, version).await?;
        let stage = request.ensure_can_decide(&actor)?;
        let now = self.deps.clock.now();

        let (updated, action, comment) = match judgement {
            Judgement::Recommend(comment) => (
                request.recommended(&actor, comment.clone(), now)?,
                AuditAction::LeaveRecommend,
                comment,
            ),
            Judgement::Reject(comment) => (
                request.rejected(&actor, comment.clone(), now)?,
                AuditAction::LeaveReject,
                Some(comment),
            ),
        };
        self.save(&updated, version).await?;

        let event_action = match updated.status() {
            LeaveRequestStatus::Approved => event::action::LEAVE_APPROVED,
            LeaveRequestStatus::Rejected => event::action::LEAVE_REJECTED,
            _ => event::action::LEAVE_RECOMMENDED,
        };
        log_business_event!(
            event.category = event::category::LEAVE,
            event.action = event_action,
            event.entity_type = event::entity_type::LEAVE_REQUEST,
            event.entity_id = %updated.id(),
            event.actor_id = %actor.id(),
            event.result = event::result::SUCCESS,
            stage = %stage,
            "休暇申請を判断しました"
        );

        self.after_transition(
            &actor,
            &updated,
            action,
            json!({
                "stage": stage,
                "comment": comment,
                "status": updated.status(),
                "version": updated.version().as_u32(),
            }),
            LiveEvent::LeaveUpdated(LeaveEventPayload::of(&updated)),
        )
        .await;

        Ok(updated)
    }

    /// 更新対象を取得し、クライアントが見ているバージョンと一致するか確認する
    async fn load_for_update(
        &self,
        id: &LeaveRequestId,
        version: Version,
    ) -> Result<LeaveRequest, ApiError> {
        let request = self
            .deps
            .leave_repo
            .find_by_id(id)
            .await
            .or_not_found("休暇申請")?;

        if request.version() != version {
            return Err(stale_version());
        }
        Ok(request)
    }

    async fn save(&self, request: &LeaveRequest, expected: Version) -> Result<(), ApiError> {
        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps
            .leave_repo
            .update_with_version_check(&mut tx, request, expected)
            .await
            .map_err(|e| {
                if e.as_conflict().is_some() {
                    stale_version()
                } else {
                    ApiError::from(e)
                }
            })?;
        commit_tx(tx).await
    }

    async fn after_transition(
        &self,
        actor: &User,
        request: &LeaveRequest,
        action: AuditAction,
        detail: serde_json::Value,
        live_event: LiveEvent,
    ) {
        record_audit(
            self.deps.audit_log_repo.as_ref(),
            AuditLog::new_success(
                actor.id().clone(),
                actor.name().as_str(),
                action,
                RESOURCE_TYPE,
                request.id().to_string(),
                Some(detail),
                self.deps.clock.now(),
            ),
        )
        .await;

        self.deps.hub.publish(live_event);
    }
}

fn stale_version() -> ApiError {
    ApiError::Conflict(
        "休暇申請は既に更新されています。最新の情報を取得してください。".to_string(),
    )
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{DateTime, TimeZone, Utc};
    use leaveflow_domain::{
        clock::FixedClock,
        password::PasswordHash,
        user::{Email, NewUser, UserRole},
        value_objects::{AnnualEntitlement, DepartmentName, UserName},
    };
    use leaveflow_infra::mock::{
        MockAuditLogRepository,
        MockLeaveRequestRepository,
        MockTransactionManager,
        MockUserRepository,
    };
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    use super::*;

    /// 2026-03-02（月）09:00 UTC
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn user(role: UserRole, department: &str, entitlement: u16) -> User {
        User::new(NewUser {
            id: UserId::new(),
            email: Email::new(format!("{}@example.com", UserId::new())).unwrap(),
            name: UserName::new(format!("{role} of {department}")).unwrap(),
            department: DepartmentName::new(department).unwrap(),
            role,
            annual_entitlement: AnnualEntitlement::new(entitlement).unwrap(),
            now: now(),
        })
    }

    struct Fixture {
        sut:            LeaveUseCaseImpl,
        leave_repo:     MockLeaveRequestRepository,
        audit_log_repo: MockAuditLogRepository,
        hub:            EventHub,
        employee:       User,
        director:       User,
        other_director: User,
        head:           User,
        hr:             User,
        admin:          User,
    }

    #[fixture]
    fn fixture() -> Fixture {
        let employee = user(UserRole::Employee, "Engineering", 10);
        let director = user(UserRole::Director, "Engineering", 30);
        let other_director = user(UserRole::Director, "Sales", 30);
        let head = user(UserRole::DepartmentalHead, "Engineering", 30);
        let hr = user(UserRole::HrDirector, "Human Resources", 30);
        let admin = user(UserRole::Admin, "IT", 30);

        let user_repo = MockUserRepository::new();
        for u in [&employee, &director, &other_director, &head, &hr, &admin] {
            user_repo.add_user(u.clone(), PasswordHash::new("hash"));
        }
        let leave_repo = MockLeaveRequestRepository::new();
        let audit_log_repo = MockAuditLogRepository::new();
        let hub = EventHub::new(16);

        let sut = LeaveUseCaseImpl::new(LeaveDeps {
            user_repo:      Arc::new(user_repo),
            leave_repo:     Arc::new(leave_repo.clone()),
            tx_manager:     Arc::new(MockTransactionManager),
            audit_log_repo: Arc::new(audit_log_repo.clone()),
            hub:            hub.clone(),
            policy:         LeavePolicy::default(),
            clock:          Arc::new(FixedClock::new(now())),
        });

        Fixture {
            sut,
            leave_repo,
            audit_log_repo,
            hub,
            employee,
            director,
            other_director,
            head,
            hr,
            admin,
        }
    }

    fn input(leave_type: LeaveType, start: NaiveDate, end: NaiveDate) -> SubmitLeaveInput {
        SubmitLeaveInput {
            leave_type,
            start_date: start,
            end_date: end,
            reason: "家族旅行".to_string(),
            relief_officer: Some("鈴木".to_string()),
        }
    }

    async fn submitted(f: &Fixture) -> LeaveRequest {
        f.sut
            .submit(
                f.employee.id(),
                input(LeaveType::Annual, date(3, 9), date(3, 13)),
            )
            .await
            .unwrap()
    }

    // === submit ===

    #[rstest]
    #[tokio::test]
    async fn test_申請はdirector段階の承認待ちから始まる(fixture: Fixture) {
        let mut rx = fixture.hub.subscribe();

        let request = submitted(&fixture).await;

        assert_eq!(request.status(), LeaveRequestStatus::Pending);
        assert_eq!(request.current_stage(), Some(ApprovalStage::Director));
        assert_eq!(request.version(), Version::initial());
        assert_eq!(
            fixture.audit_log_repo.recorded()[0].action,
            AuditAction::LeaveSubmit
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            LiveEvent::LeaveSubmitted(payload) if payload.leave_id == *request.id().as_uuid()
        ));
    }

    #[rstest]
    #[case::過去の日付(LeaveType::Annual, date(2, 27), date(3, 3))]
    #[case::週末のみ(LeaveType::Short, date(3, 7), date(3, 8))]
    #[case::短期休暇の上限超過(LeaveType::Short, date(3, 9), date(3, 16))]
    #[case::残日数不足(LeaveType::Annual, date(3, 9), date(3, 23))]
    #[case::終了日が開始日より前(LeaveType::Annual, date(3, 13), date(3, 9))]
    #[tokio::test]
    async fn test_ポリシー違反の申請は400を返す(
        fixture: Fixture,
        #[case] leave_type: LeaveType,
        #[case] start: NaiveDate,
        #[case] end: NaiveDate,
    ) {
        let result = fixture
            .sut
            .submit(fixture.employee.id(), input(leave_type, start, end))
            .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))), "{result:?}");
    }

    #[rstest]
    #[tokio::test]
    async fn test_承認待ちの申請と重なる期間は409を返す(fixture: Fixture) {
        submitted(&fixture).await;

        let result = fixture
            .sut
            .submit(
                fixture.employee.id(),
                input(LeaveType::Short, date(3, 13), date(3, 13)),
            )
            .await;

        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_承認待ちの年次休暇は残日数を予約する(fixture: Fixture) {
        submitted(&fixture).await;

        // 付与 10 日のうち 5 日が予約済みのため、6 日は申請できない
        let result = fixture
            .sut
            .submit(
                fixture.employee.id(),
                input(LeaveType::Annual, date(4, 6), date(4, 13)),
            )
            .await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let balance = fixture
            .sut
            .balance(fixture.employee.id(), None)
            .await
            .unwrap();
        assert_eq!(balance.year, 2026);
        assert_eq!(balance.reserved, 5);
        assert_eq!(balance.remaining, 5);
    }

    /// 2 件の提出を同時に走らせる
    ///
    /// 既存申請の読み込みと保存の間に、もう一方の提出が割り込める状態にしておく。
    async fn submit_concurrently(
        f: &Fixture,
        first: SubmitLeaveInput,
        second: SubmitLeaveInput,
    ) -> (
        Result<LeaveRequest, ApiError>,
        Result<LeaveRequest, ApiError>,
    ) {
        f.leave_repo.set_read_delay(Duration::from_millis(20));
        tokio::join!(
            f.sut.submit(f.employee.id(), first),
            f.sut.submit(f.employee.id(), second),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn test_期間が重なる同時提出は片方だけが保存される(fixture: Fixture) {
        let (first, second) = submit_concurrently(
            &fixture,
            input(LeaveType::Annual, date(3, 9), date(3, 13)),
            input(LeaveType::Annual, date(3, 11), date(3, 17)),
        )
        .await;

        assert!(first.is_ok(), "{first:?}");
        assert!(matches!(second, Err(ApiError::Conflict(_))), "{second:?}");
        let stored = fixture
            .leave_repo
            .find_by_employee(fixture.employee.id(), None)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn test_同時提出でも年次休暇の残日数を超えて予約されない(fixture: Fixture) {
        // 付与 10 日に対し 5 日と 7 日。単独ならどちらも収まる
        let (first, second) = submit_concurrently(
            &fixture,
            input(LeaveType::Annual, date(3, 9), date(3, 13)),
            input(LeaveType::Annual, date(3, 16), date(3, 24)),
        )
        .await;

        assert!(first.is_ok(), "{first:?}");
        assert!(matches!(second, Err(ApiError::BadRequest(_))), "{second:?}");
        let balance = fixture
            .sut
            .balance(fixture.employee.id(), None)
            .await
            .unwrap();
        assert_eq!(balance.reserved, 5);
    }

    // === recommend / reject ===

    #[rstest]
    #[tokio::test]
    async fn test_3段階の推薦で承認済みになる(fixture: Fixture) {
        let request = submitted(&fixture).await;
        let id = request.id().clone();

        let r = fixture
            .sut
            .recommend(fixture.director.id(), &id, request.version(), None)
            .await
            .unwrap();
        assert_eq!(r.current_stage(), Some(ApprovalStage::DepartmentalHead));

        let r = fixture
            .sut
            .recommend(fixture.head.id(), &id, r.version(), Some("問題なし".into()))
            .await
            .unwrap();
        assert_eq!(r.current_stage(), Some(ApprovalStage::HrDirector));

        let r = fixture
            .sut
            .recommend(fixture.hr.id(), &id, r.version(), None)
            .await
            .unwrap();

        assert_eq!(r.status(), LeaveRequestStatus::Approved);
        assert_eq!(r.version().as_u32(), 4);
        assert_eq!(r.recommendations().len(), 3);
        let actions: Vec<AuditAction> = fixture
            .audit_log_repo
            .recorded()
            .iter()
            .map(|l| l.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::LeaveSubmit,
                AuditAction::LeaveRecommend,
                AuditAction::LeaveRecommend,
                AuditAction::LeaveRecommend,
            ]
        );
    }

    #[rstest]
    #[tokio::test]
    async fn test_他部署のdirectorは判断できない(fixture: Fixture) {
        let request = submitted(&fixture).await;

        let result = fixture
            .sut
            .recommend(
                fixture.other_director.id(),
                request.id(),
                request.version(),
                None,
            )
            .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_段階と異なるロールは判断できない(fixture: Fixture) {
        let request = submitted(&fixture).await;

        for actor in [&fixture.head, &fixture.hr, &fixture.admin] {
            let result = fixture
                .sut
                .recommend(actor.id(), request.id(), request.version(), None)
                .await;
            assert!(matches!(result, Err(ApiError::Forbidden(_))));
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_自分の申請は判断できない(fixture: Fixture) {
        let own = fixture
            .sut
            .submit(
                fixture.director.id(),
                input(LeaveType::Short, date(3, 10), date(3, 10)),
            )
            .await
            .unwrap();

        let result = fixture
            .sut
            .recommend(fixture.director.id(), own.id(), own.version(), None)
            .await;

        assert!(matches!(result, Err(ApiError::Forbidden(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_古いバージョンでの判断は409を返す(fixture: Fixture) {
        let request = submitted(&fixture).await;
        fixture
            .sut
            .recommend(fixture.director.id(), request.id(), request.version(), None)
            .await
            .unwrap();

        let result = fixture
            .sut
            .reject(
                fixture.head.id(),
                request.id(),
                request.version(),
                "重複".to_string(),
            )
            .await;

        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[rstest]
    #[case("", false)]
    #[case("   ", false)]
    #[case("繁忙期のため", true)]
    #[tokio::test]
    async fn test_却下にはコメントが必要(
        fixture: Fixture,
        #[case] comment: &str,
        #[case] ok: bool,
    ) {
        let request = submitted(&fixture).await;

        let result = fixture
            .sut
            .reject(
                fixture.director.id(),
                request.id(),
                request.version(),
                comment.to_string(),
            )
            .await;

        match (result, ok) {
            (Ok(r), true) => {
                assert_eq!(r.status(), LeaveRequestStatus::Rejected);
                assert_eq!(
                    fixture.audit_log_repo.recorded().last().unwrap().action,
                    AuditAction::LeaveReject
                );
            }
            (Err(ApiError::BadRequest(_)), false) => {}
            (other, _) => panic!("想定外の結果: {other:?}"),
        }
    }

    // === cancel ===

    #[rstest]
    #[tokio::test]
    async fn test_申請者のみ取り消せる(fixture: Fixture) {
        let request = submitted(&fixture).await;

        let denied = fixture
            .sut
            .cancel(fixture.director.id(), request.id(), request.version())
            .await;
        assert!(matches!(denied, Err(ApiError::Forbidden(_))));

        let cancelled = fixture
            .sut
            .cancel(fixture.employee.id(), request.id(), request.version())
            .await
            .unwrap();
        assert_eq!(cancelled.status(), LeaveRequestStatus::Cancelled);
        assert!(!cancelled.holds_days());
    }

    #[rstest]
    #[tokio::test]
    async fn test_却下済みの申請は取り消せない(fixture: Fixture) {
        let request = submitted(&fixture).await;
        let rejected = fixture
            .sut
            .reject(
                fixture.director.id(),
                request.id(),
                request.version(),
                "人員不足".to_string(),
            )
            .await
            .unwrap();

        let result = fixture
            .sut
            .cancel(fixture.employee.id(), rejected.id(), rejected.version())
            .await;

        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    // === queries ===

    #[rstest]
    #[tokio::test]
    async fn test_承認待ち一覧は段階と部署で絞り込まれる(fixture: Fixture) {
        let request = submitted(&fixture).await;

        let mine = fixture
            .sut
            .list_pending_approvals(fixture.director.id())
            .await
            .unwrap();
        let other = fixture
            .sut
            .list_pending_approvals(fixture.other_director.id())
            .await
            .unwrap();
        let head = fixture
            .sut
            .list_pending_approvals(fixture.head.id())
            .await
            .unwrap();
        let employee = fixture
            .sut
            .list_pending_approvals(fixture.employee.id())
            .await
            .unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id(), request.id());
        assert!(other.is_empty());
        assert!(head.is_empty());
        assert!(employee.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn test_閲覧権限のない申請は404を返す(fixture: Fixture) {
        let request = submitted(&fixture).await;

        assert!(
            fixture
                .sut
                .get(fixture.director.id(), request.id())
                .await
                .is_ok()
        );
        assert!(
            fixture
                .sut
                .get(fixture.admin.id(), request.id())
                .await
                .is_ok()
        );
        let hidden = fixture.sut.get(fixture.other_director.id(), request.id()).await;
        assert!(matches!(hidden, Err(ApiError::NotFound(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn test_管理者一覧はステータスで絞り込める(fixture: Fixture) {
        let request = submitted(&fixture).await;
        fixture
            .sut
            .cancel(fixture.employee.id(), request.id(), request.version())
            .await
            .unwrap();
        fixture.leave_repo.add_request(
            LeaveRequest::new(NewLeaveRequest {
                id:             LeaveRequestId::new(),
                employee_id:    fixture.head.id().clone(),
                employee_name:  "head".to_string(),
                department:     fixture.head.department().clone(),
                leave_type:     LeaveType::Short,
                period:         LeavePeriod::new(date(3, 20), date(3, 20)).unwrap(),
                reason:         LeaveReason::new("通院").unwrap(),
                relief_officer: None,
                now:            now(),
            }),
        );

        let pending = fixture
            .sut
            .list_all(&LeaveRequestFilter {
                status: Some(LeaveRequestStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        let all = fixture
            .sut
            .list_all(&LeaveRequestFilter::default())
            .await
            .unwrap();

        assert_eq!(pending.len(), 1);
        assert_eq!(all.len(), 2);
    }
}
