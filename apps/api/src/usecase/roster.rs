//! # ロスター・カレンダーユースケース
//!
//! 管理者によるロスターエントリの登録・削除と、
//! 承認済み休暇とロスターを合わせた月次カレンダーの組み立てを扱う。

use std::sync::Arc;

use chrono::NaiveDate;
use leaveflow_domain::{
    audit_log::{AuditAction, AuditLog},
    clock::Clock,
    leave::LeavePeriod,
    roster::{CalendarMonth, LeaveCalendar, NewRosterEntry, RosterEntry, RosterEntryId},
    user::UserId,
    value_objects::DepartmentName,
};
use leaveflow_infra::{
    SessionData,
    db::TransactionManager,
    repository::{AuditLogRepository, LeaveRequestRepository, RosterRepository, UserRepository},
};
use leaveflow_shared::{event_log::event, log_business_event};
use serde_json::json;

use super::helpers::{FindResultExt, begin_tx, commit_tx, record_audit};
use crate::{
    error::ApiError,
    live::{EventHub, LiveEvent, RosterChange},
};

const RESOURCE_TYPE: &str = "roster_entry";

/// ロスターエントリ登録の入力
#[derive(Debug)]
pub struct CreateRosterEntryInput {
    pub user_id:    UserId,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub note:       Option<String>,
}

/// ロスターユースケースの依存
pub struct RosterDeps {
    pub user_repo:      Arc<dyn UserRepository>,
    pub leave_repo:     Arc<dyn LeaveRequestRepository>,
    pub roster_repo:    Arc<dyn RosterRepository>,
    pub tx_manager:     Arc<dyn TransactionManager>,
    pub audit_log_repo: Arc<dyn AuditLogRepository>,
    pub hub:            EventHub,
    pub clock:          Arc<dyn Clock>,
}

pub struct RosterUseCaseImpl {
    deps: RosterDeps,
}

impl RosterUseCaseImpl {
    pub fn new(deps: RosterDeps) -> Self {
        Self { deps }
    }

    /// 月次カレンダーを組み立てる
    pub async fn calendar(
        &self,
        year: i32,
        month: u32,
        department: Option<String>,
    ) -> Result<LeaveCalendar, ApiError> {
        let month = CalendarMonth::new(year, month)?;
        let department = department
            .filter(|d| !d.trim().is_empty())
            .map(DepartmentName::new)
            .transpose()?;
        let range = month.as_period();

        let leaves = self.deps.leave_repo.find_approved_overlapping(&range).await?;
        let roster = self.deps.roster_repo.find_overlapping(&range).await?;

        Ok(LeaveCalendar::build(
            month,
            &leaves,
            &roster,
            department.as_ref(),
        ))
    }

    /// ロスターエントリを登録する
    ///
    /// 同じユーザーの既存エントリと期間が重なる場合は 409 を返す。
    /// 対象ユーザーの行をロックしてから確認・保存するため、同時登録でも重複は残らない。
    pub async fn create_entry(
        &self,
        actor: &SessionData,
        input: CreateRosterEntryInput,
    ) -> Result<RosterEntry, ApiError> {
        let period = LeavePeriod::new(input.start_date, input.end_date)?;
        let user = self
            .deps
            .user_repo
            .find_by_id(&input.user_id)
            .await
            .or_not_found("ユーザー")?;

        let entry = RosterEntry::new(NewRosterEntry {
            id: RosterEntryId::new(),
            user: &user,
            period,
            note: input.note,
            created_by: actor.user_id().clone(),
            now: self.deps.clock.now(),
        })?;

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps.user_repo.lock_for_update(&mut tx, user.id()).await?;
        let overlapping = self
            .deps
            .roster_repo
            .find_overlapping_for_user(&mut tx, user.id(), &period)
            .await?;
        if !overlapping.is_empty() {
            return Err(ApiError::Conflict(
                "同じユーザーの既存のロスターと期間が重複しています".to_string(),
            ));
        }

        self.deps.roster_repo.insert(&mut tx, &entry).await?;
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::ROSTER,
            event.action = event::action::ROSTER_ENTRY_CREATED,
            event.entity_type = event::entity_type::ROSTER_ENTRY,
            event.entity_id = %entry.id(),
            event.actor_id = %actor.user_id(),
            event.result = event::result::SUCCESS,
            "ロスターを登録しました"
        );

        self.after_change(
            actor,
            &entry,
            AuditAction::RosterCreate,
            RosterChange::Created,
        )
        .await;

        Ok(entry)
    }

    /// ロスターエントリを削除する
    pub async fn delete_entry(
        &self,
        actor: &SessionData,
        id: &RosterEntryId,
    ) -> Result<(), ApiError> {
        let entry = self
            .deps
            .roster_repo
            .find_by_id(id)
            .await
            .or_not_found("ロスター")?;

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        let deleted = self.deps.roster_repo.delete(&mut tx, id).await?;
        commit_tx(tx).await?;

        // 同時に削除された場合は後勝ちで 404
        if !deleted {
            return Err(ApiError::NotFound("ロスターが見つかりません".to_string()));
        }

        log_business_event!(
            event.category = event::category::ROSTER,
            event.action = event::action::ROSTER_ENTRY_DELETED,
            event.entity_type = event::entity_type::ROSTER_ENTRY,
            event.entity_id = %entry.id(),
            event.actor_id = %actor.user_id(),
            event.result = event::result::SUCCESS,
            "ロスターを削除しました"
        );

        self.after_change(
            actor,
            &entry,
            AuditAction::RosterDelete,
            RosterChange::Deleted,
        )
        .await;

        Ok(())
    }

    async fn after_change(
        &self,
        actor: &SessionData,
        entry: &RosterEntry,
        action: AuditAction,
        change: RosterChange,
    ) {
        record_audit(
            self.deps.audit_log_repo.as_ref(),
            AuditLog::new_success(
                actor.user_id().clone(),
                actor.name(),
                action,
                RESOURCE_TYPE,
                entry.id().to_string(),
                Some(json!({
                    "user_id": entry.user_id(),
                    "start_date": entry.period().start(),
                    "end_date": entry.period().end(),
                })),
                self.deps.clock.now(),
            ),
        )
        .await;

        self.deps
            .hub
            .publish(LiveEvent::roster_updated(entry.id(), change));
    }
}
