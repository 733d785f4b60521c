//! # 申請ルール
//!
//! 申請時点で判定できるルール（開始日、短期休暇の日数上限）をまとめる。
//! 残日数の判定は [`super::balance`] が担う。

use chrono::NaiveDate;

use super::{period::LeavePeriod, request::LeaveType};
use crate::DomainError;

/// 休暇申請ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeavePolicy {
    /// 短期休暇 1 件あたりの営業日数上限
    short_leave_max_days: u32,
}

impl LeavePolicy {
    /// 短期休暇の既定上限（営業日）
    pub const DEFAULT_SHORT_LEAVE_MAX_DAYS: u32 = 5;

    pub fn new(short_leave_max_days: u32) -> Self {
        Self {
            short_leave_max_days,
        }
    }

    pub fn short_leave_max_days(&self) -> u32 {
        self.short_leave_max_days
    }

    /// 新規申請を検証する
    ///
    /// # Errors
    ///
    /// - 開始日が `today` より前
    /// - 期間に営業日が含まれない
    /// - 短期休暇が上限日数を超える
    pub fn validate_submission(
        &self,
        leave_type: LeaveType,
        period: &LeavePeriod,
        today: NaiveDate,
    ) -> Result<(), DomainError> {
        if period.start() < today {
            return Err(DomainError::Validation(
                "過去の日付から始まる休暇は申請できません".to_string(),
            ));
        }

        let days = period.working_days();
        if days == 0 {
            return Err(DomainError::Validation(
                "休暇期間に営業日が含まれていません".to_string(),
            ));
        }

        if leave_type == LeaveType::Short && days > self.short_leave_max_days {
            return Err(DomainError::Validation(format!(
                "短期休暇は {} 営業日以内である必要があります（申請: {days} 日）",
                self.short_leave_max_days
            )));
        }

        Ok(())
    }
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SHORT_LEAVE_MAX_DAYS)
    }
}
