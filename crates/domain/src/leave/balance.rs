//! # 年次休暇の残日数
//!
//! 年次休暇の残日数は暦年単位で計算する。
//! 承認済みは「消化」、承認待ちは「予約」として残日数から差し引く。
//! 年をまたぐ申請は年ごとの営業日数で按分する。

use serde::Serialize;

use super::{
    period::LeavePeriod,
    request::{LeaveRequest, LeaveRequestStatus, LeaveType},
};
use crate::{DomainError, value_objects::AnnualEntitlement};

/// 年次休暇の残日数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnnualLeaveBalance {
    pub year:        i32,
    pub entitlement: u16,
    /// 承認済みの営業日数
    pub used:        u32,
    /// 承認待ちの営業日数
    pub reserved:    u32,
    /// 付与日数 - 消化 - 予約（超過時は負になりうる）
    pub remaining:   i32,
}

impl AnnualLeaveBalance {
    /// 指定年の残日数を計算する
    ///
    /// `requests` には対象ユーザーの申請を渡す。年次休暇以外や
    /// 取り消し・却下済みの申請は無視する。
    pub fn compute(year: i32, entitlement: AnnualEntitlement, requests: &[LeaveRequest]) -> Self {
        let (used, reserved) = requests
            .iter()
            .filter(|r| r.leave_type() == LeaveType::Annual)
            .fold((0u32, 0u32), |(used, reserved), r| {
                let days = r.period().working_days_in_year(year);
                match r.status() {
                    LeaveRequestStatus::Approved => (used + days, reserved),
                    LeaveRequestStatus::Pending => (used, reserved + days),
                    LeaveRequestStatus::Rejected | LeaveRequestStatus::Cancelled => {
                        (used, reserved)
                    }
                }
            });

        let entitlement = entitlement.days();
        Self {
            year,
            entitlement,
            used,
            reserved,
            remaining: i32::from(entitlement) - used as i32 - reserved as i32,
        }
    }

    /// 追加の申請がこの年の残日数に収まるか検証する
    pub fn ensure_fits(&self, period: &LeavePeriod) -> Result<(), DomainError> {
        let requested = period.working_days_in_year(self.year) as i32;
        if requested > self.remaining {
            return Err(DomainError::Validation(format!(
                "{} 年の年次休暇の残日数が不足しています（残り: {} 日、申請: {requested} 日）",
                self.year,
                self.remaining.max(0)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        leave::{LeaveRequestId, NewLeaveRequest},
        user::{Email, NewUser, User, UserId, UserRole},
        value_objects::{DepartmentName, LeaveReason, UserName},
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(start: NaiveDate, end: NaiveDate) -> LeavePeriod {
        LeavePeriod::new(start, end).unwrap()
    }

    fn approver(role: UserRole) -> User {
        User::new(NewUser {
            id: UserId::new(),
            email: Email::new("approver@example.com").unwrap(),
            name: UserName::new("Approver").unwrap(),
            department: DepartmentName::new("Engineering").unwrap(),
            role,
            annual_entitlement: AnnualEntitlement::default(),
            now: DateTime::from_timestamp(0, 0).unwrap(),
        })
    }

    fn request(leave_type: LeaveType, period: LeavePeriod) -> LeaveRequest {
        LeaveRequest::new(NewLeaveRequest {
            id: LeaveRequestId::new(),
            employee_id: UserId::new(),
            employee_name: "Employee".to_string(),
            department: DepartmentName::new("Engineering").unwrap(),
            leave_type,
            period,
            reason: LeaveReason::new("休暇").unwrap(),
            relief_officer: None,
            now: DateTime::from_timestamp(0, 0).unwrap(),
        })
    }

    fn approve(request: LeaveRequest) -> LeaveRequest {
        let now = DateTime::from_timestamp(10, 0).unwrap();
        request
            .recommended(&approver(UserRole::Director), None, now)
            .and_then(|r| r.recommended(&approver(UserRole::DepartmentalHead), None, now))
            .and_then(|r| r.recommended(&approver(UserRole::HrDirector), None, now))
            .unwrap()
    }

    #[test]
    fn test_承認済みは消化で承認待ちは予約として数える() {
        // 2026-03-02(月)〜03-06(金) = 5 日、03-09(月)〜03-10(火) = 2 日
        let requests = vec![
            approve(request(LeaveType::Annual, period(date(2026, 3, 2), date(2026, 3, 6)))),
            request(LeaveType::Annual, period(date(2026, 3, 9), date(2026, 3, 10))),
            request(LeaveType::Short, period(date(2026, 4, 1), date(2026, 4, 1))),
        ];

        let sut = AnnualLeaveBalance::compute(2026, AnnualEntitlement::default(), &requests);

        assert_eq!(
            sut,
            AnnualLeaveBalance {
                year:        2026,
                entitlement: 30,
                used:        5,
                reserved:    2,
                remaining:   23,
            }
        );
    }

    #[test]
    fn test_年をまたぐ申請は対象年の営業日のみ数える() {
        // 2026-12-28(月)〜2027-01-08(金): 2026 年 4 日、2027 年 6 日
        let requests = vec![request(
            LeaveType::Annual,
            period(date(2026, 12, 28), date(2027, 1, 8)),
        )];

        let sut = AnnualLeaveBalance::compute(2027, AnnualEntitlement::default(), &requests);

        assert_eq!(sut.reserved, 6);
        assert_eq!(sut.remaining, 24);
    }

    #[test]
    fn test_残日数を超える申請は拒否される() {
        let entitlement = AnnualEntitlement::new(3).unwrap();
        let sut = AnnualLeaveBalance::compute(2026, entitlement, &[]);

        assert!(
            sut.ensure_fits(&period(date(2026, 3, 2), date(2026, 3, 4)))
                .is_ok()
        );
        assert!(
            sut.ensure_fits(&period(date(2026, 3, 2), date(2026, 3, 5)))
                .is_err()
        );
    }
}
