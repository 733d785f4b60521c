//! # 休暇ロスター
//!
//! 管理者が登録する計画休暇（[`RosterEntry`]）と、承認済みの休暇申請を
//! 月単位のカレンダー（[`LeaveCalendar`]）に統合する。
//!
//! カレンダー上のエントリは表示月に切り詰められ、月と重ならないものは除外される。

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    DomainError,
    leave::{LeavePeriod, LeaveRequest, LeaveRequestStatus, LeaveType, period::is_weekend},
    user::{User, UserId},
    value_objects::DepartmentName,
};

define_uuid_id! {
    /// ロスターエントリ ID
    pub struct RosterEntryId;
}

/// ロスターのメモの最大文字数
const MAX_NOTE_LENGTH: usize = 200;

/// ロスターエントリ（管理者が登録する計画休暇）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    id: RosterEntryId,
    user_id: UserId,
    user_name: String,
    department: DepartmentName,
    period: LeavePeriod,
    note: Option<String>,
    created_by: UserId,
    created_at: DateTime<Utc>,
}

/// ロスターエントリの新規作成パラメータ
pub struct NewRosterEntry<'a> {
    pub id:         RosterEntryId,
    /// 休暇を取るユーザー
    pub user:       &'a User,
    pub period:     LeavePeriod,
    pub note:       Option<String>,
    pub created_by: UserId,
    pub now:        DateTime<Utc>,
}

/// ロスターエントリの DB 復元パラメータ
pub struct RosterEntryRecord {
    pub id:         RosterEntryId,
    pub user_id:    UserId,
    pub user_name:  String,
    pub department: DepartmentName,
    pub period:     LeavePeriod,
    pub note:       Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl RosterEntry {
    /// 新しいロスターエントリを作成する
    ///
    /// # Errors
    ///
    /// - 対象ユーザーが無効化されている
    /// - メモが 200 文字を超える
    pub fn new(params: NewRosterEntry<'_>) -> Result<Self, DomainError> {
        if !params.user.is_active() {
            return Err(DomainError::Validation(
                "無効化されたユーザーのロスターは登録できません".to_string(),
            ));
        }

        let note = params
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if note
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH)
        {
            return Err(DomainError::Validation(format!(
                "メモは {MAX_NOTE_LENGTH} 文字以内である必要があります"
            )));
        }

        Ok(Self {
            id: params.id,
            user_id: params.user.id().clone(),
            user_name: params.user.name().as_str().to_string(),
            department: params.user.department().clone(),
            period: params.period,
            note,
            created_by: params.created_by,
            created_at: params.now,
        })
    }

    pub fn from_db(record: RosterEntryRecord) -> Self {
        Self {
            id: record.id,
            user_id: record.user_id,
            user_name: record.user_name,
            department: record.department,
            period: record.period,
            note: record.note,
            created_by: record.created_by,
            created_at: record.created_at,
        }
    }

    pub fn id(&self) -> &RosterEntryId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn department(&self) -> &DepartmentName {
        &self.department
    }

    pub fn period(&self) -> &LeavePeriod {
        &self.period
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// カレンダーの表示月
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarMonth {
    year:   i32,
    month:  u32,
    #[serde(skip)]
    period: LeavePeriod,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::Validation(format!(
                "月は 1〜12 で指定してください（指定: {month}）"
            )));
        }

        let invalid_year = || DomainError::Validation(format!("不正な年: {year}"));
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid_year)?;
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let last = next_first
            .and_then(|d| d.pred_opt())
            .ok_or_else(invalid_year)?;

        Ok(Self {
            year,
            month,
            period: LeavePeriod::new(first, last)?,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        self.period.start()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.period.end()
    }

    pub fn as_period(&self) -> LeavePeriod {
        self.period
    }
}

/// カレンダーエントリの出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalendarSource {
    /// 承認済みの休暇申請
    ApprovedLeave { leave_type: LeaveType },
    /// 管理者が登録したロスター
    Roster,
}

/// カレンダー上の 1 件の不在
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarEntry {
    pub user_id:      UserId,
    pub user_name:    String,
    pub department:   DepartmentName,
    /// 表示月に切り詰めた期間
    pub period:       LeavePeriod,
    pub source:       CalendarSource,
    /// 休暇申請 ID またはロスターエントリ ID
    pub reference_id: Uuid,
}

/// カレンダーの 1 日
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date:          NaiveDate,
    pub is_weekend:    bool,
    /// その日を含むエントリの `reference_id`
    pub reference_ids: Vec<Uuid>,
}

/// 月単位の休暇カレンダー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveCalendar {
    pub month:   CalendarMonth,
    pub entries: Vec<CalendarEntry>,
    pub days:    Vec<CalendarDay>,
}

impl LeaveCalendar {
    /// 承認済み休暇とロスターを統合してカレンダーを組み立てる
    ///
    /// 承認済み以外の休暇申請は含めない。`department` を指定した場合は
    /// その部署のエントリのみ残す。エントリは開始日、氏名の順に並べる。
    pub fn build(
        month: CalendarMonth,
        leaves: &[LeaveRequest],
        roster: &[RosterEntry],
        department: Option<&DepartmentName>,
    ) -> Self {
        let range = month.as_period();

        let from_leaves = leaves
            .iter()
            .filter(|l| l.status() == LeaveRequestStatus::Approved)
            .filter_map(|l| {
                let period = l.period().intersection(&range)?;
                Some(CalendarEntry {
                    user_id: l.employee_id().clone(),
                    user_name: l.employee_name().to_string(),
                    department: l.department().clone(),
                    period,
                    source: CalendarSource::ApprovedLeave {
                        leave_type: l.leave_type(),
                    },
                    reference_id: *l.id().as_uuid(),
                })
            });

        let from_roster = roster.iter().filter_map(|r| {
            let period = r.period().intersection(&range)?;
            Some(CalendarEntry {
                user_id: r.user_id().clone(),
                user_name: r.user_name().to_string(),
                department: r.department().clone(),
                period,
                source: CalendarSource::Roster,
                reference_id: *r.id().as_uuid(),
            })
        });

        let mut entries: Vec<CalendarEntry> = from_leaves
            .chain(from_roster)
            .filter(|e| department.is_none_or(|d| &e.department == d))
            .collect();
        entries.sort_by(|a, b| {
            a.period
                .start()
                .cmp(&b.period.start())
                .then_with(|| a.user_name.cmp(&b.user_name))
        });

        let days = range
            .days()
            .map(|date| CalendarDay {
                date,
                is_weekend: is_weekend(date),
                reference_ids: entries
                    .iter()
                    .filter(|e| e.period.contains(date))
                    .map(|e| e.reference_id)
                    .collect(),
            })
            .collect();

        Self {
            month,
            entries,
            days,
        }
    }
}
