//! # 休暇期間
//!
//! 開始日・終了日（両端を含む）で表す休暇期間と、その営業日計算。
//! 営業日は月曜〜金曜。祝日は考慮しない。

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 休暇期間（値オブジェクト）
///
/// # 不変条件
///
/// - `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeavePeriod {
    start: NaiveDate,
    end:   NaiveDate,
}

impl LeavePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DomainError> {
        if end < start {
            return Err(DomainError::Validation(
                "終了日は開始日以降である必要があります".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// 期間内の日付を順に返す
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|d| *d <= self.end)
    }

    /// 期間内の営業日数（土日を除く）
    ///
    /// 週単位でまとめて数えるため、期間の長さによらず定数時間で求まる。
    pub fn working_days(&self) -> u32 {
        let total = self.end.signed_duration_since(self.start).num_days() + 1;
        let (weeks, rest) = (total / 7, total % 7);
        let first = i64::from(self.start.weekday().num_days_from_monday());
        let rest_working = (0..rest).filter(|i| (first + i) % 7 < 5).count() as i64;

        u32::try_from(weeks * 5 + rest_working).unwrap_or(u32::MAX)
    }

    /// 指定年に含まれる営業日数
    ///
    /// 年をまたぐ休暇の残日数計算に使う。
    pub fn working_days_in_year(&self, year: i32) -> u32 {
        let Some(year_period) = year_period(year) else {
            return 0;
        };
        self.intersection(&year_period)
            .map_or(0, |p| p.working_days())
    }

    /// 期間が触れる年の一覧（昇順）
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start.year()..=self.end.year()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 他の期間と 1 日でも重なるか
    pub fn overlaps(&self, other: &LeavePeriod) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// 他の期間との共通部分
    pub fn intersection(&self, other: &LeavePeriod) -> Option<LeavePeriod> {
        if !self.overlaps(other) {
            return None;
        }
        Some(Self {
            start: self.start.max(other.start),
            end:   self.end.min(other.end),
        })
    }
}

/// 土日かどうか
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn year_period(year: i32) -> Option<LeavePeriod> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31)?;
    Some(LeavePeriod { start, end })
}
