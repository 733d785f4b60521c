//! # 時計
//!
//! 申請日の過去判定や残日数の対象年は [`Clock::today`] で決める。
//! 日付の境界は UTC で、利用者のタイムゾーンには依存しない。

use chrono::{DateTime, NaiveDate, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// OS の時刻
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 常に同じ時刻を返す（テスト用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(at)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    /// JST の月曜朝はまだ UTC では日曜
    #[rstest]
    #[case("2026-03-02T08:30:00+09:00", (2026, 3, 1))]
    #[case("2026-03-02T09:00:00+09:00", (2026, 3, 2))]
    #[case("2026-12-31T23:59:59Z", (2026, 12, 31))]
    fn test_todayはutcの日付(#[case] at: &str, #[case] (y, m, d): (i32, u32, u32)) {
        let clock = FixedClock::new(DateTime::parse_from_rfc3339(at).unwrap().to_utc());

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(y, m, d).unwrap());
    }

    #[test]
    fn test_system_clockは呼び出し時点の時刻() {
        let before = Utc::now();
        let now = SystemClock.now();

        assert!(now >= before);
        assert!(now <= Utc::now());
    }
}
