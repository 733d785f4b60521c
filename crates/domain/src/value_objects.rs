//! # 値オブジェクト
//!
//! 利用者と休暇申請で共有する、生成時に検証済みの値。
//!
//! | 型 | 内部表現 | 用途 |
//! |---|---------|------|
//! | [`Version`] | `NonZeroU32` | 楽観的ロック |
//! | [`UserName`] | `String` | 表示名（個人情報） |
//! | [`DepartmentName`] | `String` | 部署名 |
//! | [`LeaveReason`] | `String` | 休暇申請の理由 |
//! | [`ReliefOfficer`] | `String` | 不在中の代行者 |
//! | [`AnnualEntitlement`] | `u16` | 年次休暇の年間付与日数 |

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// 楽観的ロックのバージョン番号
///
/// 申請時が 1 で、推薦・却下・取消のたびに 1 増える。
/// 承認者は画面で見ていたバージョンを送り、食い違えば 409 になる。
///
/// ```rust
/// use leaveflow_domain::value_objects::Version;
///
/// assert_eq!(Version::initial().next().as_u32(), 2);
/// assert!(Version::new(0).is_err());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct Version(NonZeroU32);

impl Version {
    pub fn initial() -> Self {
        Self(NonZeroU32::MIN)
    }

    pub fn new(value: u32) -> Result<Self, DomainError> {
        NonZeroU32::new(value)
            .map(Self)
            .ok_or_else(|| DomainError::Validation("バージョンは 1 以上を指定してください".to_string()))
    }

    /// 遷移後のバージョン（`u32::MAX` 回の遷移は起こり得ない）
    pub fn next(&self) -> Self {
        Self(self.0.checked_add(1).expect("バージョンが上限に達した"))
    }

    pub fn as_u32(&self) -> u32 {
        self.0.get()
    }

    /// `INTEGER` 列への保存用
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0.get()).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map_err(|_| DomainError::Validation(format!("不正なバージョン: {value}")))
            .and_then(Self::new)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

define_validated_string! {
    /// 表示名（個人情報のため `Debug` では伏せる）
    pub struct UserName("ユーザー名", max = 100, redact);
}

define_validated_string! {
    /// 部署名
    ///
    /// Director と DepartmentalHead の段階では、承認者と申請者の部署が一致する必要がある。
    pub struct DepartmentName("部署名", max = 100);
}

define_validated_string! {
    /// 休暇申請の理由
    pub struct LeaveReason("申請理由", max = 500);
}

define_validated_string! {
    /// 不在中の代行者（自由記述）
    pub struct ReliefOfficer("代行者", max = 100);
}

/// 年次休暇の年間付与日数の上限
const MAX_ANNUAL_ENTITLEMENT: u16 = 365;

/// 年次休暇の年間付与日数（営業日単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnualEntitlement(u16);

impl AnnualEntitlement {
    /// 既定の付与日数
    pub const DEFAULT_DAYS: u16 = 30;

    pub fn new(days: u16) -> Result<Self, DomainError> {
        if days > MAX_ANNUAL_ENTITLEMENT {
            return Err(DomainError::Validation(format!(
                "年次休暇の付与日数は {MAX_ANNUAL_ENTITLEMENT} 日以内である必要があります"
            )));
        }
        Ok(Self(days))
    }

    pub fn days(&self) -> u16 {
        self.0
    }
}

impl Default for AnnualEntitlement {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

impl TryFrom<i32> for AnnualEntitlement {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u16::try_from(value)
            .map_err(|_| DomainError::Validation(format!("不正な付与日数: {value}")))
            .and_then(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_バージョンは1から始まり遷移ごとに増える() {
        let v1 = Version::initial();

        assert_eq!(v1.as_u32(), 1);
        assert_eq!(v1.next().as_i32(), 2);
        assert!(v1 < v1.next());
    }

    #[test]
    fn test_バージョンはjsonでは数値になり0を受け付けない() {
        assert_eq!(serde_json::to_string(&Version::initial()).unwrap(), "1");
        assert!(serde_json::from_str::<Version>("0").is_err());
    }

    #[rstest]
    #[case(1, true)]
    #[case(7, true)]
    #[case(0, false)]
    #[case(-1, false)]
    fn test_i32からバージョンへの変換(#[case] input: i32, #[case] ok: bool) {
        assert_eq!(Version::try_from(input).is_ok(), ok);
    }

    #[test]
    fn test_ユーザー名は前後の空白を除去する() {
        let name = UserName::new("  山田太郎  ").unwrap();
        assert_eq!(name.as_str(), "山田太郎");
    }

    #[test]
    fn test_ユーザー名のdebug出力はマスクされる() {
        let name = UserName::new("山田太郎").unwrap();
        let debug = format!("{name:?}");
        assert!(debug.contains("***"));
        assert!(!debug.contains("山田"));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn test_部署名は空を拒否する(#[case] input: &str) {
        assert!(DepartmentName::new(input).is_err());
    }

    #[test]
    fn test_申請理由は500文字まで受け入れる() {
        assert!(LeaveReason::new("あ".repeat(500)).is_ok());
        assert!(LeaveReason::new("あ".repeat(501)).is_err());
    }

    #[rstest]
    #[case(0, true)]
    #[case(30, true)]
    #[case(365, true)]
    #[case(366, false)]
    #[case(-1, false)]
    fn test_付与日数の範囲(#[case] input: i32, #[case] ok: bool) {
        assert_eq!(AnnualEntitlement::try_from(input).is_ok(), ok);
    }

    #[test]
    fn test_付与日数の既定値は30日() {
        assert_eq!(AnnualEntitlement::default().days(), 30);
    }
}
