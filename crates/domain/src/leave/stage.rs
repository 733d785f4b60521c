//! # 承認段階と推薦記録
//!
//! 承認チェーンは Director → DepartmentalHead → HrDirector の固定順。
//! 各段階の判断は [`Recommendation`] として申請に積み上がる。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

use crate::{
    DomainError,
    user::{UserId, UserRole},
};

/// 承認段階
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApprovalStage {
    Director,
    DepartmentalHead,
    HrDirector,
}

impl ApprovalStage {
    /// 承認チェーン（判断される順）
    pub const CHAIN: [ApprovalStage; 3] = [
        ApprovalStage::Director,
        ApprovalStage::DepartmentalHead,
        ApprovalStage::HrDirector,
    ];

    /// 最初の段階
    pub fn first() -> Self {
        Self::Director
    }

    /// チェーン上の位置（0 始まり）
    pub fn index(&self) -> usize {
        match self {
            Self::Director => 0,
            Self::DepartmentalHead => 1,
            Self::HrDirector => 2,
        }
    }

    /// 次の段階。最終段の後は `None`
    pub fn next(&self) -> Option<Self> {
        Self::CHAIN.get(self.index() + 1).copied()
    }

    /// この段階を判断できるロール
    pub fn required_role(&self) -> UserRole {
        match self {
            Self::Director => UserRole::Director,
            Self::DepartmentalHead => UserRole::DepartmentalHead,
            Self::HrDirector => UserRole::HrDirector,
        }
    }

    /// 申請者と同じ部署の承認者に限定される段階か
    ///
    /// HrDirector は全社横断で判断する。
    pub fn requires_same_department(&self) -> bool {
        !matches!(self, Self::HrDirector)
    }

    /// ロールが担当する段階
    pub fn for_role(role: UserRole) -> Option<Self> {
        Self::CHAIN.into_iter().find(|s| s.required_role() == role)
    }
}

impl_from_str_by_name!(ApprovalStage, "承認段階");

/// 段階ごとの判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    Recommended,
    Rejected,
}

/// 推薦記録
///
/// 承認者が段階ごとに残す判断。申請の `recommendations` に JSON で永続化される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub stage:         ApprovalStage,
    pub approver_id:   UserId,
    pub approver_name: String,
    pub decision:      Decision,
    pub comment:       Option<String>,
    pub decided_at:    DateTime<Utc>,
}

/// 推薦記録がチェーンの先頭から順に並んでいるか検証する
///
/// 最後の 1 件以外はすべて `Recommended` でなければならない。
pub(crate) fn validate_chain_prefix(recommendations: &[Recommendation]) -> Result<(), DomainError> {
    if recommendations.len() > ApprovalStage::CHAIN.len() {
        return Err(DomainError::Validation(
            "推薦記録が承認チェーンの段階数を超えています".to_string(),
        ));
    }

    for (i, rec) in recommendations.iter().enumerate() {
        if rec.stage != ApprovalStage::CHAIN[i] {
            return Err(DomainError::Validation(format!(
                "推薦記録の順序が不正です: {} 番目は {} である必要があります（実際: {}）",
                i + 1,
                ApprovalStage::CHAIN[i],
                rec.stage
            )));
        }
        let is_last = i + 1 == recommendations.len();
        if !is_last && rec.decision != Decision::Recommended {
            return Err(DomainError::Validation(format!(
                "却下された段階（{}）の後に推薦記録があります",
                rec.stage
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn rec(stage: ApprovalStage, decision: Decision) -> Recommendation {
        Recommendation {
            stage,
            approver_id: UserId::new(),
            approver_name: "Approver".to_string(),
            decision,
            comment: None,
            decided_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[rstest]
    #[case(ApprovalStage::Director, Some(ApprovalStage::DepartmentalHead))]
    #[case(ApprovalStage::DepartmentalHead, Some(ApprovalStage::HrDirector))]
    #[case(ApprovalStage::HrDirector, None)]
    fn test_次の段階はチェーン順(
        #[case] stage: ApprovalStage,
        #[case] expected: Option<ApprovalStage>,
    ) {
        assert_eq!(stage.next(), expected);
    }

    #[rstest]
    #[case(UserRole::Director, Some(ApprovalStage::Director))]
    #[case(UserRole::DepartmentalHead, Some(ApprovalStage::DepartmentalHead))]
    #[case(UserRole::HrDirector, Some(ApprovalStage::HrDirector))]
    #[case(UserRole::Employee, None)]
    #[case(UserRole::Admin, None)]
    fn test_ロールから担当段階を引ける(
        #[case] role: UserRole,
        #[case] expected: Option<ApprovalStage>,
    ) {
        assert_eq!(ApprovalStage::for_role(role), expected);
    }

    #[test]
    fn test_人事部長段階のみ部署を問わない() {
        assert!(ApprovalStage::Director.requires_same_department());
        assert!(ApprovalStage::DepartmentalHead.requires_same_department());
        assert!(!ApprovalStage::HrDirector.requires_same_department());
    }

    #[test]
    fn test_推薦記録はjsonで段階名をsnake_caseにする() {
        let json = serde_json::to_value(rec(ApprovalStage::HrDirector, Decision::Rejected)).unwrap();

        assert_eq!(json["stage"], "hr_director");
        assert_eq!(json["decision"], "rejected");
    }

    #[test]
    fn test_チェーン順の推薦記録は妥当() {
        let recs = vec![
            rec(ApprovalStage::Director, Decision::Recommended),
            rec(ApprovalStage::DepartmentalHead, Decision::Rejected),
        ];

        assert!(validate_chain_prefix(&recs).is_ok());
    }

    #[test]
    fn test_段階を飛ばした推薦記録は不正() {
        let recs = vec![rec(ApprovalStage::DepartmentalHead, Decision::Recommended)];

        assert!(validate_chain_prefix(&recs).is_err());
    }

    #[test]
    fn test_却下の後に続く推薦記録は不正() {
        let recs = vec![
            rec(ApprovalStage::Director, Decision::Rejected),
            rec(ApprovalStage::DepartmentalHead, Decision::Recommended),
        ];

        assert!(validate_chain_prefix(&recs).is_err());
    }
}
