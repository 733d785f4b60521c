//! # パスワード
//!
//! 平文は [`PlainPassword`]、保存値は Argon2id の PHC 文字列 [`PasswordHash`] で扱う。
//! ハッシュ化と照合はインフラ層の `PasswordChecker` が行う。

use crate::DomainError;

/// 新しく設定できるパスワードの文字数
const PASSWORD_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 8..=128;

/// 平文パスワード（`Debug` には値を出さない）
#[derive(Clone)]
pub struct PlainPassword(String);

impl std::fmt::Debug for PlainPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PlainPassword(***)")
    }
}

impl PlainPassword {
    /// ログイン入力など、長さを問わない平文
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// ユーザー作成・パスワード変更で設定する平文
    pub fn new_for_registration(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let len = value.chars().count();
        if !PASSWORD_LENGTH_RANGE.contains(&len) {
            return Err(DomainError::Validation(format!(
                "パスワードは {} 〜 {} 文字で設定してください",
                PASSWORD_LENGTH_RANGE.start(),
                PASSWORD_LENGTH_RANGE.end()
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Argon2id の PHC 文字列
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(phc: impl Into<String>) -> Self {
        Self(phc.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 照合結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerifyResult {
    Match,
    Mismatch,
}

impl PasswordVerifyResult {
    pub fn is_match(self) -> bool {
        self == Self::Match
    }
}

impl From<bool> for PasswordVerifyResult {
    fn from(matched: bool) -> Self {
        if matched { Self::Match } else { Self::Mismatch }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_平文はdebugに出ない() {
        let password = PlainPassword::new("hunter2-secret");

        assert_eq!(format!("{password:?}"), "PlainPassword(***)");
    }

    #[rstest]
    #[case::短すぎる("1234567", false)]
    #[case::下限("12345678", true)]
    #[case::全角("休暇申請のパスワード", true)]
    #[case::上限("a".repeat(128), true)]
    #[case::長すぎる("a".repeat(129), false)]
    fn test_設定できるパスワードの長さ(#[case] input: String, #[case] ok: bool) {
        assert_eq!(PlainPassword::new_for_registration(input).is_ok(), ok);
    }

    #[test]
    fn test_照合結果はboolから作れる() {
        assert!(PasswordVerifyResult::from(true).is_match());
        assert_eq!(PasswordVerifyResult::from(false), PasswordVerifyResult::Mismatch);
    }
}
