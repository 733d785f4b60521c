//! # パスワードハッシュ
//!
//! ユーザー作成・パスワード変更時のハッシュ化と、ログイン時の照合を行う。
//! 保存形式は Argon2id の PHC 文字列（`$argon2id$v=19$...`）。

use argon2::{
    Argon2,
    Params,
    PasswordHasher as _,
    PasswordVerifier as _,
    password_hash::{PasswordHash as Argon2PasswordHash, SaltString},
};
use leaveflow_domain::password::{PasswordHash, PasswordVerifyResult, PlainPassword};
use rand::Rng as _;

use crate::InfraError;

/// 未登録メールアドレスでのログイン時に照合する固定ハッシュ
///
/// 登録済みユーザーと同じ照合コストをかけ、応答時間を揃える。
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=65536,t=1,p=1$olntqw+EoVpwH4B1vUAI0A$5yCA1izLODgz8nQOInDGwbuQB/AS0sIQDwpmIilve5M";

/// パスワードのハッシュ化と照合
pub trait PasswordChecker: Send + Sync {
    /// 平文とハッシュを照合する（ハッシュが PHC 形式でなければエラー）
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError>;

    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError>;
}

/// Argon2id（m=64MiB, t=1, p=1）による実装
pub struct Argon2PasswordChecker {
    argon2: Argon2<'static>,
}

impl Argon2PasswordChecker {
    pub fn new() -> Self {
        let params = Params::new(64 * 1024, 1, 1, None).expect("Argon2 パラメータが不正です");

        Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params),
        }
    }
}

impl Default for Argon2PasswordChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordChecker for Argon2PasswordChecker {
    fn verify(
        &self,
        password: &PlainPassword,
        hash: &PasswordHash,
    ) -> Result<PasswordVerifyResult, InfraError> {
        let parsed = Argon2PasswordHash::new(hash.as_str())
            .map_err(|e| InfraError::unexpected(format!("不正なハッシュ形式: {e}")))?;

        let matched = self
            .argon2
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok();

        Ok(PasswordVerifyResult::from(matched))
    }

    fn hash(&self, password: &PlainPassword) -> Result<PasswordHash, InfraError> {
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| InfraError::unexpected(format!("ソルトの生成に失敗: {e}")))?;

        let hash = self
            .argon2
            .hash_password(password.as_str().as_bytes(), &salt)
            .map_err(|e| InfraError::unexpected(format!("パスワードのハッシュ化に失敗: {e}")))?;

        Ok(PasswordHash::new(hash.to_string()))
    }
}
