//! # 認証ユースケース
//!
//! ログイン・ログアウト・パスワード変更を扱う。
//!
//! ## セキュリティ
//!
//! - 存在しないメールアドレスでも [`DUMMY_HASH`] で同じコストの検証を行い、
//!   応答時間からユーザーの有無を推測されないようにする
//! - 失敗理由（ユーザーなし・パスワード不一致・無効ユーザー）はクライアントに区別して返さない

use std::sync::Arc;

use leaveflow_domain::{
    clock::Clock,
    password::{PasswordHash, PlainPassword},
    user::{Email, User, UserId},
};
use leaveflow_infra::{
    PasswordChecker,
    SessionData,
    SessionManager,
    db::TransactionManager,
    password::DUMMY_HASH,
    repository::UserRepository,
};
use leaveflow_shared::{
    event_log::{error, event},
    log_business_event,
};

use super::helpers::{FindResultExt, begin_tx, commit_tx};
use crate::error::ApiError;

const INVALID_CREDENTIALS: &str = "メールアドレスまたはパスワードが正しくありません";

/// ログイン結果
#[derive(Debug)]
pub struct LoginOutcome {
    pub session_id: String,
    pub session:    SessionData,
}

/// 認証ユースケース
pub struct AuthUseCaseImpl {
    user_repo:        Arc<dyn UserRepository>,
    tx_manager:       Arc<dyn TransactionManager>,
    session_manager:  Arc<dyn SessionManager>,
    password_checker: Arc<dyn PasswordChecker>,
    clock:            Arc<dyn Clock>,
}

impl AuthUseCaseImpl {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        session_manager: Arc<dyn SessionManager>,
        password_checker: Arc<dyn PasswordChecker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            user_repo,
            tx_manager,
            session_manager,
            password_checker,
            clock,
        }
    }

    /// メールアドレスとパスワードでログインし、セッションを作成する
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let password = PlainPassword::new(password);

        let credentials = match Email::new(email) {
            Ok(email) => self.user_repo.find_credentials_by_email(&email).await?,
            Err(_) => None,
        };

        let Some((user, hash)) = credentials else {
            self.verify(&password, &PasswordHash::new(DUMMY_HASH))?;
            log_login_failure(None, "user_not_found");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        if !self.verify(&password, &hash)? {
            log_login_failure(Some(user.id()), "password_mismatch");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        if !user.can_login() {
            log_login_failure(Some(user.id()), "inactive_user");
            return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let session = SessionData::for_user(&user, self.clock.now());
        let session_id = self.session_manager.create(&session).await?;

        log_business_event!(
            event.category = event::category::AUTH,
            event.action = event::action::LOGIN_SUCCESS,
            event.entity_type = event::entity_type::USER,
            event.entity_id = %user.id(),
            event.actor_id = %user.id(),
            event.result = event::result::SUCCESS,
            "ログイン成功"
        );

        Ok(LoginOutcome {
            session_id,
            session,
        })
    }

    /// セッションを削除する
    ///
    /// 既に存在しないセッションでも成功とする。
    pub async fn logout(&self, session_id: &str, user_id: Option<&UserId>) -> Result<(), ApiError> {
        self.session_manager.delete(session_id).await?;

        if let Some(user_id) = user_id {
            log_business_event!(
                event.category = event::category::AUTH,
                event.action = event::action::LOGOUT,
                event.entity_type = event::entity_type::SESSION,
                event.actor_id = %user_id,
                event.result = event::result::SUCCESS,
                "ログアウト"
            );
        }
        Ok(())
    }

    /// 現在のユーザーを取得する
    pub async fn me(&self, user_id: &UserId) -> Result<User, ApiError> {
        self.user_repo.find_by_id(user_id).await.or_not_found("ユーザー")
    }

    /// パスワードを変更する
    ///
    /// 現在のパスワードが一致しない場合は 400 を返す。
    pub async fn change_password(
        &self,
        user_id: &UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let hash = self
            .user_repo
            .find_password_hash(user_id)
            .await
            .or_not_found("ユーザー")?;

        if !self.verify(&PlainPassword::new(current_password), &hash)? {
            return Err(ApiError::BadRequest(
                "現在のパスワードが正しくありません".to_string(),
            ));
        }

        let new_password = PlainPassword::new_for_registration(new_password)?;
        let new_hash = self
            .password_checker
            .hash(&new_password)
            .map_err(|e| ApiError::Internal(format!("パスワードのハッシュ化に失敗: {}", e)))?;

        let mut tx = begin_tx(self.tx_manager.as_ref()).await?;
        self.user_repo
            .update_password(&mut tx, user_id, &new_hash, self.clock.now())
            .await?;
        commit_tx(tx).await?;

        log_business_event!(
            event.category = event::category::AUTH,
            event.action = event::action::PASSWORD_CHANGED,
            event.entity_type = event::entity_type::USER,
            event.entity_id = %user_id,
            event.actor_id = %user_id,
            event.result = event::result::SUCCESS,
            "パスワード変更"
        );
        Ok(())
    }

    fn verify(&self, password: &PlainPassword, hash: &PasswordHash) -> Result<bool, ApiError> {
        self.password_checker
            .verify(password, hash)
            .map(|result| result.is_match())
            .map_err(|e| {
                tracing::error!(
                    error.category = error::category::INFRASTRUCTURE,
                    error.kind = error::kind::PASSWORD_VERIFICATION,
                    "パスワード検証で内部エラー: {}",
                    e
                );
                ApiError::Internal("パスワード検証に失敗しました".to_string())
            })
    }
}

fn log_login_failure(user_id: Option<&UserId>, reason: &str) {
    let entity_id = user_id.map(ToString::to_string).unwrap_or_default();
    log_business_event!(
        event.category = event::category::AUTH,
        event.action = event::action::LOGIN_FAILURE,
        event.entity_type = event::entity_type::USER,
        event.entity_id = %entity_id,
        event.result = event::result::FAILURE,
        event.reason = reason,
        "ログイン失敗"
    );
}
