//! # ユーザー管理ユースケース
//!
//! 管理者によるユーザーの作成・更新・有効化/無効化を扱う。
//! すべての変更は監査ログに記録し、`user_updated` を配信する。

use std::sync::Arc;

use leaveflow_domain::{
    audit_log::{AuditAction, AuditLog},
    clock::Clock,
    password::PlainPassword,
    user::{Email, NewUser, User, UserId, UserProfileChanges, UserRole, UserStatus},
    value_objects::{AnnualEntitlement, DepartmentName, UserName},
};
use leaveflow_infra::{
    PasswordChecker,
    SessionData,
    SessionManager,
    db::TransactionManager,
    repository::{AuditLogRepository, UserRepository},
};
use leaveflow_shared::event_log::error;
use serde_json::json;

use super::helpers::{FindResultExt, begin_tx, commit_tx, record_audit};
use crate::{
    error::ApiError,
    live::{EventHub, LiveEvent},
};

const RESOURCE_TYPE: &str = "user";

/// ユーザー作成の入力
#[derive(Debug)]
pub struct CreateUserInput {
    pub email:              String,
    pub name:               String,
    pub department:         String,
    pub role:               UserRole,
    pub annual_entitlement: Option<u16>,
    pub initial_password:   String,
}

/// ユーザー更新の入力（指定された項目のみ変更する）
#[derive(Debug, Default)]
pub struct UpdateUserInput {
    pub name:               Option<String>,
    pub department:         Option<String>,
    pub role:               Option<UserRole>,
    pub annual_entitlement: Option<u16>,
}

/// ユーザー管理ユースケースの依存
pub struct UserDeps {
    pub user_repo:        Arc<dyn UserRepository>,
    pub tx_manager:       Arc<dyn TransactionManager>,
    pub audit_log_repo:   Arc<dyn AuditLogRepository>,
    pub session_manager:  Arc<dyn SessionManager>,
    pub password_checker: Arc<dyn PasswordChecker>,
    pub hub:              EventHub,
    pub clock:            Arc<dyn Clock>,
}

/// ユーザー管理ユースケース
pub struct UserUseCaseImpl {
    deps: UserDeps,
}

impl UserUseCaseImpl {
    pub fn new(deps: UserDeps) -> Self {
        Self { deps }
    }

    /// ユーザー一覧を名前順で取得する
    pub async fn list_users(&self, status: Option<UserStatus>) -> Result<Vec<User>, ApiError> {
        Ok(self.deps.user_repo.find_all(status).await?)
    }

    /// ユーザーを作成する
    ///
    /// メールアドレスが既に使われている場合は 409 を返す。
    pub async fn create_user(
        &self,
        actor: &SessionData,
        input: CreateUserInput,
    ) -> Result<User, ApiError> {
        let email = Email::new(input.email)?;
        let annual_entitlement = match input.annual_entitlement {
            Some(days) => AnnualEntitlement::new(days)?,
            None => AnnualEntitlement::default(),
        };
        let password = PlainPassword::new_for_registration(input.initial_password)?;

        let user = User::new(NewUser {
            id: UserId::new(),
            email,
            name: UserName::new(input.name)?,
            department: DepartmentName::new(input.department)?,
            role: input.role,
            annual_entitlement,
            now: self.deps.clock.now(),
        });

        if self.deps.user_repo.find_by_email(user.email()).await?.is_some() {
            return Err(email_taken());
        }

        let hash = self
            .deps
            .password_checker
            .hash(&password)
            .map_err(|e| ApiError::Internal(format!("パスワードのハッシュ化に失敗: {}", e)))?;

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps
            .user_repo
            .insert(&mut tx, &user, &hash)
            .await
            .map_err(|e| {
                if e.as_conflict().is_some() {
                    email_taken()
                } else {
                    ApiError::from(e)
                }
            })?;
        commit_tx(tx).await?;

        self.after_change(
            actor,
            &user,
            AuditAction::UserCreate,
            json!({
                "email": user.email().as_str(),
                "role": user.role(),
                "department": user.department().as_str(),
            }),
        )
        .await;

        Ok(user)
    }

    /// ユーザーのプロフィールを更新する
    ///
    /// ロールまたは部署が変わった場合は既存セッションを破棄し、再ログインを求める。
    pub async fn update_user(
        &self,
        actor: &SessionData,
        user_id: &UserId,
        input: UpdateUserInput,
    ) -> Result<User, ApiError> {
        let changes = UserProfileChanges {
            name:               input.name.map(UserName::new).transpose()?,
            department:         input.department.map(DepartmentName::new).transpose()?,
            role:               input.role,
            annual_entitlement: input
                .annual_entitlement
                .map(AnnualEntitlement::new)
                .transpose()?,
        };

        let user = self
            .deps
            .user_repo
            .find_by_id(user_id)
            .await
            .or_not_found("ユーザー")?;

        let detail = json!({
            "name_changed": changes.name.is_some(),
            "department": changes.department.as_ref().map(DepartmentName::as_str),
            "role": changes.role,
            "annual_entitlement": changes.annual_entitlement.map(|e| e.days()),
        });
        let authority_changed = changes.role.is_some_and(|r| r != user.role())
            || changes
                .department
                .as_ref()
                .is_some_and(|d| d != user.department());

        let updated = user.with_profile(changes, self.deps.clock.now());

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        if authority_changed {
            self.revoke_sessions(updated.id()).await;
        }

        self.after_change(actor, &updated, AuditAction::UserUpdate, detail)
            .await;

        Ok(updated)
    }

    /// ユーザーを有効化・無効化する
    ///
    /// 自分自身は無効化できない。無効化したユーザーのセッションはすべて破棄する。
    pub async fn update_user_status(
        &self,
        actor: &SessionData,
        user_id: &UserId,
        status: UserStatus,
    ) -> Result<User, ApiError> {
        if actor.user_id() == user_id && status == UserStatus::Inactive {
            return Err(ApiError::BadRequest(
                "自分自身を無効化することはできません".to_string(),
            ));
        }

        let user = self
            .deps
            .user_repo
            .find_by_id(user_id)
            .await
            .or_not_found("ユーザー")?;
        let previous = user.status();
        let updated = user.with_status(status, self.deps.clock.now());

        let mut tx = begin_tx(self.deps.tx_manager.as_ref()).await?;
        self.deps.user_repo.update(&mut tx, &updated).await?;
        commit_tx(tx).await?;

        if status == UserStatus::Inactive {
            self.revoke_sessions(updated.id()).await;
        }

        let action = match status {
            UserStatus::Active => AuditAction::UserActivate,
            UserStatus::Inactive => AuditAction::UserDeactivate,
        };
        self.after_change(
            actor,
            &updated,
            action,
            json!({ "from": previous, "to": status }),
        )
        .await;

        Ok(updated)
    }

    async fn revoke_sessions(&self, user_id: &UserId) {
        if let Err(e) = self.deps.session_manager.delete_all_for_user(user_id).await {
            tracing::error!(
                error.category = error::category::INFRASTRUCTURE,
                error.kind = error::kind::SESSION,
                user_id = %user_id,
                "セッションの破棄に失敗: {}",
                e
            );
        }
    }

    async fn after_change(
        &self,
        actor: &SessionData,
        user: &User,
        action: AuditAction,
        detail: serde_json::Value,
    ) {
        record_audit(
            self.deps.audit_log_repo.as_ref(),
            AuditLog::new_success(
                actor.user_id().clone(),
                actor.name(),
                action,
                RESOURCE_TYPE,
                user.id().to_string(),
                Some(detail),
                self.deps.clock.now(),
            ),
        )
        .await;

        self.deps.hub.publish(LiveEvent::UserUpdated {
            user_id: user.id().clone(),
            status:  user.status(),
        });
    }
}

fn email_taken() -> ApiError {
    ApiError::Conflict("このメールアドレスは既に使用されています".to_string())
}
